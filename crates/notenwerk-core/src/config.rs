// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Application configuration.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NotenwerkError, Result};
use crate::types::{ProcessingSettings, Profile};

/// Upper bounds on any working surface the pipeline allocates.
///
/// The defaults mirror common browser canvas limits, so a job that would fail
/// to get a drawing surface there fails here too, with a clear error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferLimits {
    /// Maximum width or height in pixels.
    pub max_dimension: u32,
    /// Maximum total pixel count.
    pub max_pixels: u64,
}

impl Default for BufferLimits {
    fn default() -> Self {
        Self {
            max_dimension: 32_767,
            max_pixels: 268_435_456,
        }
    }
}

impl BufferLimits {
    /// Check that a `width` x `height` RGBA surface fits within these limits.
    pub fn check(&self, width: u32, height: u32) -> Result<()> {
        let fail = |reason: String| NotenwerkError::BufferAllocationFailed {
            width,
            height,
            reason,
        };

        if width == 0 || height == 0 {
            return Err(fail("zero-sized surface".into()));
        }
        if width > self.max_dimension || height > self.max_dimension {
            return Err(fail(format!(
                "exceeds maximum dimension {}",
                self.max_dimension
            )));
        }
        let pixels = width as u64 * height as u64;
        if pixels > self.max_pixels {
            return Err(fail(format!(
                "{pixels} pixels exceeds limit of {}",
                self.max_pixels
            )));
        }
        Ok(())
    }
}

/// Application settings, loaded from a JSON file when one is given.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Profile whose defaults apply when `settings` is absent.
    pub default_profile: Profile,
    /// Explicit processing settings overriding the profile defaults.
    pub settings: Option<ProcessingSettings>,
    /// Quiet period after the last settings change before recomputing.
    pub debounce_ms: u64,
    /// Surface size limits for decoding and processing.
    pub limits: BufferLimits,
    /// Also write the matching crop of the original for comparison.
    pub write_original: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            default_profile: Profile::Standard,
            settings: None,
            debounce_ms: 300,
            limits: BufferLimits::default(),
            write_original: true,
        }
    }
}

impl AppConfig {
    /// Read a config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        if let Some(ref settings) = config.settings {
            settings.validate()?;
        }
        info!(path = %path.as_ref().display(), "config loaded");
        Ok(config)
    }

    /// Write the config as pretty-printed JSON.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), json)?;
        debug!(path = %path.as_ref().display(), "config saved");
        Ok(())
    }

    /// The settings new images are stamped with.
    pub fn effective_settings(&self) -> ProcessingSettings {
        self.settings
            .clone()
            .unwrap_or_else(|| self.default_profile.settings())
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Algorithm;

    #[test]
    fn limits_accept_ordinary_pages() {
        let limits = BufferLimits::default();
        assert!(limits.check(2480 * 3, 3508 * 3).is_ok());
    }

    #[test]
    fn limits_reject_oversized_and_empty() {
        let limits = BufferLimits {
            max_dimension: 100,
            max_pixels: 5_000,
        };
        assert!(matches!(
            limits.check(101, 10),
            Err(NotenwerkError::BufferAllocationFailed { width: 101, .. })
        ));
        assert!(limits.check(100, 51).is_err());
        assert!(limits.check(100, 50).is_ok());
        assert!(limits.check(0, 10).is_err());
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notenwerk.json");

        let config = AppConfig {
            default_profile: Profile::Compact,
            debounce_ms: 150,
            write_original: false,
            ..AppConfig::default()
        };
        config.save(&path).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.default_profile, Profile::Compact);
        assert_eq!(loaded.debounce(), Duration::from_millis(150));
        assert!(!loaded.write_original);
        assert_eq!(loaded.effective_settings(), Profile::Compact.settings());
    }

    #[test]
    fn partial_file_takes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"settings":{"algorithm":"classic","threshold":150}}"#).unwrap();

        let loaded = AppConfig::load(&path).unwrap();
        assert_eq!(loaded.debounce_ms, 300);
        let settings = loaded.effective_settings();
        assert_eq!(settings.algorithm, Algorithm::Classic);
        assert_eq!(settings.threshold, 150);
        assert_eq!(settings.padding.top, 50);
    }

    #[test]
    fn partial_classic_file_gets_classic_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("classic.json");
        std::fs::write(&path, r#"{"settings":{"algorithm":"classic"}}"#).unwrap();

        let settings = AppConfig::load(&path).unwrap().effective_settings();
        assert_eq!(settings.algorithm, Algorithm::Classic);
        assert_eq!(settings.threshold, Algorithm::Classic.default_threshold());
    }

    #[test]
    fn load_rejects_invalid_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"settings":{"smoothness":99}}"#).unwrap();

        assert!(matches!(
            AppConfig::load(&path),
            Err(NotenwerkError::InvalidSettings(_))
        ));
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            AppConfig::load(dir.path().join("absent.json")),
            Err(NotenwerkError::Io(_))
        ));
    }
}
