// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command-line settings overrides and output naming.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use clap::Args;
use notenwerk_core::error::Result;
use notenwerk_core::{AppConfig, Algorithm, Padding, ProcessingSettings, Profile, Rgb};

/// Processing settings flags. Anything left unset comes from the config
/// file, or the profile defaults when there is no config.
#[derive(Args, Debug, Clone, Default)]
pub struct SettingsArgs {
    /// Default set to start from: standard or compact
    #[arg(long, value_name = "PROFILE")]
    pub profile: Option<Profile>,

    /// Threshold algorithm: adaptive or classic
    #[arg(long, value_name = "ALGORITHM")]
    pub algorithm: Option<Algorithm>,

    /// Threshold (adaptive 0-100, classic 50-220)
    #[arg(long, value_name = "N")]
    pub threshold: Option<u32>,

    /// Classic mode ink darkening near the threshold (0-60)
    #[arg(long, value_name = "N")]
    pub contrast_boost: Option<u32>,

    /// Upscale factor before thresholding (1.0-3.0)
    #[arg(long, value_name = "FLOAT")]
    pub scale: Option<f32>,

    /// Width of the soft edge band (0-20, 0 = hard edges)
    #[arg(long, value_name = "N")]
    pub smoothness: Option<u32>,

    /// Keep the full frame instead of cropping to content
    #[arg(long)]
    pub no_crop: bool,

    /// Margin on every side, in output pixels (0-300)
    #[arg(long, value_name = "N")]
    pub padding: Option<u32>,

    #[arg(long, value_name = "N")]
    pub padding_top: Option<u32>,

    #[arg(long, value_name = "N")]
    pub padding_right: Option<u32>,

    #[arg(long, value_name = "N")]
    pub padding_bottom: Option<u32>,

    #[arg(long, value_name = "N")]
    pub padding_left: Option<u32>,

    /// Paper colour as hex, e.g. FFFFFF or #f5f0e6
    #[arg(long, value_name = "HEX")]
    pub background: Option<Rgb>,

    /// Transparent background with ink as alpha
    #[arg(long)]
    pub transparent: bool,
}

impl SettingsArgs {
    /// Layer these flags over `config` and validate the result.
    pub fn resolve(&self, config: &AppConfig) -> Result<ProcessingSettings> {
        let profile = self.profile.unwrap_or(config.default_profile);
        let mut settings = match self.profile {
            Some(profile) => profile.settings(),
            None => config.effective_settings(),
        };

        if let Some(algorithm) = self.algorithm {
            settings = settings.with_algorithm(algorithm, profile);
        }
        if let Some(threshold) = self.threshold {
            settings.threshold = threshold;
        }
        if let Some(boost) = self.contrast_boost {
            settings.contrast_boost = boost;
        }
        if let Some(scale) = self.scale {
            settings.scale_multiplier = scale;
        }
        if let Some(smoothness) = self.smoothness {
            settings.smoothness = smoothness;
        }
        if self.no_crop {
            settings.auto_crop = false;
        }

        if let Some(all) = self.padding {
            settings.padding = Padding::uniform(all);
        }
        let Padding {
            top,
            right,
            bottom,
            left,
        } = settings.padding;
        settings.padding = Padding {
            top: self.padding_top.unwrap_or(top),
            right: self.padding_right.unwrap_or(right),
            bottom: self.padding_bottom.unwrap_or(bottom),
            left: self.padding_left.unwrap_or(left),
        };

        if let Some(background) = self.background {
            settings.background_color = background;
        }
        if self.transparent {
            settings.is_transparent = true;
        }

        settings.validate()?;
        Ok(settings)
    }
}

/// Where the two outputs for `input` go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub processed: PathBuf,
    pub original: PathBuf,
}

impl OutputPaths {
    /// `<stem>_processed.png` and `<stem>_original.png` in `out`, or next to
    /// the input when no directory is given.
    pub fn for_input(input: &Path, out: Option<&Path>) -> Self {
        let (dir, stem) = Self::target(input, out);
        Self::named(&dir, &stem)
    }

    /// Output paths for a whole batch, in input order.
    ///
    /// Inputs that would land on the same name in the same directory get
    /// `_2`, `_3`, ... appended to the stem, so no output is overwritten.
    pub fn assign(inputs: &[PathBuf], out: Option<&Path>) -> Vec<Self> {
        let mut taken = HashSet::new();
        inputs
            .iter()
            .map(|input| {
                let (dir, stem) = Self::target(input, out);
                let mut name = stem.clone();
                let mut n = 1;
                while !taken.insert((dir.clone(), name.clone())) {
                    n += 1;
                    name = format!("{stem}_{n}");
                }
                Self::named(&dir, &name)
            })
            .collect()
    }

    fn target(input: &Path, out: Option<&Path>) -> (PathBuf, String) {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "page".into());
        let dir = match out {
            Some(dir) => dir.to_path_buf(),
            None => input.parent().map(Path::to_path_buf).unwrap_or_default(),
        };
        (dir, stem)
    }

    fn named(dir: &Path, stem: &str) -> Self {
        Self {
            processed: dir.join(format!("{stem}_processed.png")),
            original: dir.join(format!("{stem}_original.png")),
        }
    }
}
