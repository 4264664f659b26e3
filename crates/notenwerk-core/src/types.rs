// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the Notenwerk scan cleaner.

use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{NotenwerkError, Result};

/// Accepted range of the upsampling factor.
pub const SCALE_RANGE: RangeInclusive<f32> = 1.0..=3.0;
/// Accepted range of the classic ink boost, in percent.
pub const CONTRAST_BOOST_RANGE: RangeInclusive<u32> = 0..=60;
/// Accepted range of the soft-threshold half-width.
pub const SMOOTHNESS_RANGE: RangeInclusive<u32> = 0..=20;
/// Accepted range of each margin, in rescaled pixels.
pub const PADDING_RANGE: RangeInclusive<u32> = 0..=300;

/// Background blur radius per unit of scale (adaptive mode).
pub const BLUR_RADIUS_PER_SCALE: f32 = 20.0;

/// Thresholding strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// One global cutoff plus an optional ink boost for dark pixels.
    Classic,
    /// Cutoff follows a blurred estimate of the local paper brightness.
    #[default]
    Adaptive,
}

impl Algorithm {
    /// Valid `threshold` values for this algorithm. The two scales are unrelated:
    /// adaptive is an offset strength, classic an absolute red-channel level.
    pub fn threshold_range(&self) -> RangeInclusive<u32> {
        match self {
            Self::Classic => 50..=220,
            Self::Adaptive => 0..=100,
        }
    }

    /// Threshold used when switching to this algorithm under the standard profile.
    pub fn default_threshold(&self) -> u32 {
        Profile::Standard.default_threshold(*self)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classic => "classic",
            Self::Adaptive => "adaptive",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Algorithm {
    type Err = NotenwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "classic" => Ok(Self::Classic),
            "adaptive" => Ok(Self::Adaptive),
            other => Err(NotenwerkError::InvalidSettings(format!(
                "unknown algorithm {other:?} (expected \"classic\" or \"adaptive\")"
            ))),
        }
    }
}

/// Named bundles of defaults.
///
/// `Standard` favours smooth, heavily upsampled output; `Compact` trades some
/// edge quality for smaller files and faster processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Profile {
    #[default]
    Standard,
    Compact,
}

impl Profile {
    /// Default threshold for `algorithm` under this profile.
    pub fn default_threshold(&self, algorithm: Algorithm) -> u32 {
        match (self, algorithm) {
            (_, Algorithm::Adaptive) => 60,
            (Self::Standard, Algorithm::Classic) => 140,
            (Self::Compact, Algorithm::Classic) => 130,
        }
    }

    /// The full default settings for this profile.
    pub fn settings(&self) -> ProcessingSettings {
        let (contrast_boost, scale_multiplier, smoothness) = match self {
            Self::Standard => (20, 2.0, 10),
            Self::Compact => (15, 1.5, 5),
        };
        ProcessingSettings {
            algorithm: Algorithm::Adaptive,
            threshold: self.default_threshold(Algorithm::Adaptive),
            contrast_boost,
            scale_multiplier,
            smoothness,
            auto_crop: true,
            padding: Padding::uniform(50),
            background_color: Rgb::WHITE,
            is_transparent: false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standard => "standard",
            Self::Compact => "compact",
        }
    }
}

impl FromStr for Profile {
    type Err = NotenwerkError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "compact" => Ok(Self::Compact),
            other => Err(NotenwerkError::InvalidSettings(format!(
                "unknown profile {other:?} (expected \"standard\" or \"compact\")"
            ))),
        }
    }
}

/// An opaque sRGB colour, written as `#RRGGBB` in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Self = Self::new(255, 255, 255);
    pub const BLACK: Self = Self::new(0, 0, 0);

    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn channels(&self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    /// Sum of absolute per-channel differences to `other`.
    pub fn manhattan_distance(&self, other: [u8; 3]) -> u32 {
        self.channels()
            .iter()
            .zip(other.iter())
            .map(|(&a, &b)| a.abs_diff(b) as u32)
            .sum()
    }
}

impl Default for Rgb {
    fn default() -> Self {
        Self::WHITE
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Rgb {
    type Err = NotenwerkError;

    /// Accepts `#RRGGBB`, `RRGGBB`, `#RGB`, and `RGB`.
    fn from_str(s: &str) -> Result<Self> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || NotenwerkError::InvalidSettings(format!("invalid colour {s:?}"));

        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }

        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            6 => Ok(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
            )),
            3 => {
                // #abc is shorthand for #aabbcc
                let short = |i: usize| channel(&hex[i..i + 1]).map(|v| v * 17);
                Ok(Self::new(short(0)?, short(1)?, short(2)?))
            }
            _ => Err(invalid()),
        }
    }
}

impl TryFrom<String> for Rgb {
    type Error = NotenwerkError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Rgb> for String {
    fn from(value: Rgb) -> Self {
        value.to_string()
    }
}

/// One side of the output page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
    Top,
    Right,
    Bottom,
    Left,
}

/// How editing one margin propagates to the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarginLink {
    /// All four margins move together.
    #[default]
    Uniform,
    /// Top/bottom move together, as do left/right.
    Axis,
    /// Each margin is set on its own.
    Independent,
}

/// Margins added around the detected content, in rescaled pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Padding {
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
    pub left: u32,
}

impl Padding {
    pub const fn uniform(value: u32) -> Self {
        Self {
            top: value,
            right: value,
            bottom: value,
            left: value,
        }
    }

    pub const fn axis(vertical: u32, horizontal: u32) -> Self {
        Self {
            top: vertical,
            right: horizontal,
            bottom: vertical,
            left: horizontal,
        }
    }

    /// Left plus right.
    pub fn horizontal(&self) -> u32 {
        self.left + self.right
    }

    /// Top plus bottom.
    pub fn vertical(&self) -> u32 {
        self.top + self.bottom
    }

    /// Set `edge` to `value`, propagating according to `link`.
    pub fn linked(self, link: MarginLink, edge: Edge, value: u32) -> Self {
        match link {
            MarginLink::Uniform => Self::uniform(value),
            MarginLink::Axis => match edge {
                Edge::Top | Edge::Bottom => Self {
                    top: value,
                    bottom: value,
                    ..self
                },
                Edge::Left | Edge::Right => Self {
                    left: value,
                    right: value,
                    ..self
                },
            },
            MarginLink::Independent => match edge {
                Edge::Top => Self { top: value, ..self },
                Edge::Right => Self { right: value, ..self },
                Edge::Bottom => Self { bottom: value, ..self },
                Edge::Left => Self { left: value, ..self },
            },
        }
    }

    fn sides(&self) -> [(&'static str, u32); 4] {
        [
            ("top", self.top),
            ("right", self.right),
            ("bottom", self.bottom),
            ("left", self.left),
        ]
    }
}

impl Default for Padding {
    fn default() -> Self {
        Self::uniform(50)
    }
}

/// Everything that controls one run of the cleaning pipeline.
///
/// A plain value: callers snapshot it per image and the pipeline never
/// mutates it.
///
/// A stored value that omits `threshold` gets the default for its own
/// algorithm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "StoredSettings")]
pub struct ProcessingSettings {
    pub algorithm: Algorithm,
    /// Adaptive: 0–100 offset strength. Classic: 50–220 red-channel cutoff.
    pub threshold: u32,
    /// Percentage by which near-threshold pixels are darkened (classic only).
    pub contrast_boost: u32,
    /// Upsampling factor applied before thresholding.
    pub scale_multiplier: f32,
    /// Half-width of the soft-threshold ramp; 0 gives a hard step.
    pub smoothness: u32,
    /// Trim the output to the detected content plus `padding`.
    pub auto_crop: bool,
    pub padding: Padding,
    /// Paper colour; ignored when `is_transparent` is set.
    pub background_color: Rgb,
    /// Emit black ink on a transparent background instead of a paper colour.
    pub is_transparent: bool,
}

impl Default for ProcessingSettings {
    fn default() -> Self {
        Profile::Standard.settings()
    }
}

impl ProcessingSettings {
    /// Reject any value outside its documented range. Nothing is clamped.
    pub fn validate(&self) -> Result<()> {
        let threshold_range = self.algorithm.threshold_range();
        if !threshold_range.contains(&self.threshold) {
            return Err(NotenwerkError::InvalidSettings(format!(
                "threshold {} outside {}..={} for the {} algorithm",
                self.threshold,
                threshold_range.start(),
                threshold_range.end(),
                self.algorithm
            )));
        }

        if !CONTRAST_BOOST_RANGE.contains(&self.contrast_boost) {
            return Err(out_of_range(
                "contrast_boost",
                self.contrast_boost,
                &CONTRAST_BOOST_RANGE,
            ));
        }

        if !self.scale_multiplier.is_finite() || !SCALE_RANGE.contains(&self.scale_multiplier) {
            return Err(NotenwerkError::InvalidSettings(format!(
                "scale_multiplier {} outside {}..={}",
                self.scale_multiplier,
                SCALE_RANGE.start(),
                SCALE_RANGE.end()
            )));
        }

        if !SMOOTHNESS_RANGE.contains(&self.smoothness) {
            return Err(out_of_range("smoothness", self.smoothness, &SMOOTHNESS_RANGE));
        }

        for (side, value) in self.padding.sides() {
            if !PADDING_RANGE.contains(&value) {
                return Err(out_of_range(&format!("padding.{side}"), value, &PADDING_RANGE));
            }
        }

        Ok(())
    }

    /// Switch algorithm, resetting the threshold to the new algorithm's
    /// default under `profile`.
    pub fn with_algorithm(self, algorithm: Algorithm, profile: Profile) -> Self {
        if algorithm == self.algorithm {
            return self;
        }
        Self {
            algorithm,
            threshold: profile.default_threshold(algorithm),
            ..self
        }
    }

    /// Standard deviation of the background blur, in rescaled pixels.
    pub fn blur_radius(&self) -> f32 {
        BLUR_RADIUS_PER_SCALE * self.scale_multiplier
    }
}

/// Serialized shape of [`ProcessingSettings`] with every field optional.
#[derive(Deserialize)]
#[serde(default)]
struct StoredSettings {
    algorithm: Algorithm,
    threshold: Option<u32>,
    contrast_boost: u32,
    scale_multiplier: f32,
    smoothness: u32,
    auto_crop: bool,
    padding: Padding,
    background_color: Rgb,
    is_transparent: bool,
}

impl Default for StoredSettings {
    fn default() -> Self {
        let base = ProcessingSettings::default();
        Self {
            algorithm: base.algorithm,
            threshold: None,
            contrast_boost: base.contrast_boost,
            scale_multiplier: base.scale_multiplier,
            smoothness: base.smoothness,
            auto_crop: base.auto_crop,
            padding: base.padding,
            background_color: base.background_color,
            is_transparent: base.is_transparent,
        }
    }
}

impl From<StoredSettings> for ProcessingSettings {
    fn from(stored: StoredSettings) -> Self {
        Self {
            algorithm: stored.algorithm,
            threshold: stored
                .threshold
                .unwrap_or_else(|| stored.algorithm.default_threshold()),
            contrast_boost: stored.contrast_boost,
            scale_multiplier: stored.scale_multiplier,
            smoothness: stored.smoothness,
            auto_crop: stored.auto_crop,
            padding: stored.padding,
            background_color: stored.background_color,
            is_transparent: stored.is_transparent,
        }
    }
}

fn out_of_range(field: &str, value: u32, range: &RangeInclusive<u32>) -> NotenwerkError {
    NotenwerkError::InvalidSettings(format!(
        "{field} {value} outside {}..={}",
        range.start(),
        range.end()
    ))
}

/// Tightest rectangle around the content pixels of a composited buffer.
///
/// Coordinates are inclusive and refer to the rescaled buffer. When
/// `has_content` is false the coordinates are meaningless.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub has_content: bool,
}

impl BoundingBox {
    /// A box that contains nothing yet.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Grow the box to contain `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        if !self.has_content {
            *self = Self {
                min_x: x,
                min_y: y,
                max_x: x,
                max_y: y,
                has_content: true,
            };
            return;
        }
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    pub fn width(&self) -> u32 {
        if self.has_content {
            self.max_x - self.min_x + 1
        } else {
            0
        }
    }

    pub fn height(&self) -> u32 {
        if self.has_content {
            self.max_y - self.min_y + 1
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_defaults() {
        let s = ProcessingSettings::default();
        assert_eq!(s.algorithm, Algorithm::Adaptive);
        assert_eq!(s.threshold, 60);
        assert_eq!(s.contrast_boost, 20);
        assert_eq!(s.scale_multiplier, 2.0);
        assert_eq!(s.smoothness, 10);
        assert!(s.auto_crop);
        assert_eq!(s.padding, Padding::uniform(50));
        assert_eq!(s.background_color, Rgb::WHITE);
        assert!(!s.is_transparent);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn compact_profile_defaults() {
        let s = Profile::Compact.settings();
        assert_eq!(s.contrast_boost, 15);
        assert_eq!(s.scale_multiplier, 1.5);
        assert_eq!(s.smoothness, 5);
        assert!(s.validate().is_ok());

        let classic = s.with_algorithm(Algorithm::Classic, Profile::Compact);
        assert_eq!(classic.threshold, 130);
    }

    #[test]
    fn switching_algorithm_resets_threshold() {
        let s = ProcessingSettings::default().with_algorithm(Algorithm::Classic, Profile::Standard);
        assert_eq!(s.algorithm, Algorithm::Classic);
        assert_eq!(s.threshold, 140);
        assert!(s.validate().is_ok());

        let back = s.with_algorithm(Algorithm::Adaptive, Profile::Standard);
        assert_eq!(back.threshold, 60);
    }

    #[test]
    fn same_algorithm_keeps_threshold() {
        let s = ProcessingSettings {
            threshold: 75,
            ..ProcessingSettings::default()
        };
        assert_eq!(s.clone().with_algorithm(Algorithm::Adaptive, Profile::Standard), s);
    }

    #[test]
    fn threshold_range_depends_on_algorithm() {
        let adaptive_150 = ProcessingSettings {
            threshold: 150,
            ..ProcessingSettings::default()
        };
        assert!(matches!(
            adaptive_150.validate(),
            Err(NotenwerkError::InvalidSettings(_))
        ));

        let classic_150 = ProcessingSettings {
            algorithm: Algorithm::Classic,
            threshold: 150,
            ..ProcessingSettings::default()
        };
        assert!(classic_150.validate().is_ok());

        let classic_40 = ProcessingSettings {
            threshold: 40,
            ..classic_150
        };
        assert!(classic_40.validate().is_err());
    }

    #[test]
    fn rejects_out_of_range_fields() {
        let base = ProcessingSettings::default();
        let cases = [
            ProcessingSettings {
                contrast_boost: 61,
                ..base.clone()
            },
            ProcessingSettings {
                scale_multiplier: 0.5,
                ..base.clone()
            },
            ProcessingSettings {
                scale_multiplier: 3.5,
                ..base.clone()
            },
            ProcessingSettings {
                scale_multiplier: f32::NAN,
                ..base.clone()
            },
            ProcessingSettings {
                smoothness: 21,
                ..base.clone()
            },
            ProcessingSettings {
                padding: Padding {
                    left: 301,
                    ..Padding::default()
                },
                ..base.clone()
            },
        ];
        for settings in cases {
            assert!(
                settings.validate().is_err(),
                "expected rejection of {settings:?}"
            );
        }
    }

    #[test]
    fn padding_error_names_the_side() {
        let s = ProcessingSettings {
            padding: Padding {
                bottom: 400,
                ..Padding::default()
            },
            ..ProcessingSettings::default()
        };
        let msg = s.validate().unwrap_err().to_string();
        assert!(msg.contains("padding.bottom"), "{msg}");
    }

    #[test]
    fn range_bounds_are_inclusive() {
        let s = ProcessingSettings {
            scale_multiplier: 3.0,
            smoothness: 0,
            contrast_boost: 60,
            padding: Padding::uniform(300),
            threshold: 0,
            ..ProcessingSettings::default()
        };
        assert!(s.validate().is_ok());
        let s = ProcessingSettings {
            threshold: 100,
            scale_multiplier: 1.0,
            ..s
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn rgb_parses_hex_forms() {
        assert_eq!("#FFFFFF".parse::<Rgb>().unwrap(), Rgb::WHITE);
        assert_eq!("1a2b3c".parse::<Rgb>().unwrap(), Rgb::new(0x1a, 0x2b, 0x3c));
        assert_eq!("#fa0".parse::<Rgb>().unwrap(), Rgb::new(0xff, 0xaa, 0x00));
        assert!("#12345".parse::<Rgb>().is_err());
        assert!("#GGGGGG".parse::<Rgb>().is_err());
        assert_eq!(Rgb::new(0xf5, 0xf0, 0xe1).to_string(), "#F5F0E1");
    }

    #[test]
    fn rgb_serializes_as_hex_string() {
        let json = serde_json::to_string(&Rgb::new(1, 2, 255)).unwrap();
        assert_eq!(json, "\"#0102FF\"");
        let back: Rgb = serde_json::from_str("\"#0102ff\"").unwrap();
        assert_eq!(back, Rgb::new(1, 2, 255));
        assert!(serde_json::from_str::<Rgb>("\"nope\"").is_err());
    }

    #[test]
    fn manhattan_distance() {
        assert_eq!(Rgb::WHITE.manhattan_distance([255, 255, 255]), 0);
        assert_eq!(Rgb::WHITE.manhattan_distance([245, 245, 245]), 30);
        assert_eq!(Rgb::BLACK.manhattan_distance([255, 255, 255]), 765);
    }

    #[test]
    fn padding_link_modes() {
        let p = Padding::uniform(50);
        assert_eq!(p.linked(MarginLink::Uniform, Edge::Left, 10), Padding::uniform(10));
        assert_eq!(
            p.linked(MarginLink::Axis, Edge::Top, 10),
            Padding::axis(10, 50)
        );
        assert_eq!(
            p.linked(MarginLink::Axis, Edge::Right, 0),
            Padding::axis(50, 0)
        );
        assert_eq!(
            p.linked(MarginLink::Independent, Edge::Bottom, 7),
            Padding {
                top: 50,
                right: 50,
                bottom: 7,
                left: 50
            }
        );
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let s: ProcessingSettings =
            serde_json::from_str(r##"{"algorithm":"classic","threshold":130,"background_color":"#000000"}"##)
                .unwrap();
        assert_eq!(s.algorithm, Algorithm::Classic);
        assert_eq!(s.threshold, 130);
        assert_eq!(s.background_color, Rgb::BLACK);
        assert_eq!(s.smoothness, 10);
    }

    #[test]
    fn missing_threshold_follows_the_stored_algorithm() {
        let classic: ProcessingSettings = serde_json::from_str(r#"{"algorithm":"classic"}"#).unwrap();
        assert_eq!(classic.threshold, Algorithm::Classic.default_threshold());
        assert_eq!(classic.threshold, 140);
        assert!(classic.validate().is_ok());

        let adaptive: ProcessingSettings = serde_json::from_str("{}").unwrap();
        assert_eq!(adaptive, ProcessingSettings::default());
    }

    #[test]
    fn bounding_box_grows() {
        let mut bbox = BoundingBox::empty();
        assert!(!bbox.has_content);
        assert_eq!(bbox.width(), 0);

        bbox.include(5, 7);
        assert_eq!((bbox.width(), bbox.height()), (1, 1));

        bbox.include(2, 9);
        bbox.include(8, 3);
        assert_eq!(
            bbox,
            BoundingBox {
                min_x: 2,
                min_y: 3,
                max_x: 8,
                max_y: 9,
                has_content: true
            }
        );
        assert_eq!((bbox.width(), bbox.height()), (7, 7));
    }

    #[test]
    fn algorithm_and_profile_parse() {
        assert_eq!("Adaptive".parse::<Algorithm>().unwrap(), Algorithm::Adaptive);
        assert_eq!("classic".parse::<Algorithm>().unwrap(), Algorithm::Classic);
        assert!("otsu".parse::<Algorithm>().is_err());
        assert_eq!("compact".parse::<Profile>().unwrap(), Profile::Compact);
    }
}
