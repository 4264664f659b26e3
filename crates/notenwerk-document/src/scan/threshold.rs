// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Thresholder — turns a red-channel level into a whiteness score
// (0 = full ink, 255 = full paper) with a soft linear transition band.

use image::GrayImage;
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::{Algorithm, ProcessingSettings};

/// Classic mode darkens pixels up to this far above the threshold.
pub const INK_BOOST_WINDOW: f32 = 40.0;

/// Soft threshold of `value` against `threshold`.
///
/// With `smoothness == 0` this is a hard step: 0 below the threshold, 255 at
/// or above it. Otherwise whiteness ramps linearly from 0 at
/// `threshold - smoothness` to 255 at `threshold + smoothness` and is clamped
/// outside that band.
pub fn soft_threshold(value: f32, threshold: f32, smoothness: f32) -> f32 {
    if smoothness <= 0.0 {
        return if value < threshold { 0.0 } else { 255.0 };
    }
    let low = threshold - smoothness;
    ((value - low) / (2.0 * smoothness) * 255.0).clamp(0.0, 255.0)
}

/// Quantize a whiteness score to a channel value.
pub fn to_level(whiteness: f32) -> u8 {
    whiteness.round().clamp(0.0, 255.0) as u8
}

/// Per-pixel threshold decision for one run of the pipeline.
#[derive(Debug, Clone, Copy)]
pub enum Thresholder<'a> {
    /// Fixed global cutoff; near-threshold pixels are darkened first.
    Classic {
        threshold: f32,
        /// Multiplier applied inside the boost window, `1 - boost/100`.
        boost_factor: f32,
        smoothness: f32,
    },
    /// Cutoff sits `offset` below the local background estimate.
    Adaptive {
        background: &'a GrayImage,
        offset: f32,
        smoothness: f32,
    },
}

impl<'a> Thresholder<'a> {
    pub fn classic(threshold: u32, contrast_boost: u32, smoothness: u32) -> Self {
        Self::Classic {
            threshold: threshold as f32,
            boost_factor: 1.0 - contrast_boost as f32 / 100.0,
            smoothness: smoothness as f32,
        }
    }

    /// `background` must have the same dimensions as the buffer being
    /// thresholded.
    pub fn adaptive(background: &'a GrayImage, threshold: u32, smoothness: u32) -> Self {
        Self::Adaptive {
            background,
            offset: (100.0 - threshold as f32) / 2.0,
            smoothness: smoothness as f32,
        }
    }

    /// Build the thresholder `settings` ask for. `background` is required in
    /// adaptive mode and ignored in classic mode.
    pub fn from_settings(
        settings: &ProcessingSettings,
        background: Option<&'a GrayImage>,
    ) -> Result<Self> {
        match (settings.algorithm, background) {
            (Algorithm::Adaptive, Some(background)) => Ok(Self::adaptive(
                background,
                settings.threshold,
                settings.smoothness,
            )),
            (Algorithm::Adaptive, None) => Err(NotenwerkError::InvalidSettings(
                "adaptive thresholding needs a background estimate".into(),
            )),
            (Algorithm::Classic, _) => Ok(Self::classic(
                settings.threshold,
                settings.contrast_boost,
                settings.smoothness,
            )),
        }
    }

    /// Whiteness of the pixel at `(x, y)` whose red channel is `value`.
    pub fn whiteness(&self, x: u32, y: u32, value: u8) -> f32 {
        match *self {
            Self::Classic {
                threshold,
                boost_factor,
                smoothness,
            } => {
                let mut value = value as f32;
                if value < threshold + INK_BOOST_WINDOW {
                    value *= boost_factor;
                }
                soft_threshold(value, threshold, smoothness)
            }
            Self::Adaptive {
                background,
                offset,
                smoothness,
            } => {
                let local = background.get_pixel(x, y)[0] as f32 - offset;
                soft_threshold(value as f32, local, smoothness)
            }
        }
    }
}
