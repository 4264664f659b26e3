// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Compositor — renders whiteness as black ink over either an opaque paper
// colour or a transparent background.

use image::Rgba;
use notenwerk_core::{ProcessingSettings, Rgb};
use tracing::{debug, instrument};

use super::threshold::{Thresholder, to_level};
use crate::image::buffer::PixelBuffer;

/// Maps whiteness to an output pixel. Ink is always black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compositor {
    background: Rgb,
    transparent: bool,
}

impl Compositor {
    pub fn new(background: Rgb, transparent: bool) -> Self {
        Self {
            background,
            transparent,
        }
    }

    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self::new(settings.background_color, settings.is_transparent)
    }

    /// Output pixel for `whiteness`.
    ///
    /// Transparent: black with alpha `255 - whiteness`. Opaque: the paper
    /// colour scaled by `whiteness / 255`, fully opaque.
    pub fn ink(&self, whiteness: u8) -> Rgba<u8> {
        if self.transparent {
            return Rgba([0, 0, 0, 255 - whiteness]);
        }
        let blend = |channel: u8| ((channel as u32 * whiteness as u32 + 127) / 255) as u8;
        let Rgb { r, g, b } = self.background;
        Rgba([blend(r), blend(g), blend(b), 255])
    }

    /// The pixel used for empty space: the paper colour, or fully transparent.
    pub fn paper(&self) -> Rgba<u8> {
        if self.transparent {
            Rgba([0, 0, 0, 0])
        } else {
            let Rgb { r, g, b } = self.background;
            Rgba([r, g, b, 255])
        }
    }
}

/// Threshold and composite every pixel of `working` in place.
#[instrument(skip_all, fields(width = working.width(), height = working.height()))]
pub fn binarize_in_place(
    working: &mut PixelBuffer,
    thresholder: &Thresholder<'_>,
    compositor: &Compositor,
) {
    for (x, y, pixel) in working.enumerate_pixels_mut() {
        let whiteness = to_level(thresholder.whiteness(x, y, pixel[0]));
        *pixel = compositor.ink(whiteness);
    }
    debug!("Threshold and composite complete");
}
