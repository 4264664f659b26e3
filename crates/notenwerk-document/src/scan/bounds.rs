// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Content locator — finds the tightest box around every pixel of the
// composited page that is not background.

use image::Rgba;
use notenwerk_core::{BoundingBox, ProcessingSettings, Rgb};
use tracing::{debug, instrument};

use crate::image::buffer::PixelBuffer;

/// Transparent mode: alpha above this counts as ink.
pub const ALPHA_CONTENT_THRESHOLD: u8 = 10;

/// Opaque mode: Manhattan RGB distance from the paper colour above this
/// counts as ink. Assumes black ink on a light paper colour; a paper colour
/// within this distance of black makes ink undetectable.
pub const COLOR_DISTANCE_THRESHOLD: u32 = 30;

/// Classifies composited pixels as content or background.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentLocator {
    background: Rgb,
    transparent: bool,
}

impl ContentLocator {
    pub fn new(background: Rgb, transparent: bool) -> Self {
        Self {
            background,
            transparent,
        }
    }

    pub fn from_settings(settings: &ProcessingSettings) -> Self {
        Self::new(settings.background_color, settings.is_transparent)
    }

    pub fn is_content(&self, pixel: &Rgba<u8>) -> bool {
        if self.transparent {
            pixel[3] > ALPHA_CONTENT_THRESHOLD
        } else {
            self.background
                .manhattan_distance([pixel[0], pixel[1], pixel[2]])
                > COLOR_DISTANCE_THRESHOLD
        }
    }

    /// Scan every pixel of `composited` and box the content.
    #[instrument(skip_all, fields(width = composited.width(), height = composited.height()))]
    pub fn locate(&self, composited: &PixelBuffer) -> BoundingBox {
        let mut bounds = BoundingBox::empty();
        for (x, y, pixel) in composited.enumerate_pixels() {
            if self.is_content(pixel) {
                bounds.include(x, y);
            }
        }
        debug!(?bounds, "Content located");
        bounds
    }
}
