// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rescaler — upsamples the page before thresholding so soft edges have
// enough pixels to ramp across.

use image::imageops::{self, FilterType};
use notenwerk_core::BufferLimits;
use notenwerk_core::error::Result;
use tracing::{debug, info, instrument};

use crate::image::buffer::{PixelBuffer, duplicate};

/// Cubic resampling. Nearest-neighbour would leave stair-stepped gradients
/// that the soft threshold turns into jagged strokes.
pub const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

/// Output size for `scale`: each axis rounded to the nearest pixel, never 0.
pub fn scaled_dimensions(width: u32, height: u32, scale: f32) -> (u32, u32) {
    let axis = |len: u32| ((len as f64 * scale as f64).round() as u32).max(1);
    (axis(width), axis(height))
}

/// Resample `source` by `scale` into a new buffer.
///
/// When the target size equals the source size the pixels are copied
/// unchanged.
#[instrument(skip(source, limits), fields(width = source.width(), height = source.height()))]
pub fn rescale(source: &PixelBuffer, scale: f32, limits: &BufferLimits) -> Result<PixelBuffer> {
    let (width, height) = scaled_dimensions(source.width(), source.height(), scale);
    limits.check(width, height)?;

    if (width, height) == source.dimensions() {
        debug!("Scale leaves size unchanged, copying source");
        return duplicate(source);
    }

    let resized = imageops::resize(source, width, height, RESAMPLE_FILTER);
    info!(new_w = width, new_h = height, "Rescale complete");
    Ok(resized)
}
