// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Crop & pad assembler — trims the processed page to its content plus
// margins, and cuts the exact same window out of the untouched rescaled
// original so the two can be compared pixel for pixel.

use image::{Rgba, imageops};
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::{BoundingBox, BufferLimits, Padding, ProcessingSettings};
use tracing::{debug, info, instrument};

use super::composite::Compositor;
use crate::image::buffer::{PixelBuffer, allocate_filled};

/// Size of the padded output for `bounds`.
pub fn padded_dimensions(bounds: &BoundingBox, padding: &Padding) -> Option<(u32, u32)> {
    let width = bounds.width().checked_add(padding.horizontal())?;
    let height = bounds.height().checked_add(padding.vertical())?;
    Some((width, height))
}

/// Produce the `(processed, cropped_original)` pair.
///
/// With auto-crop off, or no content found, both buffers are returned whole.
/// Otherwise both are cut with the same `bounds` and `padding`, so their
/// dimensions always match.
#[instrument(skip_all, fields(auto_crop = settings.auto_crop, has_content = bounds.has_content))]
pub fn assemble(
    processed: PixelBuffer,
    original: PixelBuffer,
    bounds: &BoundingBox,
    settings: &ProcessingSettings,
    limits: &BufferLimits,
) -> Result<(PixelBuffer, PixelBuffer)> {
    debug_assert_eq!(processed.dimensions(), original.dimensions());

    if !settings.auto_crop {
        debug!("Auto-crop disabled, keeping full frame");
        return Ok((processed, original));
    }
    if !bounds.has_content {
        info!("No content found, falling back to full frame");
        return Ok((processed, original));
    }

    let (width, height) = padded_dimensions(bounds, &settings.padding).ok_or_else(|| {
        NotenwerkError::BufferAllocationFailed {
            width: u32::MAX,
            height: u32::MAX,
            reason: "padded size overflows".into(),
        }
    })?;
    let fill = Compositor::from_settings(settings).paper();

    let processed = crop_and_pad(&processed, bounds, &settings.padding, fill, (width, height), limits)?;
    let original = crop_and_pad(&original, bounds, &settings.padding, fill, (width, height), limits)?;

    info!(width, height, "Cropped to content");
    Ok((processed, original))
}

/// Allocate a `size` canvas filled with `fill` and copy the `bounds` region
/// of `source` to `(padding.left, padding.top)`.
fn crop_and_pad(
    source: &PixelBuffer,
    bounds: &BoundingBox,
    padding: &Padding,
    fill: Rgba<u8>,
    (width, height): (u32, u32),
    limits: &BufferLimits,
) -> Result<PixelBuffer> {
    let mut canvas = allocate_filled(width, height, fill, limits)?;
    let region = imageops::crop_imm(
        source,
        bounds.min_x,
        bounds.min_y,
        bounds.width(),
        bounds.height(),
    )
    .to_image();
    imageops::replace(&mut canvas, &region, padding.left as i64, padding.top as i64);
    Ok(canvas)
}
