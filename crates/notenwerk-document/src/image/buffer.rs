// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pixel buffers and fallible surface allocation.
//
// Every working surface the pipeline creates goes through here, so an
// oversized request becomes `BufferAllocationFailed` for that job instead of
// an abort.

use image::{Rgba, RgbaImage};
use notenwerk_core::BufferLimits;
use notenwerk_core::error::{NotenwerkError, Result};

/// Row-major RGBA8 raster, stride `width * 4`.
pub type PixelBuffer = RgbaImage;

/// Allocate a `width` x `height` buffer with every pixel set to `fill`.
pub fn allocate_filled(
    width: u32,
    height: u32,
    fill: Rgba<u8>,
    limits: &BufferLimits,
) -> Result<PixelBuffer> {
    limits.check(width, height)?;
    let pixel_count = width as usize * height as usize;
    let mut data = reserve(width, height)?;
    data.extend(std::iter::repeat_n(fill.0, pixel_count).flatten());
    into_buffer(width, height, data)
}

/// Copy `source` into a freshly allocated buffer.
pub fn duplicate(source: &PixelBuffer) -> Result<PixelBuffer> {
    let (width, height) = source.dimensions();
    let mut data = reserve(width, height)?;
    data.extend_from_slice(source.as_raw());
    into_buffer(width, height, data)
}

fn reserve(width: u32, height: u32) -> Result<Vec<u8>> {
    let fail = |reason: String| NotenwerkError::BufferAllocationFailed {
        width,
        height,
        reason,
    };
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|pixels| pixels.checked_mul(4))
        .ok_or_else(|| fail("byte length overflows".into()))?;

    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|err| fail(err.to_string()))?;
    Ok(data)
}

fn into_buffer(width: u32, height: u32, data: Vec<u8>) -> Result<PixelBuffer> {
    RgbaImage::from_raw(width, height, data).ok_or_else(|| {
        NotenwerkError::BufferAllocationFailed {
            width,
            height,
            reason: "buffer length does not match dimensions".into(),
        }
    })
}
