// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Background estimator — a heavily blurred copy of the page's red channel
// approximating how bright the paper is at every point. Shadows, vignetting
// and creases shift this estimate along with the ink, so thresholding
// against it cancels them out.

use image::{GrayImage, Luma};
use imageproc::filter::gaussian_blur_f32;
use tracing::{debug, instrument};

use crate::image::buffer::PixelBuffer;

/// Extract the red channel, the pipeline's luminance proxy.
pub fn red_channel(buffer: &PixelBuffer) -> GrayImage {
    let (width, height) = buffer.dimensions();
    GrayImage::from_fn(width, height, |x, y| Luma([buffer.get_pixel(x, y)[0]]))
}

/// Blur the red channel of the rescaled page with a Gaussian of standard
/// deviation `radius` (in rescaled pixels).
#[instrument(skip(rescaled), fields(width = rescaled.width(), height = rescaled.height()))]
pub fn estimate_background(rescaled: &PixelBuffer, radius: f32) -> GrayImage {
    let red = red_channel(rescaled);
    if radius <= 0.0 {
        return red;
    }
    let blurred = gaussian_blur_f32(&red, radius);
    debug!(radius, "Background estimate computed");
    blurred
}
