// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// notenwerk-document — Image processing for the Notenwerk scan cleaner.
//
// Provides decoding and PNG encoding of page images, and the cleaning
// pipeline: rescale, background estimation, soft thresholding, ink
// compositing, content detection, and synchronized crop-and-pad of the
// processed page and the matching region of the original.

pub mod image;
pub mod scan;

// Re-export the primary entry points so callers can use `notenwerk_document::process` etc.
pub use crate::image::buffer::PixelBuffer;
pub use crate::image::processor::ImageProcessor;
pub use scan::enhance::{ProcessResult, ScanCleaner, process, process_with_limits};
