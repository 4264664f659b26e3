// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scan cleaning pipeline — the single entry point that runs every stage:
// validate, rescale, estimate background, threshold and composite, locate
// content, and crop both outputs to the same window.

use notenwerk_core::error::Result;
use notenwerk_core::{Algorithm, BoundingBox, BufferLimits, ProcessingSettings};
use tracing::{debug, info, instrument};

use super::background::estimate_background;
use super::bounds::ContentLocator;
use super::composite::{Compositor, binarize_in_place};
use super::crop::assemble;
use super::rescale::rescale;
use super::threshold::Thresholder;
use crate::image::buffer::{PixelBuffer, duplicate};
use crate::image::processor::{ImageProcessor, encode_png};

/// The two images a run produces.
///
/// `processed` and `cropped_original` always have the same dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessResult {
    /// The cleaned page.
    pub processed: PixelBuffer,
    /// The same window cut from the rescaled, unmodified source.
    pub cropped_original: PixelBuffer,
    /// The content box that drove the crop, in rescaled coordinates.
    pub bounds: BoundingBox,
}

impl ProcessResult {
    pub fn dimensions(&self) -> (u32, u32) {
        self.processed.dimensions()
    }

    /// The cleaned page as PNG, alpha preserved.
    pub fn processed_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.processed)
    }

    /// The comparison crop of the original as PNG.
    pub fn original_png(&self) -> Result<Vec<u8>> {
        encode_png(&self.cropped_original)
    }
}

/// Cleans one page image.
///
/// Holds the decoded source so the same page can be re-run with different
/// settings without decoding again.
pub struct ScanCleaner {
    source: PixelBuffer,
    limits: BufferLimits,
}

impl ScanCleaner {
    // -- Construction ---------------------------------------------------------

    /// Decode a page from encoded bytes (JPEG, PNG, TIFF, etc.).
    pub fn from_bytes(data: &[u8], limits: BufferLimits) -> Result<Self> {
        let source = ImageProcessor::decode(data, &limits)?.into_rgba();
        Ok(Self { source, limits })
    }

    /// Decode a page from a file.
    pub fn open(path: impl AsRef<std::path::Path>, limits: BufferLimits) -> Result<Self> {
        let source = ImageProcessor::open(path, &limits)?.into_rgba();
        Ok(Self { source, limits })
    }

    /// Wrap an already-decoded page with default limits.
    pub fn from_rgba(source: PixelBuffer) -> Self {
        Self {
            source,
            limits: BufferLimits::default(),
        }
    }

    pub fn with_limits(self, limits: BufferLimits) -> Self {
        Self { limits, ..self }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn as_rgba(&self) -> &PixelBuffer {
        &self.source
    }

    pub fn into_rgba(self) -> PixelBuffer {
        self.source
    }

    // -- Processing -----------------------------------------------------------

    /// Run the full pipeline on the held page.
    pub fn process(&self, settings: &ProcessingSettings) -> Result<ProcessResult> {
        process_with_limits(&self.source, settings, &self.limits)
    }
}

/// Clean `source` with `settings`, using default buffer limits.
pub fn process(source: &PixelBuffer, settings: &ProcessingSettings) -> Result<ProcessResult> {
    process_with_limits(source, settings, &BufferLimits::default())
}

/// Clean `source` with `settings`.
///
/// Pure: the same inputs always give byte-identical outputs. Settings are
/// validated up front and never clamped. A page with no detectable content
/// is returned whole rather than treated as an error.
#[instrument(
    skip_all,
    fields(
        width = source.width(),
        height = source.height(),
        algorithm = %settings.algorithm,
        scale = settings.scale_multiplier,
    )
)]
pub fn process_with_limits(
    source: &PixelBuffer,
    settings: &ProcessingSettings,
    limits: &BufferLimits,
) -> Result<ProcessResult> {
    settings.validate()?;
    info!("Cleaning page");

    // Step 1: Rescale. This copy stays pristine for the comparison output.
    let original = rescale(source, settings.scale_multiplier, limits)?;

    // Step 2: Local background, from the rescaled source rather than the
    // thresholded buffer.
    let background = match settings.algorithm {
        Algorithm::Adaptive => Some(estimate_background(&original, settings.blur_radius())),
        Algorithm::Classic => None,
    };

    // Step 3: Threshold and composite a working copy in place.
    let mut working = duplicate(&original)?;
    let thresholder = Thresholder::from_settings(settings, background.as_ref())?;
    binarize_in_place(&mut working, &thresholder, &Compositor::from_settings(settings));
    drop(background);

    // Step 4: One bounding box, shared by both crops.
    let bounds = ContentLocator::from_settings(settings).locate(&working);
    debug!(?bounds, "Content bounds");

    // Step 5: Crop and pad both buffers.
    let (processed, cropped_original) = assemble(working, original, &bounds, settings, limits)?;

    info!(
        out_w = processed.width(),
        out_h = processed.height(),
        has_content = bounds.has_content,
        "Page cleaned"
    );

    Ok(ProcessResult {
        processed,
        cropped_original,
        bounds,
    })
}

// -- Tests --------------------------------------------------------------------
