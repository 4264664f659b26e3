// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image processor — decodes arbitrary encoded bytes into an RGBA page buffer
// and encodes results as PNG. Uses the `image` crate for all codecs.

use std::io::Cursor;

use image::{DynamicImage, ImageFormat, ImageReader, RgbaImage};
use notenwerk_core::BufferLimits;
use notenwerk_core::error::{NotenwerkError, Result};
use tracing::{debug, info, instrument};

/// A single decoded page image, ready to feed the cleaning pipeline.
///
/// ```ignore
/// let page = ImageProcessor::open("score.jpg", &BufferLimits::default())?;
/// let result = notenwerk_document::process(page.as_rgba(), &settings)?;
/// ```
pub struct ImageProcessor {
    /// The decoded image, always RGBA8.
    image: RgbaImage,
}

impl ImageProcessor {
    // -- Construction ---------------------------------------------------------

    /// Decode raw encoded bytes (JPEG, PNG, WebP, TIFF, ...).
    ///
    /// The header is inspected first so an oversized image is rejected before
    /// its pixels are allocated.
    #[instrument(skip(data, limits), fields(data_len = data.len()))]
    pub fn decode(data: &[u8], limits: &BufferLimits) -> Result<Self> {
        let reader = ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .map_err(|err| NotenwerkError::DecodeFailed(format!("cannot read input: {err}")))?;

        let format = reader
            .format()
            .ok_or_else(|| NotenwerkError::DecodeFailed("unrecognised image format".into()))?;

        let (width, height) = reader.into_dimensions().map_err(|err| {
            NotenwerkError::DecodeFailed(format!("cannot read {format:?} header: {err}"))
        })?;
        limits.check(width, height)?;

        let decoded = image::load_from_memory_with_format(data, format).map_err(|err| {
            NotenwerkError::DecodeFailed(format!("failed to decode {format:?} image: {err}"))
        })?;

        info!(width, height, ?format, "Image decoded");
        Ok(Self::from_dynamic(decoded))
    }

    /// Read and decode an image file.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>, limits: &BufferLimits) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::decode(&data, limits)
    }

    /// Wrap an already-decoded image, converting it to RGBA8.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        Self {
            image: image.into_rgba8(),
        }
    }

    /// Wrap an RGBA buffer as-is.
    pub fn from_rgba(image: RgbaImage) -> Self {
        Self { image }
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.image
    }

    // -- Output ---------------------------------------------------------------

    /// Encode the image as RGBA PNG bytes. Alpha is preserved.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }

    /// Write the image to `path` as PNG, whatever the extension says.
    pub fn save_png(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        self.image
            .save_with_format(path.as_ref(), ImageFormat::Png)
            .map_err(|err| {
                NotenwerkError::ImageError(format!(
                    "failed to save image to {}: {}",
                    path.as_ref().display(),
                    err
                ))
            })?;
        debug!(path = %path.as_ref().display(), "PNG written");
        Ok(())
    }
}

/// Encode an RGBA buffer as PNG, returning the raw bytes.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = Cursor::new(&mut buffer);
    image
        .write_to(&mut cursor, ImageFormat::Png)
        .map_err(|err| NotenwerkError::ImageError(format!("PNG encoding failed: {err}")))?;
    Ok(buffer)
}
