// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for Notenwerk.

use thiserror::Error;

/// Top-level error type for all Notenwerk operations.
///
/// An empty page is not an error: the pipeline falls back to the full frame.
#[derive(Debug, Error)]
pub enum NotenwerkError {
    // -- Pipeline errors --
    #[error("could not decode source image: {0}")]
    DecodeFailed(String),

    #[error("cannot allocate {width}x{height} buffer: {reason}")]
    BufferAllocationFailed {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    #[error("image encoding failed: {0}")]
    ImageError(String),

    #[error("background job stopped: {0}")]
    JobFailed(String),

    // -- Session --
    #[error("image not found: {0}")]
    ImageNotFound(String),

    // -- Storage / configuration --
    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, NotenwerkError>;
