// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages.
//
// Every technical error maps to a short plain-English message and a
// suggestion. Callers mark the affected image as failed and show this text;
// nothing here triggers a retry.

use crate::error::NotenwerkError;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Trying again may work (I/O hiccup).
    Transient,
    /// The user must change something (settings, file choice).
    ActionRequired,
    /// This input will never process.
    Permanent,
}

/// A human-readable error with plain English message and actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Plain English summary.
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    /// Whether repeating the same action unchanged could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl std::fmt::Display for HumanError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.message, self.suggestion)
    }
}

/// Convert a `NotenwerkError` into a `HumanError`.
pub fn humanize_error(err: &NotenwerkError) -> HumanError {
    match err {
        NotenwerkError::DecodeFailed(_) => HumanError {
            message: "This file couldn't be opened as an image.".into(),
            suggestion: "It may be damaged or in an unusual format. Try a PNG or JPEG instead.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        NotenwerkError::BufferAllocationFailed { width, height, .. } => HumanError {
            message: "This image is too large to process.".into(),
            suggestion: format!(
                "The working image would be {width}x{height} pixels. Lower the scale or use a smaller photo."
            ),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        NotenwerkError::InvalidSettings(detail) => HumanError {
            message: "One of the settings is out of range.".into(),
            suggestion: format!("Adjust the setting and try again. ({detail})"),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        NotenwerkError::ImageError(_) => HumanError {
            message: "The result couldn't be saved.".into(),
            suggestion: "Try again, or choose a different output location.".into(),
            retriable: true,
            severity: Severity::Transient,
        },

        NotenwerkError::JobFailed(_) => HumanError {
            message: "Processing this image stopped unexpectedly.".into(),
            suggestion: "Change a setting or add the image again. If it keeps happening, please report it.".into(),
            retriable: false,
            severity: Severity::Permanent,
        },

        NotenwerkError::ImageNotFound(_) => HumanError {
            message: "That image is no longer in the list.".into(),
            suggestion: "Add the image again to keep working on it.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },

        NotenwerkError::Io(io_err) => match io_err.kind() {
            std::io::ErrorKind::NotFound => HumanError {
                message: "The file couldn't be found.".into(),
                suggestion: "It may have been moved or deleted. Try choosing the file again.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            std::io::ErrorKind::PermissionDenied => HumanError {
                message: "Notenwerk doesn't have permission to use that file.".into(),
                suggestion: "Check the file permissions, or copy it somewhere else first.".into(),
                retriable: false,
                severity: Severity::ActionRequired,
            },
            _ => HumanError {
                message: "There was a problem reading or writing a file.".into(),
                suggestion: "Try again. If this keeps happening, the disk may be full.".into(),
                retriable: true,
                severity: Severity::Transient,
            },
        },

        NotenwerkError::Serialization(_) => HumanError {
            message: "The configuration file couldn't be read.".into(),
            suggestion: "Check that it is valid JSON, or remove it to use the defaults.".into(),
            retriable: false,
            severity: Severity::ActionRequired,
        },
    }
}
