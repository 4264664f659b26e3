// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Cleaning pipeline — rescale, background estimation, soft thresholding,
// ink compositing, content detection, and synchronized crop-and-pad.

pub mod background;
pub mod bounds;
pub mod composite;
pub mod crop;
pub mod enhance;
pub mod rescale;
pub mod threshold;

pub use enhance::{ProcessResult, ScanCleaner};
