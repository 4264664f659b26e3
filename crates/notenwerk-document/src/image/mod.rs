// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding, PNG encoding, and bounded buffer allocation.

pub mod buffer;
pub mod processor;

pub use buffer::PixelBuffer;
pub use processor::ImageProcessor;
