// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// notenwerk-session — In-memory image history and the debounced recompute
// scheduler that keeps each image's result in step with its latest settings.

pub mod fingerprint;
pub mod history;
pub mod scheduler;

pub use history::{History, ImageId, ImageRecord, ImageStatus};
pub use scheduler::{Scheduler, SchedulerEvent};
