// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Recompute scheduler — debounces settings changes per image, runs the
// pipeline on the blocking pool, and applies a result only if no newer
// settings arrived while it was computing.
//
// History and the pending-timer table sit behind `std::sync::Mutex`. Every
// critical section is a few field assignments and no guard is held across
// an `.await`. When both are needed the timers lock is taken first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::human_errors::HumanError;
use notenwerk_core::{AppConfig, BufferLimits, ProcessingSettings};
use notenwerk_document::{PixelBuffer, process_with_limits};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::history::{History, ImageId, ImageRecord, Outcome};

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

/// How a scheduled generation ended. Every generation ends in exactly one
/// event.
#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    /// The result is now the image's current result.
    Applied { id: ImageId, generation: u64 },
    /// Newer settings arrived first, or the image was removed; nothing was
    /// applied.
    Superseded { id: ImageId, generation: u64 },
    /// The job failed; only this image is affected.
    Failed {
        id: ImageId,
        generation: u64,
        error: HumanError,
    },
}

impl SchedulerEvent {
    pub fn id(&self) -> ImageId {
        match self {
            Self::Applied { id, .. } | Self::Superseded { id, .. } | Self::Failed { id, .. } => *id,
        }
    }

    pub fn generation(&self) -> u64 {
        match self {
            Self::Applied { generation, .. }
            | Self::Superseded { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}

/// A debounce timer that has not fired yet.
struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Shared handle to the session's images and their recompute jobs.
///
/// Cheap to clone; all clones drive the same history. Methods that start
/// jobs must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    history: Arc<Mutex<History>>,
    timers: Arc<Mutex<HashMap<ImageId, PendingTimer>>>,
    events: broadcast::Sender<SchedulerEvent>,
    debounce: Duration,
    limits: BufferLimits,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Scheduler {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_options(config.debounce(), config.limits)
    }

    pub fn with_options(debounce: Duration, limits: BufferLimits) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            history: Arc::new(Mutex::new(History::new())),
            timers: Arc::new(Mutex::new(HashMap::new())),
            events,
            debounce,
            limits,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    /// Run `f` against the history under its lock.
    pub fn read<R>(&self, f: impl FnOnce(&History) -> R) -> R {
        f(&lock(&self.history))
    }

    /// Clone of one record.
    pub fn record(&self, id: ImageId) -> Result<ImageRecord> {
        lock(&self.history).get(id).cloned()
    }

    // -- Ingestion ------------------------------------------------------------

    /// Add a page from encoded bytes. Does not start processing; call
    /// [`Scheduler::process_now`] next.
    ///
    /// Decoding runs on the blocking pool; the history is locked only to
    /// append the finished record.
    pub async fn ingest(
        &self,
        name: impl Into<String>,
        bytes: Vec<u8>,
        settings: ProcessingSettings,
    ) -> ImageId {
        let name = name.into();
        let bytes: Arc<[u8]> = bytes.into();
        let limits = self.limits;

        let decode = {
            let (name, bytes, settings) = (name.clone(), Arc::clone(&bytes), settings.clone());
            tokio::task::spawn_blocking(move || ImageRecord::decode(name, &bytes, settings, &limits))
        };
        let record = decode.await.unwrap_or_else(|err| {
            let err = NotenwerkError::JobFailed(format!("decode task: {err}"));
            ImageRecord::unreadable(name, &bytes, settings, &err)
        });
        lock(&self.history).push(record)
    }

    pub fn ingest_rgba(
        &self,
        name: impl Into<String>,
        source: PixelBuffer,
        settings: ProcessingSettings,
    ) -> ImageId {
        lock(&self.history).ingest_rgba(name, source, settings)
    }

    pub fn remove(&self, id: ImageId) -> Result<ImageRecord> {
        let mut timers = lock(&self.timers);
        let record = lock(&self.history).remove(id)?;
        if let Some(timer) = timers.remove(&id) {
            self.cancelled(id, timer);
        }
        Ok(record)
    }

    pub fn clear(&self) {
        let mut timers = lock(&self.timers);
        lock(&self.history).clear();
        for (id, timer) in timers.drain() {
            self.cancelled(id, timer);
        }
    }

    // -- Scheduling -----------------------------------------------------------

    /// Store new settings for `id` and schedule a recompute after the
    /// debounce interval. Returns the new generation.
    ///
    /// A timer still waiting from an earlier call is cancelled and reported
    /// as superseded. Invalid settings are rejected and change nothing.
    #[instrument(skip(self, settings))]
    pub fn update_settings(&self, id: ImageId, settings: ProcessingSettings) -> Result<u64> {
        settings.validate()?;
        let mut timers = lock(&self.timers);
        let generation = lock(&self.history).update_settings(id, settings)?;

        if let Some(previous) = timers.remove(&id) {
            debug_assert!(previous.generation < generation);
            self.cancelled(id, previous);
        }

        let scheduler = self.clone();
        let debounce = self.debounce;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if scheduler.claim_timer(id, generation) {
                scheduler.run(id, generation).await;
            }
        });
        timers.insert(id, PendingTimer { generation, handle });
        debug!(generation, debounce_ms = debounce.as_millis() as u64, "recompute armed");
        Ok(generation)
    }

    /// Recompute `id` with its current settings right away.
    ///
    /// Fails with `DecodeFailed` for a record whose bytes never decoded.
    #[instrument(skip(self))]
    pub fn process_now(&self, id: ImageId) -> Result<JoinHandle<()>> {
        let mut timers = lock(&self.timers);
        let generation = {
            let mut history = lock(&self.history);
            let record = history.get(id)?;
            if record.source.is_none() {
                return Err(NotenwerkError::DecodeFailed(record.name.clone()));
            }
            history.invalidate(id)?
        };
        if let Some(previous) = timers.remove(&id) {
            self.cancelled(id, previous);
        }
        drop(timers);

        let scheduler = self.clone();
        Ok(tokio::spawn(async move {
            scheduler.run(id, generation).await;
        }))
    }

    // -- Internals ------------------------------------------------------------

    /// Remove this generation's timer entry. False if it was cancelled.
    fn claim_timer(&self, id: ImageId, generation: u64) -> bool {
        let mut timers = lock(&self.timers);
        match timers.get(&id) {
            Some(timer) if timer.generation == generation => {
                timers.remove(&id);
                true
            }
            _ => false,
        }
    }

    fn cancelled(&self, id: ImageId, timer: PendingTimer) {
        timer.handle.abort();
        debug!(%id, generation = timer.generation, "pending recompute cancelled");
        self.emit(SchedulerEvent::Superseded {
            id,
            generation: timer.generation,
        });
    }

    async fn run(&self, id: ImageId, generation: u64) {
        let job = lock(&self.history).begin(id, generation);
        let Some((source, settings)) = job else {
            debug!(%id, generation, "stale before start, skipped");
            self.emit(SchedulerEvent::Superseded { id, generation });
            return;
        };

        let limits = self.limits;
        let result = tokio::task::spawn_blocking(move || {
            process_with_limits(&source, &settings, &limits)
        })
        .await
        .unwrap_or_else(|err| Err(NotenwerkError::JobFailed(format!("pipeline task: {err}"))));

        let outcome = lock(&self.history).complete(id, generation, result);
        let event = match outcome {
            Outcome::Applied => {
                info!(%id, generation, "result applied");
                SchedulerEvent::Applied { id, generation }
            }
            Outcome::Failed(error) => SchedulerEvent::Failed {
                id,
                generation,
                error,
            },
            Outcome::Superseded => {
                warn!(%id, generation, "stale result discarded");
                SchedulerEvent::Superseded { id, generation }
            }
        };
        self.emit(event);
    }

    fn emit(&self, event: SchedulerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
