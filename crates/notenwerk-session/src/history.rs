// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Session history — every page loaded this session, its settings snapshot,
// and its latest result. Memory only; nothing is persisted.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::human_errors::{HumanError, humanize_error};
use notenwerk_core::{BufferLimits, ProcessingSettings};
use notenwerk_document::{ImageProcessor, PixelBuffer, ProcessResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::fingerprint::hash_bytes;

/// Unique identifier for an ingested image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ImageId(pub Uuid);

impl ImageId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ImageId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ImageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of an image's current result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageStatus {
    /// Waiting for a (re)computation.
    Pending,
    /// A job for the current generation is running.
    Processing,
    /// `result` matches the current settings.
    Ready,
    /// Decoding or the latest job failed; see `error`.
    Failed,
}

/// One page in the session.
#[derive(Debug, Clone)]
pub struct ImageRecord {
    pub id: ImageId,
    pub name: String,
    /// SHA-256 hex of the bytes the page was loaded from.
    pub source_hash: String,
    /// Decoded page. `None` when decoding failed.
    pub source: Option<Arc<PixelBuffer>>,
    /// Settings this image is processed with. Copied by value, never shared.
    pub settings: ProcessingSettings,
    pub status: ImageStatus,
    /// Why the last decode or job failed, in user-facing terms.
    pub error: Option<HumanError>,
    /// Latest applied result. Kept when a later job fails.
    pub result: Option<Arc<ProcessResult>>,
    /// Bumped on every settings change; results from older generations are
    /// discarded.
    pub generation: u64,
    pub created_at: DateTime<Utc>,
}

impl ImageRecord {
    fn new(name: String, source_hash: String, settings: ProcessingSettings) -> Self {
        Self {
            id: ImageId::new(),
            name,
            source_hash,
            source: None,
            settings,
            status: ImageStatus::Pending,
            error: None,
            result: None,
            generation: 0,
            created_at: Utc::now(),
        }
    }

    /// Decode `bytes` into a record for [`History::push`].
    ///
    /// Undecodable input still gets a record, marked `Failed`, so the caller
    /// can show what went wrong. Touches no shared state.
    pub fn decode(
        name: impl Into<String>,
        bytes: &[u8],
        settings: ProcessingSettings,
        limits: &BufferLimits,
    ) -> Self {
        let mut record = Self::new(name.into(), hash_bytes(bytes), settings);
        match ImageProcessor::decode(bytes, limits) {
            Ok(page) => record.source = Some(Arc::new(page.into_rgba())),
            Err(err) => record.mark_unreadable(&err),
        }
        record
    }

    /// A record for `bytes` that could not be loaded at all.
    pub fn unreadable(
        name: impl Into<String>,
        bytes: &[u8],
        settings: ProcessingSettings,
        err: &NotenwerkError,
    ) -> Self {
        let mut record = Self::new(name.into(), hash_bytes(bytes), settings);
        record.mark_unreadable(err);
        record
    }

    fn mark_unreadable(&mut self, err: &NotenwerkError) {
        warn!(name = %self.name, error = %err, "image could not be decoded");
        self.status = ImageStatus::Failed;
        self.error = Some(humanize_error(err));
    }

    pub fn is_ready(&self) -> bool {
        self.status == ImageStatus::Ready
    }
}

/// What became of a finished job.
#[derive(Debug, Clone)]
pub enum Outcome {
    Applied,
    Failed(HumanError),
    /// The record moved on to a newer generation, or is gone.
    Superseded,
}

/// Ordered collection of the session's images.
#[derive(Debug, Default)]
pub struct History {
    records: Vec<ImageRecord>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Ingestion ------------------------------------------------------------

    /// Decode `bytes` and add the page with a snapshot of `settings`.
    ///
    /// Decodes on the caller's thread; see [`ImageRecord::decode`] to do
    /// that part elsewhere.
    pub fn ingest(
        &mut self,
        name: impl Into<String>,
        bytes: &[u8],
        settings: ProcessingSettings,
        limits: &BufferLimits,
    ) -> ImageId {
        self.push(ImageRecord::decode(name, bytes, settings, limits))
    }

    /// Add an already-decoded page. Its fingerprint is taken over the raw
    /// RGBA bytes.
    pub fn ingest_rgba(
        &mut self,
        name: impl Into<String>,
        source: PixelBuffer,
        settings: ProcessingSettings,
    ) -> ImageId {
        let mut record = ImageRecord::new(name.into(), hash_bytes(source.as_raw()), settings);
        record.source = Some(Arc::new(source));
        self.push(record)
    }

    /// Append a prepared record.
    pub fn push(&mut self, record: ImageRecord) -> ImageId {
        let id = record.id;
        info!(%id, name = %record.name, failed = record.source.is_none(), "image ingested");
        self.records.push(record);
        id
    }

    // -- Queries --------------------------------------------------------------

    pub fn get(&self, id: ImageId) -> Result<&ImageRecord> {
        self.records
            .iter()
            .find(|r| r.id == id)
            .ok_or_else(|| NotenwerkError::ImageNotFound(id.to_string()))
    }

    fn get_mut(&mut self, id: ImageId) -> Result<&mut ImageRecord> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| NotenwerkError::ImageNotFound(id.to_string()))
    }

    /// All records, newest first.
    pub fn list(&self) -> Vec<&ImageRecord> {
        self.records.iter().rev().collect()
    }

    /// Most recent record loaded from bytes with this fingerprint.
    pub fn find_by_hash(&self, source_hash: &str) -> Option<&ImageRecord> {
        self.records
            .iter()
            .rev()
            .find(|r| r.source_hash.eq_ignore_ascii_case(source_hash))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    // -- Removal --------------------------------------------------------------

    pub fn remove(&mut self, id: ImageId) -> Result<ImageRecord> {
        let index = self
            .records
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| NotenwerkError::ImageNotFound(id.to_string()))?;
        info!(%id, "image removed");
        Ok(self.records.remove(index))
    }

    pub fn clear(&mut self) {
        info!(count = self.records.len(), "history cleared");
        self.records.clear();
    }

    // -- Generations ----------------------------------------------------------

    /// Replace the settings snapshot and start a new generation.
    pub fn update_settings(&mut self, id: ImageId, settings: ProcessingSettings) -> Result<u64> {
        let record = self.get_mut(id)?;
        record.settings = settings;
        Ok(Self::bump(record))
    }

    /// Start a new generation with unchanged settings.
    pub fn invalidate(&mut self, id: ImageId) -> Result<u64> {
        let record = self.get_mut(id)?;
        Ok(Self::bump(record))
    }

    fn bump(record: &mut ImageRecord) -> u64 {
        record.generation += 1;
        if record.source.is_some() {
            record.status = ImageStatus::Pending;
        }
        debug!(id = %record.id, generation = record.generation, "generation bumped");
        record.generation
    }

    /// Mark `generation` as running and hand back what the job needs.
    ///
    /// `None` when the generation is stale, the record is gone, or there is
    /// no decoded source to work on.
    pub fn begin(
        &mut self,
        id: ImageId,
        generation: u64,
    ) -> Option<(Arc<PixelBuffer>, ProcessingSettings)> {
        let record = self.get_mut(id).ok()?;
        if record.generation != generation {
            return None;
        }
        let source = Arc::clone(record.source.as_ref()?);
        record.status = ImageStatus::Processing;
        Some((source, record.settings.clone()))
    }

    /// Store a finished job's outcome if `generation` is still current.
    pub fn complete(
        &mut self,
        id: ImageId,
        generation: u64,
        result: Result<ProcessResult>,
    ) -> Outcome {
        let Ok(record) = self.get_mut(id) else {
            return Outcome::Superseded;
        };
        if record.generation != generation {
            return Outcome::Superseded;
        }
        match result {
            Ok(result) => {
                record.result = Some(Arc::new(result));
                record.status = ImageStatus::Ready;
                record.error = None;
                Outcome::Applied
            }
            Err(err) => {
                warn!(%id, generation, error = %err, "processing failed");
                let human = humanize_error(&err);
                record.status = ImageStatus::Failed;
                record.error = Some(human.clone());
                Outcome::Failed(human)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use notenwerk_core::Algorithm;
    use notenwerk_core::human_errors::Severity;
    use notenwerk_document::process;

    fn page() -> RgbaImage {
        RgbaImage::from_pixel(8, 8, Rgba([255, 255, 255, 255]))
    }

    fn png_bytes() -> Vec<u8> {
        notenwerk_document::image::processor::encode_png(&page()).unwrap()
    }

    #[test]
    fn ingest_decodes_and_fingerprints() {
        let mut history = History::new();
        let bytes = png_bytes();
        let id = history.ingest(
            "page.png",
            &bytes,
            ProcessingSettings::default(),
            &BufferLimits::default(),
        );

        let record = history.get(id).unwrap();
        assert_eq!(record.status, ImageStatus::Pending);
        assert_eq!(record.source_hash, hash_bytes(&bytes));
        assert_eq!(record.source.as_deref(), Some(&page()));
        assert_eq!(record.generation, 0);
    }

    #[test]
    fn decoded_record_is_pushed_later() {
        let bytes = png_bytes();
        let record = ImageRecord::decode(
            "page.png",
            &bytes,
            ProcessingSettings::default(),
            &BufferLimits::default(),
        );
        assert_eq!(record.status, ImageStatus::Pending);
        assert!(record.source.is_some());

        let mut history = History::new();
        let id = history.push(record);
        assert_eq!(history.get(id).unwrap().source_hash, hash_bytes(&bytes));

        let lost = ImageRecord::unreadable(
            "lost.png",
            &bytes,
            ProcessingSettings::default(),
            &NotenwerkError::JobFailed("decode task cancelled".into()),
        );
        let lost = history.push(lost);
        let record = history.get(lost).unwrap();
        assert_eq!(record.status, ImageStatus::Failed);
        assert!(!record.error.as_ref().unwrap().retriable);
        assert!(history.begin(lost, 0).is_none());
    }

    #[test]
    fn undecodable_input_is_recorded_as_failed() {
        let mut history = History::new();
        let id = history.ingest(
            "notes.txt",
            b"not an image",
            ProcessingSettings::default(),
            &BufferLimits::default(),
        );
        let record = history.get(id).unwrap();
        assert_eq!(record.status, ImageStatus::Failed);
        assert!(record.source.is_none());
        let error = record.error.as_ref().unwrap();
        assert_eq!(error.severity, Severity::Permanent);

        // Nothing to run for it.
        assert!(history.begin(id, 0).is_none());
    }

    #[test]
    fn settings_are_snapshotted_by_value() {
        let mut history = History::new();
        let mut current = ProcessingSettings::default();
        let id = history.ingest_rgba("a", page(), current.clone());

        current.threshold = 90;
        assert_eq!(history.get(id).unwrap().settings.threshold, 60);

        history.update_settings(id, current.clone()).unwrap();
        assert_eq!(history.get(id).unwrap().settings, current);
    }

    #[test]
    fn list_is_newest_first() {
        let mut history = History::new();
        let first = history.ingest_rgba("first", page(), ProcessingSettings::default());
        let second = history.ingest_rgba("second", page(), ProcessingSettings::default());
        let ids: Vec<ImageId> = history.list().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![second, first]);
    }

    #[test]
    fn find_by_hash_returns_latest_duplicate() {
        let mut history = History::new();
        let bytes = png_bytes();
        let limits = BufferLimits::default();
        history.ingest("one", &bytes, ProcessingSettings::default(), &limits);
        let two = history.ingest("two", &bytes, ProcessingSettings::default(), &limits);

        let found = history.find_by_hash(&hash_bytes(&bytes)).unwrap();
        assert_eq!(found.id, two);
        assert!(history.find_by_hash("00").is_none());
    }

    #[test]
    fn remove_and_clear() {
        let mut history = History::new();
        let a = history.ingest_rgba("a", page(), ProcessingSettings::default());
        let b = history.ingest_rgba("b", page(), ProcessingSettings::default());

        assert_eq!(history.remove(a).unwrap().name, "a");
        assert!(matches!(history.get(a), Err(NotenwerkError::ImageNotFound(_))));
        assert!(matches!(history.remove(a), Err(NotenwerkError::ImageNotFound(_))));
        assert_eq!(history.len(), 1);

        history.clear();
        assert!(history.is_empty());
        assert!(history.get(b).is_err());
    }

    #[test]
    fn stale_results_are_discarded() {
        let mut history = History::new();
        let id = history.ingest_rgba("a", page(), ProcessingSettings::default());

        let first = history.invalidate(id).unwrap();
        let (source, settings) = history.begin(id, first).unwrap();
        assert_eq!(history.get(id).unwrap().status, ImageStatus::Processing);

        let newer = ProcessingSettings::default().with_algorithm(Algorithm::Classic, Default::default());
        let second = history.update_settings(id, newer).unwrap();
        assert_ne!(history.get(id).unwrap().generation, first);
        assert!(history.begin(id, first).is_none());

        let outcome = history.complete(id, first, process(&source, &settings));
        assert!(matches!(outcome, Outcome::Superseded));
        assert!(history.get(id).unwrap().result.is_none());
        assert_eq!(history.get(id).unwrap().status, ImageStatus::Pending);

        let (source, settings) = history.begin(id, second).unwrap();
        let outcome = history.complete(id, second, process(&source, &settings));
        assert!(matches!(outcome, Outcome::Applied));
        assert!(history.get(id).unwrap().is_ready());
    }

    #[test]
    fn failure_keeps_previous_result() {
        let mut history = History::new();
        let id = history.ingest_rgba("a", page(), ProcessingSettings::default());

        let g1 = history.invalidate(id).unwrap();
        let (source, settings) = history.begin(id, g1).unwrap();
        history.complete(id, g1, process(&source, &settings));
        let before = history.get(id).unwrap().result.clone().unwrap();

        let g2 = history.invalidate(id).unwrap();
        history.begin(id, g2).unwrap();
        let outcome = history.complete(
            id,
            g2,
            Err(NotenwerkError::BufferAllocationFailed {
                width: 1,
                height: 1,
                reason: "test".into(),
            }),
        );
        assert!(matches!(outcome, Outcome::Failed(_)));

        let record = history.get(id).unwrap();
        assert_eq!(record.status, ImageStatus::Failed);
        assert!(record.error.as_ref().unwrap().message.contains("too large"));
        assert!(Arc::ptr_eq(record.result.as_ref().unwrap(), &before));
    }

    #[test]
    fn completion_for_removed_image_is_superseded() {
        let mut history = History::new();
        let id = history.ingest_rgba("a", page(), ProcessingSettings::default());
        let g = history.invalidate(id).unwrap();
        let (source, settings) = history.begin(id, g).unwrap();
        history.remove(id).unwrap();
        assert!(matches!(
            history.complete(id, g, process(&source, &settings)),
            Outcome::Superseded
        ));
    }
}
