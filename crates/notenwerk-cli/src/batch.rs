// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch processing — one independent job per input file. A failing file is
// reported and skipped; the rest carry on.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notenwerk_core::error::{NotenwerkError, Result};
use notenwerk_core::human_errors::{HumanError, humanize_error};
use notenwerk_core::{AppConfig, ProcessingSettings};
use notenwerk_document::ProcessResult;
use notenwerk_session::{ImageStatus, Scheduler};
use tracing::{error, info, instrument};

use crate::options::OutputPaths;

/// Per-run options that are not processing settings.
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: Option<PathBuf>,
    pub write_original: bool,
}

/// Tally of a finished batch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct BatchSummary {
    pub written: Vec<PathBuf>,
    pub failed: Vec<PathBuf>,
}

impl BatchSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Process every input with `settings`, writing outputs as each finishes.
#[instrument(skip_all, fields(inputs = inputs.len()))]
pub async fn run(
    inputs: &[PathBuf],
    settings: &ProcessingSettings,
    config: &AppConfig,
    options: &BatchOptions,
) -> BatchSummary {
    let scheduler = Scheduler::new(config);
    let mut summary = BatchSummary::default();
    let mut jobs = Vec::with_capacity(inputs.len());
    let outputs = OutputPaths::assign(inputs, options.out_dir.as_deref());

    for (input, paths) in inputs.iter().zip(outputs) {
        let bytes = match tokio::fs::read(input).await {
            Ok(bytes) => bytes,
            Err(err) => {
                report(input, &humanize_error(&NotenwerkError::from(err)));
                summary.failed.push(input.clone());
                continue;
            }
        };

        let name = input.display().to_string();
        let id = scheduler.ingest(name, bytes, settings.clone()).await;
        match scheduler.process_now(id) {
            Ok(handle) => jobs.push((input, paths, id, handle)),
            Err(err) => {
                let human = scheduler
                    .record(id)
                    .ok()
                    .and_then(|record| record.error)
                    .unwrap_or_else(|| humanize_error(&err));
                report(input, &human);
                summary.failed.push(input.clone());
            }
        }
    }

    for (input, paths, id, handle) in jobs {
        if let Err(err) = handle.await {
            error!(input = %input.display(), error = %err, "processing task aborted");
            summary.failed.push(input.clone());
            continue;
        }

        let record = match scheduler.record(id) {
            Ok(record) => record,
            Err(err) => {
                report(input, &humanize_error(&err));
                summary.failed.push(input.clone());
                continue;
            }
        };
        let ready = record.status == ImageStatus::Ready;
        let result = match record.result {
            Some(result) if ready => result,
            _ => {
                let human = record.error.unwrap_or_else(|| {
                    humanize_error(&NotenwerkError::ImageError("no result produced".into()))
                });
                report(input, &human);
                summary.failed.push(input.clone());
                continue;
            }
        };

        let write_original = options.write_original;
        let written =
            tokio::task::spawn_blocking(move || write_outputs(&result, &paths, write_original))
                .await
                .unwrap_or_else(|err| {
                    Err(NotenwerkError::JobFailed(format!("write task: {err}")))
                });

        match written {
            Ok(paths) => {
                for path in &paths {
                    println!("{}", path.display());
                }
                summary.written.extend(paths);
            }
            Err(err) => {
                report(input, &humanize_error(&err));
                summary.failed.push(input.clone());
            }
        }
    }

    info!(
        written = summary.written.len(),
        failed = summary.failed.len(),
        "batch finished"
    );
    summary
}

/// Encode and write the outputs for one page. Returns the paths written.
fn write_outputs(
    result: &Arc<ProcessResult>,
    paths: &OutputPaths,
    write_original: bool,
) -> Result<Vec<PathBuf>> {
    if let Some(dir) = paths.processed.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)?;
    }

    std::fs::write(&paths.processed, result.processed_png()?)?;
    let mut written = vec![paths.processed.clone()];

    if write_original {
        std::fs::write(&paths.original, result.original_png()?)?;
        written.push(paths.original.clone());
    }
    Ok(written)
}

fn report(input: &Path, human: &HumanError) {
    error!(input = %input.display(), severity = ?human.severity, "{}", human.message);
    eprintln!("{}: {}", input.display(), human);
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use notenwerk_document::image::processor::encode_png;

    fn page_png() -> Vec<u8> {
        let mut page = RgbaImage::from_pixel(40, 30, Rgba([240, 240, 240, 255]));
        for x in 5..35 {
            page.put_pixel(x, 15, Rgba([20, 20, 20, 255]));
        }
        encode_png(&page).unwrap()
    }

    fn settings() -> ProcessingSettings {
        ProcessingSettings {
            scale_multiplier: 1.0,
            ..ProcessingSettings::default()
        }
    }

    fn options(out_dir: &Path, write_original: bool) -> BatchOptions {
        BatchOptions {
            out_dir: Some(out_dir.to_path_buf()),
            write_original,
        }
    }

    #[tokio::test]
    async fn writes_both_outputs_with_matching_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("score.png");
        std::fs::write(&input, page_png()).unwrap();
        let out = dir.path().join("out");

        let summary = run(
            &[input],
            &settings(),
            &AppConfig::default(),
            &options(&out, true),
        )
        .await;
        assert!(summary.all_succeeded());
        assert_eq!(summary.written.len(), 2);

        let processed = image::open(out.join("score_processed.png")).unwrap();
        let original = image::open(out.join("score_original.png")).unwrap();
        // 30x1 line plus 50px padding on every side.
        assert_eq!((processed.width(), processed.height()), (130, 101));
        assert_eq!(
            (original.width(), original.height()),
            (processed.width(), processed.height())
        );
    }

    #[tokio::test]
    async fn bad_inputs_fail_alone() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.png");
        let garbage = dir.path().join("garbage.png");
        let missing = dir.path().join("missing.png");
        std::fs::write(&good, page_png()).unwrap();
        std::fs::write(&garbage, b"definitely not a png").unwrap();

        let summary = run(
            &[garbage.clone(), good, missing.clone()],
            &settings(),
            &AppConfig::default(),
            &options(dir.path(), false),
        )
        .await;

        assert_eq!(summary.failed, vec![garbage, missing]);
        assert_eq!(summary.written, vec![dir.path().join("good_processed.png")]);
        assert!(!dir.path().join("good_original.png").exists());
    }

    #[tokio::test]
    async fn same_named_inputs_do_not_overwrite_each_other() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("a").join("page.png");
        let second = dir.path().join("b").join("page.png");
        for input in [&first, &second] {
            std::fs::create_dir_all(input.parent().unwrap()).unwrap();
            std::fs::write(input, page_png()).unwrap();
        }
        let out = dir.path().join("out");

        let summary = run(
            &[first, second],
            &settings(),
            &AppConfig::default(),
            &options(&out, false),
        )
        .await;

        assert!(summary.all_succeeded());
        assert_eq!(
            summary.written,
            vec![out.join("page_processed.png"), out.join("page_2_processed.png")]
        );
        assert!(out.join("page_2_processed.png").exists());
    }
}
