// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Batch grading — one blocking task per sheet on the tokio pool, bounded by a
// semaphore. A failing sheet never affects the others.

use std::path::PathBuf;
use std::sync::Arc;

use omr_core::error::{OmrError, Result};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use super::app_services::{GradedSheet, GradingJob};

/// Outcome for one input photo.
#[derive(Debug)]
pub struct SheetResult {
    pub path: PathBuf,
    pub outcome: Result<GradedSheet>,
}

/// Grade every path with at most `jobs` sheets in flight.
pub async fn grade_sheets(job: Arc<GradingJob>, paths: Vec<PathBuf>, jobs: usize) -> Vec<SheetResult> {
    let limit = Arc::new(Semaphore::new(jobs.max(1)));
    info!(sheets = paths.len(), jobs = jobs.max(1), "Grading batch");

    let mut pending = Vec::with_capacity(paths.len());
    for path in paths {
        let task = match Arc::clone(&limit).acquire_owned().await {
            Ok(permit) => {
                let job = Arc::clone(&job);
                let task_path = path.clone();
                Ok(tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    job.grade_file(&task_path)
                }))
            }
            Err(err) => Err(OmrError::Internal(format!("grading task not started: {err}"))),
        };
        pending.push((path, task));
    }

    let mut results = Vec::with_capacity(pending.len());
    for (path, task) in pending {
        let outcome = match task {
            Ok(handle) => handle
                .await
                .unwrap_or_else(|err| Err(OmrError::Internal(format!("grading task failed: {err}")))),
            Err(err) => Err(err),
        };
        if let Err(err) = &outcome {
            warn!(path = %path.display(), error = %err, "Sheet failed");
        }
        results.push(SheetResult { path, outcome });
    }

    let graded = results.iter().filter(|r| r.outcome.is_ok()).count();
    info!(graded, failed = results.len() - graded, "Batch complete");
    results
}
