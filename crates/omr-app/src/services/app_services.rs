// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Central service layer — builds the sheet pipeline from the configuration
// and exposes the operations the CLI commands need.
//
// The pipeline is immutable once built, so it is shared behind an `Arc`
// between the command handlers and the blocking grading tasks.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use omr_core::GraderConfig;
use omr_core::error::Result;
use omr_core::types::{AnswerKey, AnswerVector, GradeReport, MissingKeyPolicy, StudentInfo};
use omr_grading::{MistakePatterns, analyze_mistakes, grade};
use omr_vision::{SheetImage, SheetPipeline, SheetScan};
use serde::Serialize;
use tracing::{info, instrument};

use super::batch::{SheetResult, grade_sheets};

/// Everything produced by grading one sheet.
#[derive(Debug, Clone, Serialize)]
pub struct GradedSheet {
    pub answers: AnswerVector,
    pub report: GradeReport,
    pub mistakes: MistakePatterns,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub student_info: Option<StudentInfo>,
}

/// An answer key together with the policy for its missing entries.
#[derive(Debug, Clone)]
pub struct KeySpec {
    pub key: AnswerKey,
    pub policy: MissingKeyPolicy,
}

/// Shared services for the command handlers.
#[derive(Clone)]
pub struct AppServices {
    pipeline: Arc<SheetPipeline>,
}

/// Read the grader config file, or fall back to the defaults when `None`.
pub fn load_config(config_path: Option<&Path>) -> Result<GraderConfig> {
    match config_path {
        Some(path) => {
            info!(path = %path.display(), "Loading grader config");
            GraderConfig::load(path)
        }
        None => Ok(GraderConfig::default()),
    }
}

impl AppServices {
    pub fn with_config(config: GraderConfig) -> Result<Self> {
        let pipeline = SheetPipeline::new(config)?;
        info!(
            rows = pipeline.config().grid.rows,
            cols = pipeline.config().grid.cols,
            "Grader services initialised"
        );
        Ok(Self {
            pipeline: Arc::new(pipeline),
        })
    }

    pub fn config(&self) -> &GraderConfig {
        self.pipeline.config()
    }

    /// Read the answers from one photo without grading.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn detect(&self, path: &Path) -> Result<SheetScan> {
        let image = SheetImage::open(path)?;
        self.pipeline.process(&image)
    }

    /// Grade many photos in parallel, at most `jobs` at a time. Results come
    /// back in input order.
    pub async fn grade_batch(
        &self,
        key: KeySpec,
        paths: Vec<PathBuf>,
        jobs: usize,
    ) -> Vec<SheetResult> {
        let job = Arc::new(GradingJob {
            pipeline: Arc::clone(&self.pipeline),
            key,
        });
        grade_sheets(job, paths, jobs).await
    }
}

/// One batch's shared state: the pipeline and the key every sheet is graded
/// against.
pub struct GradingJob {
    pipeline: Arc<SheetPipeline>,
    key: KeySpec,
}

impl GradingJob {
    /// Detect and grade a single photo. Blocking.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn grade_file(&self, path: &Path) -> Result<GradedSheet> {
        let image = SheetImage::open(path)?;
        let scan = self.pipeline.process(&image)?;
        self.grade_scan(scan)
    }

    pub fn grade_scan(&self, scan: SheetScan) -> Result<GradedSheet> {
        let report = grade(&scan.answers, &self.key.key, self.key.policy)?;
        let mistakes = analyze_mistakes(&scan.answers, &self.key.key);
        Ok(GradedSheet {
            answers: scan.answers,
            report,
            mistakes,
            student_info: scan.student_info,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use omr_core::error::OmrError;

    #[test]
    fn defaults_without_a_config_file() {
        let config = load_config(None).expect("config");
        let services = AppServices::with_config(config).expect("services");
        assert_eq!(services.config(), &GraderConfig::default());
    }

    #[test]
    fn reads_config_file() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("grader.json");
        std::fs::write(&path, r#"{"grid": {"rows": 10}}"#).expect("write");

        let config = load_config(Some(&path)).expect("config");
        let services = AppServices::with_config(config).expect("services");
        assert_eq!(services.config().grid.rows, 10);
    }

    #[test]
    fn invalid_config_file_is_rejected() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("grader.json");
        std::fs::write(&path, r#"{"classifier": {"margin": 0.5}}"#).expect("write");

        assert!(matches!(
            load_config(Some(&path)),
            Err(OmrError::InvalidConfig(_))
        ));
    }

    #[test]
    fn detect_reports_unreadable_photos() {
        let services = AppServices::with_config(GraderConfig::default()).expect("services");
        assert!(matches!(
            services.detect(Path::new("/nonexistent/sheet.png")),
            Err(OmrError::LoadFailure(_))
        ));
    }
}
