// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Report rendering — plain-text summaries for the terminal and JSON for
// scripts.

use std::path::Path;

use omr_core::error::{OmrError, Result};
use omr_core::human_errors::humanize_error;
use omr_core::types::{OutcomeStatus, StudentInfo};
use omr_vision::SheetScan;
use serde::Serialize;

use crate::services::app_services::GradedSheet;
use crate::services::batch::SheetResult;

fn letter_or_none(choice: Option<impl std::fmt::Display>) -> String {
    choice.map_or_else(|| "None".to_string(), |c| c.to_string())
}

/// Text report for one graded sheet.
pub fn render_graded(path: &Path, sheet: &GradedSheet) -> Vec<String> {
    let report = &sheet.report;
    let mut lines = vec![
        format!("Sheet: {}", path.display()),
        format!("Total Questions: {}", report.total),
        format!("Correct Answers: {}", report.correct),
        format!("Incorrect Answers: {}", report.incorrect),
        format!("Unanswered: {}", report.unanswered),
    ];
    if report.skipped > 0 {
        lines.push(format!("Skipped (no key): {}", report.skipped));
    }
    lines.push(format!("Score: {}", report.score_display()));

    if let Some(info) = &sheet.student_info {
        lines.extend(render_student_info(info));
    }

    lines.push(String::new());
    lines.push("Detailed Results:".into());
    for outcome in &report.outcomes {
        let status = match outcome.status {
            OutcomeStatus::Correct => "✓",
            OutcomeStatus::Incorrect | OutcomeStatus::Unanswered => "✗",
            OutcomeStatus::Skipped => "-",
        };
        lines.push(format!(
            "Q{}: {} Your Answer: {} | Correct: {}",
            outcome.question,
            status,
            letter_or_none(outcome.student),
            letter_or_none(outcome.key),
        ));
    }

    lines.push(String::new());
    lines.push("Common Mistakes:".into());
    for (label, count) in sheet.mistakes.entries() {
        lines.push(format!("  {label}: {count}"));
    }
    lines
}

/// Answers only, as printed by `detect`.
pub fn render_detected(path: &Path, scan: &SheetScan) -> Vec<String> {
    let mut lines = vec![format!("Sheet: {}", path.display())];
    if let Some(info) = &scan.student_info {
        lines.extend(render_student_info(info));
    }
    lines.extend(
        scan.answers_by_question()
            .into_iter()
            .map(|(label, letter)| format!("{label}: {}", letter_or_none(letter))),
    );
    lines
}

fn render_student_info(info: &StudentInfo) -> Vec<String> {
    let mut lines = vec!["Student Info:".to_string()];
    lines.extend(info.iter().map(|(field, value)| {
        let value = if value.is_empty() { "-" } else { value };
        format!("  {field}: {value}")
    }));
    lines
}

/// Text for a sheet that could not be graded.
pub fn render_failure(path: &Path, err: &OmrError) -> Vec<String> {
    let human = humanize_error(err);
    vec![
        format!("Sheet: {}", path.display()),
        format!("Error: {}", human.message),
        format!("Suggestion: {}", human.suggestion),
    ]
}

#[derive(Serialize)]
struct SheetJson<'a> {
    path: String,
    #[serde(flatten)]
    outcome: OutcomeJson<'a>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum OutcomeJson<'a> {
    Graded(&'a GradedSheet),
    Failed { error: String, suggestion: String },
}

/// All batch results as a pretty JSON array, in input order.
pub fn results_json(results: &[SheetResult]) -> Result<String> {
    let sheets: Vec<SheetJson<'_>> = results
        .iter()
        .map(|result| SheetJson {
            path: result.path.display().to_string(),
            outcome: match &result.outcome {
                Ok(sheet) => OutcomeJson::Graded(sheet),
                Err(err) => {
                    let human = humanize_error(err);
                    OutcomeJson::Failed {
                        error: human.message,
                        suggestion: human.suggestion,
                    }
                }
            },
        })
        .collect();
    Ok(serde_json::to_string_pretty(&sheets)?)
}
