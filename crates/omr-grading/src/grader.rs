// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grading engine — compare an answer vector against the key, question by
// question, and compute the score.

use omr_core::error::{OmrError, Result};
use omr_core::types::{
    AnswerKey, AnswerVector, ChoiceIndex, GradeReport, MissingKeyPolicy, OutcomeStatus,
    QuestionOutcome,
};
use tracing::{debug, info, instrument};

/// Grade `answers` against `key`.
///
/// Both must have one entry per question. Key entries that are missing are
/// resolved with `policy`: `Fail` rejects the sheet, `UseChoice` grades
/// against the given choice and `Skip` leaves the question out of the total.
/// A question without a determinate mark is unanswered, never correct.
#[instrument(skip_all, fields(questions = answers.len()))]
pub fn grade(
    answers: &AnswerVector,
    key: &AnswerKey,
    policy: MissingKeyPolicy,
) -> Result<GradeReport> {
    if key.len() != answers.len() {
        return Err(OmrError::KeyLengthMismatch {
            key: key.len(),
            answers: answers.len(),
        });
    }

    let mut report = GradeReport {
        total: 0,
        correct: 0,
        incorrect: 0,
        unanswered: 0,
        skipped: 0,
        score_percent: 0.0,
        outcomes: Vec::with_capacity(answers.len()),
    };

    for (index, (student, entry)) in answers.iter().zip(key.entries()).enumerate() {
        let question = index + 1;
        let expected = resolve_key(*entry, policy, question)?;

        let status = match (expected, student) {
            (None, _) => OutcomeStatus::Skipped,
            (Some(_), None) => OutcomeStatus::Unanswered,
            (Some(k), Some(s)) if k == s => OutcomeStatus::Correct,
            (Some(_), Some(_)) => OutcomeStatus::Incorrect,
        };

        match status {
            OutcomeStatus::Correct => report.correct += 1,
            OutcomeStatus::Incorrect => report.incorrect += 1,
            OutcomeStatus::Unanswered => report.unanswered += 1,
            OutcomeStatus::Skipped => report.skipped += 1,
        }

        report.outcomes.push(QuestionOutcome {
            question,
            student,
            key: expected,
            status,
        });
    }

    report.total = report.correct + report.incorrect + report.unanswered;
    report.score_percent = if report.total == 0 {
        0.0
    } else {
        report.correct as f64 / report.total as f64 * 100.0
    };

    info!(
        total = report.total,
        correct = report.correct,
        incorrect = report.incorrect,
        unanswered = report.unanswered,
        skipped = report.skipped,
        score = %report.score_display(),
        "Sheet graded"
    );
    Ok(report)
}

/// The choice a question is graded against, or `None` when it is skipped.
fn resolve_key(
    entry: Option<ChoiceIndex>,
    policy: MissingKeyPolicy,
    question: usize,
) -> Result<Option<ChoiceIndex>> {
    match (entry, policy) {
        (Some(choice), _) => Ok(Some(choice)),
        (None, MissingKeyPolicy::Fail) => Err(OmrError::MissingKeyEntry { question }),
        (None, MissingKeyPolicy::UseChoice(choice)) => {
            debug!(question, choice = %choice, "Missing key entry replaced");
            Ok(Some(choice))
        }
        (None, MissingKeyPolicy::Skip) => {
            debug!(question, "Missing key entry skipped");
            Ok(None)
        }
    }
}
