// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for instructors grading a stack of sheets.
//
// Every technical error is mapped to a plain summary with a clear suggestion.
// Severity tells the shell whether the fix is a new photo or a fixed input.

use crate::error::OmrError;

/// Who has to act to get past the error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The photo itself is unusable. Take it again.
    Retake,
    /// The key, config, or file path supplied by the user needs fixing.
    FixInput,
    /// Something inside the grader went wrong.
    Internal,
}

/// A human-readable error with a short summary and an actionable suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    /// Short summary (shown as the sheet's status).
    pub message: String,
    /// What the user should try.
    pub suggestion: String,
    pub severity: Severity,
}

/// Convert an `OmrError` into a `HumanError` an instructor can act on.
pub fn humanize_error(err: &OmrError) -> HumanError {
    match err {
        // -- Pipeline errors --
        OmrError::LoadFailure(detail) => HumanError {
            message: "The sheet image could not be opened.".into(),
            suggestion: format!(
                "Make sure the file is a JPEG or PNG photo and is not damaged. ({detail})"
            ),
            severity: Severity::FixInput,
        },

        OmrError::NoBoundaryFound => HumanError {
            message: "Sheet not detected.".into(),
            suggestion: "Photograph the whole sheet on a darker, plain background so all four edges are visible.".into(),
            severity: Severity::Retake,
        },

        OmrError::DegenerateQuadrilateral => HumanError {
            message: "Corner detection failed.".into(),
            suggestion: "Hold the camera straight above the sheet and keep all four corners in the frame.".into(),
            severity: Severity::Retake,
        },

        OmrError::GridShapeMismatch { expected, actual } => HumanError {
            message: "Layout mismatch.".into(),
            suggestion: format!(
                "The sheet does not match the configured exam template ({expected} answer cells expected, {actual} found). Check the rows/columns setting or retake the photo."
            ),
            severity: Severity::Retake,
        },

        // -- Grading errors --
        OmrError::KeyLengthMismatch { key, answers } => HumanError {
            message: "The answer key does not fit this exam.".into(),
            suggestion: format!(
                "The key has {key} answers but the sheet has {answers} questions. Load the key for this exam."
            ),
            severity: Severity::FixInput,
        },

        OmrError::MissingKeyEntry { question } => HumanError {
            message: "The answer key is incomplete.".into(),
            suggestion: format!(
                "Question {question} has no correct answer. Fill it in, or choose to skip or default missing answers."
            ),
            severity: Severity::FixInput,
        },

        OmrError::InvalidAnswerKey(detail) => HumanError {
            message: "The answer key could not be read.".into(),
            suggestion: format!("Answers must be letters A to E. ({detail})"),
            severity: Severity::FixInput,
        },

        // -- Configuration / persistence --
        OmrError::InvalidConfig(detail) => HumanError {
            message: "The grader settings are invalid.".into(),
            suggestion: format!("Fix the configuration file and try again. ({detail})"),
            severity: Severity::FixInput,
        },

        OmrError::Io(io_err) => {
            if io_err.kind() == std::io::ErrorKind::NotFound {
                HumanError {
                    message: "The file couldn't be found.".into(),
                    suggestion: "It may have been moved or deleted. Check the path and try again.".into(),
                    severity: Severity::FixInput,
                }
            } else if io_err.kind() == std::io::ErrorKind::PermissionDenied {
                HumanError {
                    message: "The grader doesn't have permission to read that file.".into(),
                    suggestion: "Check the file permissions, or copy the file somewhere readable first.".into(),
                    severity: Severity::FixInput,
                }
            } else {
                HumanError {
                    message: "There was a problem reading or writing a file.".into(),
                    suggestion: "Try again. If this keeps happening, your storage may be full.".into(),
                    severity: Severity::Internal,
                }
            }
        }

        OmrError::Serialization(_) => HumanError {
            message: "A key or settings file is not valid JSON.".into(),
            suggestion: "Check the file for typos such as missing quotes or commas.".into(),
            severity: Severity::FixInput,
        },

        OmrError::Internal(detail) => HumanError {
            message: "Something went wrong while grading this sheet.".into(),
            suggestion: format!("Try the sheet again on its own. ({detail})"),
            severity: Severity::Internal,
        },
    }
}
