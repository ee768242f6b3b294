// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the OMR grader.

use thiserror::Error;

/// Top-level error type for all grading operations.
///
/// Every pipeline failure aborts the sheet it occurred on; a sheet either
/// produces a full report or one of these.
#[derive(Debug, Error)]
pub enum OmrError {
    // -- Pipeline errors --
    #[error("failed to load sheet image: {0}")]
    LoadFailure(String),

    #[error("sheet not detected: no four-sided boundary found")]
    NoBoundaryFound,

    #[error("corner detection failed: sheet corners collapse onto each other")]
    DegenerateQuadrilateral,

    #[error("layout mismatch: expected {expected} answer cells, got {actual}")]
    GridShapeMismatch { expected: usize, actual: usize },

    // -- Grading errors --
    #[error("answer key has {key} entries but the sheet has {answers} questions")]
    KeyLengthMismatch { key: usize, answers: usize },

    #[error("answer key has no entry for question {question}")]
    MissingKeyEntry { question: usize },

    #[error("invalid answer key: {0}")]
    InvalidAnswerKey(String),

    // -- Configuration / persistence --
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OmrError>;
