// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omr-grading — Score detected answers against an answer key and summarise
// the kinds of mistakes a student made.

pub mod diagnostics;
pub mod grader;

pub use diagnostics::{MistakePatterns, analyze_mistakes};
pub use grader::grade;
