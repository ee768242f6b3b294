// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mistake patterns for instructor feedback. A pure summary over the same two
// vectors grading uses; it never changes the score.

use omr_core::types::{AnswerKey, AnswerVector};
use serde::{Deserialize, Serialize};

/// Choice index of the middle option (C).
const MIDDLE_CHOICE: usize = 2;

/// How a student's wrong answers relate to the correct ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MistakePatterns {
    /// Questions left without a determinate mark.
    pub skipped: usize,
    /// Wrong choice right next to the correct one.
    pub wrong_by_one: usize,
    /// Wrong choice three or more positions away.
    pub opposite_end: usize,
    /// Wrong choice two away that happens to be C.
    pub middle_bias: usize,
}

impl MistakePatterns {
    /// Labelled counts in display order.
    pub fn entries(&self) -> [(&'static str, usize); 4] {
        [
            ("Skipped answers", self.skipped),
            ("Wrong by one", self.wrong_by_one),
            ("Opposite end", self.opposite_end),
            ("Middle bias", self.middle_bias),
        ]
    }
}

/// Classify each question of `answers` against `key`.
///
/// Questions whose key entry is missing are ignored. A wrong answer two
/// positions away that is not C falls in no category.
pub fn analyze_mistakes(answers: &AnswerVector, key: &AnswerKey) -> MistakePatterns {
    let mut patterns = MistakePatterns::default();

    for (student, entry) in answers.iter().zip(key.entries()) {
        let Some(correct) = entry else { continue };
        let Some(chosen) = student else {
            patterns.skipped += 1;
            continue;
        };
        if chosen == *correct {
            continue;
        }

        let distance = chosen.index().abs_diff(correct.index());
        if distance == 1 {
            patterns.wrong_by_one += 1;
        } else if distance >= 3 {
            patterns.opposite_end += 1;
        } else if chosen.index() == MIDDLE_CHOICE {
            patterns.middle_bias += 1;
        }
    }

    patterns
}
