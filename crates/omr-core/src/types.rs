// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types for the OMR grader.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{OmrError, Result};

/// Number of choices per question on the supported sheet format (A–E).
pub const CHOICES_PER_QUESTION: usize = 5;

/// Zero-based choice within a question (`0` = A, `4` = E).
///
/// Serialized as its letter so key files and JSON reports read naturally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "char", into = "char")]
pub struct ChoiceIndex(u8);

impl ChoiceIndex {
    /// Build a choice from a zero-based index. `None` when out of range.
    pub fn new(index: usize) -> Option<Self> {
        (index < CHOICES_PER_QUESTION).then_some(Self(index as u8))
    }

    /// Parse a choice letter (case-insensitive).
    pub fn from_letter(letter: char) -> Option<Self> {
        let upper = letter.to_ascii_uppercase();
        if upper.is_ascii_uppercase() {
            Self::new((upper as u8 - b'A') as usize)
        } else {
            None
        }
    }

    /// Zero-based index.
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Letter shown on the printed sheet.
    pub fn letter(self) -> char {
        (b'A' + self.0) as char
    }
}

impl TryFrom<char> for ChoiceIndex {
    type Error = OmrError;

    fn try_from(letter: char) -> Result<Self> {
        Self::from_letter(letter)
            .ok_or_else(|| OmrError::InvalidAnswerKey(format!("'{letter}' is not a choice A-E")))
    }
}

impl From<ChoiceIndex> for char {
    fn from(choice: ChoiceIndex) -> char {
        choice.letter()
    }
}

impl std::fmt::Display for ChoiceIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Outcome of classifying one question: a choice, or `None` when no single
/// bubble was marked with confidence (blank, erased, or double-marked).
pub type Mark = Option<ChoiceIndex>;

/// Detected answers for one sheet, one entry per question in sheet order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnswerVector(Vec<Mark>);

impl AnswerVector {
    pub fn new(marks: Vec<Mark>) -> Self {
        Self(marks)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Mark for a zero-based question index.
    pub fn get(&self, question: usize) -> Mark {
        self.0.get(question).copied().flatten()
    }

    pub fn as_slice(&self) -> &[Mark] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = Mark> + '_ {
        self.0.iter().copied()
    }

    /// Number of questions with a determinate mark.
    pub fn answered(&self) -> usize {
        self.0.iter().filter(|m| m.is_some()).count()
    }

    /// `("Q1", Some('A'))`-style labels for display.
    pub fn labelled(&self) -> impl Iterator<Item = (String, Option<char>)> + '_ {
        self.0
            .iter()
            .enumerate()
            .map(|(i, mark)| (format!("Q{}", i + 1), mark.map(ChoiceIndex::letter)))
    }
}

impl FromIterator<Mark> for AnswerVector {
    fn from_iter<I: IntoIterator<Item = Mark>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Correct answers for an exam, one entry per question.
///
/// Entries may be missing; how a missing entry is treated is decided by the
/// caller through [`MissingKeyPolicy`], never by the key itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnswerKey {
    answers: Vec<Option<ChoiceIndex>>,
}

impl AnswerKey {
    pub fn new(answers: Vec<Option<ChoiceIndex>>) -> Self {
        Self { answers }
    }

    /// Build a complete key from choices.
    pub fn from_choices(choices: impl IntoIterator<Item = ChoiceIndex>) -> Self {
        Self {
            answers: choices.into_iter().map(Some).collect(),
        }
    }

    /// Parse a key written as letters, e.g. `"ABCDE ?BAC"`.
    ///
    /// `?`, `-` and `_` mark a missing entry; whitespace and commas are
    /// separators and ignored.
    pub fn from_letters(letters: &str) -> Result<Self> {
        let mut answers = Vec::new();
        for ch in letters.chars() {
            match ch {
                c if c.is_whitespace() || c == ',' => continue,
                '?' | '-' | '_' => answers.push(None),
                c => answers.push(Some(ChoiceIndex::try_from(c)?)),
            }
        }
        if answers.is_empty() {
            return Err(OmrError::InvalidAnswerKey("key is empty".into()));
        }
        Ok(Self { answers })
    }

    pub fn len(&self) -> usize {
        self.answers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.answers.is_empty()
    }

    /// Correct choice for a zero-based question index, if the key has one.
    pub fn get(&self, question: usize) -> Option<ChoiceIndex> {
        self.answers.get(question).copied().flatten()
    }

    pub fn entries(&self) -> &[Option<ChoiceIndex>] {
        &self.answers
    }

    /// Whether every question has a correct answer.
    pub fn is_complete(&self) -> bool {
        self.answers.iter().all(Option::is_some)
    }

    /// Letters form, with `?` for missing entries.
    pub fn to_letters(&self) -> String {
        self.answers
            .iter()
            .map(|a| a.map_or('?', ChoiceIndex::letter))
            .collect()
    }
}

/// What grading does with a question whose key entry is missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingKeyPolicy {
    /// Reject the whole sheet with `MissingKeyEntry`.
    #[default]
    Fail,
    /// Grade against this choice instead.
    UseChoice(ChoiceIndex),
    /// Leave the question out of the score entirely.
    Skip,
}

/// A point in image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for Point {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// Sheet boundary with its corners in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quadrilateral {
    pub top_left: Point,
    pub top_right: Point,
    pub bottom_left: Point,
    pub bottom_right: Point,
}

impl Quadrilateral {
    /// Corners as `[top-left, top-right, bottom-left, bottom-right]`.
    pub fn corners(&self) -> [Point; 4] {
        [
            self.top_left,
            self.top_right,
            self.bottom_left,
            self.bottom_right,
        ]
    }

    /// Enclosed area (shoelace over the perimeter order TL, TR, BR, BL).
    pub fn area(&self) -> f32 {
        let ring = [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ];
        let mut twice = 0.0f32;
        for i in 0..ring.len() {
            let j = (i + 1) % ring.len();
            twice += ring[i].x * ring[j].y - ring[j].x * ring[i].y;
        }
        twice.abs() / 2.0
    }
}

/// How a single question was scored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Correct,
    Incorrect,
    /// No determinate mark on the sheet.
    Unanswered,
    /// Key entry missing and the policy excluded the question.
    Skipped,
}

/// Per-question line of a [`GradeReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    /// One-based question number.
    pub question: usize,
    pub student: Mark,
    pub key: Option<ChoiceIndex>,
    pub status: OutcomeStatus,
}

/// Score for one graded sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeReport {
    /// Questions counted towards the score (skipped ones excluded).
    pub total: usize,
    pub correct: usize,
    pub incorrect: usize,
    pub unanswered: usize,
    pub skipped: usize,
    /// `correct / total * 100`, unrounded.
    pub score_percent: f64,
    pub outcomes: Vec<QuestionOutcome>,
}

impl GradeReport {
    /// Score rounded to two decimals, e.g. `"75.00%"`.
    pub fn score_display(&self) -> String {
        format!("{:.2}%", self.score_percent)
    }
}

/// Decoded header fields (index number, department code, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentInfo(BTreeMap<String, String>);

impl StudentInfo {
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn choice_letters() {
        assert_eq!(ChoiceIndex::new(0).map(ChoiceIndex::letter), Some('A'));
        assert_eq!(ChoiceIndex::new(4).map(ChoiceIndex::letter), Some('E'));
        assert!(ChoiceIndex::new(5).is_none());
        assert_eq!(ChoiceIndex::from_letter('c'), ChoiceIndex::new(2));
        assert!(ChoiceIndex::from_letter('F').is_none());
        assert!(ChoiceIndex::from_letter('3').is_none());
    }

    #[test]
    fn key_from_letters_with_gaps() {
        let key = AnswerKey::from_letters("AB?D, e").expect("valid key");
        assert_eq!(key.len(), 5);
        assert_eq!(key.get(1), ChoiceIndex::new(1));
        assert_eq!(key.get(2), None);
        assert_eq!(key.get(4), ChoiceIndex::new(4));
        assert!(!key.is_complete());
        assert_eq!(key.to_letters(), "AB?DE");
    }

    #[test]
    fn key_from_letters_rejects_unknown_choice() {
        let err = AnswerKey::from_letters("ABX").unwrap_err();
        assert!(matches!(err, OmrError::InvalidAnswerKey(_)));
        assert!(AnswerKey::from_letters("  ").is_err());
    }

    #[test]
    fn key_json_uses_letters() {
        let key: AnswerKey =
            serde_json::from_str(r#"{"answers": ["A", "c", null]}"#).expect("parse key");
        assert_eq!(key.entries(), &[ChoiceIndex::new(0), ChoiceIndex::new(2), None]);

        let json = serde_json::to_string(&key).expect("serialize");
        assert_eq!(json, r#"{"answers":["A","C",null]}"#);

        assert!(serde_json::from_str::<AnswerKey>(r#"{"answers": ["Z"]}"#).is_err());
    }

    #[test]
    fn answer_vector_labels() {
        let answers = AnswerVector::new(vec![ChoiceIndex::new(1), None]);
        let labels: Vec<_> = answers.labelled().collect();
        assert_eq!(labels, vec![(String::from("Q1"), Some('B')), (String::from("Q2"), None)]);
        assert_eq!(answers.answered(), 1);
        assert_eq!(answers.get(7), None);
    }

    #[test]
    fn quadrilateral_area() {
        let quad = Quadrilateral {
            top_left: Point::new(0.0, 0.0),
            top_right: Point::new(10.0, 0.0),
            bottom_left: Point::new(0.0, 5.0),
            bottom_right: Point::new(10.0, 5.0),
        };
        assert!((quad.area() - 50.0).abs() < 1e-3);
    }
}
