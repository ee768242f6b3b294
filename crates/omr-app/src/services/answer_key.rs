// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer key input — key files, inline letter keys and the missing-entry
// policy flag.

use std::path::Path;

use omr_core::error::{OmrError, Result};
use omr_core::types::{AnswerKey, ChoiceIndex, MissingKeyPolicy};
use tracing::info;

/// Read a JSON key file of the form `{"answers": ["A", "C", null, ...]}`.
pub fn load_key_file(path: &Path) -> Result<AnswerKey> {
    let data = std::fs::read_to_string(path)?;
    let key: AnswerKey = serde_json::from_str(&data)?;
    if key.is_empty() {
        return Err(OmrError::InvalidAnswerKey(format!(
            "{} contains no answers",
            path.display()
        )));
    }
    info!(
        path = %path.display(),
        questions = key.len(),
        complete = key.is_complete(),
        "Answer key loaded"
    );
    Ok(key)
}

/// Write a key file in the format `load_key_file` reads.
pub fn save_key_file(path: &Path, key: &AnswerKey) -> Result<()> {
    let json = serde_json::to_string_pretty(key)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Parse the `--missing` flag: `fail`, `skip` or `default:<LETTER>`.
pub fn parse_missing_policy(value: &str) -> std::result::Result<MissingKeyPolicy, String> {
    let value = value.trim();
    match value.to_ascii_lowercase().as_str() {
        "fail" => return Ok(MissingKeyPolicy::Fail),
        "skip" => return Ok(MissingKeyPolicy::Skip),
        _ => {}
    }

    let letter = value
        .split_once(':')
        .filter(|(kind, _)| kind.eq_ignore_ascii_case("default"))
        .map(|(_, letter)| letter.trim())
        .ok_or_else(|| format!("expected fail, skip or default:<A-E>, got {value:?}"))?;

    let mut chars = letter.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => ChoiceIndex::from_letter(c)
            .map(MissingKeyPolicy::UseChoice)
            .ok_or_else(|| format!("{c:?} is not a choice between A and E")),
        _ => Err(format!("expected a single letter after default:, got {letter:?}")),
    }
}
