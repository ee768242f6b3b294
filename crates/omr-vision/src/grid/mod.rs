// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Answer grid — cell layout over the ink mask and per-question mark decisions.

pub mod classify;
pub mod segment;

pub use classify::MarkClassifier;
pub use segment::{Cell, CellGrid, CellRect, GridSegmenter};
