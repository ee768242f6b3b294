// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// omr-vision — Image pipeline for the OMR grader.
//
// Loads sheet photos, finds and rectifies the sheet, binarizes it into an ink
// mask, tiles the answer grid and decides which bubble each question has
// marked. Optionally decodes the student-identity header.

pub mod grid;
pub mod photo;
pub mod pipeline;
pub mod scan;
pub mod student_info;

// Re-export the primary structs so callers can use `omr_vision::SheetPipeline` etc.
pub use grid::{GridSegmenter, MarkClassifier};
pub use photo::loader::SheetImage;
pub use pipeline::{SheetPipeline, SheetScan};
pub use scan::{Binarizer, EdgeExtractor, QuadFinder, Rectifier};
pub use student_info::StudentInfoDecoder;
