// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Mark classification — count ink in each choice cell and decide which
// choice, if any, the student marked.

use image::GrayImage;
use omr_core::config::ClassifierConfig;
use omr_core::types::{AnswerVector, ChoiceIndex, Mark};
use tracing::{debug, instrument};

use super::segment::{Cell, CellGrid};
use crate::scan::binarize::{LocalMean, blur};

/// Decide the marked choice from per-choice ink counts.
///
/// A choice wins when it has the most ink (first on ties), has any ink at
/// all, holds more than `ratio` of the question's maximum, and beats the
/// runner-up by more than a factor of `margin`. Anything else is `None`.
pub fn decide(counts: &[u32], ratio: f64, margin: f64) -> Mark {
    let mut best: Option<(usize, u32)> = None;
    for (i, &count) in counts.iter().enumerate() {
        if best.is_none_or(|(_, top)| count > top) {
            best = Some((i, count));
        }
    }
    let (winner, top) = best?;
    if top == 0 {
        return None;
    }

    let total_max = counts.iter().copied().max().unwrap_or(0);
    if !(top as f64 > total_max as f64 * ratio) {
        return None;
    }

    let runner_up = counts
        .iter()
        .enumerate()
        .filter(|&(i, _)| i != winner)
        .map(|(_, &c)| c)
        .max()
        .unwrap_or(0);
    if !(top as f64 > runner_up as f64 * margin) {
        return None;
    }

    ChoiceIndex::new(winner)
}

/// Ink counting and per-question decisions over a segmented grid.
#[derive(Debug, Clone)]
pub struct MarkClassifier {
    config: ClassifierConfig,
}

impl MarkClassifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    /// Foreground pixels in one cell after denoising.
    ///
    /// A blurred pixel counts when it reaches both the fixed floor and the
    /// mean of its neighbourhood, which drops isolated specks and the soft
    /// halo around strokes.
    pub fn ink_count(&self, cell: &GrayImage) -> u32 {
        let smoothed = blur(cell, self.config.cell_blur_sigma);
        let means = LocalMean::new(&smoothed);
        let floor = self.config.cell_floor as f64;
        let radius = self.config.cell_block_radius;

        let mut count = 0;
        for (x, y, pixel) in smoothed.enumerate_pixels() {
            let value = pixel.0[0] as f64;
            if value >= floor && value >= means.mean(x, y, radius) {
                count += 1;
            }
        }
        count
    }

    /// Ink counts for the choices of one question.
    pub fn counts(&self, cells: &[Cell]) -> Vec<u32> {
        cells.iter().map(|cell| self.ink_count(&cell.mask)).collect()
    }

    pub fn decide(&self, counts: &[u32]) -> Mark {
        decide(counts, self.config.ratio, self.config.margin)
    }

    /// Classify every question. Returns the answers and the raw counts.
    #[instrument(skip_all, fields(rows = grid.rows(), cols = grid.cols()))]
    pub fn classify(&self, grid: &CellGrid) -> (AnswerVector, Vec<Vec<u32>>) {
        let mut answers = Vec::with_capacity(grid.rows());
        let mut all_counts = Vec::with_capacity(grid.rows());

        for (question, cells) in grid.questions().enumerate() {
            let counts = self.counts(cells);
            let mark = self.decide(&counts);
            debug!(question = question + 1, ?counts, ?mark, "Question classified");
            answers.push(mark);
            all_counts.push(counts);
        }

        (AnswerVector::new(answers), all_counts)
    }
}
