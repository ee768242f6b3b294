// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grid segmentation — tile the ink mask into rows (questions) and columns
// (choices). Leftover pixels from integer division go one each to the first
// rows and columns, so the cells cover the mask exactly.

use image::GrayImage;
use image::imageops::crop_imm;
use omr_core::config::GridConfig;
use omr_core::error::{OmrError, Result};
use tracing::{debug, instrument};

/// Split `total` pixels into `parts` contiguous lengths.
///
/// Every length is `total / parts`, and the first `total % parts` lengths get
/// one extra pixel. The lengths always sum to `total`.
pub fn split_lengths(total: u32, parts: u32) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts).map(|i| base + u32::from(i < remainder)).collect()
}

/// Position of one answer cell inside the mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    /// Zero-based question (row) index.
    pub question: usize,
    /// Zero-based choice (column) index.
    pub choice: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A cropped answer cell.
#[derive(Debug, Clone)]
pub struct Cell {
    pub rect: CellRect,
    pub mask: GrayImage,
}

/// All cells of a sheet in question-major order.
#[derive(Debug, Clone)]
pub struct CellGrid {
    rows: usize,
    cols: usize,
    cells: Vec<Cell>,
}

impl CellGrid {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// The choice cells of one question, left to right.
    pub fn question(&self, row: usize) -> &[Cell] {
        let start = (row * self.cols).min(self.cells.len());
        let end = (start + self.cols).min(self.cells.len());
        &self.cells[start..end]
    }

    /// Iterate questions in order.
    pub fn questions(&self) -> impl Iterator<Item = &[Cell]> {
        self.cells.chunks(self.cols.max(1))
    }
}

/// Cuts a rectified ink mask into `rows` x `cols` cells.
#[derive(Debug, Clone)]
pub struct GridSegmenter {
    rows: u32,
    cols: u32,
}

impl GridSegmenter {
    pub fn new(config: &GridConfig) -> Self {
        Self {
            rows: config.rows,
            cols: config.cols,
        }
    }

    pub fn rows(&self) -> u32 {
        self.rows
    }

    pub fn cols(&self) -> u32 {
        self.cols
    }

    /// Cell rectangles for a `width` x `height` mask.
    ///
    /// Fails with `GridShapeMismatch` when the mask is too small to give every
    /// cell at least one pixel.
    pub fn layout(&self, width: u32, height: u32) -> Result<Vec<CellRect>> {
        let expected = self.rows as usize * self.cols as usize;
        if self.rows > height || self.cols > width {
            return Err(OmrError::GridShapeMismatch {
                expected,
                actual: self.rows.min(height) as usize * self.cols.min(width) as usize,
            });
        }
        let row_heights = split_lengths(height, self.rows);
        let col_widths = split_lengths(width, self.cols);

        let mut cells = Vec::with_capacity(expected);
        let mut y = 0;
        for (question, &cell_h) in row_heights.iter().enumerate() {
            let mut x = 0;
            for (choice, &cell_w) in col_widths.iter().enumerate() {
                if cell_w > 0 && cell_h > 0 {
                    cells.push(CellRect {
                        question,
                        choice,
                        x,
                        y,
                        width: cell_w,
                        height: cell_h,
                    });
                }
                x += cell_w;
            }
            y += cell_h;
        }

        if cells.len() != expected {
            return Err(OmrError::GridShapeMismatch {
                expected,
                actual: cells.len(),
            });
        }
        Ok(cells)
    }

    /// Crop every cell out of the mask.
    #[instrument(skip_all, fields(rows = self.rows, cols = self.cols))]
    pub fn segment(&self, mask: &GrayImage) -> Result<CellGrid> {
        let (width, height) = mask.dimensions();
        let cells: Vec<Cell> = self
            .layout(width, height)?
            .into_iter()
            .map(|rect| Cell {
                mask: crop_imm(mask, rect.x, rect.y, rect.width, rect.height).to_image(),
                rect,
            })
            .collect();

        debug!(cells = cells.len(), width, height, "Mask segmented");
        Ok(CellGrid {
            rows: self.rows as usize,
            cols: self.cols as usize,
            cells,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn segmenter(rows: u32, cols: u32) -> GridSegmenter {
        GridSegmenter::new(&GridConfig { rows, cols })
    }

    #[test]
    fn split_gives_remainder_to_leading_parts() {
        assert_eq!(split_lengths(700, 20), vec![35; 20]);
        assert_eq!(split_lengths(10, 3), vec![4, 3, 3]);
        assert_eq!(split_lengths(2, 4), vec![1, 1, 0, 0]);
        assert!(split_lengths(5, 0).is_empty());
    }

    #[test]
    fn cells_tile_the_mask_exactly() {
        for &(rows, cols, width, height) in &[
            (20, 5, 600, 700),
            (20, 5, 601, 703),
            (7, 3, 100, 50),
            (1, 1, 9, 9),
            (13, 4, 97, 131),
        ] {
            let cells = segmenter(rows, cols).layout(width, height).expect("layout");
            assert_eq!(cells.len(), (rows * cols) as usize);

            let mut coverage = vec![0u8; (width * height) as usize];
            for cell in &cells {
                for y in cell.y..cell.y + cell.height {
                    for x in cell.x..cell.x + cell.width {
                        coverage[(y * width + x) as usize] += 1;
                    }
                }
            }
            assert!(
                coverage.iter().all(|&c| c == 1),
                "gaps or overlaps for {rows}x{cols} on {width}x{height}"
            );

            let row_sum: u32 = cells.iter().filter(|c| c.choice == 0).map(|c| c.height).sum();
            let col_sum: u32 = cells.iter().filter(|c| c.question == 0).map(|c| c.width).sum();
            assert_eq!((col_sum, row_sum), (width, height));
        }
    }

    #[test]
    fn cells_are_question_major() {
        let cells = segmenter(3, 2).layout(20, 30).expect("layout");
        let order: Vec<(usize, usize)> = cells.iter().map(|c| (c.question, c.choice)).collect();
        assert_eq!(order, vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1)]);
    }

    #[test]
    fn mask_smaller_than_grid_is_a_mismatch() {
        let result = segmenter(20, 5).layout(4, 700);
        assert!(matches!(
            result,
            Err(OmrError::GridShapeMismatch {
                expected: 100,
                actual: 80
            })
        ));
    }

    #[test]
    fn oversized_grid_is_rejected_before_layout() {
        let result = segmenter(u32::MAX, 5).layout(600, 700);
        assert!(matches!(
            result,
            Err(OmrError::GridShapeMismatch {
                expected,
                actual: 3500
            }) if expected == u32::MAX as usize * 5
        ));
    }

    #[test]
    fn segment_crops_cell_contents() {
        let mut mask = GrayImage::new(50, 40);
        // Ink in question 1, choice 2 (x 20..30, y 20..40 for a 2x5 grid).
        for y in 22..38 {
            for x in 22..28 {
                mask.put_pixel(x, y, Luma([255]));
            }
        }
        let grid = segmenter(2, 5).segment(&mask).expect("segment");
        assert_eq!(grid.rows(), 2);
        assert_eq!(grid.cols(), 5);
        assert_eq!(grid.questions().count(), 2);

        let inked: Vec<(usize, usize)> = grid
            .cells()
            .iter()
            .filter(|c| c.mask.pixels().any(|p| p.0[0] > 0))
            .map(|c| (c.rect.question, c.rect.choice))
            .collect();
        assert_eq!(inked, vec![(1, 2)]);
        assert_eq!(grid.question(1)[2].mask.dimensions(), (10, 20));
    }
}
