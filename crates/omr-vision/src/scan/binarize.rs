// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Ink-mask binarization of the rectified sheet: grayscale, CLAHE, light blur,
// then an inverted local-mean threshold so pen and pencil marks become 255 and
// paper becomes 0.

use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::filter::gaussian_blur_f32;
use omr_core::config::BinarizeConfig;
use tracing::{debug, instrument};

use super::clahe::equalize_adaptive;

/// Produces the binary ink mask of a rectified sheet.
#[derive(Debug, Clone)]
pub struct Binarizer {
    config: BinarizeConfig,
}

impl Binarizer {
    pub fn new(config: BinarizeConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(block_radius = self.config.block_radius, offset = self.config.offset))]
    pub fn binarize(&self, sheet: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(sheet);
        let equalized = equalize_adaptive(
            &gray,
            self.config.clahe_clip_limit,
            self.config.clahe_tiles,
        );
        let smoothed = blur(&equalized, self.config.blur_sigma);
        let mask = threshold_below_local_mean(
            &smoothed,
            self.config.block_radius,
            self.config.offset,
        );

        debug!(
            ink_pixels = mask.pixels().filter(|p| p.0[0] > 0).count(),
            "Ink mask computed"
        );
        mask
    }
}

/// Gaussian blur that treats a non-positive sigma as "no blur".
pub(crate) fn blur(gray: &GrayImage, sigma: f32) -> GrayImage {
    if sigma > 0.0 {
        gaussian_blur_f32(gray, sigma)
    } else {
        gray.clone()
    }
}

/// Mark pixels darker than their local mean minus `offset` as 255 (ink).
///
/// The mean is taken over a `(2 * radius + 1)`-pixel square, clipped at the
/// image border.
pub(crate) fn threshold_below_local_mean(gray: &GrayImage, radius: u32, offset: i32) -> GrayImage {
    let means = LocalMean::new(gray);
    ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
        let value = gray.get_pixel(x, y).0[0] as f64;
        if value < means.mean(x, y, radius) - offset as f64 {
            Luma([255u8])
        } else {
            Luma([0u8])
        }
    })
}

/// Box means over a grayscale image, backed by a summed-area table.
pub(crate) struct LocalMean {
    table: Vec<u64>,
    width: u32,
    height: u32,
}

impl LocalMean {
    pub(crate) fn new(gray: &GrayImage) -> Self {
        let (w, h) = gray.dimensions();
        let stride = (w + 1) as usize;
        let mut table = vec![0u64; stride * (h + 1) as usize];

        for y in 0..h {
            let mut row_sum: u64 = 0;
            for x in 0..w {
                row_sum += gray.get_pixel(x, y).0[0] as u64;
                let idx = (y + 1) as usize * stride + (x + 1) as usize;
                let above = y as usize * stride + (x + 1) as usize;
                table[idx] = row_sum + table[above];
            }
        }

        Self {
            table,
            width: w,
            height: h,
        }
    }

    /// Mean of the square of `radius` around (`cx`, `cy`), clamped to bounds.
    pub(crate) fn mean(&self, cx: u32, cy: u32, radius: u32) -> f64 {
        let stride = (self.width + 1) as usize;

        let x1 = cx.saturating_sub(radius) as usize;
        let y1 = cy.saturating_sub(radius) as usize;
        let x2 = (cx as usize + radius as usize + 1).min(self.width as usize);
        let y2 = (cy as usize + radius as usize + 1).min(self.height as usize);

        let area = ((x2 - x1) * (y2 - y1)) as f64;
        if area == 0.0 {
            return 0.0;
        }

        // S = I[y2][x2] - I[y1][x2] - I[y2][x1] + I[y1][x1]
        let sum = self.table[y2 * stride + x2] as f64
            - self.table[y1 * stride + x2] as f64
            - self.table[y2 * stride + x1] as f64
            + self.table[y1 * stride + x1] as f64;

        sum / area
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;
    use imageproc::drawing::draw_filled_circle_mut;

    #[test]
    fn local_mean_matches_brute_force() {
        let gray = GrayImage::from_fn(9, 7, |x, y| Luma([(x * 13 + y * 29) as u8]));
        let means = LocalMean::new(&gray);

        let brute = |cx: u32, cy: u32, r: u32| {
            let mut sum = 0.0;
            let mut n = 0.0;
            for y in cy.saturating_sub(r)..=(cy + r).min(6) {
                for x in cx.saturating_sub(r)..=(cx + r).min(8) {
                    sum += gray.get_pixel(x, y).0[0] as f64;
                    n += 1.0;
                }
            }
            sum / n
        };

        for &(cx, cy, r) in &[(0, 0, 1), (4, 3, 2), (8, 6, 3), (2, 5, 0)] {
            assert!((means.mean(cx, cy, r) - brute(cx, cy, r)).abs() < 1e-9);
        }
    }

    #[test]
    fn blank_paper_has_no_ink() {
        let sheet = RgbImage::from_pixel(120, 140, Rgb([235, 235, 235]));
        let mask = Binarizer::new(BinarizeConfig::default()).binarize(&sheet);
        assert_eq!(mask.dimensions(), (120, 140));
        assert!(mask.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn filled_bubble_becomes_ink() {
        let mut sheet = RgbImage::from_pixel(120, 140, Rgb([235, 235, 235]));
        draw_filled_circle_mut(&mut sheet, (60, 70), 12, Rgb([25, 25, 25]));

        let mask = Binarizer::new(BinarizeConfig::default()).binarize(&sheet);
        let ink = |x: u32, y: u32| mask.get_pixel(x, y).0[0] == 255;

        // The rim of the bubble is ink.
        assert!((48..=54).any(|x| ink(x, 70)), "no ink on the left rim");
        // Paper far from the bubble is not.
        assert!(!ink(10, 10));
        assert!(!ink(110, 130));
    }

    #[test]
    fn threshold_is_inverted() {
        let mut gray = GrayImage::from_pixel(21, 21, Luma([200]));
        gray.put_pixel(10, 10, Luma([20]));
        let mask = threshold_below_local_mean(&gray, 5, 2);
        assert_eq!(mask.get_pixel(10, 10).0[0], 255);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        // A bright pixel next to the dark one sits above the local mean.
        assert_eq!(mask.get_pixel(11, 10).0[0], 0);
    }
}
