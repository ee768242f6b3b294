// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Contrast-limited adaptive histogram equalization (CLAHE).
//
// The image is split into a grid of tiles. Each tile gets its own equalization
// lookup table built from a clipped histogram, and every output pixel blends
// the tables of the four nearest tile centres bilinearly so tile seams do not
// show.

use image::{GrayImage, ImageBuffer, Luma};

use crate::grid::segment::split_lengths;

/// Equalize `gray` with `tiles` x `tiles` tiles and the given clip limit.
///
/// `clip_limit` is relative to the uniform bin height (`area / 256`); `0`
/// disables clipping, which degrades to plain per-tile equalization.
pub fn equalize_adaptive(gray: &GrayImage, clip_limit: f32, tiles: u32) -> GrayImage {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        return gray.clone();
    }
    let tiles_x = tiles.clamp(1, w);
    let tiles_y = tiles.clamp(1, h);

    let tile_widths = split_lengths(w, tiles_x);
    let tile_heights = split_lengths(h, tiles_y);
    let x_starts = offsets(&tile_widths);
    let y_starts = offsets(&tile_heights);

    let mut luts = Vec::with_capacity((tiles_x * tiles_y) as usize);
    for (ty, &th) in tile_heights.iter().enumerate() {
        for (tx, &tw) in tile_widths.iter().enumerate() {
            luts.push(tile_lut(gray, x_starts[tx], y_starts[ty], tw, th, clip_limit));
        }
    }

    let centers_x = centers(&x_starts, &tile_widths);
    let centers_y = centers(&y_starts, &tile_heights);
    let stride = tiles_x as usize;

    ImageBuffer::from_fn(w, h, |x, y| {
        let value = gray.get_pixel(x, y).0[0] as usize;
        let (left, right, wx) = neighbours(x as f32 + 0.5, &centers_x);
        let (top, bottom, wy) = neighbours(y as f32 + 0.5, &centers_y);
        let lut = |tx: usize, ty: usize| luts[ty * stride + tx][value] as f32;

        let upper = lut(left, top) * (1.0 - wx) + lut(right, top) * wx;
        let lower = lut(left, bottom) * (1.0 - wx) + lut(right, bottom) * wx;
        let blended = upper * (1.0 - wy) + lower * wy;
        Luma([blended.round().clamp(0.0, 255.0) as u8])
    })
}

/// Equalization table for one tile.
fn tile_lut(gray: &GrayImage, x0: u32, y0: u32, tw: u32, th: u32, clip_limit: f32) -> [u8; 256] {
    let mut histogram = [0u32; 256];
    for y in y0..y0 + th {
        for x in x0..x0 + tw {
            histogram[gray.get_pixel(x, y).0[0] as usize] += 1;
        }
    }
    let area = tw * th;

    if clip_limit > 0.0 {
        let limit = ((clip_limit * area as f32 / 256.0) as u32).max(1);
        let mut excess = 0u32;
        for bin in histogram.iter_mut() {
            if *bin > limit {
                excess += *bin - limit;
                *bin = limit;
            }
        }
        // Spread the clipped counts evenly; leftovers go to the low bins.
        let share = excess / 256;
        let leftover = excess % 256;
        for (i, bin) in histogram.iter_mut().enumerate() {
            *bin += share + u32::from((i as u32) < leftover);
        }
    }

    let scale = 255.0 / area as f32;
    let mut lut = [0u8; 256];
    let mut cdf = 0u32;
    for (i, &count) in histogram.iter().enumerate() {
        cdf += count;
        lut[i] = (cdf as f32 * scale).round().min(255.0) as u8;
    }
    lut
}

fn offsets(lengths: &[u32]) -> Vec<u32> {
    lengths
        .iter()
        .scan(0u32, |start, &len| {
            let current = *start;
            *start += len;
            Some(current)
        })
        .collect()
}

fn centers(starts: &[u32], lengths: &[u32]) -> Vec<f32> {
    starts
        .iter()
        .zip(lengths)
        .map(|(&s, &len)| s as f32 + len as f32 / 2.0)
        .collect()
}

/// The two tile centres around `pos` and the weight of the second one.
/// Positions outside the outermost centres clamp to the edge tile.
fn neighbours(pos: f32, centers: &[f32]) -> (usize, usize, f32) {
    let last = centers.len() - 1;
    if pos <= centers[0] {
        return (0, 0, 0.0);
    }
    if pos >= centers[last] {
        return (last, last, 0.0);
    }
    let i = centers.iter().rposition(|&c| c <= pos).unwrap_or(0).min(last - 1);
    let weight = (pos - centers[i]) / (centers[i + 1] - centers[i]);
    (i, i + 1, weight)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spread(img: &GrayImage) -> u8 {
        let min = img.pixels().map(|p| p.0[0]).min().unwrap_or(0);
        let max = img.pixels().map(|p| p.0[0]).max().unwrap_or(0);
        max - min
    }

    #[test]
    fn uniform_image_stays_uniform() {
        let gray = GrayImage::from_pixel(64, 48, Luma([150]));
        let out = equalize_adaptive(&gray, 2.0, 8);
        assert_eq!(out.dimensions(), (64, 48));
        assert_eq!(spread(&out), 0);
    }

    #[test]
    fn low_contrast_is_stretched() {
        let gray = GrayImage::from_fn(80, 80, |x, _| Luma([100 + (x / 8) as u8]));
        assert_eq!(spread(&gray), 9);
        let out = equalize_adaptive(&gray, 2.0, 4);
        assert!(spread(&out) > 9, "spread {}", spread(&out));
    }

    #[test]
    fn dark_marks_stay_darker_than_paper() {
        let mut gray = GrayImage::from_pixel(64, 64, Luma([200]));
        for y in 28..36 {
            for x in 28..36 {
                gray.put_pixel(x, y, Luma([40]));
            }
        }
        let out = equalize_adaptive(&gray, 2.0, 8);
        assert!(out.get_pixel(31, 31).0[0] < out.get_pixel(5, 5).0[0]);
        assert!(out.get_pixel(31, 31).0[0] < out.get_pixel(40, 31).0[0]);
    }

    #[test]
    fn more_tiles_than_pixels_is_clamped() {
        let gray = GrayImage::from_fn(3, 2, |x, y| Luma([(x * 40 + y * 10) as u8]));
        let out = equalize_adaptive(&gray, 2.0, 8);
        assert_eq!(out.dimensions(), (3, 2));
    }

    #[test]
    fn neighbours_clamp_at_the_edges() {
        let centers = [5.0, 15.0, 25.0];
        assert_eq!(neighbours(1.0, &centers), (0, 0, 0.0));
        assert_eq!(neighbours(30.0, &centers), (2, 2, 0.0));
        let (a, b, w) = neighbours(10.0, &centers);
        assert_eq!((a, b), (0, 1));
        assert!((w - 0.5).abs() < 1e-6);
    }
}
