// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Perspective rectification — order the four sheet corners and warp the photo
// to a fixed top-down rectangle with a projective transform.

use image::{Rgb, RgbImage};
use imageproc::geometric_transformations::{Interpolation, Projection, warp_into};
use omr_core::config::RectifyConfig;
use omr_core::error::{OmrError, Result};
use omr_core::types::{Point, Quadrilateral};
use tracing::{debug, info, instrument, warn};

/// Corners closer than this (in pixels) count as the same point.
const COINCIDENT_EPSILON: f32 = 0.5;

/// Order four unordered corners as top-left, top-right, bottom-left,
/// bottom-right.
///
/// Top-left has the smallest `x + y` and bottom-right the largest. Top-right
/// has the smallest `y - x` and bottom-left the largest. Ties resolve to the
/// first point. This is a heuristic: under strong rotation (around 45°) two
/// roles can land on the same point, which is reported as
/// `DegenerateQuadrilateral`.
pub fn order_corners(points: [Point; 4]) -> Result<Quadrilateral> {
    let sum = |p: &Point| p.x + p.y;
    let diff = |p: &Point| p.y - p.x;

    let tl = extreme_index(&points, sum, false);
    let br = extreme_index(&points, sum, true);
    let tr = extreme_index(&points, diff, false);
    let bl = extreme_index(&points, diff, true);

    let picked = [tl, tr, bl, br];
    for i in 0..picked.len() {
        for j in (i + 1)..picked.len() {
            let (a, b) = (points[picked[i]], points[picked[j]]);
            let coincident =
                (a.x - b.x).abs() < COINCIDENT_EPSILON && (a.y - b.y).abs() < COINCIDENT_EPSILON;
            if picked[i] == picked[j] || coincident {
                debug!(?points, "Corner ordering collapsed two corners");
                return Err(OmrError::DegenerateQuadrilateral);
            }
        }
    }

    Ok(Quadrilateral {
        top_left: points[tl],
        top_right: points[tr],
        bottom_left: points[bl],
        bottom_right: points[br],
    })
}

/// Index of the smallest (or largest) key, first occurrence on ties.
fn extreme_index(points: &[Point; 4], key: impl Fn(&Point) -> f32, largest: bool) -> usize {
    let mut best = 0;
    for i in 1..points.len() {
        let (candidate, current) = (key(&points[i]), key(&points[best]));
        if (largest && candidate > current) || (!largest && candidate < current) {
            best = i;
        }
    }
    best
}

/// Warps the detected sheet to a `width` x `height` top-down image.
#[derive(Debug, Clone)]
pub struct Rectifier {
    config: RectifyConfig,
}

impl Rectifier {
    pub fn new(config: RectifyConfig) -> Self {
        Self { config }
    }

    /// Output rectangle corners in `Quadrilateral::corners` order.
    pub fn target_corners(&self) -> [(f32, f32); 4] {
        let (w, h) = (self.config.width as f32, self.config.height as f32);
        [(0.0, 0.0), (w, 0.0), (0.0, h), (w, h)]
    }

    /// Projective transform from the quadrilateral to the output rectangle.
    pub fn projection(&self, quad: &Quadrilateral) -> Result<Projection> {
        let corners = quad.corners();
        let src = corners.map(|p| (p.x, p.y));
        Projection::from_control_points(src, self.target_corners()).ok_or_else(|| {
            warn!(?quad, "No projective transform fits these corners");
            OmrError::DegenerateQuadrilateral
        })
    }

    /// Warp the photo so the quadrilateral fills the output image.
    ///
    /// Output pixels that map outside the photo are white.
    #[instrument(skip_all, fields(width = self.config.width, height = self.config.height))]
    pub fn rectify(&self, photo: &RgbImage, quad: &Quadrilateral) -> Result<RgbImage> {
        if quad.area() < 1.0 {
            return Err(OmrError::DegenerateQuadrilateral);
        }
        let projection = self.projection(quad)?;

        let mut output = RgbImage::new(self.config.width, self.config.height);
        warp_into(
            photo,
            &projection,
            Interpolation::Bilinear,
            Rgb([255u8, 255, 255]),
            &mut output,
        );

        info!("Sheet rectified");
        Ok(output)
    }
}
