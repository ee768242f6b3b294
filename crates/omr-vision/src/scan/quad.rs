// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet boundary search — external contours of the edge map, simplified with
// Douglas–Peucker, keeping the largest one that reduces to four vertices.
// Corners are then refined as intersections of lines fitted to each side and
// pulled inward off the traced edge pixels.

use image::GrayImage;
use imageproc::contours::{BorderType, Contour, find_contours};
use imageproc::geometry::{approximate_polygon_dp, arc_length};
use imageproc::point::Point as PixelPoint;
use omr_core::config::QuadConfig;
use omr_core::error::{OmrError, Result};
use omr_core::types::Point;
use tracing::{debug, info, instrument, warn};

/// A four-sided contour, corners in contour order.
#[derive(Debug, Clone, PartialEq)]
pub struct QuadCandidate {
    pub corners: [Point; 4],
    /// Area enclosed by the original contour (not the simplified polygon).
    pub area: f64,
}

/// Finds the answer sheet outline in an edge map.
#[derive(Debug, Clone)]
pub struct QuadFinder {
    config: QuadConfig,
}

impl QuadFinder {
    pub fn new(config: QuadConfig) -> Self {
        Self { config }
    }

    /// Corners of the largest four-sided external contour, unordered.
    #[instrument(skip_all)]
    pub fn find(&self, edges: &GrayImage) -> Result<[Point; 4]> {
        match self.candidates(edges).into_iter().next() {
            Some(best) => {
                info!(area = best.area, "Sheet boundary found");
                Ok(best.corners)
            }
            None => {
                warn!("No four-sided contour large enough for a sheet");
                Err(OmrError::NoBoundaryFound)
            }
        }
    }

    /// Every qualifying four-sided contour, largest area first.
    pub fn candidates(&self, edges: &GrayImage) -> Vec<QuadCandidate> {
        let contours: Vec<Contour<i32>> = find_contours(edges);

        let mut candidates: Vec<QuadCandidate> = contours
            .iter()
            .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
            .filter_map(|c| self.as_quad(&c.points))
            .collect();

        candidates.sort_by(|a, b| b.area.total_cmp(&a.area));
        debug!(
            contours = contours.len(),
            quads = candidates.len(),
            "Contour search complete"
        );
        candidates
    }

    fn as_quad(&self, points: &[PixelPoint<i32>]) -> Option<QuadCandidate> {
        if points.len() < 4 {
            return None;
        }
        let area = polygon_area(points);
        if area <= self.config.min_area {
            return None;
        }

        let epsilon = self.config.approx_ratio * arc_length(points, true);
        let polygon = approximate_closed_polygon(points, epsilon);
        if polygon.len() != 4 {
            return None;
        }

        let vertices: [(f64, f64); 4] =
            std::array::from_fn(|i| (polygon[i].x as f64, polygon[i].y as f64));
        let refined = refine_corners(points, vertices, epsilon);
        let corners = inset_corners(refined, self.config.outline_inset);
        Some(QuadCandidate {
            corners: corners.map(|(x, y)| Point::new(x as f32, y as f32)),
            area,
        })
    }
}

/// A straight line through `point` along the unit vector `dir`.
#[derive(Debug, Clone, Copy)]
struct Line {
    point: (f64, f64),
    dir: (f64, f64),
}

impl Line {
    /// Total least squares fit. `None` for fewer than two distinct points.
    fn fit(points: &[(f64, f64)]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let n = points.len() as f64;
        let mx = points.iter().map(|p| p.0).sum::<f64>() / n;
        let my = points.iter().map(|p| p.1).sum::<f64>() / n;
        let (mut sxx, mut syy, mut sxy) = (0.0, 0.0, 0.0);
        for &(x, y) in points {
            sxx += (x - mx) * (x - mx);
            syy += (y - my) * (y - my);
            sxy += (x - mx) * (y - my);
        }
        if sxx + syy < 1e-9 {
            return None;
        }
        let theta = 0.5 * (2.0 * sxy).atan2(sxx - syy);
        Some(Self {
            point: (mx, my),
            dir: (theta.cos(), theta.sin()),
        })
    }

    fn intersect(&self, other: &Line) -> Option<(f64, f64)> {
        let cross = self.dir.0 * other.dir.1 - self.dir.1 * other.dir.0;
        if cross.abs() < 1e-9 {
            return None;
        }
        let (dx, dy) = (other.point.0 - self.point.0, other.point.1 - self.point.1);
        let t = (dx * other.dir.1 - dy * other.dir.0) / cross;
        Some((self.point.0 + t * self.dir.0, self.point.1 + t * self.dir.1))
    }
}

fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    (a.0 - b.0).hypot(a.1 - b.1)
}

fn segment_distance(p: (f64, f64), a: (f64, f64), b: (f64, f64)) -> f64 {
    let (vx, vy) = (b.0 - a.0, b.1 - a.1);
    let len_sq = vx * vx + vy * vy;
    if len_sq == 0.0 {
        return distance(p, a);
    }
    let t = (((p.0 - a.0) * vx + (p.1 - a.1) * vy) / len_sq).clamp(0.0, 1.0);
    distance(p, (a.0 + t * vx, a.1 + t * vy))
}

/// Move each polygon vertex to the intersection of the lines fitted to the
/// contour points of its two sides.
///
/// Points within a tenth of a side's length of either end are left out of
/// that side's fit, so rounded or clipped corners do not bend the lines. A
/// vertex keeps its position when a fit fails or the intersection lands more
/// than `tolerance` away from it.
fn refine_corners(
    points: &[PixelPoint<i32>],
    vertices: [(f64, f64); 4],
    tolerance: f64,
) -> [(f64, f64); 4] {
    let mut sides: [Vec<(f64, f64)>; 4] = Default::default();
    for p in points {
        let q = (p.x as f64, p.y as f64);
        let (side, gap) = (0..4)
            .map(|i| (i, segment_distance(q, vertices[i], vertices[(i + 1) % 4])))
            .fold((0, f64::INFINITY), |best, cur| if cur.1 < best.1 { cur } else { best });
        if gap > tolerance {
            continue;
        }
        let (a, b) = (vertices[side], vertices[(side + 1) % 4]);
        let trim = 0.1 * distance(a, b);
        if distance(q, a) < trim || distance(q, b) < trim {
            continue;
        }
        sides[side].push(q);
    }

    let lines: Vec<Option<Line>> = sides.iter().map(|s| Line::fit(s)).collect();
    std::array::from_fn(|i| {
        let (before, after) = (&lines[(i + 3) % 4], &lines[i]);
        match (before, after) {
            (Some(l1), Some(l2)) => match l1.intersect(l2) {
                Some(corner) if distance(corner, vertices[i]) <= tolerance => corner,
                _ => vertices[i],
            },
            _ => vertices[i],
        }
    })
}

/// Move every corner `by` pixels towards each of its two neighbours.
fn inset_corners(corners: [(f64, f64); 4], by: f64) -> [(f64, f64); 4] {
    if by <= 0.0 {
        return corners;
    }
    std::array::from_fn(|i| {
        let corner = corners[i];
        let mut moved = corner;
        for neighbour in [corners[(i + 3) % 4], corners[(i + 1) % 4]] {
            let len = distance(corner, neighbour);
            if len > 0.0 {
                moved.0 += by * (neighbour.0 - corner.0) / len;
                moved.1 += by * (neighbour.1 - corner.1) / len;
            }
        }
        moved
    })
}

/// Index of the ring point farthest from `points[from]`, first on ties.
fn farthest_from(points: &[PixelPoint<i32>], from: usize) -> usize {
    let origin = points[from];
    let squared_distance = |p: &PixelPoint<i32>| {
        let dx = (p.x - origin.x) as i64;
        let dy = (p.y - origin.y) as i64;
        dx * dx + dy * dy
    };
    let mut far = from;
    for (i, p) in points.iter().enumerate() {
        if squared_distance(p) > squared_distance(&points[far]) {
            far = i;
        }
    }
    far
}

/// Douglas–Peucker on a closed curve.
///
/// The ring is cut at a pair of mutually distant points, found by hopping to
/// the farthest point three times from the first one. Where the contour
/// happens to start therefore does not become a vertex. Each half is
/// simplified as an open chain and the halves are joined again.
fn approximate_closed_polygon(
    points: &[PixelPoint<i32>],
    epsilon: f64,
) -> Vec<PixelPoint<i32>> {
    if points.len() < 3 || epsilon <= 0.0 {
        return points.to_vec();
    }

    let (mut first, mut second) = (0, farthest_from(points, 0));
    for _ in 0..2 {
        first = second;
        second = farthest_from(points, first);
    }
    if first == second {
        return vec![points[first]];
    }

    let n = points.len();
    let ring: Vec<PixelPoint<i32>> = points[first..]
        .iter()
        .chain(&points[..first])
        .copied()
        .collect();
    let far = (second + n - first) % n;
    let start = ring[0];
    let points = ring.as_slice();

    let mut polygon = approximate_polygon_dp(&points[..=far], epsilon, false);
    // The far point opens the second chain.
    polygon.pop();

    let mut closing: Vec<PixelPoint<i32>> = points[far..].to_vec();
    closing.push(start);
    let mut tail = approximate_polygon_dp(&closing, epsilon, false);
    // The start point is already at the head of the polygon.
    tail.pop();

    polygon.extend(tail);
    polygon.dedup();
    polygon
}

/// Enclosed area of a closed pixel contour (shoelace formula).
fn polygon_area(points: &[PixelPoint<i32>]) -> f64 {
    let n = points.len();
    let mut area = 0.0f64;
    for i in 0..n {
        let j = (i + 1) % n;
        area += points[i].x as f64 * points[j].y as f64;
        area -= points[j].x as f64 * points[i].y as f64;
    }
    area.abs() / 2.0
}
