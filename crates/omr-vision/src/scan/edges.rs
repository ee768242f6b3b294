// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Edge extraction — grayscale, Gaussian smoothing and Canny on the resized
// photo, with an optional dilation for outlines broken by poor lighting.

use image::{GrayImage, RgbImage};
use imageproc::distance_transform::Norm;
use imageproc::edges::canny;
use imageproc::filter::gaussian_blur_f32;
use imageproc::morphology::dilate;
use omr_core::config::EdgeConfig;
use tracing::{debug, instrument};

/// Turns a canonical-size photo into a binary edge map (255 = edge).
#[derive(Debug, Clone)]
pub struct EdgeExtractor {
    config: EdgeConfig,
}

impl EdgeExtractor {
    pub fn new(config: EdgeConfig) -> Self {
        Self { config }
    }

    #[instrument(skip_all, fields(width = photo.width(), height = photo.height()))]
    pub fn extract(&self, photo: &RgbImage) -> GrayImage {
        let gray = image::imageops::grayscale(photo);

        let smoothed = if self.config.blur_sigma > 0.0 {
            gaussian_blur_f32(&gray, self.config.blur_sigma)
        } else {
            gray
        };

        let edges = canny(&smoothed, self.config.canny_low, self.config.canny_high);

        let edges = if self.config.close_radius > 0 {
            dilate(&edges, Norm::LInf, self.config.close_radius)
        } else {
            edges
        };

        debug!(
            edge_pixels = edges.pixels().filter(|p| p.0[0] > 0).count(),
            "Edge map computed"
        );
        edges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sheet_on_background() -> RgbImage {
        let mut img = RgbImage::from_pixel(200, 240, Rgb([30, 30, 30]));
        for y in 40..200 {
            for x in 50..150 {
                img.put_pixel(x, y, Rgb([240, 240, 240]));
            }
        }
        img
    }

    #[test]
    fn blank_photo_has_no_edges() {
        let photo = RgbImage::from_pixel(120, 140, Rgb([200, 200, 200]));
        let edges = EdgeExtractor::new(EdgeConfig::default()).extract(&photo);
        assert_eq!(edges.dimensions(), (120, 140));
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn sheet_outline_is_found() {
        let edges = EdgeExtractor::new(EdgeConfig::default()).extract(&sheet_on_background());

        // Along the left side of the sheet.
        assert!((47..=53).any(|x| edges.get_pixel(x, 120).0[0] == 255));
        // Nothing deep inside the sheet or far out in the background.
        assert_eq!(edges.get_pixel(100, 120).0[0], 0);
        assert_eq!(edges.get_pixel(10, 10).0[0], 0);
    }

    #[test]
    fn closing_thickens_the_outline() {
        let closing = EdgeConfig {
            close_radius: 1,
            ..EdgeConfig::default()
        };
        let photo = sheet_on_background();
        let count = |img: &GrayImage| img.pixels().filter(|p| p.0[0] > 0).count();

        let plain = EdgeExtractor::new(EdgeConfig::default()).extract(&photo);
        let closed = EdgeExtractor::new(closing).extract(&photo);
        assert!(count(&closed) > count(&plain));
    }

    #[test]
    fn default_outline_stays_on_the_sheet_boundary() {
        let edges = EdgeExtractor::new(EdgeConfig::default()).extract(&sheet_on_background());

        // The sheet spans x 50..150. Without dilation the outline never
        // reaches the second background pixel on either side.
        for y in 60..180 {
            assert_eq!(edges.get_pixel(48, y).0[0], 0, "left at y={y}");
            assert_eq!(edges.get_pixel(151, y).0[0], 0, "right at y={y}");
        }
    }
}
