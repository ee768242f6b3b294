// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Student identity fields printed as bubble rows in the sheet header
// (index number, department code, ...). Each field is a fixed band of the
// rectified sheet, given as fractions of its height and width.

use image::GrayImage;
use image::imageops::crop_imm;
use omr_core::config::StudentInfoConfig;
use omr_core::types::StudentInfo;
use tracing::{debug, instrument};

use crate::grid::segment::split_lengths;

/// How marked bubble positions turn into characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Bubble `i` is the digit `i % 10`.
    Numeric,
    /// Bubble `i` is the letter `'A' + i`.
    Alphabetic,
}

/// One header field: a band of bubbles laid out left to right.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldRegion {
    pub name: &'static str,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
    pub bubbles: u32,
    pub kind: FieldKind,
}

impl FieldRegion {
    /// Pixel bounds `(x, y, width, height)` on a `width` x `height` sheet.
    pub fn bounds(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let scale = |fraction: f32, size: u32| ((fraction * size as f32) as u32).min(size);
        let (x0, x1) = (scale(self.left, width), scale(self.right, width));
        let (y0, y1) = (scale(self.top, height), scale(self.bottom, height));
        (x0, y0, x1.saturating_sub(x0), y1.saturating_sub(y0))
    }
}

pub const STUDENT_FIELDS: [FieldRegion; 6] = [
    FieldRegion {
        name: "index_number",
        top: 0.05,
        bottom: 0.15,
        left: 0.10,
        right: 0.40,
        bubbles: 10,
        kind: FieldKind::Numeric,
    },
    FieldRegion {
        name: "department_code",
        top: 0.05,
        bottom: 0.15,
        left: 0.45,
        right: 0.60,
        bubbles: 3,
        kind: FieldKind::Alphabetic,
    },
    FieldRegion {
        name: "academic_year",
        top: 0.05,
        bottom: 0.15,
        left: 0.65,
        right: 0.80,
        bubbles: 4,
        kind: FieldKind::Numeric,
    },
    FieldRegion {
        name: "year_of_study",
        top: 0.15,
        bottom: 0.25,
        left: 0.10,
        right: 0.30,
        bubbles: 1,
        kind: FieldKind::Numeric,
    },
    FieldRegion {
        name: "course_code",
        top: 0.15,
        bottom: 0.25,
        left: 0.35,
        right: 0.60,
        bubbles: 6,
        kind: FieldKind::Alphabetic,
    },
    FieldRegion {
        name: "semester",
        top: 0.15,
        bottom: 0.25,
        left: 0.65,
        right: 0.80,
        bubbles: 1,
        kind: FieldKind::Numeric,
    },
];

/// Turn marked bubble positions (ascending) into the field's text.
pub fn decode_field(kind: FieldKind, marked: &[usize]) -> String {
    marked
        .iter()
        .filter_map(|&i| match kind {
            FieldKind::Numeric => char::from_digit((i % 10) as u32, 10),
            FieldKind::Alphabetic => u8::try_from(i)
                .ok()
                .and_then(|i| b'A'.checked_add(i))
                .map(char::from),
        })
        .collect()
}

/// Reads every field in `STUDENT_FIELDS` from an ink mask.
#[derive(Debug, Clone)]
pub struct StudentInfoDecoder {
    mark_threshold: u32,
}

impl StudentInfoDecoder {
    pub fn new(config: &StudentInfoConfig) -> Self {
        Self {
            mark_threshold: config.mark_threshold,
        }
    }

    /// Positions of the bubbles in `field` holding more than the threshold
    /// of ink pixels.
    pub fn marked_bubbles(&self, mask: &GrayImage, field: &FieldRegion) -> Vec<usize> {
        let (x, y, width, height) = field.bounds(mask.width(), mask.height());
        if width == 0 || height == 0 {
            return Vec::new();
        }

        let mut marked = Vec::new();
        let mut left = x;
        for (i, bubble_w) in split_lengths(width, field.bubbles).into_iter().enumerate() {
            let ink = crop_imm(mask, left, y, bubble_w, height)
                .to_image()
                .pixels()
                .filter(|p| p.0[0] > 0)
                .count();
            if ink as u64 > self.mark_threshold as u64 {
                marked.push(i);
            }
            left += bubble_w;
        }
        marked
    }

    #[instrument(skip_all)]
    pub fn decode(&self, mask: &GrayImage) -> StudentInfo {
        let mut info = StudentInfo::default();
        for field in &STUDENT_FIELDS {
            let marked = self.marked_bubbles(mask, field);
            let value = decode_field(field.kind, &marked);
            debug!(field = field.name, ?marked, %value, "Student field decoded");
            info.insert(field.name, value);
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn fill(mask: &mut GrayImage, x: u32, y: u32, w: u32, h: u32) {
        for yy in y..y + h {
            for xx in x..x + w {
                mask.put_pixel(xx, yy, Luma([255]));
            }
        }
    }

    #[test]
    fn numeric_and_alphabetic_decoding() {
        assert_eq!(decode_field(FieldKind::Numeric, &[0, 3, 9]), "039");
        assert_eq!(decode_field(FieldKind::Numeric, &[12]), "2");
        assert_eq!(decode_field(FieldKind::Alphabetic, &[0, 2, 5]), "ACF");
        assert_eq!(decode_field(FieldKind::Alphabetic, &[]), "");
    }

    #[test]
    fn bounds_follow_fractions() {
        let (x, y, w, h) = STUDENT_FIELDS[0].bounds(600, 700);
        assert_eq!((x, y, w, h), (60, 35, 180, 70));
    }

    #[test]
    fn decodes_marked_header_bubbles() {
        let mut mask = GrayImage::new(600, 700);
        // index_number: x 60..240 in 18 px bubbles; mark 3 and 7.
        fill(&mut mask, 60 + 3 * 18 + 2, 40, 14, 60);
        fill(&mut mask, 60 + 7 * 18 + 2, 40, 14, 60);
        // department_code: three bubbles of about 30 px from x 270; mark B.
        fill(&mut mask, 270 + 30 + 5, 40, 20, 60);
        // semester: a single bubble, roughly x 390..480 and y 105..175.
        fill(&mut mask, 400, 110, 60, 50);
        // A speck that must not count.
        fill(&mut mask, 62, 110, 3, 3);

        let decoder = StudentInfoDecoder::new(&StudentInfoConfig::default());
        let info = decoder.decode(&mask);

        assert_eq!(info.get("index_number"), Some("37"));
        assert_eq!(info.get("department_code"), Some("B"));
        assert_eq!(info.get("semester"), Some("0"));
        assert_eq!(info.get("year_of_study"), Some(""));
        assert_eq!(info.get("course_code"), Some(""));
        assert_eq!(info.iter().count(), STUDENT_FIELDS.len());
    }
}
