// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Grader configuration. Every threshold the pipeline uses lives here so a
// deployment can retune for its lighting and paper without code changes.
// Defaults reproduce the reference sheet format (20 questions × 5 choices on a
// 600×700 canonical sheet).

use serde::{Deserialize, Serialize};

use crate::error::{OmrError, Result};
use crate::types::CHOICES_PER_QUESTION;

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraderConfig {
    pub edges: EdgeConfig,
    pub quad: QuadConfig,
    pub rectify: RectifyConfig,
    pub binarize: BinarizeConfig,
    pub grid: GridConfig,
    pub classifier: ClassifierConfig,
    pub student_info: StudentInfoConfig,
}

/// Edge extraction on the resized raw photo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EdgeConfig {
    /// Photos are resized to exactly this size before edge detection.
    pub input_width: u32,
    pub input_height: u32,
    /// Gaussian smoothing applied before Canny.
    pub blur_sigma: f32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Dilation radius for closing gaps in the edge map. `0` (the default)
    /// leaves the Canny output as is; any dilation moves the traced outline
    /// into the background by the same number of pixels.
    pub close_radius: u8,
}

impl Default for EdgeConfig {
    fn default() -> Self {
        Self {
            input_width: 600,
            input_height: 700,
            blur_sigma: 1.0,
            canny_low: 10.0,
            canny_high: 50.0,
            close_radius: 0,
        }
    }
}

/// Sheet boundary search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuadConfig {
    /// Contours enclosing less than this many square pixels are noise.
    pub min_area: f64,
    /// Polygon approximation tolerance as a fraction of the contour perimeter.
    pub approx_ratio: f64,
    /// Pixels each corner moves inward along both of its sides. The traced
    /// contour runs along the outer edge pixels, which belong to the
    /// background as often as to the sheet.
    pub outline_inset: f64,
}

impl Default for QuadConfig {
    fn default() -> Self {
        Self {
            min_area: 1000.0,
            approx_ratio: 0.02,
            outline_inset: 1.0,
        }
    }
}

/// Size of the rectified, top-down sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RectifyConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for RectifyConfig {
    fn default() -> Self {
        Self {
            width: 600,
            height: 700,
        }
    }
}

/// Ink-mask binarization of the rectified sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinarizeConfig {
    /// CLAHE histogram clip limit, relative to the uniform bin height.
    pub clahe_clip_limit: f32,
    /// CLAHE tile grid (tiles per axis).
    pub clahe_tiles: u32,
    pub blur_sigma: f32,
    /// Local-mean window radius for adaptive thresholding.
    pub block_radius: u32,
    /// A pixel is ink when darker than its local mean minus this offset.
    pub offset: i32,
}

impl Default for BinarizeConfig {
    fn default() -> Self {
        Self {
            clahe_clip_limit: 2.0,
            clahe_tiles: 8,
            blur_sigma: 0.8,
            block_radius: 5,
            offset: 2,
        }
    }
}

/// Exam layout: one row per question, one column per choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub rows: u32,
    pub cols: u32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            cols: CHOICES_PER_QUESTION as u32,
        }
    }
}

/// Per-question mark decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// The winning count must exceed this fraction of the question's maximum.
    pub ratio: f64,
    /// The winning count must exceed the runner-up by this factor.
    pub margin: f64,
    /// Denoising blur applied to each cell before counting.
    pub cell_blur_sigma: f32,
    /// Local-mean window radius for the per-cell threshold.
    pub cell_block_radius: u32,
    /// Blurred values below this never count as ink.
    pub cell_floor: u8,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            ratio: 0.3,
            margin: 1.2,
            cell_blur_sigma: 0.8,
            cell_block_radius: 5,
            cell_floor: 128,
        }
    }
}

/// Header-field decoding (index number, department code, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudentInfoConfig {
    pub enabled: bool,
    /// Minimum ink pixels for a header bubble to count as marked.
    pub mark_threshold: u32,
}

impl Default for StudentInfoConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            mark_threshold: 100,
        }
    }
}

impl GraderConfig {
    /// Load a JSON config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let data = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make the pipeline meaningless.
    pub fn validate(&self) -> Result<()> {
        if self.edges.input_width == 0 || self.edges.input_height == 0 {
            return Err(invalid("edges.input_width/input_height must be non-zero"));
        }
        if self.edges.canny_low > self.edges.canny_high {
            return Err(invalid("edges.canny_low must not exceed edges.canny_high"));
        }
        if self.rectify.width == 0 || self.rectify.height == 0 {
            return Err(invalid("rectify.width/height must be non-zero"));
        }
        if self.grid.rows == 0 || self.grid.cols == 0 {
            return Err(invalid("grid.rows/cols must be non-zero"));
        }
        if self.grid.cols as usize > CHOICES_PER_QUESTION {
            return Err(invalid(&format!(
                "grid.cols must be at most {CHOICES_PER_QUESTION}"
            )));
        }
        // Every cell needs at least one pixel of the rectified sheet.
        if self.grid.rows > self.rectify.height || self.grid.cols > self.rectify.width {
            return Err(invalid("grid.rows/cols must not exceed rectify.height/width"));
        }
        if !(0.0..=1.0).contains(&self.classifier.ratio) {
            return Err(invalid("classifier.ratio must lie in [0, 1]"));
        }
        if self.classifier.margin < 1.0 {
            return Err(invalid("classifier.margin must be at least 1.0"));
        }
        if self.binarize.clahe_tiles == 0 {
            return Err(invalid("binarize.clahe_tiles must be non-zero"));
        }
        if self.quad.approx_ratio <= 0.0 {
            return Err(invalid("quad.approx_ratio must be positive"));
        }
        if !(self.quad.outline_inset >= 0.0 && self.quad.outline_inset.is_finite()) {
            return Err(invalid("quad.outline_inset must be a non-negative number"));
        }
        if self.edges.blur_sigma < 0.0
            || self.binarize.blur_sigma < 0.0
            || self.classifier.cell_blur_sigma < 0.0
        {
            return Err(invalid("blur sigmas must not be negative"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> OmrError {
    OmrError::InvalidConfig(reason.to_string())
}
