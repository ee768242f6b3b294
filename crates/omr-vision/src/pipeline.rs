// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// The sheet pipeline: photo → edges → boundary → rectified sheet → ink mask →
// cells → answers. Each stage is a pure function of its input, so one
// pipeline can be shared across threads grading many sheets.

use image::{DynamicImage, GrayImage, RgbImage};
use omr_core::config::GraderConfig;
use omr_core::error::Result;
use omr_core::types::{AnswerVector, Quadrilateral, StudentInfo};
use tracing::{info, instrument};

use crate::grid::{GridSegmenter, MarkClassifier};
use crate::photo::loader::{SheetImage, encode_png};
use crate::scan::{Binarizer, EdgeExtractor, QuadFinder, Rectifier, order_corners};
use crate::student_info::StudentInfoDecoder;

/// Everything a shell may want to show for one processed sheet.
#[derive(Debug, Clone)]
pub struct SheetScan {
    /// Detected boundary in canonical-input coordinates. `None` when the
    /// sheet arrived already rectified.
    pub quad: Option<Quadrilateral>,
    pub rectified: RgbImage,
    pub ink_mask: GrayImage,
    pub answers: AnswerVector,
    /// Ink count per question, per choice.
    pub ink_counts: Vec<Vec<u32>>,
    pub student_info: Option<StudentInfo>,
}

impl SheetScan {
    /// `("Q1", Some('A'))`-style answer labels.
    pub fn answers_by_question(&self) -> Vec<(String, Option<char>)> {
        self.answers.labelled().collect()
    }

    pub fn rectified_png(&self) -> Result<Vec<u8>> {
        encode_png(&DynamicImage::ImageRgb8(self.rectified.clone()))
    }

    pub fn ink_mask_png(&self) -> Result<Vec<u8>> {
        encode_png(&DynamicImage::ImageLuma8(self.ink_mask.clone()))
    }
}

/// All detection stages, configured once.
#[derive(Debug, Clone)]
pub struct SheetPipeline {
    config: GraderConfig,
    edges: EdgeExtractor,
    quads: QuadFinder,
    rectifier: Rectifier,
    binarizer: Binarizer,
    segmenter: GridSegmenter,
    classifier: MarkClassifier,
    student_info: Option<StudentInfoDecoder>,
}

impl SheetPipeline {
    /// Build a pipeline. Fails with `InvalidConfig` on unusable settings.
    pub fn new(config: GraderConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            edges: EdgeExtractor::new(config.edges.clone()),
            quads: QuadFinder::new(config.quad.clone()),
            rectifier: Rectifier::new(config.rectify.clone()),
            binarizer: Binarizer::new(config.binarize.clone()),
            segmenter: GridSegmenter::new(&config.grid),
            classifier: MarkClassifier::new(config.classifier.clone()),
            student_info: config
                .student_info
                .enabled
                .then(|| StudentInfoDecoder::new(&config.student_info)),
            config,
        })
    }

    pub fn config(&self) -> &GraderConfig {
        &self.config
    }

    /// Run every stage on a photo.
    #[instrument(skip_all, fields(width = image.width(), height = image.height()))]
    pub fn process(&self, image: &SheetImage) -> Result<SheetScan> {
        let photo = image.to_canonical(self.config.edges.input_width, self.config.edges.input_height);
        let edge_map = self.edges.extract(&photo);
        let corners = self.quads.find(&edge_map)?;
        let quad = order_corners(corners)?;
        let rectified = self.rectifier.rectify(&photo, &quad)?;

        let mut scan = self.process_rectified(rectified)?;
        scan.quad = Some(quad);
        Ok(scan)
    }

    /// Run the stages after rectification on an already top-down sheet.
    #[instrument(skip_all, fields(width = rectified.width(), height = rectified.height()))]
    pub fn process_rectified(&self, rectified: RgbImage) -> Result<SheetScan> {
        let ink_mask = self.binarizer.binarize(&rectified);
        let student_info = self.student_info.as_ref().map(|d| d.decode(&ink_mask));
        let grid = self.segmenter.segment(&ink_mask)?;
        let (answers, ink_counts) = self.classifier.classify(&grid);

        info!(
            questions = answers.len(),
            answered = answers.answered(),
            "Sheet read"
        );
        Ok(SheetScan {
            quad: None,
            rectified,
            ink_mask,
            answers,
            ink_counts,
            student_info,
        })
    }
}
