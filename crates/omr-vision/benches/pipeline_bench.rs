// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the omr-vision crate: the full photo-to-answers
// pipeline and the post-rectification stages on a synthetic 20x5 sheet.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::draw_filled_circle_mut;

use omr_core::GraderConfig;
use omr_vision::{SheetImage, SheetPipeline};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// A 600x700 photo: dark background, white sheet inset by 40 px, one filled
/// bubble per question.
fn synthetic_photo() -> RgbImage {
    let mut img = RgbImage::from_pixel(600, 700, Rgb([30, 30, 30]));
    for y in 40..660 {
        for x in 40..560 {
            img.put_pixel(x, y, Rgb([240, 240, 240]));
        }
    }
    for q in 0..20 {
        let cx = 40.0 + ((q * 3 % 5) as f32 + 0.5) * 104.0;
        let cy = 40.0 + (q as f32 + 0.5) * 31.0;
        draw_filled_circle_mut(&mut img, (cx as i32, cy as i32), 11, Rgb([20, 20, 20]));
    }
    img
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_full_pipeline(c: &mut Criterion) {
    let pipeline = match SheetPipeline::new(GraderConfig::default()) {
        Ok(p) => p,
        Err(err) => panic!("default config rejected: {err}"),
    };
    let photo = match SheetImage::from_dynamic(DynamicImage::ImageRgb8(synthetic_photo())) {
        Ok(p) => p,
        Err(err) => panic!("synthetic photo rejected: {err}"),
    };

    c.bench_function("process (600x700 photo)", |b| {
        b.iter(|| {
            let scan = pipeline.process(black_box(&photo));
            black_box(scan.ok());
        });
    });
}

/// Binarization, segmentation and classification only.
fn bench_rectified_stages(c: &mut Criterion) {
    let pipeline = match SheetPipeline::new(GraderConfig::default()) {
        Ok(p) => p,
        Err(err) => panic!("default config rejected: {err}"),
    };
    let sheet = synthetic_photo();

    c.bench_function("process_rectified (600x700)", |b| {
        b.iter(|| {
            let scan = pipeline.process_rectified(black_box(sheet.clone()));
            black_box(scan.ok());
        });
    });
}

criterion_group!(benches, bench_full_pipeline, bench_rectified_stages);
criterion_main!(benches);
