// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Sheet photo loader — decode JPEG/PNG files or bytes into an in-memory image
// and produce the fixed-size RGB buffer the detection stages work on.

use image::{DynamicImage, ImageFormat, RgbImage};
use omr_core::error::{OmrError, Result};
use tracing::{debug, info, instrument};

/// A decoded photograph of an answer sheet.
///
/// The photo is never modified; resizing and conversion return new buffers.
///
/// ```ignore
/// let photo = SheetImage::open("sheet.jpg")?;
/// let canonical = photo.to_canonical(600, 700);
/// ```
#[derive(Debug, Clone)]
pub struct SheetImage {
    image: DynamicImage,
}

impl SheetImage {
    // -- Construction ---------------------------------------------------------

    /// Load a photo from a file path.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let img = image::open(path.as_ref()).map_err(|err| {
            OmrError::LoadFailure(format!(
                "failed to open {}: {}",
                path.as_ref().display(),
                err
            ))
        })?;
        info!(width = img.width(), height = img.height(), "Sheet photo loaded");
        Self::checked(img)
    }

    /// Decode a photo from raw encoded bytes (JPEG, PNG, etc.).
    #[instrument(skip(data), fields(data_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let img = image::load_from_memory(data)
            .map_err(|err| OmrError::LoadFailure(format!("failed to decode image: {}", err)))?;
        debug!(
            width = img.width(),
            height = img.height(),
            "Sheet photo decoded from bytes"
        );
        Self::checked(img)
    }

    /// Wrap an already-decoded `DynamicImage`.
    pub fn from_dynamic(image: DynamicImage) -> Result<Self> {
        Self::checked(image)
    }

    fn checked(image: DynamicImage) -> Result<Self> {
        if image.width() == 0 || image.height() == 0 {
            return Err(OmrError::LoadFailure("image has no pixels".into()));
        }
        Ok(Self { image })
    }

    // -- Accessors ------------------------------------------------------------

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn as_dynamic(&self) -> &DynamicImage {
        &self.image
    }

    // -- Conversion -----------------------------------------------------------

    /// Resize to exactly `width` x `height` (aspect ratio is not preserved)
    /// and convert to 8-bit RGB.
    #[instrument(skip(self), fields(from_w = self.width(), from_h = self.height()))]
    pub fn to_canonical(&self, width: u32, height: u32) -> RgbImage {
        if self.image.width() == width && self.image.height() == height {
            return self.image.to_rgb8();
        }
        self.image
            .resize_exact(width, height, image::imageops::FilterType::Lanczos3)
            .to_rgb8()
    }

    /// Encode the photo as PNG bytes.
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        encode_png(&self.image)
    }
}

/// Encode any image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buffer);
    image.write_to(&mut cursor, ImageFormat::Png).map_err(encode_error)?;
    Ok(buffer)
}

/// Encoding happens after a sheet loaded fine, so a failure here is ours.
fn encode_error(err: image::ImageError) -> OmrError {
    OmrError::Internal(format!("PNG encoding failed: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn sample(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        }))
    }

    #[test]
    fn garbage_bytes_fail_to_load() {
        let result = SheetImage::from_bytes(b"definitely not a photo");
        assert!(matches!(result, Err(OmrError::LoadFailure(_))));
    }

    #[test]
    fn missing_file_fails_to_load() {
        let result = SheetImage::open("/nonexistent/sheet.jpg");
        assert!(matches!(result, Err(OmrError::LoadFailure(_))));
    }

    #[test]
    fn empty_image_is_rejected() {
        let result = SheetImage::from_dynamic(DynamicImage::new_rgb8(0, 0));
        assert!(matches!(result, Err(OmrError::LoadFailure(_))));
    }

    #[test]
    fn png_bytes_decode_back() {
        let photo = SheetImage::from_dynamic(sample(40, 30)).expect("wrap");
        let bytes = photo.to_png_bytes().expect("encode");
        assert_eq!(&bytes[1..4], b"PNG");

        let decoded = SheetImage::from_bytes(&bytes).expect("decode");
        assert_eq!(decoded.width(), 40);
        assert_eq!(decoded.height(), 30);
    }

    #[test]
    fn encode_failures_are_internal_not_load_failures() {
        let err = encode_error(image::ImageError::IoError(std::io::Error::other("disk full")));
        assert!(matches!(err, OmrError::Internal(ref detail) if detail.contains("disk full")));
        assert_eq!(
            omr_core::human_errors::humanize_error(&err).severity,
            omr_core::human_errors::Severity::Internal
        );
    }

    #[test]
    fn canonical_resize_ignores_aspect_ratio() {
        let photo = SheetImage::from_dynamic(sample(1200, 900)).expect("wrap");
        let canonical = photo.to_canonical(600, 700);
        assert_eq!(canonical.dimensions(), (600, 700));
    }

    #[test]
    fn canonical_keeps_pixels_when_already_sized() {
        let photo = SheetImage::from_dynamic(sample(60, 70)).expect("wrap");
        let canonical = photo.to_canonical(60, 70);
        assert_eq!(canonical.get_pixel(10, 20), &Rgb([10, 20, 128]));
    }
}
