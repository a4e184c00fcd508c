use std::io::Cursor;

use image::{DynamicImage, ImageOutputFormat};

use crate::capabilities::FaceDetector;
use crate::models::BoundingBox;
use crate::utils::PassportError;

/// A cropped portrait, encoded as JPEG.
#[derive(Debug, Clone, PartialEq)]
pub struct FaceCrop {
    pub region: BoundingBox,
    pub jpeg: Vec<u8>,
}

/// Result of a localization attempt. `NotFound` and `DetectorFailed` lead to the
/// same fallback downstream but are kept apart for logging.
#[derive(Debug, Clone, PartialEq)]
pub enum FaceOutcome {
    Found(FaceCrop),
    NotFound,
    DetectorFailed(String),
}

impl FaceOutcome {
    pub fn into_crop(self) -> Option<FaceCrop> {
        match self {
            FaceOutcome::Found(crop) => Some(crop),
            _ => None,
        }
    }
}

/// FaceLocalizer finds the bearer's portrait and cuts it out with a margin.
pub struct FaceLocalizer;

impl FaceLocalizer {
    /// Never fails: detector errors and degenerate crops become outcomes.
    pub fn locate(
        detector: &dyn FaceDetector,
        image: &DynamicImage,
        expand_margin: f64,
        jpeg_quality: u8,
    ) -> FaceOutcome {
        match Self::try_locate(detector, image, expand_margin, jpeg_quality) {
            Ok(Some(crop)) => {
                log::info!("Face region found at {:?}", crop.region);
                FaceOutcome::Found(crop)
            }
            Ok(None) => {
                log::info!("No face detected");
                FaceOutcome::NotFound
            }
            Err(e) => {
                log::warn!("Face localization failed: {}", e);
                FaceOutcome::DetectorFailed(e.to_string())
            }
        }
    }

    fn try_locate(
        detector: &dyn FaceDetector,
        image: &DynamicImage,
        expand_margin: f64,
        jpeg_quality: u8,
    ) -> Result<Option<FaceCrop>, PassportError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PassportError::ImageProcessingError(
                "Zero-sized image".to_string(),
            ));
        }

        let gray = image.to_luma8();
        let faces = detector.detect_faces(&gray)?;
        log::debug!("Detector reported {} face(s)", faces.len());

        // Detector order is authoritative: the first box wins.
        let first = match faces.first() {
            Some(face) => *face,
            None => return Ok(None),
        };

        if first.width > image.width() as i64 || first.height > image.height() as i64 {
            return Err(PassportError::ImageProcessingError(format!(
                "Detected box {:?} is larger than the image",
                first
            )));
        }

        let region = Self::expand_box(first, expand_margin, image.width(), image.height());
        if region.is_empty() {
            return Err(PassportError::ImageProcessingError(format!(
                "Detected box {:?} lies outside the image",
                first
            )));
        }

        let crop = image.crop_imm(
            region.x as u32,
            region.y as u32,
            region.width as u32,
            region.height as u32,
        );
        let jpeg = Self::encode_jpeg(&crop, jpeg_quality)?;
        Ok(Some(FaceCrop { region, jpeg }))
    }

    /// Pads the box by `margin` times its size on every side, then clamps the
    /// origin at zero and the extent at the far image edges. Arithmetic saturates,
    /// so arbitrary detector output yields a box, possibly empty.
    pub fn expand_box(face: BoundingBox, margin: f64, image_width: u32, image_height: u32) -> BoundingBox {
        let expand_w = (face.width as f64 * margin) as i64;
        let expand_h = (face.height as f64 * margin) as i64;

        let x = face.x.saturating_sub(expand_w).max(0);
        let y = face.y.saturating_sub(expand_h).max(0);
        let width = face
            .width
            .saturating_add(expand_w.saturating_mul(2))
            .min(image_width as i64 - x)
            .max(0);
        let height = face
            .height
            .saturating_add(expand_h.saturating_mul(2))
            .min(image_height as i64 - y)
            .max(0);

        BoundingBox::new(x, y, width, height)
    }

    fn encode_jpeg(crop: &DynamicImage, quality: u8) -> Result<Vec<u8>, PassportError> {
        let rgb = DynamicImage::ImageRgb8(crop.to_rgb8());
        let mut buffer = Cursor::new(Vec::new());
        rgb.write_to(&mut buffer, ImageOutputFormat::Jpeg(quality))?;
        Ok(buffer.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::fake::{FailingFaceDetector, StaticFaceDetector};
    use image::{Rgb, RgbImage};

    fn blank(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([180, 160, 150])))
    }

    #[test]
    fn test_expand_box_clamps_to_origin() {
        let region = FaceLocalizer::expand_box(BoundingBox::new(10, 10, 20, 20), 0.7, 100, 100);
        assert_eq!(region, BoundingBox::new(0, 0, 48, 48));
    }

    #[test]
    fn test_expand_box_clamps_far_edges() {
        let region = FaceLocalizer::expand_box(BoundingBox::new(70, 80, 20, 20), 0.7, 100, 100);
        assert_eq!(region, BoundingBox::new(56, 66, 44, 34));
        assert!(region.x + region.width <= 100);
        assert!(region.y + region.height <= 100);
    }

    #[test]
    fn test_expand_box_interior() {
        let region = FaceLocalizer::expand_box(BoundingBox::new(100, 100, 50, 40), 0.5, 400, 400);
        assert_eq!(region, BoundingBox::new(75, 80, 100, 80));
    }

    #[test]
    fn test_expand_box_outside_image_is_empty() {
        let region = FaceLocalizer::expand_box(BoundingBox::new(500, 10, 20, 20), 0.7, 100, 100);
        assert!(region.is_empty());
        assert!(region.width >= 0 && region.height >= 0);
    }

    #[test]
    fn test_expand_box_saturates_on_huge_input() {
        let region = FaceLocalizer::expand_box(BoundingBox::new(0, 0, i64::MAX / 2, 10), 0.7, 8, 8);
        assert_eq!(region, BoundingBox::new(0, 0, 8, 8));

        let region = FaceLocalizer::expand_box(BoundingBox::new(i64::MIN, i64::MAX, 4, 4), 0.7, 8, 8);
        assert!(region.is_empty());
    }

    #[test]
    fn test_locate_box_larger_than_image_is_soft() {
        let detector = StaticFaceDetector::new(vec![BoundingBox::new(0, 0, i64::MAX / 2, 10)]);
        let outcome = FaceLocalizer::locate(&detector, &blank(8, 8), 0.7, 90);
        assert!(matches!(outcome, FaceOutcome::DetectorFailed(_)));
    }

    #[test]
    fn test_locate_uses_first_box() {
        let detector = StaticFaceDetector::new(vec![
            BoundingBox::new(10, 10, 20, 20),
            BoundingBox::new(40, 40, 50, 50),
        ]);
        let outcome = FaceLocalizer::locate(&detector, &blank(100, 100), 0.7, 90);
        let crop = outcome.into_crop().unwrap();
        assert_eq!(crop.region, BoundingBox::new(0, 0, 48, 48));

        let decoded = image::load_from_memory(&crop.jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (48, 48));
    }

    #[test]
    fn test_locate_no_faces() {
        let outcome = FaceLocalizer::locate(&StaticFaceDetector::none(), &blank(50, 50), 0.7, 90);
        assert_eq!(outcome, FaceOutcome::NotFound);
    }

    #[test]
    fn test_locate_detector_failure_is_soft() {
        let outcome = FaceLocalizer::locate(&FailingFaceDetector, &blank(50, 50), 0.7, 90);
        assert!(matches!(outcome, FaceOutcome::DetectorFailed(_)));
    }

    #[test]
    fn test_locate_box_outside_image_is_soft() {
        let detector = StaticFaceDetector::new(vec![BoundingBox::new(500, 500, 10, 10)]);
        let outcome = FaceLocalizer::locate(&detector, &blank(50, 50), 0.7, 90);
        assert!(matches!(outcome, FaceOutcome::DetectorFailed(_)));
    }

    #[test]
    fn test_locate_zero_sized_image() {
        let detector = StaticFaceDetector::new(vec![BoundingBox::new(0, 0, 1, 1)]);
        let outcome = FaceLocalizer::locate(&detector, &blank(0, 0), 0.7, 90);
        assert!(matches!(outcome, FaceOutcome::DetectorFailed(_)));
    }
}
