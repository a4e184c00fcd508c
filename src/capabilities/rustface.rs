use std::path::PathBuf;

use image::GrayImage;
use rustface::ImageData;

use super::FaceDetector;
use crate::models::BoundingBox;
use crate::utils::PassportError;

/// Frontal face detector using the SeetaFace cascade shipped as
/// `seeta_fd_frontal_v1.0.bin`.
pub struct RustfaceDetector {
    model_path: PathBuf,
    min_face_size: u32,
}

impl RustfaceDetector {
    pub fn new(model_path: impl Into<PathBuf>) -> Result<Self, PassportError> {
        let model_path = model_path.into();
        if !model_path.is_file() {
            return Err(PassportError::ConfigError(format!(
                "Face model not found at {}",
                model_path.display()
            )));
        }
        Ok(RustfaceDetector {
            model_path,
            min_face_size: 20,
        })
    }

    pub fn with_min_face_size(mut self, size: u32) -> Self {
        self.min_face_size = size;
        self
    }
}

impl FaceDetector for RustfaceDetector {
    fn detect_faces(&self, gray: &GrayImage) -> Result<Vec<BoundingBox>, PassportError> {
        let path = self.model_path.to_str().ok_or_else(|| {
            PassportError::ConfigError("Face model path is not valid UTF-8".to_string())
        })?;
        // Detectors are stateful and not shareable across threads, so one is built per call.
        let mut detector = rustface::create_detector(path)
            .map_err(|e| PassportError::ImageProcessingError(format!("Failed to load face model: {}", e)))?;
        detector.set_min_face_size(self.min_face_size);
        detector.set_score_thresh(2.0);
        detector.set_pyramid_scale_factor(0.8);
        detector.set_slide_window_step(4, 4);

        let mut image = ImageData::new(gray.as_raw(), gray.width(), gray.height());
        let faces = detector
            .detect(&mut image)
            .into_iter()
            .map(|face| {
                let bbox = face.bbox();
                BoundingBox::new(
                    bbox.x() as i64,
                    bbox.y() as i64,
                    bbox.width() as i64,
                    bbox.height() as i64,
                )
            })
            .collect();
        Ok(faces)
    }
}
