//! In-memory capability implementations for tests and offline demos.

use std::collections::VecDeque;
use std::sync::Mutex;

use image::{DynamicImage, GrayImage};

use super::{BlobStorage, FaceDetector, MrzDecoder};
use crate::models::{BoundingBox, RawMrzFields, StoredBlob};
use crate::utils::PassportError;

/// Returns the same answer for every image.
pub struct StaticMrzDecoder {
    fields: Option<RawMrzFields>,
}

impl StaticMrzDecoder {
    pub fn new(fields: Option<RawMrzFields>) -> Self {
        StaticMrzDecoder { fields }
    }
}

impl MrzDecoder for StaticMrzDecoder {
    fn decode(&self, _image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError> {
        Ok(self.fields.clone())
    }
}

/// Answers decode calls in order from a script; once exhausted it reports no MRZ.
/// Also records the dimensions and whether each image was binarized.
pub struct ScriptedMrzDecoder {
    answers: Mutex<VecDeque<Result<Option<RawMrzFields>, PassportError>>>,
    calls: Mutex<Vec<DecodeCall>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeCall {
    pub width: u32,
    pub height: u32,
    pub binary: bool,
}

impl ScriptedMrzDecoder {
    pub fn new(answers: Vec<Result<Option<RawMrzFields>, PassportError>>) -> Self {
        ScriptedMrzDecoder {
            answers: Mutex::new(answers.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<DecodeCall> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl MrzDecoder for ScriptedMrzDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError> {
        let binary = image
            .to_luma8()
            .pixels()
            .all(|p| p[0] == 0 || p[0] == 255);
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(DecodeCall {
                width: image.width(),
                height: image.height(),
                binary,
            });
        }
        match self.answers.lock() {
            Ok(mut answers) => answers.pop_front().unwrap_or(Ok(None)),
            Err(_) => Err(PassportError::Internal("decoder script poisoned".to_string())),
        }
    }
}

/// Reports a fixed list of boxes regardless of the image.
pub struct StaticFaceDetector {
    boxes: Vec<BoundingBox>,
}

impl StaticFaceDetector {
    pub fn new(boxes: Vec<BoundingBox>) -> Self {
        StaticFaceDetector { boxes }
    }

    pub fn none() -> Self {
        StaticFaceDetector { boxes: Vec::new() }
    }
}

impl FaceDetector for StaticFaceDetector {
    fn detect_faces(&self, _gray: &GrayImage) -> Result<Vec<BoundingBox>, PassportError> {
        Ok(self.boxes.clone())
    }
}

/// Always errors, like a detector whose model failed to load.
pub struct FailingFaceDetector;

impl FaceDetector for FailingFaceDetector {
    fn detect_faces(&self, _gray: &GrayImage) -> Result<Vec<BoundingBox>, PassportError> {
        Err(PassportError::ImageProcessingError(
            "face model unavailable".to_string(),
        ))
    }
}

/// Keeps stored blobs in memory so tests can inspect what was uploaded.
pub struct MemoryStorage {
    bucket_id: String,
    blobs: Mutex<Vec<(String, Vec<u8>)>>,
}

impl MemoryStorage {
    pub fn new(bucket_id: impl Into<String>) -> Self {
        MemoryStorage {
            bucket_id: bucket_id.into(),
            blobs: Mutex::new(Vec::new()),
        }
    }

    pub fn blobs(&self) -> Vec<(String, Vec<u8>)> {
        self.blobs.lock().map(|blobs| blobs.clone()).unwrap_or_default()
    }
}

impl BlobStorage for MemoryStorage {
    fn store(
        &self,
        bucket_id: &str,
        unique_id: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, PassportError> {
        self.blobs
            .lock()
            .map_err(|_| PassportError::StorageFailure("memory store poisoned".to_string()))?
            .push((unique_id.to_string(), bytes.to_vec()));
        Ok(StoredBlob {
            id: unique_id.to_string(),
            url: format!("memory://{}/{}", bucket_id, unique_id),
        })
    }

    fn bucket_id(&self) -> &str {
        &self.bucket_id
    }
}

/// Rejects every upload.
pub struct FailingStorage;

impl BlobStorage for FailingStorage {
    fn store(
        &self,
        _bucket_id: &str,
        _unique_id: &str,
        _bytes: &[u8],
    ) -> Result<StoredBlob, PassportError> {
        Err(PassportError::StorageFailure("bucket unavailable".to_string()))
    }

    fn bucket_id(&self) -> &str {
        "unavailable"
    }
}
