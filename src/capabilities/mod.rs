//! External primitives the extraction pipeline depends on.
//!
//! Each primitive is a trait so hosts can plug in their own OCR engine,
//! face detector and blob store; `fake` holds in-memory stand-ins for tests.

use image::{DynamicImage, GrayImage};

use crate::models::{BoundingBox, RawMrzFields, StoredBlob};
use crate::utils::PassportError;

pub mod fake;
pub mod storage;

#[cfg(feature = "tesseract")]
pub mod tesseract;

#[cfg(feature = "rustface")]
pub mod rustface;

pub use storage::{AppwriteStorage, DirectoryStorage};

#[cfg(feature = "tesseract")]
pub use self::tesseract::TesseractMrzDecoder;

#[cfg(feature = "rustface")]
pub use self::rustface::RustfaceDetector;

pub trait MrzDecoder: Send + Sync {
    /// `Ok(None)` means the image holds no readable MRZ. `Err` is reserved
    /// for a malfunctioning decoder.
    fn decode(&self, image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError>;
}

pub trait FaceDetector: Send + Sync {
    /// Boxes in detector order. An empty vector is a valid answer.
    fn detect_faces(&self, gray: &GrayImage) -> Result<Vec<BoundingBox>, PassportError>;
}

pub trait BlobStorage: Send + Sync {
    fn store(
        &self,
        bucket_id: &str,
        unique_id: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, PassportError>;

    /// Bucket new blobs are written to.
    fn bucket_id(&self) -> &str;
}
