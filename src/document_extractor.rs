use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::capabilities::{BlobStorage, FaceDetector, MrzDecoder};
use crate::config::ExtractorConfig;
use crate::models::{BatchResult, DocumentInput, FaceSource, NormalizedRecord};
use crate::processing::{
    BatchRunner, FaceLocalizer, FaceOutcome, FieldNormalizer, MrzAcquirer,
};
use crate::utils::PassportError;

/// Orchestrates MRZ acquisition, field normalization, face cropping and
/// portrait storage for one document at a time.
pub struct DocumentExtractor {
    decoder: Arc<dyn MrzDecoder>,
    detector: Arc<dyn FaceDetector>,
    storage: Arc<dyn BlobStorage>,
    config: ExtractorConfig,
}

impl DocumentExtractor {
    pub fn new(
        decoder: Arc<dyn MrzDecoder>,
        detector: Arc<dyn FaceDetector>,
        storage: Arc<dyn BlobStorage>,
        config: ExtractorConfig,
    ) -> Result<Self, PassportError> {
        config.validate()?;
        Ok(DocumentExtractor {
            decoder,
            detector,
            storage,
            config,
        })
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Extracts one document. Every failure, including a panic inside an
    /// image codec, comes back as a `PassportError`.
    pub fn extract_document(
        &self,
        image: &[u8],
        filename: &str,
    ) -> Result<NormalizedRecord, PassportError> {
        catch_unwind(AssertUnwindSafe(|| self.extract_inner(image, filename))).unwrap_or_else(
            |payload| {
                let message = panic_message(payload);
                log::error!("Extraction of {} panicked: {}", filename, message);
                Err(PassportError::Internal(message))
            },
        )
    }

    /// Extracts every document, isolating per-item failures. Rejects the whole
    /// batch up front when it is empty or over the configured cap.
    pub fn extract_batch(&self, documents: &[DocumentInput]) -> Result<BatchResult, PassportError> {
        BatchRunner::run(self, documents)
    }

    /// Batch variant taking images and filenames as parallel sequences.
    pub fn extract_batch_named<B: AsRef<[u8]>, S: AsRef<str>>(
        &self,
        images: &[B],
        filenames: &[S],
    ) -> Result<BatchResult, PassportError> {
        if images.len() != filenames.len() {
            return Err(PassportError::InputError(format!(
                "{} images but {} filenames",
                images.len(),
                filenames.len()
            )));
        }
        let documents: Vec<DocumentInput> = images
            .iter()
            .zip(filenames)
            .map(|(bytes, name)| DocumentInput::new(name.as_ref(), bytes.as_ref().to_vec()))
            .collect();
        self.extract_batch(&documents)
    }

    fn extract_inner(&self, image: &[u8], filename: &str) -> Result<NormalizedRecord, PassportError> {
        if filename.trim().is_empty() {
            return Err(PassportError::InputError("No selected file".to_string()));
        }
        if image.is_empty() {
            return Err(PassportError::InputError(format!("{} is empty", filename)));
        }
        log::info!("Processing {} ({} bytes)", filename, image.len());

        // Undecodable bytes can't carry an MRZ either.
        let decoded = image::load_from_memory(image).map_err(|e| {
            PassportError::MrzNotFound(format!("{} is not a readable image: {}", filename, e))
        })?;

        // Step 1: MRZ, without which there is no record
        let (raw, attempt) =
            MrzAcquirer::acquire(self.decoder.as_ref(), &decoded, filename, &self.config)?;
        log::info!("MRZ for {} decoded on {:?} attempt", filename, attempt);

        // Step 2: Field cleanup
        let fields = FieldNormalizer::normalize_fields(&raw, &self.config);

        // Step 3: Portrait, falling back to the whole page
        let outcome = FaceLocalizer::locate(
            self.detector.as_ref(),
            &decoded,
            self.config.expand_margin,
            self.config.face_jpeg_quality,
        );
        let (face_region, face_source) = match outcome {
            FaceOutcome::Found(crop) => (Some(crop.jpeg), FaceSource::Cropped),
            FaceOutcome::NotFound => (None, FaceSource::FullDocument),
            FaceOutcome::DetectorFailed(reason) => {
                log::warn!("Using full image of {} as portrait: {}", filename, reason);
                (None, FaceSource::FullDocument)
            }
        };

        // Step 4: Storage
        let artifact = face_region.as_deref().unwrap_or(image);
        let unique_id = uuid::Uuid::new_v4().simple().to_string();
        let stored = self
            .storage
            .store(self.storage.bucket_id(), &unique_id, artifact)?;
        log::info!("Portrait for {} stored at {}", filename, stored.url);

        Ok(NormalizedRecord {
            passport_number: fields.passport_number,
            country: fields.country,
            surname: fields.surname,
            names: fields.names,
            nationality: fields.nationality,
            date_of_birth: fields.date_of_birth,
            sex: fields.sex,
            expiration_date: fields.expiration_date,
            personal_number: fields.personal_number,
            face_region,
            face_source,
            face_image_url: stored.url,
        })
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
