use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDate;
use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MrzFormat {
    TD1, // ID Card (85.6mm × 54.0mm)
    TD2, // ID Card (105.0mm × 74.0mm)
    TD3, // Passport (125.0mm × 88.0mm)
}

impl MrzFormat {
    pub fn mrz_lines(&self) -> usize {
        match self {
            MrzFormat::TD1 => 3,
            MrzFormat::TD2 => 2,
            MrzFormat::TD3 => 2,
        }
    }

    pub fn mrz_chars_per_line(&self) -> usize {
        match self {
            MrzFormat::TD1 => 30,
            MrzFormat::TD2 => 36,
            MrzFormat::TD3 => 44,
        }
    }
}

/// Fields as handed over by an MRZ decoder. Values are raw: they may still
/// carry filler characters, padding and OCR confusions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMrzFields {
    pub mrz_type: Option<MrzFormat>,
    pub document_type: String,
    pub country: String,
    pub number: String,
    pub surname: String,
    pub names: String,
    pub nationality: String,
    pub date_of_birth: String,
    pub sex: String,
    pub expiration_date: String,
    pub personal_number: String,
    /// Number of check digits that verified; decoders without check digits leave 0.
    pub valid_score: u8,
}

/// Which image ended up in blob storage as the bearer's portrait.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FaceSource {
    Cropped,
    FullDocument,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedRecord {
    pub passport_number: String,
    pub country: String,
    pub surname: String,
    pub names: String,
    pub nationality: String,
    pub date_of_birth: Option<NaiveDate>,
    pub sex: String,
    pub expiration_date: Option<NaiveDate>,
    pub personal_number: String,
    #[serde(serialize_with = "serialize_face_region")]
    pub face_region: Option<Vec<u8>>,
    pub face_source: FaceSource,
    pub face_image_url: String,
}

fn serialize_face_region<S>(region: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match region {
        Some(bytes) => serializer.serialize_some(&STANDARD.encode(bytes)),
        None => serializer.serialize_none(),
    }
}

/// Axis-aligned rectangle in pixel coordinates, as reported by a face detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BoundingBox {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl BoundingBox {
    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Self {
        BoundingBox { x, y, width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0 || self.height <= 0
    }
}

/// Reference handed back by a blob storage backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub id: String,
    pub url: String,
}

/// One uploaded document: the encoded image and the name it was submitted under.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl DocumentInput {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        DocumentInput {
            filename: filename.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemError {
    pub identifier: String,
    pub kind: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BatchItem {
    Success(NormalizedRecord),
    Failure(ItemError),
}

impl BatchItem {
    pub fn is_failure(&self) -> bool {
        matches!(self, BatchItem::Failure(_))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub total: usize,
    pub successful_count: usize,
    pub failed_count: usize,
    pub per_item: Vec<BatchItem>,
}

impl BatchResult {
    /// Builds the aggregate; counts are derived from `per_item` so they always sum to `total`.
    pub fn from_items(per_item: Vec<BatchItem>) -> Self {
        let failed_count = per_item.iter().filter(|item| item.is_failure()).count();
        BatchResult {
            total: per_item.len(),
            successful_count: per_item.len() - failed_count,
            failed_count,
            per_item,
        }
    }
}
