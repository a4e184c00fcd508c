use image::{DynamicImage, ImageOutputFormat};
use tesseract::{PageSegMode, Tesseract};

use super::MrzDecoder;
use crate::models::RawMrzFields;
use crate::processing::MrzParser;
use crate::utils::PassportError;

const MRZ_WHITELIST: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789<";

/// MRZ decoder backed by libtesseract. The engine reads from disk, so each
/// image is written to a temporary PNG that is removed when decoding ends.
pub struct TesseractMrzDecoder {
    datapath: Option<String>,
    language: String,
}

impl TesseractMrzDecoder {
    pub fn new(datapath: Option<String>, language: impl Into<String>) -> Self {
        TesseractMrzDecoder {
            datapath,
            language: language.into(),
        }
    }

    fn read_text(&self, image: &DynamicImage) -> Result<String, PassportError> {
        let mut temp_file = tempfile::Builder::new()
            .prefix("mrz_")
            .suffix(".png")
            .tempfile()
            .map_err(|e| PassportError::IoError(format!("Failed to create temporary file: {}", e)))?;
        image.write_to(temp_file.as_file_mut(), ImageOutputFormat::Png)?;

        let path_str = temp_file.path().to_str().ok_or_else(|| {
            PassportError::Internal("Could not convert path to string".to_string())
        })?;

        let mut tess = Tesseract::new(self.datapath.as_deref(), Some(self.language.as_str()))
            .map_err(|e| PassportError::Internal(format!("Failed to initialize Tesseract: {}", e)))?
            .set_variable("tessedit_char_whitelist", MRZ_WHITELIST)
            .map_err(|e| PassportError::Internal(format!("Failed to set Tesseract variable: {}", e)))?;

        tess.set_page_seg_mode(PageSegMode::PsmAuto);

        tess = tess
            .set_image(path_str)
            .map_err(|e| PassportError::Internal(format!("Failed to set image: {}", e)))?;

        tess.get_text()
            .map_err(|e| PassportError::Internal(format!("Failed to extract text: {}", e)))
    }
}

impl Default for TesseractMrzDecoder {
    fn default() -> Self {
        Self::new(None, "eng")
    }
}

impl MrzDecoder for TesseractMrzDecoder {
    fn decode(&self, image: &DynamicImage) -> Result<Option<RawMrzFields>, PassportError> {
        let text = self.read_text(image)?;
        log::debug!("MRZ OCR result:\n{}", text);
        Ok(MrzParser::parse_mrz_text(&text))
    }
}
