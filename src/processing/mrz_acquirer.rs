use std::path::{Path, PathBuf};

use image::{DynamicImage, GrayImage};
use imageproc::contrast::{otsu_level, threshold};

use crate::capabilities::MrzDecoder;
use crate::config::ExtractorConfig;
use crate::models::RawMrzFields;
use crate::utils::PassportError;

/// Which attempt produced the MRZ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MrzAttempt {
    Original,
    Binarized,
}

/// MrzAcquirer drives the decode primitive: first on the image as uploaded,
/// then on an Otsu-binarized copy.
pub struct MrzAcquirer;

impl MrzAcquirer {
    pub fn acquire(
        decoder: &dyn MrzDecoder,
        image: &DynamicImage,
        filename: &str,
        config: &ExtractorConfig,
    ) -> Result<(RawMrzFields, MrzAttempt), PassportError> {
        if let Some(fields) = Self::try_decode(decoder, image, filename, MrzAttempt::Original) {
            return Ok((fields, MrzAttempt::Original));
        }

        log::info!("Direct MRZ decode failed for {}, retrying on binarized image", filename);
        let binary = Self::binarize(image);
        if let Some(dir) = &config.scratch_dir {
            Self::materialize(&binary, dir, filename);
        }

        let binary = DynamicImage::ImageLuma8(binary);
        if let Some(fields) = Self::try_decode(decoder, &binary, filename, MrzAttempt::Binarized) {
            return Ok((fields, MrzAttempt::Binarized));
        }

        Err(PassportError::MrzNotFound(format!(
            "No MRZ decoded from {} or its binarized copy",
            filename
        )))
    }

    /// Grayscale conversion followed by a global threshold at the Otsu level.
    pub fn binarize(image: &DynamicImage) -> GrayImage {
        let gray = image.to_luma8();
        let level = otsu_level(&gray);
        log::debug!("Otsu threshold level {}", level);
        threshold(&gray, level)
    }

    fn try_decode(
        decoder: &dyn MrzDecoder,
        image: &DynamicImage,
        filename: &str,
        attempt: MrzAttempt,
    ) -> Option<RawMrzFields> {
        match decoder.decode(image) {
            Ok(fields) => fields,
            Err(e) => {
                log::warn!("MRZ decoder error on {:?} attempt for {}: {}", attempt, filename, e);
                None
            }
        }
    }

    /// Path the binarized copy of `filename` is written to inside `dir`.
    pub fn scratch_path(dir: &Path, filename: &str) -> PathBuf {
        let stem = Path::new(filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("document");
        dir.join(format!("processed_{}.png", stem))
    }

    /// Best effort: a scratch copy that cannot be written is only logged.
    fn materialize(binary: &GrayImage, dir: &Path, filename: &str) {
        let path = Self::scratch_path(dir, filename);
        let written = std::fs::create_dir_all(dir)
            .map_err(PassportError::from)
            .and_then(|_| binary.save(&path).map_err(PassportError::from));
        match written {
            Ok(()) => log::info!("Wrote binarized fallback image to {}", path.display()),
            Err(e) => log::warn!("Could not write scratch image {}: {}", path.display(), e),
        }
    }
}
