use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassportError {
    /// Missing or empty upload, or a batch over the size cap.
    #[error("Input error: {0}")]
    InputError(String),
    /// Neither the original image nor its binarized fallback yielded an MRZ.
    #[error("MRZ not found: {0}")]
    MrzNotFound(String),
    #[error("Storage failure: {0}")]
    StorageFailure(String),
    #[error("Image processing error: {0}")]
    ImageProcessingError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("IO error: {0}")]
    IoError(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PassportError {
    /// Stable tag used in batch item errors and log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            PassportError::InputError(_) => "input_error",
            PassportError::MrzNotFound(_) => "mrz_not_found",
            PassportError::StorageFailure(_) => "storage_failure",
            PassportError::ImageProcessingError(_) => "image_processing_error",
            PassportError::ConfigError(_) => "config_error",
            PassportError::IoError(_) => "io_error",
            PassportError::Internal(_) => "internal_error",
        }
    }
}

impl From<std::io::Error> for PassportError {
    fn from(err: std::io::Error) -> Self {
        PassportError::IoError(err.to_string())
    }
}

impl From<image::ImageError> for PassportError {
    fn from(err: image::ImageError) -> Self {
        PassportError::ImageProcessingError(err.to_string())
    }
}
