use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::models::CountryCorrections;
use crate::utils::PassportError;

pub const DEFAULT_EXPAND_MARGIN: f64 = 0.7;
pub const DEFAULT_MAX_BATCH_SIZE: usize = 15;
pub const DEFAULT_STORAGE_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Tuning knobs for the extraction pipeline.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Fraction of the detected face size added on every side before cropping.
    pub expand_margin: f64,
    /// May lower the batch cap, never raise it above `DEFAULT_MAX_BATCH_SIZE`.
    pub max_batch_size: usize,
    /// Where binarized fallback images are written; `None` keeps them in memory only.
    pub scratch_dir: Option<PathBuf>,
    pub country_corrections: CountryCorrections,
    pub filler: char,
    pub parallel_batch: bool,
    pub face_jpeg_quality: u8,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        ExtractorConfig {
            expand_margin: DEFAULT_EXPAND_MARGIN,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            scratch_dir: None,
            country_corrections: CountryCorrections::default(),
            filler: '<',
            parallel_batch: false,
            face_jpeg_quality: 90,
        }
    }
}

impl ExtractorConfig {
    pub fn validate(&self) -> Result<(), PassportError> {
        if !self.expand_margin.is_finite() || self.expand_margin < 0.0 {
            return Err(PassportError::ConfigError(format!(
                "expand_margin must be a non-negative number, got {}",
                self.expand_margin
            )));
        }
        if self.max_batch_size == 0 || self.max_batch_size > DEFAULT_MAX_BATCH_SIZE {
            return Err(PassportError::ConfigError(format!(
                "max_batch_size must be within 1..={}, got {}",
                DEFAULT_MAX_BATCH_SIZE, self.max_batch_size
            )));
        }
        if self.face_jpeg_quality == 0 || self.face_jpeg_quality > 100 {
            return Err(PassportError::ConfigError(format!(
                "face_jpeg_quality must be within 1..=100, got {}",
                self.face_jpeg_quality
            )));
        }
        Ok(())
    }
}

/// Connection settings for the remote blob store.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: String,
    pub bucket_id: String,
    pub project_id: String,
    pub api_key: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            endpoint: DEFAULT_STORAGE_ENDPOINT.to_string(),
            bucket_id: String::new(),
            project_id: String::new(),
            api_key: None,
        }
    }
}

impl StorageConfig {
    pub fn is_configured(&self) -> bool {
        !self.bucket_id.is_empty() && !self.project_id.is_empty()
    }
}

/// Process-wide configuration, built once at startup and handed to the extractor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub extractor: ExtractorConfig,
    pub storage: StorageConfig,
}

impl AppConfig {
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, PassportError> {
        let raw = std::fs::read_to_string(&path).map_err(|e| {
            PassportError::ConfigError(format!(
                "Failed to read config {}: {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, PassportError> {
        let config: AppConfig = serde_json::from_str(raw)
            .map_err(|e| PassportError::ConfigError(format!("Invalid config JSON: {}", e)))?;
        config.extractor.validate()?;
        Ok(config)
    }

    /// Applies `LUPPA_*` environment overrides on top of the current values.
    pub fn apply_env(mut self) -> Result<Self, PassportError> {
        self.apply_vars(|key| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_vars<F>(&mut self, lookup: F) -> Result<(), PassportError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(margin) = lookup("LUPPA_EXPAND_MARGIN") {
            self.extractor.expand_margin = margin.parse().map_err(|_| {
                PassportError::ConfigError(format!("LUPPA_EXPAND_MARGIN is not a number: {}", margin))
            })?;
        }
        if let Some(size) = lookup("LUPPA_MAX_BATCH_SIZE") {
            self.extractor.max_batch_size = size.parse().map_err(|_| {
                PassportError::ConfigError(format!("LUPPA_MAX_BATCH_SIZE is not an integer: {}", size))
            })?;
        }
        if let Some(dir) = lookup("LUPPA_SCRATCH_DIR") {
            self.extractor.scratch_dir = Some(PathBuf::from(dir));
        }
        if let Some(endpoint) = lookup("LUPPA_STORAGE_ENDPOINT") {
            self.storage.endpoint = endpoint;
        }
        if let Some(bucket) = lookup("LUPPA_BUCKET_ID") {
            self.storage.bucket_id = bucket;
        }
        if let Some(project) = lookup("LUPPA_PROJECT_ID") {
            self.storage.project_id = project;
        }
        if let Some(key) = lookup("LUPPA_API_KEY") {
            self.storage.api_key = Some(key);
        }
        self.extractor.validate()
    }
}
