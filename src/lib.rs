pub mod capabilities;
pub mod config;
pub mod document_extractor;
pub mod models;
pub mod processing;
pub mod utils;

pub use config::{AppConfig, ExtractorConfig, StorageConfig};
pub use document_extractor::DocumentExtractor;
pub use models::{BatchResult, DocumentInput, NormalizedRecord};
pub use utils::PassportError;
