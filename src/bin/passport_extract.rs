// Command-line host for the passport extraction pipeline.
// One file runs single-document extraction, several run a batch; JSON goes to stdout.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use luppa_extract::capabilities::{
    AppwriteStorage, BlobStorage, DirectoryStorage, RustfaceDetector, TesseractMrzDecoder,
};
use luppa_extract::models::DocumentInput;
use luppa_extract::{AppConfig, DocumentExtractor, PassportError};
use serde_json::json;

#[derive(Parser, Debug)]
#[command(name = "passport_extract", about = "Extract MRZ fields and portrait from passport images")]
struct Args {
    /// Passport images to process
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for binarized fallback images
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// Face box expansion margin
    #[arg(long)]
    margin: Option<f64>,

    /// Store portraits in this local directory instead of remote storage
    #[arg(long)]
    store_dir: Option<PathBuf>,

    /// SeetaFace frontal model
    #[arg(long, default_value = "seeta_fd_frontal_v1.0.bin")]
    face_model: PathBuf,

    /// Tesseract data directory
    #[arg(long, env = "TESSDATA_PREFIX")]
    tessdata: Option<String>,
}

fn load_config(args: &Args) -> Result<AppConfig, PassportError> {
    let mut config = match &args.config {
        Some(path) => AppConfig::from_json_file(path)?,
        None => AppConfig::default(),
    }
    .apply_env()?;

    if let Some(dir) = &args.scratch_dir {
        config.extractor.scratch_dir = Some(dir.clone());
    }
    if let Some(margin) = args.margin {
        config.extractor.expand_margin = margin;
    }
    config.extractor.validate()?;
    Ok(config)
}

fn build_storage(args: &Args, config: &AppConfig) -> Result<Arc<dyn BlobStorage>, PassportError> {
    match &args.store_dir {
        Some(dir) => {
            let bucket = if config.storage.bucket_id.is_empty() {
                "faces".to_string()
            } else {
                config.storage.bucket_id.clone()
            };
            Ok(Arc::new(DirectoryStorage::new(dir, bucket)))
        }
        None => Ok(Arc::new(AppwriteStorage::new(config.storage.clone())?)),
    }
}

fn read_document(path: &Path) -> Result<DocumentInput, PassportError> {
    let bytes = std::fs::read(path)
        .map_err(|e| PassportError::InputError(format!("Failed to read {}: {}", path.display(), e)))?;
    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default()
        .to_string();
    Ok(DocumentInput::new(filename, bytes))
}

fn run(args: Args) -> Result<serde_json::Value, PassportError> {
    let config = load_config(&args)?;
    let extractor = DocumentExtractor::new(
        Arc::new(TesseractMrzDecoder::new(args.tessdata.clone(), "eng")),
        Arc::new(RustfaceDetector::new(&args.face_model)?),
        build_storage(&args, &config)?,
        config.extractor.clone(),
    )?;

    let documents = args
        .files
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<_>, _>>()?;

    if let [document] = documents.as_slice() {
        let record = extractor.extract_document(&document.bytes, &document.filename)?;
        serde_json::to_value(record).map_err(|e| PassportError::Internal(e.to_string()))
    } else {
        let result = extractor.extract_batch(&documents)?;
        serde_json::to_value(result).map_err(|e| PassportError::Internal(e.to_string()))
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    match run(args) {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{}", err);
            println!("{}", json!({ "error": err.to_string(), "kind": err.kind() }));
            ExitCode::FAILURE
        }
    }
}
