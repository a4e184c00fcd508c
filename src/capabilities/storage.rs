use std::fs;
use std::path::PathBuf;

use image::ImageFormat;
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::Client;
use serde::Deserialize;

use super::BlobStorage;
use crate::config::StorageConfig;
use crate::models::StoredBlob;
use crate::utils::PassportError;

/// Public view URL for a stored file.
pub fn view_url(endpoint: &str, bucket_id: &str, file_id: &str, project_id: &str) -> String {
    format!(
        "{}/storage/buckets/{}/files/{}/view?project={}",
        endpoint.trim_end_matches('/'),
        bucket_id,
        file_id,
        project_id
    )
}

/// MIME type and file extension for an encoded image. Face crops are JPEG,
/// full-document fallbacks keep whatever format was uploaded.
pub fn content_type(bytes: &[u8]) -> (&'static str, &'static str) {
    match image::guess_format(bytes) {
        Ok(ImageFormat::Jpeg) => ("image/jpeg", "jpg"),
        Ok(ImageFormat::Png) => ("image/png", "png"),
        Ok(ImageFormat::Gif) => ("image/gif", "gif"),
        Ok(ImageFormat::WebP) => ("image/webp", "webp"),
        Ok(ImageFormat::Bmp) => ("image/bmp", "bmp"),
        Ok(ImageFormat::Tiff) => ("image/tiff", "tiff"),
        _ => ("application/octet-stream", "bin"),
    }
}

#[derive(Debug, Deserialize)]
struct CreatedFile {
    #[serde(rename = "$id")]
    id: String,
}

/// Appwrite-compatible bucket storage over blocking HTTP.
pub struct AppwriteStorage {
    client: Client,
    config: StorageConfig,
}

impl AppwriteStorage {
    pub fn new(config: StorageConfig) -> Result<Self, PassportError> {
        if !config.is_configured() {
            return Err(PassportError::ConfigError(
                "Storage needs both bucket_id and project_id".to_string(),
            ));
        }
        let client = Client::builder()
            .build()
            .map_err(|e| PassportError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(AppwriteStorage { client, config })
    }
}

impl BlobStorage for AppwriteStorage {
    fn store(
        &self,
        bucket_id: &str,
        unique_id: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, PassportError> {
        let (mime, extension) = content_type(bytes);
        let part = Part::bytes(bytes.to_vec())
            .file_name(format!("{}.{}", unique_id, extension))
            .mime_str(mime)
            .map_err(|e| PassportError::StorageFailure(format!("Invalid upload part: {}", e)))?;
        let form = Form::new().text("fileId", unique_id.to_string()).part("file", part);

        let url = format!(
            "{}/storage/buckets/{}/files",
            self.config.endpoint.trim_end_matches('/'),
            bucket_id
        );
        let mut request = self
            .client
            .post(&url)
            .header("X-Appwrite-Project", &self.config.project_id)
            .multipart(form);
        if let Some(key) = &self.config.api_key {
            request = request.header("X-Appwrite-Key", key);
        }

        let created: CreatedFile = request
            .send()
            .and_then(|response| response.error_for_status())
            .and_then(|response| response.json())
            .map_err(|e| PassportError::StorageFailure(format!("Upload to {} failed: {}", url, e)))?;

        log::info!("Stored blob {} in bucket {}", created.id, bucket_id);
        Ok(StoredBlob {
            url: view_url(&self.config.endpoint, bucket_id, &created.id, &self.config.project_id),
            id: created.id,
        })
    }

    fn bucket_id(&self) -> &str {
        &self.config.bucket_id
    }
}

/// Writes blobs as files under `root/<bucket>/<id>.<ext>`, for hosts without a remote store.
pub struct DirectoryStorage {
    root: PathBuf,
    bucket_id: String,
}

impl DirectoryStorage {
    pub fn new(root: impl Into<PathBuf>, bucket_id: impl Into<String>) -> Self {
        DirectoryStorage {
            root: root.into(),
            bucket_id: bucket_id.into(),
        }
    }
}

impl BlobStorage for DirectoryStorage {
    fn store(
        &self,
        bucket_id: &str,
        unique_id: &str,
        bytes: &[u8],
    ) -> Result<StoredBlob, PassportError> {
        let dir = self.root.join(bucket_id);
        let (_, extension) = content_type(bytes);
        let path = dir.join(format!("{}.{}", unique_id, extension));
        fs::create_dir_all(&dir)
            .and_then(|_| fs::write(&path, bytes))
            .map_err(|e| {
                PassportError::StorageFailure(format!("Failed to write {}: {}", path.display(), e))
            })?;

        Ok(StoredBlob {
            id: unique_id.to_string(),
            url: format!("file://{}", path.display()),
        })
    }

    fn bucket_id(&self) -> &str {
        &self.bucket_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
    use std::io::Cursor;

    #[test]
    fn test_view_url() {
        assert_eq!(
            view_url("https://cloud.appwrite.io/v1/", "bucket1", "file9", "proj"),
            "https://cloud.appwrite.io/v1/storage/buckets/bucket1/files/file9/view?project=proj"
        );
    }

    #[test]
    fn test_appwrite_requires_ids() {
        let err = AppwriteStorage::new(StorageConfig::default()).err().unwrap();
        assert!(matches!(err, PassportError::ConfigError(_)));
    }

    fn encoded(format: ImageOutputFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([90, 120, 200])));
        let mut buffer = Cursor::new(Vec::new());
        img.write_to(&mut buffer, format).unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_content_type_follows_encoding() {
        assert_eq!(content_type(&encoded(ImageOutputFormat::Jpeg(90))), ("image/jpeg", "jpg"));
        assert_eq!(content_type(&encoded(ImageOutputFormat::Png)), ("image/png", "png"));
        assert_eq!(content_type(&[7, 8, 9]), ("application/octet-stream", "bin"));
    }

    #[test]
    fn test_directory_storage_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path(), "faces");
        let jpeg = encoded(ImageOutputFormat::Jpeg(90));
        let blob = storage.store("faces", "abc", &jpeg).unwrap();

        assert_eq!(blob.id, "abc");
        assert!(blob.url.starts_with("file://"));
        assert!(blob.url.ends_with("abc.jpg"));
        let written = fs::read(dir.path().join("faces").join("abc.jpg")).unwrap();
        assert_eq!(written, jpeg);
    }

    #[test]
    fn test_directory_storage_keeps_png_fallback_extension() {
        let dir = tempfile::tempdir().unwrap();
        let storage = DirectoryStorage::new(dir.path(), "faces");
        let png = encoded(ImageOutputFormat::Png);
        let blob = storage.store("faces", "doc", &png).unwrap();

        assert!(blob.url.ends_with("doc.png"));
        assert!(dir.path().join("faces").join("doc.png").exists());
        assert!(!dir.path().join("faces").join("doc.jpg").exists());
    }
}
