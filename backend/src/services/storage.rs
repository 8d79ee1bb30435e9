//! Local disk storage for uploaded files
//!
//! Files are written under the configured root and served back by the
//! router at `/api/storage/<path>`.

use std::path::{Component, Path, PathBuf};

use rand::{distributions::Alphanumeric, Rng};
use serde::Serialize;

use crate::config::StorageConfig;
use crate::error::{AppError, AppResult};
use shared::validation::{validate_extension, CHAT_MEDIA_EXTENSIONS, IMAGE_EXTENSIONS};

/// Public prefix under which stored files are served
pub const PUBLIC_PREFIX: &str = "/api/storage";

pub const IMAGES_DIR: &str = "images";
pub const CHAT_MEDIA_DIR: &str = "chat_media";
pub const AVATARS_DIR: &str = "avatars";

/// A file persisted by the storage service
#[derive(Debug, Clone, Serialize)]
pub struct StoredFile {
    /// Path relative to the storage root, e.g. `images/1700000000-Ab12Cd34Ef.png`
    pub path: String,
    /// Absolute public URL
    pub url: String,
}

/// An uploaded file as received from a multipart field
#[derive(Debug)]
pub struct UploadedFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct StorageService {
    root: PathBuf,
    public_base_url: String,
    image_max_bytes: usize,
    media_max_bytes: usize,
}

impl StorageService {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            root: PathBuf::from(&config.root),
            public_base_url: config.public_base_url.trim_end_matches('/').to_string(),
            image_max_bytes: config.image_max_bytes,
            media_max_bytes: config.media_max_bytes,
        }
    }

    pub fn image_max_bytes(&self) -> usize {
        self.image_max_bytes
    }

    /// Validate and store an image upload
    pub async fn store_image(&self, file: &UploadedFile) -> AppResult<StoredFile> {
        let ext = validate_extension("image", &file.filename, IMAGE_EXTENSIONS)?;
        if file.bytes.len() > self.image_max_bytes {
            return Err(AppError::validation(
                "image",
                "The image may not be greater than 2 MB",
                "L'image ne doit pas dépasser 2 Mo",
            ));
        }
        self.store(IMAGES_DIR, &ext, &file.bytes).await
    }

    /// Check a chat attachment's extension and size, returning the extension
    pub fn check_chat_media(&self, file: &UploadedFile) -> AppResult<String> {
        let ext = validate_extension("media", &file.filename, CHAT_MEDIA_EXTENSIONS)?;
        if file.bytes.len() > self.media_max_bytes {
            return Err(AppError::validation(
                "media",
                "The media may not be greater than 10 MB",
                "Le média ne doit pas dépasser 10 Mo",
            ));
        }
        Ok(ext)
    }

    /// Store a chat attachment already accepted by [`Self::check_chat_media`]
    pub async fn store_chat_media(&self, file: &UploadedFile, ext: &str) -> AppResult<StoredFile> {
        self.store(CHAT_MEDIA_DIR, ext, &file.bytes).await
    }

    /// Delete a stored file; failures are logged, not returned
    pub async fn remove(&self, relative: &str) {
        if !is_safe_relative_path(relative) {
            tracing::warn!("Refusing to remove {}", relative);
            return;
        }
        if let Err(e) = tokio::fs::remove_file(self.root.join(relative)).await {
            tracing::warn!("Could not remove {}: {}", relative, e);
        }
    }

    /// Store bytes under `dir` with a generated `<timestamp>-<random>.<ext>` name
    pub async fn store(&self, dir: &str, ext: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        self.store_named(dir, &generate_filename(ext), bytes).await
    }

    pub async fn store_named(&self, dir: &str, filename: &str, bytes: &[u8]) -> AppResult<StoredFile> {
        let relative = format!("{}/{}", dir, filename);
        if !is_safe_relative_path(&relative) {
            return Err(AppError::StorageError(format!("Refusing path {}", relative)));
        }

        let target_dir = self.root.join(dir);
        tokio::fs::create_dir_all(&target_dir)
            .await
            .map_err(|e| AppError::StorageError(format!("{}: {}", target_dir.display(), e)))?;

        let target = self.root.join(&relative);
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| AppError::StorageError(format!("{}: {}", target.display(), e)))?;

        tracing::debug!("Stored {} bytes at {}", bytes.len(), relative);

        Ok(StoredFile {
            url: self.public_url(&relative),
            path: relative,
        })
    }

    pub fn public_url(&self, relative: &str) -> String {
        format!("{}{}/{}", self.public_base_url, PUBLIC_PREFIX, relative)
    }
}

fn generate_filename(ext: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(10)
        .map(char::from)
        .collect();
    format!("{}-{}.{}", chrono::Utc::now().timestamp(), suffix, ext)
}

/// Only plain relative components, no `..` or absolute prefixes
fn is_safe_relative_path(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, Component::Normal(_)))
}
