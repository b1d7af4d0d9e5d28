//! Product image bucket - files on local disk served under a public base URL.
//!
//! Uploaded files are stored as `<uuid>-<original name>` so two uploads of
//! `photo.jpg` never collide. The public URL is what gets saved on the product.

use crate::{config::settings::StorageConfig, errors::Result};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Result of a successful upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub public_url: String,
}

#[derive(Debug, Clone)]
pub struct ImageBucket {
    root: PathBuf,
    public_base_url: String,
}

impl ImageBucket {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(config.image_dir.clone(), config.public_base_url.clone())
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL of a stored file.
    #[must_use]
    pub fn public_url(&self, file_name: &str) -> String {
        format!("{}/{file_name}", self.public_base_url)
    }

    /// Writes `bytes` under a fresh unique name derived from `original_name`.
    pub async fn upload(&self, original_name: &str, bytes: &[u8]) -> Result<StoredImage> {
        let file_name = format!("{}-{}", Uuid::new_v4(), sanitize_file_name(original_name));
        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&file_name), bytes).await?;

        tracing::info!(file_name, size = bytes.len(), "Stored product image");
        Ok(StoredImage {
            public_url: self.public_url(&file_name),
            file_name,
        })
    }
}

/// Keeps the last path component and replaces anything outside
/// `[A-Za-z0-9._-]` with `_`.
fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}
