// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Filesystem store for change images.
//!
//! Uploads land under `<static root>/images/` and are served back through the
//! `/static` mount. Single-node only; the returned URL path is what callers
//! persist in `Change.image_url`.

use std::path::{Path, PathBuf};

use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct StoredImage {
    pub filename: String,
    pub url: String,
}

#[derive(Clone)]
pub struct ImageStore {
    images_dir: PathBuf,
}

impl ImageStore {
    /// `static_root` is the directory mounted at `/static`.
    pub fn new(static_root: impl Into<PathBuf>) -> Self {
        Self {
            images_dir: static_root.into().join("images"),
        }
    }

    pub async fn save(&self, filename: &str, data: &[u8]) -> Result<StoredImage, UploadError> {
        let name = sanitize_filename(filename)?;
        tokio::fs::create_dir_all(&self.images_dir).await?;
        tokio::fs::write(self.images_dir.join(&name), data).await?;
        Ok(StoredImage {
            url: format!("/static/images/{}", name),
            filename: name,
        })
    }
}

/// Strip any path components the client smuggled into the file name. Uploads
/// must not be able to write outside the images directory.
fn sanitize_filename(filename: &str) -> Result<String, UploadError> {
    let name = Path::new(filename)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if name.is_empty() || name == "." || name == ".." {
        return Err(UploadError::InvalidFileName(filename.to_string()));
    }
    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn saves_and_reports_static_url() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.save("shot.png", b"png-bytes").await.unwrap();
        assert_eq!(stored.filename, "shot.png");
        assert_eq!(stored.url, "/static/images/shot.png");

        let on_disk = tokio::fs::read(dir.path().join("images/shot.png"))
            .await
            .unwrap();
        assert_eq!(on_disk, b"png-bytes");
    }

    #[tokio::test]
    async fn strips_path_components_from_client_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());

        let stored = store.save("../../etc/passwd", b"x").await.unwrap();
        assert_eq!(stored.filename, "passwd");
        assert!(dir.path().join("images/passwd").exists());
    }

    #[tokio::test]
    async fn rejects_empty_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ImageStore::new(dir.path());
        assert!(store.save("", b"x").await.is_err());
        assert!(store.save("..", b"x").await.is_err());
    }
}
