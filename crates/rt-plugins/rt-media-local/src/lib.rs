//! # rt-media-local
//! rusty-threads/crates/rt-plugins/rt-media-local/src/lib.rs
//! Local filesystem implementation of `MediaUploader`.
//! Uploads are checked to be decodable images and stored at their public id.

use async_trait::async_trait;
use image::ImageReader;
use rt_core::error::{AppError, Result};
use rt_core::traits::MediaUploader;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use tokio::fs;

pub struct LocalMediaUploader {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/static/uploads")
    url_prefix: String,
}

impl LocalMediaUploader {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Maps a public id such as `threads/u1/t1` onto a path below the root.
    /// Anything that could escape the root is refused.
    fn target_path(&self, public_id: &str, extension: &str) -> Result<PathBuf> {
        let relative = Path::new(public_id);
        let safe = !public_id.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !safe {
            return Err(AppError::UploadFailed(format!("invalid public id '{public_id}'")));
        }
        Ok(self.root_path.join(format!("{public_id}.{extension}")))
    }
}

#[async_trait]
impl MediaUploader for LocalMediaUploader {
    #[tracing::instrument(skip(self, source), fields(source = %source.display()))]
    async fn upload(&self, source: &Path, public_id: &str) -> Result<String> {
        // 1. Read the asset
        let data = fs::read(source)
            .await
            .map_err(|e| AppError::UploadFailed(format!("cannot read {}: {e}", source.display())))?;

        // 2. Must be a real image
        let reader = ImageReader::new(Cursor::new(data.as_slice()))
            .with_guessed_format()
            .map_err(|e| AppError::UploadFailed(e.to_string()))?;
        let format = reader
            .format()
            .ok_or_else(|| AppError::UploadFailed("unsupported media type".into()))?;
        reader
            .decode()
            .map_err(|e| AppError::UploadFailed(format!("corrupt image: {e}")))?;
        let extension = format.extensions_str().first().copied().unwrap_or("bin");

        // 3. Store under the public id (re-uploading the same id replaces it)
        let target = self.target_path(public_id, extension)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| AppError::UploadFailed(e.to_string()))?;
        }
        fs::write(&target, &data)
            .await
            .map_err(|e| AppError::UploadFailed(e.to_string()))?;

        let url = format!("{}/{public_id}.{extension}", self.url_prefix);
        tracing::info!(%url, bytes = data.len(), "media stored");
        Ok(url)
    }
}
