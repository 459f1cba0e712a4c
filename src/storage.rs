use std::io;
use std::path::{Component, Path, PathBuf};

use anyhow::Context;

use crate::domain::{self, Post};
use crate::error::{Error, Result};

/// Filesystem-backed blob store for uploaded media.
///
/// Every blob lives under the per-post directory computed by
/// `domain::media_dir`, so ownership is encoded in the path itself and
/// cleanup is a single directory removal.
#[derive(Debug, Clone)]
pub struct MediaStore {
    root: PathBuf,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Store an uploaded file for a post, returning the stable relative path
    #[tracing::instrument(name = "Store media file", skip(self, post, bytes), fields(post_id = %post.id))]
    pub async fn store(&self, post: &Post, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let filename = sanitize_filename(filename)?;
        let relative = domain::resolve_upload_path(post, filename);
        let full = self.root.join(&relative);

        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .context("Failed to create media directory")?;
        }
        tokio::fs::write(&full, bytes)
            .await
            .context("Failed to write media file")?;

        Ok(relative)
    }

    /// Remove every blob owned by a post.
    ///
    /// Invoked synchronously by the deletion path once the owning row is
    /// gone. A missing directory just means the post never had uploads.
    #[tracing::instrument(name = "Remove post media", skip(self, post), fields(post_id = %post.id))]
    pub async fn remove_post_media(&self, post: &Post) -> Result<()> {
        let dir = self.root.join(domain::media_dir(post));

        match tokio::fs::remove_dir_all(&dir).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(anyhow::Error::new(e)
                .context("Failed to remove media directory")
                .into()),
        }
    }
}

/// Uploaded filenames must be a single plain path component; anything that
/// could escape the media root (absolute paths, `..`, separators) is rejected.
fn sanitize_filename(filename: &str) -> Result<&str> {
    let mut components = Path::new(filename).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(filename),
        _ => Err(Error::Validation("Invalid upload filename".into())),
    }
}
