use async_trait::async_trait;
use image::{imageops::FilterType, ImageFormat};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

use super::{BlobStore, IdentityProvider};
use crate::error::{AuthError, Error, Result};

/// Default longest edge of a stored cover, in pixels
pub const COVER_MAX_EDGE: u32 = 512;

const URL_SCHEME: &str = "file://";

/// Cover images on the local filesystem.
///
/// Layout: `<root>/users/<uid>/covers/<key>.jpg`. Picked images are decoded,
/// shrunk to fit `max_edge` and re-encoded as JPEG, so any format the
/// `image` crate reads can be used as a cover.
pub struct CoverStore {
    root: PathBuf,
    max_edge: u32,
    identity: Arc<dyn IdentityProvider>,
}

impl CoverStore {
    pub fn new(root: impl Into<PathBuf>, max_edge: u32, identity: Arc<dyn IdentityProvider>) -> Self {
        Self {
            root: root.into(),
            max_edge,
            identity,
        }
    }

    /// Cover directory of the signed-in user
    fn user_dir(&self) -> Result<PathBuf> {
        let user = self.identity.current_user_id().ok_or(AuthError::NotSignedIn)?;
        Ok(self.root.join("users").join(user).join("covers"))
    }

    /// Resolve a cover URL to a file inside the user's cover directory
    fn path_for_url(&self, url: &str) -> Result<PathBuf> {
        let dir = self.user_dir()?;
        let path = url
            .strip_prefix(URL_SCHEME)
            .map(PathBuf::from)
            .ok_or_else(|| Error::Write(format!("not a cover URL: {}", url)))?;

        if path.parent() != Some(dir.as_path()) {
            return Err(Error::Write(format!("cover {} does not belong to this user", url)));
        }
        Ok(path)
    }
}

/// URL handed out for a stored cover
pub fn cover_url(path: &Path) -> String {
    format!("{}{}", URL_SCHEME, path.display())
}

/// Keys become file names, so keep them to a single plain path segment
fn check_key(key: &str) -> Result<()> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(Error::Upload(format!("invalid cover key '{}'", key)))
    }
}

/// Decode `source`, fit it into `max_edge` and write it as JPEG to `dest`.
/// The file is written next to `dest` first and renamed into place, so a
/// failed write never leaves a half-written cover behind.
fn save_cover(source: &Path, dest: &Path, max_edge: u32) -> Result<()> {
    let img = image::open(source).map_err(Error::upload)?;

    let img = if img.width() > max_edge || img.height() > max_edge {
        img.resize(max_edge, max_edge, FilterType::Lanczos3)
    } else {
        img
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(Error::upload)?;
    }

    let partial = dest.with_extension("jpg.part");
    // JPEG has no alpha channel
    img.to_rgb8()
        .save_with_format(&partial, ImageFormat::Jpeg)
        .map_err(Error::upload)?;
    fs::rename(&partial, dest).map_err(Error::upload)?;

    Ok(())
}

#[async_trait]
impl BlobStore for CoverStore {
    async fn upload(&self, key: &str, local_image: &Path) -> Result<String> {
        check_key(key)?;
        let dest = self.user_dir()?.join(format!("{}.jpg", key));

        // Spawn blocking because decoding and resizing are CPU-intensive
        let source = local_image.to_path_buf();
        let target = dest.clone();
        let max_edge = self.max_edge;
        tokio::task::spawn_blocking(move || save_cover(&source, &target, max_edge))
            .await
            .map_err(|e| Error::Upload(format!("Task join error: {}", e)))??;

        tracing::info!(path = %dest.display(), "📸 Stored cover");
        Ok(cover_url(&dest))
    }

    async fn delete_by_url(&self, url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Ok(());
        }
        let path = self.path_for_url(url)?;

        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(path = %path.display(), "Deleted cover");
                Ok(())
            }
            // Already gone
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::write(e)),
        }
    }

    async fn delete_all(&self) -> Result<usize> {
        let dir = self.user_dir()?;
        if !dir.exists() {
            return Ok(0);
        }

        let mut deleted = 0;
        for entry in WalkDir::new(&dir).into_iter().filter_map(|e| e.ok()) {
            if entry.file_type().is_file() {
                fs::remove_file(entry.path()).map_err(Error::write)?;
                deleted += 1;
            }
        }
        fs::remove_dir_all(&dir).map_err(Error::write)?;

        tracing::info!(deleted, "🧹 Removed all covers for user");
        Ok(deleted)
    }
}
