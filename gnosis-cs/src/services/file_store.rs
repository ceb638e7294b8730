//! File store gateway
//!
//! Narrow interface over the remote file store that holds image bytes and
//! dataset artifacts. Paths are POSIX strings rooted at a fixed prefix
//! (`/files` by default). Calls are single-shot: no retries, no caching.

use async_trait::async_trait;
use gnosis_common::db::{Image, Profile};
use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;
use uuid::Uuid;

pub const DEFAULT_REMOTE_ROOT: &str = "/files";

/// File store errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Transport failure or store-side error
    #[error("File store unavailable: {0}")]
    Unavailable(String),

    /// Local upload source does not exist
    #[error("Local source not found: {0}")]
    NotFound(String),

    /// Remote file does not exist
    #[error("Remote file not found: {0}")]
    RemoteNotFound(String),

    #[error("Invalid remote path: {0}")]
    InvalidPath(String),
}

/// What to upload
#[derive(Debug)]
pub enum PutSource<'a> {
    LocalFile(&'a Path),
    Buffer(Vec<u8>),
}

/// Gateway to the remote file store
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Create a directory and its parents. Existing directories are fine.
    async fn ensure_dir(&self, remote_dir: &str) -> Result<(), StoreError>;

    /// Upload, overwriting any existing file at `remote_path`
    async fn put(&self, source: PutSource<'_>, remote_path: &str) -> Result<(), StoreError>;

    /// Download a whole file into memory
    async fn get(&self, remote_path: &str) -> Result<Vec<u8>, StoreError>;

    async fn delete(&self, remote_path: &str) -> Result<(), StoreError>;

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError>;
}

/// Reject empty paths and `..` segments
pub fn validate_remote_path(remote_path: &str) -> Result<(), StoreError> {
    if remote_path.trim().is_empty() || remote_path.split('/').any(|segment| segment == "..") {
        return Err(StoreError::InvalidPath(remote_path.to_string()));
    }
    Ok(())
}

/// Where things live on the file store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: String,
}

impl StoreLayout {
    pub fn new(root: impl Into<String>) -> Self {
        let root = root.into();
        let trimmed = root.trim_end_matches('/');
        Self {
            root: if trimmed.is_empty() { "/".to_string() } else { trimmed.to_string() },
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    fn join(&self, relative: &str) -> String {
        let relative = relative.trim_start_matches('/');
        if self.root == "/" {
            format!("/{}", relative)
        } else {
            format!("{}/{}", self.root, relative)
        }
    }

    /// Directory holding a profile's reference images: `<root>/<userId>/<profileId>`
    pub fn profile_dir(&self, user_id: &str, profile_id: Uuid) -> String {
        self.join(&format!("{}/{}", user_id, profile_id))
    }

    /// Remote path of one reference image
    pub fn image_path(&self, profile: &Profile, image: &Image) -> String {
        format!(
            "{}/{}",
            self.profile_dir(&profile.user_id, profile.id),
            image.image_file.trim_start_matches('/')
        )
    }

    /// Dataset artifact name recorded on the group
    pub fn dataset_name(group_id: Uuid) -> String {
        format!("{}.json", group_id)
    }

    /// Remote path of a dataset artifact given its recorded name
    pub fn dataset_path(&self, dataset: &str) -> String {
        self.join(dataset)
    }
}

impl Default for StoreLayout {
    fn default() -> Self {
        Self::new(DEFAULT_REMOTE_ROOT)
    }
}

/// File store backed by a local directory (mounted share or plain disk)
///
/// Remote path `/files/a.json` maps to `<base>/files/a.json`.
#[derive(Debug, Clone)]
pub struct LocalFileStore {
    base: PathBuf,
}

impl LocalFileStore {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    fn resolve(&self, remote_path: &str) -> Result<PathBuf, StoreError> {
        validate_remote_path(remote_path)?;
        Ok(self.base.join(remote_path.trim_start_matches('/')))
    }
}

fn remote_io_error(err: std::io::Error, remote_path: &str) -> StoreError {
    if err.kind() == IoErrorKind::NotFound {
        StoreError::RemoteNotFound(remote_path.to_string())
    } else {
        StoreError::Unavailable(format!("{}: {}", remote_path, err))
    }
}

#[async_trait]
impl FileStore for LocalFileStore {
    async fn ensure_dir(&self, remote_dir: &str) -> Result<(), StoreError> {
        let dir = self.resolve(remote_dir)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_dir, e)))
    }

    async fn put(&self, source: PutSource<'_>, remote_path: &str) -> Result<(), StoreError> {
        let target = self.resolve(remote_path)?;

        let bytes = match source {
            PutSource::Buffer(bytes) => bytes,
            PutSource::LocalFile(path) => tokio::fs::read(path).await.map_err(|e| {
                if e.kind() == IoErrorKind::NotFound {
                    StoreError::NotFound(path.display().to_string())
                } else {
                    StoreError::Unavailable(format!("{}: {}", path.display(), e))
                }
            })?,
        };

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_path, e)))?;
        }

        // Write then rename so readers never see a half-written file
        let file_name = target
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| StoreError::InvalidPath(remote_path.to_string()))?;
        let staging = target.with_file_name(format!("{}.part", file_name));
        tokio::fs::write(&staging, &bytes)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_path, e)))?;
        tokio::fs::rename(&staging, &target)
            .await
            .map_err(|e| StoreError::Unavailable(format!("{}: {}", remote_path, e)))?;

        tracing::debug!(remote_path, bytes = bytes.len(), "Uploaded file");
        Ok(())
    }

    async fn get(&self, remote_path: &str) -> Result<Vec<u8>, StoreError> {
        let path = self.resolve(remote_path)?;
        tokio::fs::read(&path)
            .await
            .map_err(|e| remote_io_error(e, remote_path))
    }

    async fn delete(&self, remote_path: &str) -> Result<(), StoreError> {
        let path = self.resolve(remote_path)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| remote_io_error(e, remote_path))
    }

    async fn rename(&self, from: &str, to: &str) -> Result<(), StoreError> {
        let source = self.resolve(from)?;
        let target = self.resolve(to)?;
        tokio::fs::rename(&source, &target)
            .await
            .map_err(|e| remote_io_error(e, from))
    }
}
