//! # Download Staging
//!
//! Each sync task downloads its archive into a private [`StagingFile`] before
//! uploading it. File names embed the item id plus a random UUID, so two tasks
//! never share a path, not even two tasks for the same item.
//!
//! A staging file is removed by [`StagingFile::release`]. If the owning task
//! unwinds before reaching it, `Drop` removes the file synchronously.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bridge_traits::catalog::ItemId;
use bridge_traits::http::ByteStream;
use bridge_traits::storage::FileSystemAccess;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{Result, SyncError};

const STAGING_SUFFIX: &str = "part";

/// Directory that hands out per-task staging files
pub struct StagingArea {
    fs: Arc<dyn FileSystemAccess>,
    dir: PathBuf,
}

impl StagingArea {
    pub fn new(fs: Arc<dyn FileSystemAccess>, dir: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            dir: dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Create the staging directory if it does not exist yet
    pub async fn prepare(&self) -> Result<()> {
        self.fs
            .create_dir_all(&self.dir)
            .await
            .map_err(|e| SyncError::Download(format!("cannot create staging directory: {}", e)))
    }

    /// Reserve a fresh staging path for `item_id`
    ///
    /// Nothing is written until [`StagingFile::fill_from`] is called.
    pub fn allocate(&self, item_id: ItemId) -> StagingFile {
        let name = format!("{}-{}.{}", item_id, Uuid::new_v4(), STAGING_SUFFIX);
        StagingFile {
            fs: Arc::clone(&self.fs),
            path: self.dir.join(name),
            released: false,
        }
    }
}

/// A task-owned temporary file holding one downloaded archive
pub struct StagingFile {
    fs: Arc<dyn FileSystemAccess>,
    path: PathBuf,
    released: bool,
}

impl StagingFile {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Stream `source` into the file, returning the number of bytes written
    pub async fn fill_from(&self, mut source: ByteStream) -> Result<u64> {
        let mut sink = self
            .fs
            .open_write_stream(&self.path)
            .await
            .map_err(|e| SyncError::Download(format!("cannot open staging file: {}", e)))?;

        let written = tokio::io::copy(&mut source, &mut sink)
            .await
            .map_err(|e| SyncError::Download(format!("transfer interrupted: {}", e)))?;

        sink.flush()
            .await
            .map_err(|e| SyncError::Download(format!("cannot flush staging file: {}", e)))?;
        sink.shutdown()
            .await
            .map_err(|e| SyncError::Download(format!("cannot close staging file: {}", e)))?;

        debug!(path = ?self.path, bytes = written, "Staged download");
        Ok(written)
    }

    /// Size of the staged file on disk
    pub async fn size(&self) -> Result<u64> {
        self.fs
            .metadata(&self.path)
            .await
            .map(|m| m.size)
            .map_err(|e| SyncError::Download(format!("cannot stat staging file: {}", e)))
    }

    /// Open the staged bytes for upload
    pub async fn open(&self) -> Result<ByteStream> {
        self.fs
            .open_read_stream(&self.path)
            .await
            .map_err(|e| SyncError::Upload {
                key: self.path.display().to_string(),
                message: format!("cannot open staging file: {}", e),
            })
    }

    /// Delete the file. Missing files count as released.
    pub async fn release(mut self) -> Result<()> {
        let exists = self
            .fs
            .exists(&self.path)
            .await
            .map_err(|e| SyncError::Download(e.to_string()))?;
        if exists {
            self.fs
                .delete_file(&self.path)
                .await
                .map_err(|e| SyncError::Download(format!("cannot delete staging file: {}", e)))?;
            debug!(path = ?self.path, "Released staging file");
        }
        self.released = true;
        Ok(())
    }
}

impl Drop for StagingFile {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = ?self.path, "Removed staging file on drop"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = ?self.path, error = %e, "Failed to remove staging file"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bridge_desktop::TokioFileSystem;
    use tokio::io::AsyncReadExt;

    fn area(dir: &Path) -> StagingArea {
        let fs: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::new());
        StagingArea::new(fs, dir.join("staging"))
    }

    #[tokio::test]
    async fn test_paths_are_unique_per_allocation() {
        let root = tempfile::tempdir().unwrap();
        let area = area(root.path());

        let a = area.allocate(ItemId(42));
        let b = area.allocate(ItemId(42));

        assert_ne!(a.path(), b.path());
        let name = a.path().file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("42-"));
        assert!(name.ends_with(".part"));
    }

    #[tokio::test]
    async fn test_fill_open_release() {
        let root = tempfile::tempdir().unwrap();
        let area = area(root.path());
        area.prepare().await.unwrap();

        let file = area.allocate(ItemId(1));
        let source: ByteStream = Box::new(std::io::Cursor::new(b"zip-bytes".to_vec()));
        assert_eq!(file.fill_from(source).await.unwrap(), 9);
        assert_eq!(file.size().await.unwrap(), 9);

        let mut contents = Vec::new();
        file.open().await.unwrap().read_to_end(&mut contents).await.unwrap();
        assert_eq!(contents, b"zip-bytes");

        let path = file.path().to_path_buf();
        file.release().await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_release_without_content_is_ok() {
        let root = tempfile::tempdir().unwrap();
        let area = area(root.path());
        area.prepare().await.unwrap();

        let file = area.allocate(ItemId(3));
        file.release().await.unwrap();
    }

    #[tokio::test]
    async fn test_drop_removes_unreleased_file() {
        let root = tempfile::tempdir().unwrap();
        let area = area(root.path());
        area.prepare().await.unwrap();

        let file = area.allocate(ItemId(2));
        let source: ByteStream = Box::new(std::io::Cursor::new(vec![0u8; 64]));
        file.fill_from(source).await.unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());

        drop(file);
        assert!(!path.exists());
    }
}
