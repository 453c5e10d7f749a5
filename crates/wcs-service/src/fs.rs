//! File system abstraction.
//!
//! The service never touches `std::fs` directly; all reads and writes go
//! through the [`FileSystem`] trait so embedders can substitute their own
//! provider, and tests can run fully in memory. File *watching* is likewise
//! external: changes arrive as [`FileChangeEvent`] values pushed into the
//! service.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Metadata the service cares about.
#[derive(Clone, Copy, Debug)]
pub struct FileMetadata {
    /// Creation time, when the platform exposes one.
    pub created: Option<SystemTime>,
}

/// Trait for file system operations.
///
/// Every method is a suspension point; implementations must not block the
/// scheduler.
#[async_trait::async_trait]
pub trait FileSystem: Send + Sync {
    /// Read the entire contents of a file.
    async fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Write a file, replacing any previous contents.
    async fn write(&self, path: &Path, content: &str) -> io::Result<()>;

    /// Check if a path exists.
    async fn exists(&self, path: &Path) -> bool;

    /// Check if a path is a file.
    async fn is_file(&self, path: &Path) -> bool;

    /// Get file metadata.
    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata>;
}

/// Standard file system implementation backed by `tokio::fs`.
pub struct OsFileSystem;

#[async_trait::async_trait]
impl FileSystem for OsFileSystem {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        tokio::fs::read_to_string(path).await
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, content).await
    }

    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn is_file(&self, path: &Path) -> bool {
        tokio::fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    async fn metadata(&self, path: &Path) -> io::Result<FileMetadata> {
        let metadata = tokio::fs::metadata(path).await?;
        Ok(FileMetadata {
            created: metadata.created().or_else(|_| metadata.modified()).ok(),
        })
    }
}

/// What happened to a watched file.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum FileChangeKind {
    Created,
    Changed,
    Deleted,
}

/// A single file change pushed in by the embedding application's watcher.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FileChangeEvent {
    pub path: PathBuf,
    pub kind: FileChangeKind,
}

impl FileChangeEvent {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, kind: FileChangeKind) -> Self {
        FileChangeEvent {
            path: path.into(),
            kind,
        }
    }
}

/// In-memory file system for tests and embedders without a disk.
#[derive(Default)]
pub struct InMemoryFileSystem {
    files: std::sync::Mutex<std::collections::HashMap<PathBuf, String>>,
}

impl InMemoryFileSystem {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl Into<PathBuf>, content: impl Into<String>) {
        self.files
            .lock()
            .expect("filesystem lock poisoned")
            .insert(path.into(), content.into());
    }

    pub fn remove_file(&self, path: &Path) {
        self.files
            .lock()
            .expect("filesystem lock poisoned")
            .remove(path);
    }

    #[must_use]
    pub fn contents(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .expect("filesystem lock poisoned")
            .get(path)
            .cloned()
    }
}

#[async_trait::async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.contents(path)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "file not found"))
    }

    async fn write(&self, path: &Path, content: &str) -> io::Result<()> {
        self.add_file(path, content);
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.contents(path).is_some()
    }

    async fn is_file(&self, path: &Path) -> bool {
        self.contents(path).is_some()
    }

    async fn metadata(&self, _path: &Path) -> io::Result<FileMetadata> {
        Ok(FileMetadata { created: None })
    }
}
