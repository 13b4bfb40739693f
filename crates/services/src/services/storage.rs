//! File storage used by the backup guard, self-edit and the static page.
//!
//! Production code goes through [`LocalFileStorage`]; tests substitute
//! [`MemoryFileStorage`] so nothing touches the real disk.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::Mutex,
};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0}: not found")]
    NotFound(PathBuf),
}

impl StorageError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            StorageError::NotFound(path.to_path_buf())
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }
}

#[async_trait]
pub trait FileStorage: Send + Sync {
    async fn exists(&self, path: &Path) -> bool;

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError>;

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError>;

    /// Replace the whole file with `contents`.
    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError>;

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        let contents = self.read(from).await?;
        self.write(to, &contents).await
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileStorage;

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn exists(&self, path: &Path) -> bool {
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        tokio::fs::read(path)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| StorageError::io(path, e))
    }

    async fn copy(&self, from: &Path, to: &Path) -> Result<(), StorageError> {
        tokio::fs::copy(from, to)
            .await
            .map(|_| ())
            .map_err(|e| StorageError::io(from, e))
    }
}

/// In-memory filesystem. Directories are tracked separately from files so
/// `exists` answers for both.
#[derive(Debug, Default)]
pub struct MemoryFileStorage {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<HashSet<PathBuf>>,
}

impl MemoryFileStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) -> Self {
        self.insert(path, contents);
        self
    }

    pub fn insert(&self, path: impl Into<PathBuf>, contents: impl Into<Vec<u8>>) {
        let path = path.into();
        if let Some(parent) = path.parent() {
            self.lock_dirs().insert(parent.to_path_buf());
        }
        self.lock_files().insert(path, contents.into());
    }

    pub fn contents(&self, path: &Path) -> Option<Vec<u8>> {
        self.lock_files().get(path).cloned()
    }

    pub fn file_count(&self) -> usize {
        self.lock_files().len()
    }

    fn lock_files(&self) -> std::sync::MutexGuard<'_, HashMap<PathBuf, Vec<u8>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_dirs(&self) -> std::sync::MutexGuard<'_, HashSet<PathBuf>> {
        self.dirs.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl FileStorage for MemoryFileStorage {
    async fn exists(&self, path: &Path) -> bool {
        self.lock_files().contains_key(path) || self.lock_dirs().contains(path)
    }

    async fn create_dir(&self, path: &Path) -> Result<(), StorageError> {
        self.lock_dirs().insert(path.to_path_buf());
        Ok(())
    }

    async fn read(&self, path: &Path) -> Result<Vec<u8>, StorageError> {
        self.lock_files()
            .get(path)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_path_buf()))
    }

    async fn write(&self, path: &Path, contents: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() && !self.lock_dirs().contains(parent) {
                return Err(StorageError::NotFound(parent.to_path_buf()));
            }
        }
        self.lock_files().insert(path.to_path_buf(), contents.to_vec());
        Ok(())
    }
}
