//! Local filesystem store — one directory per environment.
//!
//! Every operation hits the disk directly; there is no caching layer.
//! Writes go through a create-then-append path; if any chunk fails the
//! partial target is removed so the file never reads as complete.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envhub_core::error::StorageError;
use envhub_core::file::{FileContent, FileRecord, is_file_entry};
use envhub_core::store::FileStore;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// A file store rooted at a base directory, with one subdirectory per
/// environment namespace.
pub struct LocalFileStore {
    root: PathBuf,
}

impl LocalFileStore {
    /// Create a store rooted at `root`. The root directory is created if
    /// missing.
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| io_err(&root, e))?;
        debug!(root = %root.display(), "Local file store opened");
        Ok(Self { root })
    }

    fn dir(&self, namespace: &str) -> PathBuf {
        self.root.join(namespace)
    }

    fn path(&self, namespace: &str, name: &str) -> PathBuf {
        self.root.join(namespace).join(name)
    }
}

fn io_err(path: &Path, e: std::io::Error) -> StorageError {
    StorageError::Io(format!("{}: {e}", path.display()))
}

#[async_trait]
impl FileStore for LocalFileStore {
    fn name(&self) -> &str {
        "local"
    }

    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StorageError> {
        Ok(self.path(namespace, name).exists())
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        let dir = self.dir(namespace);
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;

        let mut names: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        Ok(names)
    }

    async fn list_files(&self, namespace: &str) -> Result<Vec<FileRecord>, StorageError> {
        let mut records = Vec::new();
        for name in self.list(namespace).await? {
            if !is_file_entry(&name) {
                continue;
            }
            let path = self.path(namespace, &name);
            let metadata = std::fs::metadata(&path).map_err(|e| io_err(&path, e))?;
            let updated_at = metadata
                .modified()
                .map(DateTime::<Utc>::from)
                .unwrap_or_else(|_| Utc::now());
            records.push(FileRecord {
                filename: name,
                size: metadata.len(),
                updated_at,
            });
        }
        Ok(records)
    }

    async fn make_dir(&self, namespace: &str) -> Result<(), StorageError> {
        let dir = self.dir(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))
    }

    async fn remove_dir(&self, namespace: &str) -> Result<(), StorageError> {
        let dir = self.dir(namespace);
        if !dir.exists() {
            return Ok(());
        }
        std::fs::remove_dir_all(&dir).map_err(|e| io_err(&dir, e))
    }

    async fn clear_dir(&self, namespace: &str) -> Result<(), StorageError> {
        let dir = self.dir(namespace);
        if !dir.exists() {
            return Ok(());
        }
        let entries = std::fs::read_dir(&dir).map_err(|e| io_err(&dir, e))?;
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            let result = if path.is_dir() {
                std::fs::remove_dir_all(&path)
            } else {
                std::fs::remove_file(&path)
            };
            result.map_err(|e| io_err(&path, e))?;
        }
        Ok(())
    }

    async fn read(&self, namespace: &str, name: &str) -> Result<String, StorageError> {
        let path = self.path(namespace, name);
        if !path.exists() {
            return Err(StorageError::NotFound { name: name.into() });
        }
        std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))
    }

    async fn write(
        &self,
        namespace: &str,
        name: &str,
        content: FileContent,
    ) -> Result<(), StorageError> {
        let dir = self.dir(namespace);
        std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
        let path = self.path(namespace, name);

        let result = match content {
            FileContent::Text(text) => std::fs::write(&path, text.as_bytes()),
            FileContent::Chunks(chunks) => write_chunks(&path, chunks),
        };

        if let Err(e) = result {
            // A failed write must not leave a target that reads as complete.
            if std::fs::remove_file(&path).is_err() {
                warn!(path = %path.display(), "Could not remove partial write");
            }
            return Err(io_err(&path, e));
        }
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> Result<(), StorageError> {
        let path = self.path(namespace, name);
        if !path.exists() {
            return Err(StorageError::NotFound { name: name.into() });
        }
        std::fs::remove_file(&path).map_err(|e| io_err(&path, e))
    }
}

fn write_chunks(path: &Path, chunks: Vec<bytes::Bytes>) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    for chunk in chunks {
        file.write_all(&chunk)?;
    }
    file.flush()
}
