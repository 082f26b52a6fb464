//! FileStore trait — the abstraction over per-environment file storage.
//!
//! A store persists named blobs under a per-environment namespace. Every call
//! hits the backing medium directly; there is no caching layer. Implementations
//! live in `envhub-storage` (local filesystem, in-memory).

use async_trait::async_trait;
use crate::error::StorageError;
use crate::file::{FileContent, FileRecord};

/// Per-environment file storage.
///
/// `remove` fails with `NotFound` on a missing file — idempotent-delete
/// semantics, where wanted, belong to the caller. A write that fails partway
/// must not leave a file that reads as complete; callers treat any failed
/// write as "file absent or corrupt" and retry wholesale.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// A human-readable name for this store (e.g., "local", "in_memory").
    fn name(&self) -> &str;

    /// Whether `name` exists under `namespace`.
    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StorageError>;

    /// Raw directory listing of `namespace`, in stable order.
    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError>;

    /// File records for `namespace`: the raw listing minus entries with no
    /// extension marker, each remaining entry stat-ed.
    async fn list_files(&self, namespace: &str) -> Result<Vec<FileRecord>, StorageError>;

    /// Create the namespace. No-op if it already exists.
    async fn make_dir(&self, namespace: &str) -> Result<(), StorageError>;

    /// Remove the namespace and its contents. No-op if absent.
    async fn remove_dir(&self, namespace: &str) -> Result<(), StorageError>;

    /// Remove the namespace's contents but keep it addressable.
    async fn clear_dir(&self, namespace: &str) -> Result<(), StorageError>;

    /// Read the full content of `name`. `NotFound` if absent.
    async fn read(&self, namespace: &str, name: &str) -> Result<String, StorageError>;

    /// Write `content` to `name`, overwriting any prior content.
    async fn write(
        &self,
        namespace: &str,
        name: &str,
        content: FileContent,
    ) -> Result<(), StorageError>;

    /// Delete `name`. `NotFound` if absent.
    async fn remove(&self, namespace: &str, name: &str) -> Result<(), StorageError>;
}
