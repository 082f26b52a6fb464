//! In-memory store — useful for testing and ephemeral sessions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use envhub_core::error::StorageError;
use envhub_core::file::{FileContent, FileRecord, is_file_entry};
use envhub_core::store::FileStore;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;

struct StoredFile {
    data: Vec<u8>,
    updated_at: DateTime<Utc>,
}

/// A store keeping every namespace in a map. Missing namespaces behave like
/// missing directories: listing them fails, writing creates them.
pub struct MemoryFileStore {
    namespaces: RwLock<HashMap<String, BTreeMap<String, StoredFile>>>,
}

impl MemoryFileStore {
    pub fn new() -> Self {
        Self {
            namespaces: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryFileStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FileStore for MemoryFileStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn exists(&self, namespace: &str, name: &str) -> Result<bool, StorageError> {
        let namespaces = self.namespaces.read().await;
        Ok(namespaces
            .get(namespace)
            .is_some_and(|files| name.is_empty() || files.contains_key(name)))
    }

    async fn list(&self, namespace: &str) -> Result<Vec<String>, StorageError> {
        let namespaces = self.namespaces.read().await;
        let files = namespaces
            .get(namespace)
            .ok_or_else(|| StorageError::Io(format!("no such namespace: {namespace}")))?;
        Ok(files.keys().cloned().collect())
    }

    async fn list_files(&self, namespace: &str) -> Result<Vec<FileRecord>, StorageError> {
        let namespaces = self.namespaces.read().await;
        let files = namespaces
            .get(namespace)
            .ok_or_else(|| StorageError::Io(format!("no such namespace: {namespace}")))?;
        Ok(files
            .iter()
            .filter(|(name, _)| is_file_entry(name))
            .map(|(name, file)| FileRecord {
                filename: name.clone(),
                size: file.data.len() as u64,
                updated_at: file.updated_at,
            })
            .collect())
    }

    async fn make_dir(&self, namespace: &str) -> Result<(), StorageError> {
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default();
        Ok(())
    }

    async fn remove_dir(&self, namespace: &str) -> Result<(), StorageError> {
        self.namespaces.write().await.remove(namespace);
        Ok(())
    }

    async fn clear_dir(&self, namespace: &str) -> Result<(), StorageError> {
        if let Some(files) = self.namespaces.write().await.get_mut(namespace) {
            files.clear();
        }
        Ok(())
    }

    async fn read(&self, namespace: &str, name: &str) -> Result<String, StorageError> {
        let namespaces = self.namespaces.read().await;
        let file = namespaces
            .get(namespace)
            .and_then(|files| files.get(name))
            .ok_or_else(|| StorageError::NotFound { name: name.into() })?;
        String::from_utf8(file.data.clone())
            .map_err(|e| StorageError::Io(format!("{name}: {e}")))
    }

    async fn write(
        &self,
        namespace: &str,
        name: &str,
        content: FileContent,
    ) -> Result<(), StorageError> {
        let mut namespaces = self.namespaces.write().await;
        let files = namespaces.entry(namespace.to_string()).or_default();
        files.insert(
            name.to_string(),
            StoredFile {
                data: content.into_bytes(),
                updated_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn remove(&self, namespace: &str, name: &str) -> Result<(), StorageError> {
        let mut namespaces = self.namespaces.write().await;
        let removed = namespaces
            .get_mut(namespace)
            .and_then(|files| files.remove(name));
        match removed {
            Some(_) => Ok(()),
            None => Err(StorageError::NotFound { name: name.into() }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn write_and_read() {
        let store = MemoryFileStore::new();
        store.make_dir("env1").await.unwrap();
        store.write("env1", "a.txt", "hello".into()).await.unwrap();
        assert_eq!(store.read("env1", "a.txt").await.unwrap(), "hello");
    }

    #[tokio::test]
    async fn namespaces_are_isolated() {
        let store = MemoryFileStore::new();
        store.write("env1", "a.txt", "one".into()).await.unwrap();
        store.write("env2", "a.txt", "two".into()).await.unwrap();
        assert_eq!(store.read("env1", "a.txt").await.unwrap(), "one");
        assert_eq!(store.read("env2", "a.txt").await.unwrap(), "two");
    }

    #[tokio::test]
    async fn list_files_applies_extension_filter() {
        let store = MemoryFileStore::new();
        store.write("env1", "a.txt", "x".into()).await.unwrap();
        store.write("env1", "sub", "not a file".into()).await.unwrap();

        let records = store.list_files("env1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].filename, "a.txt");
    }

    #[tokio::test]
    async fn remove_missing_is_not_found() {
        let store = MemoryFileStore::new();
        store.make_dir("env1").await.unwrap();
        let err = store.remove("env1", "ghost.txt").await.unwrap_err();
        assert!(matches!(err, StorageError::NotFound { .. }));
    }

    #[tokio::test]
    async fn clear_dir_keeps_namespace() {
        let store = MemoryFileStore::new();
        store.write("env1", "a.txt", "x".into()).await.unwrap();
        store.clear_dir("env1").await.unwrap();
        assert!(store.list("env1").await.unwrap().is_empty());
        assert!(store.exists("env1", "").await.unwrap());
    }

    #[tokio::test]
    async fn remove_dir_drops_namespace() {
        let store = MemoryFileStore::new();
        store.write("env1", "a.txt", "x".into()).await.unwrap();
        store.remove_dir("env1").await.unwrap();
        assert!(store.list("env1").await.is_err());
    }
}
