//! File domain types.
//!
//! `FileRecord` describes a stored file as derived from the backing store —
//! it is never persisted as an object. `FileContent` is the tagged input to
//! write operations: callers choose the whole-content path or the chunked
//! path explicitly by constructing the matching variant.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Filename, size, and modification time of a stored file.
///
/// Serialized camelCase (`updatedAt`) to match the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub filename: String,
    pub size: u64,
    pub updated_at: DateTime<Utc>,
}

/// Content handed to a write operation.
#[derive(Debug, Clone)]
pub enum FileContent {
    /// A complete text buffer, written in one piece.
    Text(String),
    /// A finite ordered sequence of byte chunks, written in order to the
    /// same target.
    Chunks(Vec<Bytes>),
}

impl FileContent {
    /// Flatten into a single byte buffer.
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            FileContent::Text(s) => s.into_bytes(),
            FileContent::Chunks(chunks) => {
                let mut buf = Vec::with_capacity(chunks.iter().map(Bytes::len).sum());
                for chunk in chunks {
                    buf.extend_from_slice(&chunk);
                }
                buf
            }
        }
    }

    /// Total length in bytes.
    pub fn len(&self) -> usize {
        match self {
            FileContent::Text(s) => s.len(),
            FileContent::Chunks(chunks) => chunks.iter().map(Bytes::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<&str> for FileContent {
    fn from(s: &str) -> Self {
        FileContent::Text(s.to_string())
    }
}

impl From<String> for FileContent {
    fn from(s: String) -> Self {
        FileContent::Text(s)
    }
}

/// Whether a directory entry counts as a file in listings.
///
/// An entry with no extension marker is treated as a directory and excluded.
/// `"sub"` and `".gitignore"` are not files; `"a.txt"` is.
pub fn is_file_entry(name: &str) -> bool {
    Path::new(name).extension().is_some()
}
