//! # envhub Core
//!
//! Domain types, traits, and error definitions for the envhub environment
//! backend. This crate has **zero framework dependencies** — it defines the
//! domain model that all other crates implement against.
//!
//! An *environment* is a named workspace combining a file namespace and one
//! conversation with a language model. The capability seams are traits here:
//! `FileStore` for durable file storage, `ModelGateway` for the model backend.
//! Implementations live in their respective crates, all depending inward on
//! this one.

pub mod error;
pub mod file;
pub mod gateway;
pub mod message;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use error::{Error, GatewayError, Result, StorageError};
pub use file::{FileContent, FileRecord, is_file_entry};
pub use gateway::{ChatReply, ModelGateway};
pub use message::{Conversation, DEFAULT_SYSTEM_PROMPT, Message, Role};
pub use store::FileStore;
