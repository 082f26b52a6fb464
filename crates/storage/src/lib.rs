//! File storage backends for envhub.
//!
//! All stores implement the `envhub_core::FileStore` trait.

pub mod local;
pub mod memory;

pub use local::LocalFileStore;
pub use memory::MemoryFileStore;
