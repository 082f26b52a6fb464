//! Error types for the envhub domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all envhub operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Storage errors ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Model gateway errors ---
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    // --- Conversation budget ---
    #[error("Token limit of {limit} exceeded ({used} tokens used)")]
    TokenLimitExceeded { used: u64, limit: u64 },

    // --- Boundary validation ---
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Errors from the file storage layer.
///
/// `NotFound` is the only variant callers are allowed to absorb, and only on
/// delete. `Io` always propagates.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("File not found: {name}")]
    NotFound { name: String },

    #[error("I/O error: {0}")]
    Io(String),
}

/// Errors from the upstream model backend.
///
/// Transport and auth failures are distinct from `EmptyResponse`, which means
/// the call succeeded but the model returned nothing usable.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Model returned an empty response")]
    EmptyResponse,
}
