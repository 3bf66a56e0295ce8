//! Error types for the Papertrail domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each collaborator boundary has its own error enum so callers can decide
//! which failures to contain and which to surface.

use thiserror::Error;

/// The top-level error type for Papertrail operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Generation errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Paper store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Discovery errors ---
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures of the text-generation service.
///
/// These never escape the generation invoker; they are logged and collapsed
/// into an empty result there.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

/// Failures of the paper store. These are propagated to the caller.
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

/// Failures of the external discovery service.
#[derive(Debug, Clone, Error)]
pub enum DiscoveryError {
    #[error("Discovery request failed: {0}")]
    Network(String),

    #[error("Discovery service returned status {status_code}")]
    Upstream { status_code: u16 },

    #[error("Rate limited by discovery service")]
    RateLimited,

    #[error("Failed to parse discovery response: {0}")]
    Parse(String),
}
