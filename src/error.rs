//! Error types for configuration and startup

use crate::jwt::key_set::KeySetError;

/// Crate-level error type
///
/// Request-time failures are reported as [`AuthError`](crate::auth::AuthError);
/// this type covers everything around them: loading configuration, building
/// the key set client and prefetching keys.
#[derive(Debug, thiserror::Error)]
pub enum CastingError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Key set error: {0}")]
    KeySet(#[from] KeySetError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, CastingError>;
