//! Error types for tenant manifest decoding.

use thiserror::Error;

/// Errors that can occur while decoding or encoding a tenant manifest.
#[derive(Error, Debug)]
pub enum TenantError {
    /// Manifest bytes were empty or whitespace only
    #[error("tenant manifest is empty")]
    Empty,

    /// Manifest bytes are not valid UTF-8
    #[error("tenant manifest is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for tenant manifest operations.
pub type Result<T> = std::result::Result<T, TenantError>;
