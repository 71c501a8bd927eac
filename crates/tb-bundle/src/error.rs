//! Error types for bundle operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during bundle operations.
#[derive(Error, Debug)]
pub enum BundleError {
    /// Caller supplied unusable input (e.g. empty manifest bytes)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// I/O error on the bundle file or its temporary sibling
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// ZIP container error
    #[error("archive error while {context}: {source}")]
    Archive {
        context: String,
        #[source]
        source: zip::result::ZipError,
    },

    /// Manifest bytes did not decode
    #[error("failed to decode manifest '{entry}': {source}")]
    Decode {
        entry: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Archive has no tenant.yaml
    #[error("bundle is missing tenant.yaml")]
    MissingManifest,

    /// A module entry has no matching manifest module
    #[error("unable to find module in manifest for {0}")]
    UnresolvedModule(String),

    /// Static file not present in the bundle index
    #[error("static file not found in bundle: {0}")]
    NotFound(String),

    /// Requested path tries to leave the static subtree
    #[error("path traversal rejected: {0}")]
    PathTraversal(String),

    /// Archive contents contradict what was indexed or bound at load time
    #[error("corrupted bundle: {0}")]
    Corrupt(String),

    /// Entry decompresses to more bytes than allowed
    #[error("entry '{entry}' exceeds the {limit} byte limit")]
    EntryTooLarge { entry: String, limit: u64 },

    /// Invalid bundle configuration
    #[error("invalid bundle configuration: {0}")]
    Config(String),
}

impl BundleError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        BundleError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn archive(context: impl Into<String>, source: zip::result::ZipError) -> Self {
        BundleError::Archive {
            context: context.into(),
            source,
        }
    }

    /// Whether this error means "the requested file is not there": an
    /// unindexed static path or an absent archive. A bundle without a
    /// manifest is malformed, not missing.
    pub fn is_not_found(&self) -> bool {
        match self {
            BundleError::NotFound(_) => true,
            BundleError::Io { source, .. } => source.kind() == std::io::ErrorKind::NotFound,
            _ => false,
        }
    }
}

/// Result type alias for bundle operations.
pub type Result<T> = std::result::Result<T, BundleError>;
