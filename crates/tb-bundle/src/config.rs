//! Bundle configuration.
//!
//! Resolution order: explicit file → `TB_BUNDLE_CONFIG` file → per-field
//! environment variables → defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::path::DEFAULT_MODULE_EXTENSION;
use crate::{BundleError, Result};

/// Environment variable names.
const ENV_CONFIG_PATH: &str = "TB_BUNDLE_CONFIG";
const ENV_MODULE_EXT: &str = "TB_BUNDLE_MODULE_EXT";
const ENV_FILE_MODE: &str = "TB_BUNDLE_FILE_MODE";
const ENV_STATIC_CACHE: &str = "TB_BUNDLE_STATIC_CACHE";
const ENV_MAX_ENTRY_BYTES: &str = "TB_BUNDLE_MAX_ENTRY_BYTES";

/// Default permissions for written bundles (build-pipeline artifacts).
pub const DEFAULT_FILE_MODE: u32 = 0o777;

/// Default per-entry decompressed size limit (256 MiB).
pub const DEFAULT_MAX_ENTRY_BYTES: u64 = 256 * 1024 * 1024;

/// Compression applied to archive entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// Deflate (default).
    #[default]
    Deflated,
    /// No compression.
    Stored,
}

impl From<Compression> for zip::CompressionMethod {
    fn from(compression: Compression) -> Self {
        match compression {
            Compression::Deflated => zip::CompressionMethod::Deflated,
            Compression::Stored => zip::CompressionMethod::Stored,
        }
    }
}

/// Settings shared by the writer, reader and resolved bundles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BundleConfig {
    /// Suffix identifying binary module entries.
    pub module_extension: String,

    /// Unix permissions applied to written bundle files.
    pub file_mode: u32,

    /// Entry compression.
    pub compression: Compression,

    /// Static file contents cached per bundle; 0 disables caching so
    /// every request re-reads the archive.
    pub static_cache_capacity: usize,

    /// Maximum decompressed size of a single entry.
    pub max_entry_bytes: u64,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            module_extension: DEFAULT_MODULE_EXTENSION.to_string(),
            file_mode: DEFAULT_FILE_MODE,
            compression: Compression::default(),
            static_cache_capacity: 0,
            max_entry_bytes: DEFAULT_MAX_ENTRY_BYTES,
        }
    }
}

impl BundleConfig {
    /// Set the module suffix.
    pub fn with_module_extension(mut self, extension: impl Into<String>) -> Self {
        self.module_extension = extension.into();
        self
    }

    /// Set output file permissions.
    pub fn with_file_mode(mut self, mode: u32) -> Self {
        self.file_mode = mode;
        self
    }

    /// Set entry compression.
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Enable the static file cache with the given capacity.
    pub fn with_static_cache(mut self, capacity: usize) -> Self {
        self.static_cache_capacity = capacity;
        self
    }

    /// Set the per-entry size limit.
    pub fn with_max_entry_bytes(mut self, limit: u64) -> Self {
        self.max_entry_bytes = limit;
        self
    }

    /// Load from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| BundleError::io(path, e))?;
        let config: Self = serde_json::from_str(&content).map_err(|e| {
            BundleError::Config(format!("invalid JSON in {}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve configuration from an optional explicit file and the environment.
    ///
    /// An explicit path wins over `TB_BUNDLE_CONFIG`. Per-field environment
    /// variables are applied on top of whichever file (or defaults) was used.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        let file = explicit
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(ENV_CONFIG_PATH).map(PathBuf::from));

        let base = match file {
            Some(path) => Self::from_json_file(&path)?,
            None => Self::default(),
        };

        let config = base.apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults plus per-field environment overrides.
    pub fn from_env() -> Result<Self> {
        let config = Self::default().apply_env_overrides(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        if let Some(ext) = lookup(ENV_MODULE_EXT) {
            self.module_extension = ext;
        }

        if let Some(mode) = lookup(ENV_FILE_MODE) {
            let digits = mode.trim_start_matches("0o");
            self.file_mode = u32::from_str_radix(digits, 8).map_err(|_| {
                BundleError::Config(format!("{ENV_FILE_MODE} is not an octal mode: {mode}"))
            })?;
        }

        if let Some(capacity) = lookup(ENV_STATIC_CACHE) {
            self.static_cache_capacity = capacity.parse().map_err(|_| {
                BundleError::Config(format!("{ENV_STATIC_CACHE} is not a count: {capacity}"))
            })?;
        }

        if let Some(limit) = lookup(ENV_MAX_ENTRY_BYTES) {
            self.max_entry_bytes = limit.parse().map_err(|_| {
                BundleError::Config(format!("{ENV_MAX_ENTRY_BYTES} is not a byte count: {limit}"))
            })?;
        }

        Ok(self)
    }

    /// Check the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        let ext = self.module_extension.as_str();
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(BundleError::Config(format!(
                "module extension must look like '.wasm', got '{ext}'"
            )));
        }

        if ext.contains('/') {
            return Err(BundleError::Config(format!(
                "module extension must not contain '/', got '{ext}'"
            )));
        }

        if self.file_mode > 0o7777 {
            return Err(BundleError::Config(format!(
                "file mode {:o} is out of range",
                self.file_mode
            )));
        }

        if self.max_entry_bytes == 0 {
            return Err(BundleError::Config(
                "max_entry_bytes must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}
