//! Module entries and the Wasm module reference attached to them.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fmt;

use crate::config::DEFAULT_NAMESPACE;

/// A module declared in the tenant manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    /// Module name, unique within its namespace.
    pub name: String,

    /// Namespace the module belongs to.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Source language (informational).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Version reference used when computing the FQMN.
    #[serde(default, rename = "ref", skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,

    /// Fully-qualified module name. Filled in on decode when absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fqmn: String,

    /// Fields this model does not interpret, kept for re-encoding.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,

    /// Binary payload bound to this module when loaded from a bundle.
    #[serde(skip)]
    pub wasm_ref: Option<WasmModuleRef>,
}

fn default_namespace() -> String {
    DEFAULT_NAMESPACE.to_string()
}

impl Module {
    /// Create a module in the given namespace with no FQMN yet.
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            lang: None,
            reference: None,
            fqmn: String::new(),
            extra: BTreeMap::new(),
            wasm_ref: None,
        }
    }

    /// Set the version reference.
    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    /// Set an explicit FQMN.
    pub fn with_fqmn(mut self, fqmn: impl Into<String>) -> Self {
        self.fqmn = fqmn.into();
        self
    }

    /// Whether a binary payload has been attached.
    pub fn is_resolved(&self) -> bool {
        self.wasm_ref.is_some()
    }
}

/// Raw Wasm bytes bound to a manifest module.
///
/// Carries the archive entry name the bytes came from and the FQMN of
/// the module they were bound to.
#[derive(Clone, PartialEq, Eq)]
pub struct WasmModuleRef {
    name: String,
    fqmn: String,
    data: Vec<u8>,
}

impl WasmModuleRef {
    /// Create a module reference.
    pub fn new(name: impl Into<String>, fqmn: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            fqmn: fqmn.into(),
            data,
        }
    }

    /// Archive entry name the bytes were read from.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// FQMN of the module this reference is bound to.
    pub fn fqmn(&self) -> &str {
        &self.fqmn
    }

    /// Raw module bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Consume the reference, returning the raw bytes.
    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Size of the module in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the module payload is empty.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// SHA-256 of the module bytes (64 hex characters).
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.data);
        hex::encode(hasher.finalize())
    }
}

impl fmt::Debug for WasmModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WasmModuleRef")
            .field("name", &self.name)
            .field("fqmn", &self.fqmn)
            .field("bytes", &self.data.len())
            .finish()
    }
}
