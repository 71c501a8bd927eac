//! Bundle reader: decodes the manifest and binds module payloads to it.
//!
//! Reading takes two passes over the entry list because the manifest may
//! come after the modules that need it for resolution.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use tb_tenant::{TenantConfig, WasmModuleRef};
use tracing::{debug, info, warn};

use crate::archive::{ArchiveBackend, ZipBackend};
use crate::manifest::{ModuleEntry, TenantManifest};
use crate::path::{EntryKind, MANIFEST_FILE_NAME};
use crate::{Bundle, BundleConfig, BundleError, Result};

/// Reader for tenant bundles.
#[derive(Debug, Clone, Default)]
pub struct BundleReader {
    config: BundleConfig,
    backend: Option<Arc<dyn ArchiveBackend>>,
}

impl BundleReader {
    /// Create a reader with default configuration over ZIP archives.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given configuration.
    pub fn with_config(mut self, config: BundleConfig) -> Self {
        self.config = config;
        self
    }

    /// Use a specific archive backend instead of ZIP.
    pub fn with_backend(mut self, backend: Arc<dyn ArchiveBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Read and resolve the bundle at `path`.
    ///
    /// Fails with [`BundleError::MissingManifest`] if there is no
    /// `tenant.yaml`, [`BundleError::Decode`] if it does not decode, and
    /// [`BundleError::UnresolvedModule`] if any module entry has no
    /// matching manifest module. No partial bundle is ever returned.
    pub fn read<M: TenantManifest>(&self, path: &Path) -> Result<Bundle<M>> {
        self.config.validate()?;

        let backend = match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(ZipBackend::new(self.config.compression)) as Arc<dyn ArchiveBackend>,
        };
        let limit = self.config.max_entry_bytes;

        let mut archive = backend.open(path)?;
        let names = archive.entry_names().to_vec();

        // Pass 1: the manifest must be present and decode before anything else.
        let manifest_index = names
            .iter()
            .position(|name| name == MANIFEST_FILE_NAME)
            .ok_or(BundleError::MissingManifest)?;
        let manifest_bytes = archive.read_entry(manifest_index, limit)?;
        let mut manifest = M::decode(&manifest_bytes).map_err(|e| BundleError::Decode {
            entry: MANIFEST_FILE_NAME.to_string(),
            source: Box::new(e),
        })?;

        // Pass 2: classify everything else.
        let mut static_index = BTreeMap::new();
        let mut bound = HashSet::new();

        for (index, name) in names.iter().enumerate() {
            match EntryKind::classify(name, &self.config.module_extension) {
                EntryKind::Manifest => {
                    if index != manifest_index {
                        warn!(entry = %name, index, "Ignoring duplicate tenant manifest entry");
                    }
                }
                EntryKind::Static(key) => {
                    if key.is_empty() {
                        continue;
                    }
                    if static_index.contains_key(&key) {
                        warn!(entry = %name, path = %key, "Ignoring duplicate static entry");
                        continue;
                    }
                    static_index.insert(key, name.clone());
                }
                EntryKind::Module(logical_name) => {
                    let module = manifest
                        .find_module_mut(&logical_name)
                        .ok_or_else(|| BundleError::UnresolvedModule(name.clone()))?;

                    let fqmn = module.fqmn().to_string();
                    if !bound.insert(fqmn.clone()) {
                        return Err(BundleError::Corrupt(format!(
                            "{name} binds module {fqmn}, which is already bound"
                        )));
                    }

                    let data = archive.read_entry(index, limit)?;
                    let module_ref = WasmModuleRef::new(name.clone(), fqmn, data);
                    debug!(
                        entry = %name,
                        fqmn = %module_ref.fqmn(),
                        bytes = module_ref.len(),
                        sha256 = %module_ref.checksum(),
                        "Bound module"
                    );
                    module.attach(module_ref);
                }
                EntryKind::Ignored => {
                    debug!(entry = %name, "Ignoring unrecognized entry");
                }
            }
        }
        drop(archive);

        info!(
            path = %path.display(),
            modules = bound.len(),
            static_files = static_index.len(),
            "Bundle read"
        );

        Ok(Bundle::new(
            path.to_path_buf(),
            manifest,
            static_index,
            bound.len(),
            backend,
            self.config.clone(),
        ))
    }
}

/// Read a bundle with configuration from [`BundleConfig::resolve`]
/// (`TB_BUNDLE_CONFIG` and the `TB_BUNDLE_*` overrides, else defaults).
pub fn read(path: &Path) -> Result<Bundle<TenantConfig>> {
    BundleReader::new()
        .with_config(BundleConfig::resolve(None)?)
        .read(path)
}
