//! A resolved bundle and on-demand static file retrieval.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tb_tenant::TenantConfig;
use tracing::debug;

use crate::archive::ArchiveBackend;
use crate::manifest::TenantManifest;
use crate::path::{has_parent_traversal, normalize_static_path};
use crate::{BundleConfig, BundleError, Result};

/// The result of reading a bundle: the manifest with module payloads
/// bound, plus an index of static files.
///
/// Static file contents are not held in memory. Each
/// [`static_file`](Self::static_file) call reopens the archive unless the
/// content cache is enabled in [`BundleConfig`].
#[derive(Debug)]
pub struct Bundle<M: TenantManifest = TenantConfig> {
    source_path: PathBuf,
    manifest: M,
    /// Normalized path -> archive entry name (always under `static/`).
    static_index: BTreeMap<String, String>,
    modules_resolved: usize,
    backend: Arc<dyn ArchiveBackend>,
    config: BundleConfig,
    cache: Mutex<StaticCache>,
}

impl<M: TenantManifest> Bundle<M> {
    pub(crate) fn new(
        source_path: PathBuf,
        manifest: M,
        static_index: BTreeMap<String, String>,
        modules_resolved: usize,
        backend: Arc<dyn ArchiveBackend>,
        config: BundleConfig,
    ) -> Self {
        let cache = Mutex::new(StaticCache::new(config.static_cache_capacity));
        Self {
            source_path,
            manifest,
            static_index,
            modules_resolved,
            backend,
            config,
            cache,
        }
    }

    /// Path of the archive this bundle was read from.
    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// The decoded manifest with module payloads attached.
    pub fn manifest(&self) -> &M {
        &self.manifest
    }

    /// Take ownership of the manifest.
    pub fn into_manifest(self) -> M {
        self.manifest
    }

    /// Number of module entries bound to the manifest.
    pub fn modules_resolved(&self) -> usize {
        self.modules_resolved
    }

    /// Configuration the bundle was read with.
    pub fn config(&self) -> &BundleConfig {
        &self.config
    }

    /// Normalized static paths, sorted.
    pub fn static_files(&self) -> impl Iterator<Item = &str> {
        self.static_index.keys().map(String::as_str)
    }

    /// Number of indexed static files.
    pub fn static_file_count(&self) -> usize {
        self.static_index.len()
    }

    /// Whether `path` (in any accepted spelling) is indexed.
    pub fn has_static_file(&self, path: &str) -> bool {
        self.static_index.contains_key(&normalize_static_path(path))
    }

    /// Read a static file.
    ///
    /// `path` may be given as `static/x`, `/x`, `./x` or `x`. Paths with a
    /// `..` segment fail with [`BundleError::PathTraversal`]; unindexed
    /// paths fail with [`BundleError::NotFound`] without opening the
    /// archive. If the archive no longer holds an indexed entry the call
    /// fails with [`BundleError::Corrupt`].
    pub fn static_file(&self, path: &str) -> Result<Vec<u8>> {
        let key = normalize_static_path(path);

        if has_parent_traversal(&key) {
            return Err(BundleError::PathTraversal(path.to_string()));
        }

        let entry_name = self
            .static_index
            .get(&key)
            .ok_or_else(|| BundleError::NotFound(key.clone()))?;

        if let Some(content) = self.cache_lock().get(&key) {
            debug!(path = %key, "Static file served from cache");
            return Ok(content);
        }

        let mut archive = self.backend.open(&self.source_path)?;
        let index = archive
            .entry_names()
            .iter()
            .position(|name| name == entry_name)
            .ok_or_else(|| {
                BundleError::Corrupt(format!(
                    "static file '{}' is indexed but missing from {}",
                    key,
                    self.source_path.display()
                ))
            })?;
        let content = archive.read_entry(index, self.config.max_entry_bytes)?;
        drop(archive);

        debug!(path = %key, bytes = content.len(), "Static file read from bundle");

        self.cache_lock().insert(key, &content);
        Ok(content)
    }

    fn cache_lock(&self) -> std::sync::MutexGuard<'_, StaticCache> {
        self.cache.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Bounded FIFO cache of static file contents.
#[derive(Debug)]
struct StaticCache {
    capacity: usize,
    order: VecDeque<String>,
    entries: HashMap<String, Vec<u8>>,
}

impl StaticCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::new(),
            entries: HashMap::new(),
        }
    }

    fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.entries.get(key).cloned()
    }

    fn insert(&mut self, key: String, content: &[u8]) {
        if self.capacity == 0 {
            return;
        }

        if let Some(existing) = self.entries.get_mut(&key) {
            *existing = content.to_vec();
            return;
        }

        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }

        self.order.push_back(key.clone());
        self.entries.insert(key, content.to_vec());
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
