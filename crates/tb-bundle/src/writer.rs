//! Bundle writer for creating tenant bundles.
//!
//! Assembles the archive in memory, then commits it to disk with a single
//! temp-file-and-rename so a failed write never leaves a partial bundle.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::archive::{ArchiveBackend, ZipBackend};
use crate::manifest::TenantManifest;
use crate::path::{
    ensure_static_prefix, has_parent_traversal, is_manifest_name, module_base_name,
    normalize_static_path, MANIFEST_FILE_NAME,
};
use crate::{BundleConfig, BundleError, Result};

/// What a completed write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    /// Where the bundle was written.
    pub path: PathBuf,
    /// Module entries written.
    pub modules: usize,
    /// Static entries written.
    pub static_files: usize,
    /// Module names dropped because they spell the manifest name.
    pub skipped_modules: Vec<String>,
    /// Archive size in bytes.
    pub bytes: u64,
}

struct Assembled {
    bytes: Vec<u8>,
    modules: usize,
    static_files: usize,
    skipped_modules: Vec<String>,
}

/// Builder for tenant bundles.
pub struct BundleWriter {
    manifest: Vec<u8>,
    modules: Vec<(String, Vec<u8>)>,
    static_files: BTreeMap<String, Vec<u8>>,
    config: BundleConfig,
    backend: Option<Arc<dyn ArchiveBackend>>,
}

impl BundleWriter {
    /// Create a writer around raw manifest bytes.
    pub fn new(manifest: impl Into<Vec<u8>>) -> Self {
        Self {
            manifest: manifest.into(),
            modules: Vec::new(),
            static_files: BTreeMap::new(),
            config: BundleConfig::default(),
            backend: None,
        }
    }

    /// Create a writer by encoding a manifest value.
    pub fn from_manifest<M: TenantManifest>(manifest: &M) -> Result<Self> {
        let bytes = manifest
            .encode()
            .map_err(|e| BundleError::InvalidInput(format!("failed to encode manifest: {e}")))?;
        Ok(Self::new(bytes))
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

    /// Add a binary module. Directory components of `name` are dropped.
    pub fn add_module(&mut self, name: impl Into<String>, content: impl Into<Vec<u8>>) {
        let name = name.into();
        let content = content.into();
        debug!(module = %name, bytes = content.len(), "Added module to bundle");
        self.modules.push((name, content));
    }

    /// Add a static file. `path` may be spelled `static/x`, `/x`, `./x` or
    /// `x`; adding the same logical path twice keeps the last content.
    pub fn add_static_file(&mut self, path: impl AsRef<str>, content: impl Into<Vec<u8>>) {
        let key = normalize_static_path(path.as_ref());
        let content = content.into();
        debug!(path = %key, bytes = content.len(), "Added static file to bundle");
        if self.static_files.insert(key.clone(), content).is_some() {
            debug!(path = %key, "Replaced earlier static file");
        }
    }

    /// Number of modules added (including ones that will be skipped).
    pub fn module_count(&self) -> usize {
        self.modules.len()
    }

    /// Number of distinct static paths.
    pub fn static_file_count(&self) -> usize {
        self.static_files.len()
    }

    /// Assemble the bundle in memory.
    pub fn write_to_vec(&self) -> Result<Vec<u8>> {
        Ok(self.assemble()?.bytes)
    }

    /// Write the bundle to `target`.
    pub fn write(&self, target: &Path) -> Result<WriteSummary> {
        let assembled = self.assemble()?;
        commit(target, &assembled.bytes, self.config.file_mode)?;

        info!(
            path = %target.display(),
            modules = assembled.modules,
            static_files = assembled.static_files,
            bytes = assembled.bytes.len(),
            "Bundle written"
        );

        Ok(WriteSummary {
            path: target.to_path_buf(),
            modules: assembled.modules,
            static_files: assembled.static_files,
            skipped_modules: assembled.skipped_modules,
            bytes: assembled.bytes.len() as u64,
        })
    }

    fn backend(&self) -> Arc<dyn ArchiveBackend> {
        match &self.backend {
            Some(backend) => Arc::clone(backend),
            None => Arc::new(ZipBackend::new(self.config.compression)),
        }
    }

    fn assemble(&self) -> Result<Assembled> {
        if self.manifest.is_empty() {
            return Err(BundleError::InvalidInput(
                "tenant manifest must be provided".to_string(),
            ));
        }
        self.config.validate()?;

        let mut archive = self.backend().writer();

        // Manifest first
        archive.add(MANIFEST_FILE_NAME, &self.manifest)?;

        let mut modules = 0;
        let mut skipped_modules = Vec::new();
        for (name, content) in &self.modules {
            if is_manifest_name(name) {
                warn!(module = %name, "Skipping module named like the tenant manifest");
                skipped_modules.push(name.clone());
                continue;
            }

            let base = module_base_name(name);
            if base.is_empty() {
                return Err(BundleError::InvalidInput(format!(
                    "module name has no file name: {name}"
                )));
            }
            if !base.ends_with(&self.config.module_extension) {
                warn!(
                    module = %base,
                    extension = %self.config.module_extension,
                    "Module lacks the module extension and will be ignored on read"
                );
            }

            archive.add(base, content)?;
            modules += 1;
        }

        for (key, content) in &self.static_files {
            if key.is_empty() {
                return Err(BundleError::InvalidInput(
                    "static file path is empty".to_string(),
                ));
            }
            if has_parent_traversal(key) {
                return Err(BundleError::InvalidInput(format!(
                    "static file path escapes the static directory: {key}"
                )));
            }

            archive.add(&ensure_static_prefix(key), content)?;
        }

        let bytes = archive.finish()?;

        Ok(Assembled {
            bytes,
            modules,
            static_files: self.static_files.len(),
            skipped_modules,
        })
    }
}

/// Write `bundle` to `target` in one step: sibling temp file, permissions,
/// fsync, rename. The temp file is removed on any failure.
fn commit(target: &Path, bundle: &[u8], mode: u32) -> Result<()> {
    let file_name = target
        .file_name()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            BundleError::InvalidInput(format!("target path has no file name: {}", target.display()))
        })?;
    let tmp_path = target.with_file_name(format!("{}.tmp.{}", file_name, std::process::id()));

    let result = write_tmp(&tmp_path, bundle, mode).and_then(|()| {
        fs::rename(&tmp_path, target).map_err(|e| BundleError::io(target, e))
    });

    if result.is_err() {
        let _ = fs::remove_file(&tmp_path);
    }

    result
}

fn write_tmp(tmp_path: &Path, bundle: &[u8], mode: u32) -> Result<()> {
    let mut file = File::create(tmp_path).map_err(|e| BundleError::io(tmp_path, e))?;
    file.write_all(bundle)
        .map_err(|e| BundleError::io(tmp_path, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(tmp_path, fs::Permissions::from_mode(mode))
            .map_err(|e| BundleError::io(tmp_path, e))?;
    }
    #[cfg(not(unix))]
    let _ = mode;

    file.sync_all().map_err(|e| BundleError::io(tmp_path, e))?;
    Ok(())
}

/// Write a bundle with configuration from [`BundleConfig::resolve`]
/// (`TB_BUNDLE_CONFIG` and the `TB_BUNDLE_*` overrides, else defaults).
///
/// `static_files` maps relative paths (with or without `static/`) to
/// their contents.
pub fn write<I, N, C, S, P, D>(
    manifest: &[u8],
    modules: I,
    static_files: S,
    target: &Path,
) -> Result<WriteSummary>
where
    I: IntoIterator<Item = (N, C)>,
    N: Into<String>,
    C: Into<Vec<u8>>,
    S: IntoIterator<Item = (P, D)>,
    P: AsRef<str>,
    D: Into<Vec<u8>>,
{
    let mut writer = BundleWriter::new(manifest).with_config(BundleConfig::resolve(None)?);
    for (name, content) in modules {
        writer.add_module(name, content);
    }
    for (path, content) in static_files {
        writer.add_static_file(path, content);
    }
    writer.write(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::{ArchiveReader, ZipArchiveReader};
    use tempfile::TempDir;

    const MANIFEST: &[u8] = b"identifier: com.acme\ntenantVersion: 1\nmodules:\n  - name: hello\n";

    fn entry_names(bytes: Vec<u8>) -> Vec<String> {
        ZipArchiveReader::from_bytes(bytes)
            .unwrap()
            .entry_names()
            .to_vec()
    }

    #[test]
    fn test_bundle_writer_new() {
        let writer = BundleWriter::new(MANIFEST);

        assert_eq!(writer.module_count(), 0);
        assert_eq!(writer.static_file_count(), 0);
    }

    #[test]
    fn test_bundle_writer_empty_manifest_fails() {
        let writer = BundleWriter::new(Vec::new());
        let result = writer.write_to_vec();

        assert!(matches!(result, Err(BundleError::InvalidInput(_))));
    }

    #[test]
    fn test_bundle_writer_entry_layout() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_module("build/hello.wasm", b"\0asm".to_vec());
        writer.add_static_file("index.html", b"<html></html>".to_vec());
        writer.add_static_file("static/css/site.css", b"body{}".to_vec());

        let names = entry_names(writer.write_to_vec().unwrap());
        assert_eq!(
            names,
            vec![
                "tenant.yaml",
                "hello.wasm",
                "static/css/site.css",
                "static/index.html"
            ]
        );
    }

    #[test]
    fn test_bundle_writer_skips_manifest_named_modules() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_module("tenant.yaml", b"identifier: evil".to_vec());
        writer.add_module("tenant.yml", b"identifier: evil".to_vec());
        writer.add_module("hello.wasm", b"\0asm".to_vec());

        let names = entry_names(writer.write_to_vec().unwrap());
        assert_eq!(names, vec!["tenant.yaml", "hello.wasm"]);
    }

    #[test]
    fn test_bundle_writer_static_prefix_dedup() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_static_file("a.txt", b"first".to_vec());
        writer.add_static_file("static/a.txt", b"second".to_vec());

        assert_eq!(writer.static_file_count(), 1);
        let mut reader = ZipArchiveReader::from_bytes(writer.write_to_vec().unwrap()).unwrap();
        assert_eq!(reader.read_entry(1, 1024).unwrap(), b"second");
    }

    #[test]
    fn test_bundle_writer_static_spellings_collapse() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_static_file("/a.txt", b"first".to_vec());
        writer.add_static_file("./a.txt", b"middle".to_vec());
        writer.add_static_file("static//a.txt", b"later".to_vec());
        writer.add_static_file("a.txt", b"second".to_vec());

        assert_eq!(writer.static_file_count(), 1);
        let bytes = writer.write_to_vec().unwrap();
        assert_eq!(entry_names(bytes.clone()), vec!["tenant.yaml", "static/a.txt"]);

        let mut reader = ZipArchiveReader::from_bytes(bytes).unwrap();
        assert_eq!(reader.read_entry(1, 1024).unwrap(), b"second");
    }

    #[test]
    fn test_bundle_writer_rejects_traversal() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_static_file("../outside.txt", b"x".to_vec());

        assert!(matches!(
            writer.write_to_vec(),
            Err(BundleError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bundle_writer_rejects_empty_static_path() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_static_file("static/", b"x".to_vec());

        assert!(matches!(
            writer.write_to_vec(),
            Err(BundleError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_bundle_writer_duplicate_module_base_names_fail() {
        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_module("a/hello.wasm", b"1".to_vec());
        writer.add_module("b/hello.wasm", b"2".to_vec());

        assert!(matches!(
            writer.write_to_vec(),
            Err(BundleError::Archive { .. })
        ));
    }

    #[test]
    fn test_bundle_writer_deterministic() {
        let build = || {
            let mut writer = BundleWriter::new(MANIFEST);
            writer.add_module("hello.wasm", b"\0asm".to_vec());
            writer.add_static_file("b.txt", b"b".to_vec());
            writer.add_static_file("a.txt", b"a".to_vec());
            writer.write_to_vec().unwrap()
        };

        assert_eq!(build(), build());
    }

    #[test]
    fn test_bundle_writer_from_manifest() {
        let config = tb_tenant::TenantConfig::new("com.acme", 1)
            .with_module(tb_tenant::Module::new("hello", "default"));
        let writer = BundleWriter::from_manifest(&config).unwrap();

        let mut reader = ZipArchiveReader::from_bytes(writer.write_to_vec().unwrap()).unwrap();
        let manifest = reader.read_entry(0, 1 << 20).unwrap();
        assert_eq!(tb_tenant::TenantConfig::unmarshal(&manifest).unwrap(), config);
    }

    #[test]
    fn test_bundle_writer_write_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("app.wasm.zip");

        let mut writer = BundleWriter::new(MANIFEST);
        writer.add_module("hello.wasm", b"\0asm".to_vec());
        writer.add_module("tenant.yml", b"nope".to_vec());
        writer.add_static_file("index.html", b"hi".to_vec());

        let summary = writer.write(&target).unwrap();

        assert!(target.exists());
        assert_eq!(summary.path, target);
        assert_eq!(summary.modules, 1);
        assert_eq!(summary.static_files, 1);
        assert_eq!(summary.skipped_modules, vec!["tenant.yml".to_string()]);
        assert_eq!(summary.bytes, fs::metadata(&target).unwrap().len());
    }

    #[test]
    fn test_bundle_writer_leaves_no_temp_file() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("app.wasm.zip");

        BundleWriter::new(MANIFEST).write(&target).unwrap();

        let names: Vec<_> = fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(names, vec![std::ffi::OsString::from("app.wasm.zip")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_bundle_writer_applies_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let temp_dir = TempDir::new().unwrap();
        let default_target = temp_dir.path().join("default.wasm.zip");
        let custom_target = temp_dir.path().join("custom.wasm.zip");

        BundleWriter::new(MANIFEST).write(&default_target).unwrap();
        BundleWriter::new(MANIFEST)
            .with_config(BundleConfig::default().with_file_mode(0o640))
            .write(&custom_target)
            .unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o7777;
        assert_eq!(mode(&default_target), 0o777);
        assert_eq!(mode(&custom_target), 0o640);
    }

    #[test]
    fn test_bundle_writer_missing_directory_leaves_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("missing").join("app.wasm.zip");

        let result = BundleWriter::new(MANIFEST).write(&target);

        assert!(matches!(result, Err(BundleError::Io { .. })));
        assert!(!target.exists());
    }

    #[test]
    fn test_write_free_function() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("app.wasm.zip");

        let summary = write(
            MANIFEST,
            vec![("hello.wasm", b"\0asm".to_vec())],
            BTreeMap::from([("index.html".to_string(), b"hi".to_vec())]),
            &target,
        )
        .unwrap();

        assert_eq!(summary.modules, 1);
        assert_eq!(summary.static_files, 1);
    }
}
