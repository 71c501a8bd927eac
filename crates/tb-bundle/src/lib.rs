//! Tenant bundle writer/reader.
//!
//! A tenant bundle packages a tenant manifest, compiled Wasm modules and
//! static assets into a single archive.
//!
//! # Bundle Format
//!
//! Bundles are ZIP archives containing:
//! - `tenant.yaml`: the tenant manifest (exactly one, mandatory)
//! - `<name>.wasm`: module payloads, at the archive root
//! - `static/<path>`: static assets
//!
//! Anything else is ignored on read.
//!
//! On read, every module entry is bound to the manifest module of the same
//! name; a module the manifest does not know makes the bundle unreadable.
//! Static files are indexed at load time and read from the archive on
//! demand, always re-anchored under `static/`.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::BTreeMap;
//! use std::path::Path;
//!
//! let manifest = b"identifier: com.acme\ntenantVersion: 1\nmodules:\n  - name: hello\n";
//! let wasm = std::fs::read("hello.wasm").unwrap();
//!
//! tb_bundle::write(
//!     manifest,
//!     vec![("hello.wasm", wasm)],
//!     BTreeMap::from([("index.html", b"<h1>hi</h1>".to_vec())]),
//!     Path::new("app.wasm.zip"),
//! )
//! .unwrap();
//!
//! let bundle = tb_bundle::read(Path::new("app.wasm.zip")).unwrap();
//! let hello = bundle.manifest().find_module("hello").unwrap();
//! assert!(hello.wasm_ref.is_some());
//!
//! let page = bundle.static_file("/index.html").unwrap();
//! ```

pub mod archive;
pub mod bundle;
pub mod config;
pub mod error;
pub mod logging;
pub mod manifest;
pub mod path;
pub mod reader;
pub mod writer;

pub use archive::{ArchiveBackend, ArchiveReader, ArchiveWriter, ZipBackend};
pub use bundle::Bundle;
pub use config::{BundleConfig, Compression};
pub use error::{BundleError, Result};
pub use manifest::{ModuleEntry, TenantManifest};
pub use path::{normalize_static_path, EntryKind, MANIFEST_FILE_NAME, STATIC_PREFIX};
pub use reader::{read, BundleReader};
pub use tb_tenant::{Module, TenantConfig, WasmModuleRef};
pub use writer::{write, BundleWriter, WriteSummary};
