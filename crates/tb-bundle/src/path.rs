//! Entry naming rules and static-path normalization.
//!
//! Every archive entry falls into exactly one [`EntryKind`]. Static asset
//! requests are normalized with [`normalize_static_path`] and re-anchored
//! under [`STATIC_PREFIX`] before any archive entry is touched.

/// Canonical manifest entry name.
pub const MANIFEST_FILE_NAME: &str = "tenant.yaml";

/// Alternate manifest spelling; never written as a module.
pub const MANIFEST_FILE_NAME_ALT: &str = "tenant.yml";

/// Prefix marking the static asset subtree.
pub const STATIC_PREFIX: &str = "static/";

/// Default binary module suffix.
pub const DEFAULT_MODULE_EXTENSION: &str = ".wasm";

/// Normalize a static file name to its index key.
///
/// One pass strips, in order and at most once each: a leading `static/`,
/// a leading `/`, and a leading `./`. Passes repeat until nothing changes,
/// so the result is a fixpoint: `normalize(normalize(p)) == normalize(p)`.
/// `static/foo.txt`, `/foo.txt`, `./foo.txt` and `foo.txt` all map to
/// `foo.txt`. Does not touch `..` segments; see [`has_parent_traversal`].
pub fn normalize_static_path(name: &str) -> String {
    let mut current = name;
    loop {
        let next = strip_once(current);
        if next.len() == current.len() {
            return next.to_string();
        }
        current = next;
    }
}

fn strip_once(name: &str) -> &str {
    let without_static = name.strip_prefix(STATIC_PREFIX).unwrap_or(name);
    let without_slash = without_static
        .strip_prefix('/')
        .unwrap_or(without_static);
    without_slash.strip_prefix("./").unwrap_or(without_slash)
}

/// Prepend [`STATIC_PREFIX`] unless the path already carries it.
pub fn ensure_static_prefix(path: &str) -> String {
    if path.starts_with(STATIC_PREFIX) {
        path.to_string()
    } else {
        format!("{STATIC_PREFIX}{path}")
    }
}

/// Final path component of a module name (`/` and `\` both separate).
pub fn module_base_name(name: &str) -> &str {
    name.rsplit(&['/', '\\'][..]).next().unwrap_or(name)
}

/// Whether the module name is a manifest spelling and must not be written.
pub fn is_manifest_name(name: &str) -> bool {
    let base = module_base_name(name);
    base == MANIFEST_FILE_NAME || base == MANIFEST_FILE_NAME_ALT
}

/// Whether any path segment is `..`.
pub fn has_parent_traversal(path: &str) -> bool {
    path.split(&['/', '\\'][..]).any(|segment| segment == "..")
}

/// Classification of an archive entry by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryKind {
    /// The `tenant.yaml` manifest blob.
    Manifest,
    /// A static asset; carries the normalized index key.
    Static(String),
    /// A binary module; carries the logical name (suffix stripped).
    Module(String),
    /// Anything else.
    Ignored,
}

impl EntryKind {
    /// Classify an entry name.
    ///
    /// The manifest name wins, then the static prefix, then the module
    /// suffix. A `static/x.wasm` entry is therefore a static asset.
    pub fn classify(entry_name: &str, module_extension: &str) -> Self {
        if entry_name == MANIFEST_FILE_NAME {
            EntryKind::Manifest
        } else if entry_name.starts_with(STATIC_PREFIX) {
            EntryKind::Static(normalize_static_path(entry_name))
        } else if let Some(stem) = entry_name.strip_suffix(module_extension) {
            EntryKind::Module(stem.to_string())
        } else {
            EntryKind::Ignored
        }
    }
}
