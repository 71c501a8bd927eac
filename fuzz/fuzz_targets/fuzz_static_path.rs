//! Fuzz target for static path normalization and entry classification.
//!
//! Normalization must be idempotent and a traversal request must never be
//! re-anchored into something that escapes the static subtree.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tb_bundle::path::{ensure_static_prefix, has_parent_traversal, EntryKind};
use tb_bundle::{normalize_static_path, STATIC_PREFIX};

fuzz_target!(|data: &[u8]| {
    let Ok(path) = std::str::from_utf8(data) else {
        return;
    };

    let key = normalize_static_path(path);
    assert_eq!(normalize_static_path(&key), key);

    if !has_parent_traversal(&key) {
        let entry = ensure_static_prefix(&key);
        assert!(entry.starts_with(STATIC_PREFIX));
        assert_eq!(EntryKind::classify(&entry, ".wasm"), EntryKind::Static(key));
    }
});
