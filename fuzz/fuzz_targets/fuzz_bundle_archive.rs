//! Fuzz target for bundle archive parsing.
//!
//! Bundles may come from untrusted sources; listing and reading entries
//! must fail cleanly on arbitrary bytes.

#![no_main]

use libfuzzer_sys::fuzz_target;
use tb_bundle::archive::{ArchiveReader, ZipArchiveReader};
use tb_bundle::EntryKind;

const ENTRY_LIMIT: u64 = 1 << 20;

fuzz_target!(|data: &[u8]| {
    // Most random data fails at the central directory
    let Ok(mut archive) = ZipArchiveReader::from_bytes(data.to_vec()) else {
        return;
    };

    let names = archive.entry_names().to_vec();
    for (index, name) in names.iter().enumerate() {
        if EntryKind::classify(name, ".wasm") != EntryKind::Ignored {
            let _ = archive.read_entry(index, ENTRY_LIMIT);
        }
    }
});
