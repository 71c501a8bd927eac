//! Archive container capability.
//!
//! The bundle format only needs "enumerate entries", "read entry" and
//! "add entry". [`ZipBackend`] provides these over ZIP; tests substitute
//! instrumented backends.

use std::fmt;
use std::fs::File;
use std::io::{Cursor, Read, Write};
use std::path::Path;
use tracing::trace;
use zip::result::ZipError;
use zip::write::{FileOptions, ZipWriter};
use zip::ZipArchive;

use crate::config::Compression;
use crate::{BundleError, Result};

/// Opens archives for reading and creates in-memory archive writers.
pub trait ArchiveBackend: Send + Sync + fmt::Debug {
    /// Open the archive at `path`. The handle is dropped by the caller
    /// before the operation returns.
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>>;

    /// Start a new archive assembled in memory.
    fn writer(&self) -> Box<dyn ArchiveWriter>;
}

/// An opened archive.
pub trait ArchiveReader {
    /// Entry names in archive order. Duplicates are reported as-is.
    fn entry_names(&self) -> &[String];

    /// Read the full content of the entry at `index`, failing with
    /// [`BundleError::EntryTooLarge`] past `limit` bytes.
    fn read_entry(&mut self, index: usize, limit: u64) -> Result<Vec<u8>>;
}

/// An archive being assembled in memory.
pub trait ArchiveWriter {
    /// Add an entry.
    fn add(&mut self, name: &str, contents: &[u8]) -> Result<()>;

    /// Finalize and return the archive bytes.
    fn finish(self: Box<Self>) -> Result<Vec<u8>>;
}

/// ZIP-backed archives.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipBackend {
    compression: Compression,
}

impl ZipBackend {
    /// Create a backend writing entries with the given compression.
    pub fn new(compression: Compression) -> Self {
        Self { compression }
    }
}

impl ArchiveBackend for ZipBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ArchiveReader>> {
        let file = File::open(path).map_err(|e| BundleError::io(path, e))?;
        let reader = ZipArchiveReader::new(file)?;
        Ok(Box::new(reader))
    }

    fn writer(&self) -> Box<dyn ArchiveWriter> {
        Box::new(ZipArchiveWriter::new(self.compression))
    }
}

/// Largest buffer reserved up front from an entry's declared size.
const PREALLOC_LIMIT: u64 = 64 * 1024;

/// Reader over any `Read + Seek` ZIP source.
pub struct ZipArchiveReader<R: Read + std::io::Seek> {
    archive: ZipArchive<R>,
    names: Vec<String>,
}

impl<R: Read + std::io::Seek> ZipArchiveReader<R> {
    /// Parse the ZIP central directory.
    pub fn new(reader: R) -> Result<Self> {
        let mut archive =
            ZipArchive::new(reader).map_err(|e| BundleError::archive("opening bundle", e))?;

        let mut names = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| BundleError::archive(format!("listing entry {index}"), e))?;
            names.push(entry.name().to_string());
        }

        Ok(Self { archive, names })
    }
}

impl ZipArchiveReader<Cursor<Vec<u8>>> {
    /// Parse an archive held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        Self::new(Cursor::new(bytes))
    }
}

impl<R: Read + std::io::Seek> ArchiveReader for ZipArchiveReader<R> {
    fn entry_names(&self) -> &[String] {
        &self.names
    }

    fn read_entry(&mut self, index: usize, limit: u64) -> Result<Vec<u8>> {
        let name = self
            .names
            .get(index)
            .cloned()
            .ok_or_else(|| BundleError::Corrupt(format!("no entry at index {index}")))?;

        let entry = self
            .archive
            .by_index(index)
            .map_err(|e| BundleError::archive(format!("opening {name}"), e))?;

        if entry.size() > limit {
            return Err(BundleError::EntryTooLarge { entry: name, limit });
        }

        // Declared sizes can lie; bound the actual read as well.
        let mut data = Vec::with_capacity(entry.size().min(PREALLOC_LIMIT) as usize);
        entry
            .take(limit.saturating_add(1))
            .read_to_end(&mut data)
            .map_err(|e| BundleError::archive(format!("reading {name}"), ZipError::Io(e)))?;

        if data.len() as u64 > limit {
            return Err(BundleError::EntryTooLarge { entry: name, limit });
        }

        trace!(entry = %name, bytes = data.len(), "Read archive entry");
        Ok(data)
    }
}

/// In-memory ZIP writer.
pub struct ZipArchiveWriter {
    zip: ZipWriter<Cursor<Vec<u8>>>,
    options: FileOptions<'static, ()>,
}

impl ZipArchiveWriter {
    /// Create an empty archive.
    ///
    /// Entries carry a fixed timestamp and `0o644` permissions so the same
    /// inputs always produce the same bytes.
    pub fn new(compression: Compression) -> Self {
        let options: FileOptions<'static, ()> = FileOptions::default()
            .compression_method(compression.into())
            .last_modified_time(zip::DateTime::default())
            .unix_permissions(0o644);

        Self {
            zip: ZipWriter::new(Cursor::new(Vec::new())),
            options,
        }
    }
}

impl ArchiveWriter for ZipArchiveWriter {
    fn add(&mut self, name: &str, contents: &[u8]) -> Result<()> {
        self.zip
            .start_file(name, self.options)
            .map_err(|e| BundleError::archive(format!("adding {name}"), e))?;
        self.zip
            .write_all(contents)
            .map_err(|e| BundleError::archive(format!("writing {name}"), ZipError::Io(e)))?;
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<Vec<u8>> {
        let cursor = self
            .zip
            .finish()
            .map_err(|e| BundleError::archive("finalizing bundle", e))?;
        Ok(cursor.into_inner())
    }
}
