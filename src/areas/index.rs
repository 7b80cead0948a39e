//! Git index (staging area), read-only
//!
//! The index records what will go into the next commit: one entry per path
//! and merge stage, each with the staged object id and the stat data taken
//! when it was staged.
//!
//! ## Index File Format
//!
//! The index file contains:
//! - Header: Signature, version (2 or 3), and entry count
//! - Entries: Sorted by path, then stage, NUL-padded to 8 bytes
//! - Extensions: Cached trees, resolve-undo, ... (skipped)
//! - Checksum: SHA-1 hash of everything before it
//!
//! ## Data Structures
//!
//! - `entries`: Maps file paths to their entries, one per stage
//! - `children`: Maps directory paths to every tracked path below them

use crate::artifacts::index::checksum::Checksum;
use crate::artifacts::index::index_entry::{
    ENTRY_BLOCK, ENTRY_FIXED_SIZE, EXTENDED_FLAGS_SIZE, EntryFlags, IndexEntry,
    NAME_LENGTH_OVERFLOW, Stage,
};
use crate::artifacts::index::index_header::IndexHeader;
use crate::artifacts::index::{
    EXTENSION_HEADER_SIZE, HEADER_SIZE, SIGNATURE, SUPPORTED_VERSIONS,
};
use crate::artifacts::objects::object::Unpackable;
use anyhow::{Context, anyhow};
use byteorder::ByteOrder;
use std::collections::{BTreeMap, BTreeSet};
use std::ffi::OsString;
use std::ops::DerefMut;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Git index (staging area)
#[derive(Debug, Clone)]
pub struct Index {
    /// Path to the index file (typically `.git/index`)
    path: Box<Path>,
    /// Tracked paths mapped to their entries, sorted by stage
    entries: BTreeMap<PathBuf, Vec<IndexEntry>>,
    /// Directory hierarchy for parent-child lookups
    children: BTreeMap<PathBuf, BTreeSet<PathBuf>>,
    /// Index file header metadata
    header: IndexHeader,
    /// Modification time of the index file as `(seconds, nanoseconds)`
    modified: Option<(i64, i64)>,
}

impl Index {
    pub fn new(path: Box<Path>) -> Self {
        Index {
            path,
            entries: BTreeMap::new(),
            children: BTreeMap::new(),
            header: IndexHeader::empty(),
            modified: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    fn clear(&mut self) {
        self.entries.clear();
        self.children.clear();
        self.header = IndexHeader::empty();
        self.modified = None;
    }

    /// Load the index from disk
    ///
    /// A missing or empty index file yields an empty index; unlike a
    /// writer, nothing is created on disk.
    ///
    /// # Locking
    ///
    /// Acquires a shared lock on the index file during reading.
    pub fn rehydrate(&mut self) -> anyhow::Result<()> {
        self.clear();

        if !self.path().exists() {
            return Ok(());
        }

        let mut index_file = std::fs::OpenOptions::new()
            .read(true)
            .open(self.path())
            .with_context(|| format!("Unable to open index {}", self.path.display()))?;
        let mut lock = file_guard::lock(&mut index_file, file_guard::Lock::Shared, 0, 1)?;

        let metadata = lock.deref_mut().metadata()?;
        if metadata.len() == 0 {
            return Ok(());
        }

        self.modified = metadata.modified().ok().and_then(|modified| {
            modified
                .duration_since(UNIX_EPOCH)
                .ok()
                .map(|since| (since.as_secs() as i64, since.subsec_nanos() as i64))
        });

        let mut reader = Checksum::new(lock, metadata.len());
        let entries_count = self.parse_header(&mut reader)?;
        self.parse_entries(entries_count, &mut reader)?;
        self.skip_extensions(&mut reader)?;

        reader.verify().context("Corrupt index file")
    }

    fn parse_header(&mut self, reader: &mut Checksum) -> anyhow::Result<u32> {
        let header_bytes = reader.read(HEADER_SIZE)?;
        let header = IndexHeader::deserialize(std::io::Cursor::new(header_bytes))?;

        if header.marker != SIGNATURE {
            return Err(anyhow!("Invalid index file signature"));
        }

        if !SUPPORTED_VERSIONS.contains(&header.version) {
            return Err(anyhow!(
                "Unsupported index file version: {}",
                header.version
            ));
        }

        let entries_count = header.entries_count;
        self.header = header;

        Ok(entries_count)
    }

    /// Parse all entries from the index file
    ///
    /// The fixed part is read first so the extended flag and the name length
    /// can be inspected; long names fall back to scanning 8-byte blocks until
    /// the NUL terminator shows up.
    fn parse_entries(&mut self, entries_count: u32, reader: &mut Checksum) -> anyhow::Result<()> {
        for _ in 0..entries_count {
            let mut entry_bytes = reader.read(ENTRY_FIXED_SIZE)?.to_vec();
            let flags = byteorder::NetworkEndian::read_u16(&entry_bytes[60..62]);

            let mut fixed_size = ENTRY_FIXED_SIZE;
            if EntryFlags::from_bits_truncate(flags as u32).contains(EntryFlags::EXTENDED) {
                if self.header.version < 3 {
                    return Err(anyhow!("Extended index entry in a version 2 index"));
                }
                entry_bytes.extend_from_slice(&reader.read(EXTENDED_FLAGS_SIZE)?);
                fixed_size += EXTENDED_FLAGS_SIZE;
            }

            let name_len = (flags as usize) & NAME_LENGTH_OVERFLOW;
            if name_len < NAME_LENGTH_OVERFLOW {
                let rest = IndexEntry::on_disk_size(fixed_size, name_len) - fixed_size;
                entry_bytes.extend_from_slice(&reader.read(rest)?);
            } else {
                entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
                while entry_bytes[entry_bytes.len() - 1] != 0 {
                    entry_bytes.extend_from_slice(&reader.read(ENTRY_BLOCK)?);
                }
            }

            let entry = IndexEntry::deserialize(std::io::Cursor::new(entry_bytes))?;
            self.store_entry(entry);
        }

        Ok(())
    }

    /// Extensions sit between the last entry and the checksum; each one is a
    /// 4-byte signature and a 4-byte length followed by its payload.
    fn skip_extensions(&mut self, reader: &mut Checksum) -> anyhow::Result<()> {
        while reader.remaining() > 0 {
            let header = reader.read(EXTENSION_HEADER_SIZE)?;
            let signature = String::from_utf8_lossy(&header[0..4]).to_string();
            let size = byteorder::NetworkEndian::read_u32(&header[4..8]) as usize;

            tracing::trace!(extension = %signature, size, "skipping index extension");
            reader.read(size)?;
        }

        Ok(())
    }

    fn store_entry(&mut self, entry: IndexEntry) {
        for parent in entry.parent_dirs() {
            self.children
                .entry(parent.to_path_buf())
                .or_default()
                .insert(entry.name.clone());
        }

        let stages = self.entries.entry(entry.name.clone()).or_default();
        stages.push(entry);
        stages.sort();
    }

    /// Entries recorded for `path`, one per stage present
    pub fn entries_for(&self, path: &Path) -> &[IndexEntry] {
        self.entries.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    /// The entry describing `path` for comparisons: the merged entry, or the
    /// base stage of a conflict
    pub fn entry_by_path(&self, path: &Path) -> Option<&IndexEntry> {
        self.entries_for(path)
            .first()
            .filter(|entry| matches!(entry.stage, Stage::Merged | Stage::Base))
    }

    pub fn is_tracked_file(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn is_tracked_directory(&self, path: &Path) -> bool {
        path.as_os_str().is_empty() || self.children.contains_key(path)
    }

    /// Names of the tracked files and directories directly inside `dir`
    pub fn child_names(&self, dir: &Path) -> BTreeSet<OsString> {
        let descendants: Box<dyn Iterator<Item = &PathBuf>> = if dir.as_os_str().is_empty() {
            Box::new(self.entries.keys())
        } else {
            match self.children.get(dir) {
                Some(children) => Box::new(children.iter()),
                None => Box::new(std::iter::empty()),
            }
        };

        descendants
            .filter_map(|path| path.strip_prefix(dir).ok())
            .filter_map(|relative| relative.components().next())
            .map(|component| component.as_os_str().to_os_string())
            .collect()
    }

    /// Tracked paths at or below `path`
    pub fn paths_under(&self, path: &Path) -> Vec<&Path> {
        self.entries
            .keys()
            .filter(|entry_path| path.as_os_str().is_empty() || entry_path.starts_with(path))
            .map(PathBuf::as_path)
            .collect()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.entries.keys().map(PathBuf::as_path)
    }

    /// An entry is racily clean when it was modified in the same instant the
    /// index was written, so matching stat data proves nothing.
    pub fn is_racily_clean(&self, entry: &IndexEntry) -> bool {
        match self.modified {
            Some((seconds, nanos)) => {
                (entry.metadata.mtime, entry.metadata.mtime_nsec) >= (seconds, nanos)
            }
            None => false,
        }
    }
}
