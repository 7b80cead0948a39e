//! Index entry representation
//!
//! Each entry in the index represents a staged path with:
//! - File path
//! - Content hash (object ID)
//! - Stat metadata (mode, size, timestamps)
//! - Merge stage and flags
//!
//! Stat metadata lets the status engine detect unchanged files without
//! reading their content.

use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use bitflags::bitflags;
use byteorder::ByteOrder;
use derive_new::new;
use is_executable::IsExecutable;
use std::fs::Metadata;
use std::io::BufRead;
use std::os::unix::prelude::MetadataExt;
use std::path::{Path, PathBuf};

/// Size of the fixed part of an entry (stat data, object id, flags)
pub const ENTRY_FIXED_SIZE: usize = 62;

/// Size of the extended flags field present in v3 extended entries
pub const EXTENDED_FLAGS_SIZE: usize = 2;

/// Block size for entry alignment (8 bytes)
pub const ENTRY_BLOCK: usize = 8;

/// Name length value meaning "look for the NUL terminator instead"
pub const NAME_LENGTH_OVERFLOW: usize = 0xfff;

bitflags! {
    /// Per-entry flags, combining the on-disk flags word and the v3 extended flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct EntryFlags: u32 {
        const ASSUME_VALID = 0x8000;
        const EXTENDED = 0x4000;
        const SKIP_WORKTREE = 0x4000 << 16;
        const INTENT_TO_ADD = 0x2000 << 16;
    }
}

impl EntryFlags {
    /// The working copy must be treated as unchanged for this entry
    pub fn assumes_unchanged(&self) -> bool {
        self.intersects(EntryFlags::ASSUME_VALID | EntryFlags::SKIP_WORKTREE)
    }
}

/// Merge stage of an index entry
///
/// Stage 0 is a normally staged path; 1, 2 and 3 hold the common ancestor,
/// "ours" and "theirs" versions of an unresolved conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
pub enum Stage {
    #[default]
    Merged,
    Base,
    Ours,
    Theirs,
}

impl Stage {
    fn from_flags(flags: u16) -> Self {
        match (flags >> 12) & 0x3 {
            1 => Stage::Base,
            2 => Stage::Ours,
            3 => Stage::Theirs,
            _ => Stage::Merged,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            Stage::Merged => 0,
            Stage::Base => 1,
            Stage::Ours => 2,
            Stage::Theirs => 3,
        }
    }
}

/// Index entry representing a staged path
#[derive(Debug, Clone, Default, new)]
pub struct IndexEntry {
    /// Path relative to repository root
    pub name: PathBuf,
    /// SHA-1 hash of the staged content
    pub oid: ObjectId,
    /// Stat data recorded when the entry was staged
    pub metadata: EntryMetadata,
    #[new(default)]
    pub stage: Stage,
    #[new(default)]
    pub flags: EntryFlags,
}

impl IndexEntry {
    pub fn basename(&self) -> anyhow::Result<&str> {
        self.name
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| anyhow::anyhow!("Invalid file name"))
    }

    pub fn parent_dirs(&self) -> Vec<&Path> {
        let mut dirs = self
            .name
            .ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        dirs.reverse();

        dirs
    }

    pub fn is_conflicted(&self) -> bool {
        self.stage != Stage::Merged
    }

    pub fn stat_match(&self, other: &EntryMetadata) -> bool {
        (self.metadata.size == 0 || self.metadata.size == other.size)
            && self.metadata.mode == other.mode
    }

    pub fn times_match(&self, other: &EntryMetadata) -> bool {
        self.metadata.ctime == other.ctime
            && self.metadata.ctime_nsec == other.ctime_nsec
            && self.metadata.mtime == other.mtime
            && self.metadata.mtime_nsec == other.mtime_nsec
    }

    /// Recorded modification time in milliseconds since the epoch
    pub fn mtime_millis(&self) -> i64 {
        self.metadata.mtime * 1000 + self.metadata.mtime_nsec / 1_000_000
    }

    /// Length of the entry on disk, including the NUL padding
    pub fn on_disk_size(fixed_size: usize, name_len: usize) -> usize {
        (fixed_size + name_len + ENTRY_BLOCK) & !(ENTRY_BLOCK - 1)
    }
}

impl PartialEq for IndexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.stage == other.stage
    }
}

impl Eq for IndexEntry {}

impl PartialOrd for IndexEntry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for IndexEntry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.stage.cmp(&other.stage))
    }
}

/// Stat metadata stored in index entries
///
/// `ctime` is the inode change time and `mtime` the content modification
/// time, both with nanosecond precision.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryMetadata {
    pub ctime: i64,
    pub ctime_nsec: i64,
    pub mtime: i64,
    pub mtime_nsec: i64,
    pub dev: u64,
    pub ino: u64,
    pub mode: EntryMode,
    pub uid: u32,
    pub gid: u32,
    pub size: u64,
}

impl Unpackable for IndexEntry {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;

        if bytes.len() < ENTRY_FIXED_SIZE {
            return Err(anyhow::anyhow!("Invalid index entry size"));
        }

        let ctime = byteorder::NetworkEndian::read_u32(&bytes[0..4]) as i64;
        let ctime_nsec = byteorder::NetworkEndian::read_u32(&bytes[4..8]) as i64;
        let mtime = byteorder::NetworkEndian::read_u32(&bytes[8..12]) as i64;
        let mtime_nsec = byteorder::NetworkEndian::read_u32(&bytes[12..16]) as i64;
        let dev = byteorder::NetworkEndian::read_u32(&bytes[16..20]) as u64;
        let ino = byteorder::NetworkEndian::read_u32(&bytes[20..24]) as u64;
        let mode = EntryMode::try_from(byteorder::NetworkEndian::read_u32(&bytes[24..28]))?;
        let uid = byteorder::NetworkEndian::read_u32(&bytes[28..32]);
        let gid = byteorder::NetworkEndian::read_u32(&bytes[32..36]);
        let size = byteorder::NetworkEndian::read_u32(&bytes[36..40]) as u64;
        let mut oid_bytes = std::io::Cursor::new(&bytes[40..60]);
        let oid = ObjectId::read_h40_from(&mut oid_bytes)?;
        let raw_flags = byteorder::NetworkEndian::read_u16(&bytes[60..62]);

        let mut flags = EntryFlags::from_bits_truncate(raw_flags as u32);
        let mut name_start = ENTRY_FIXED_SIZE;
        if flags.contains(EntryFlags::EXTENDED) {
            if bytes.len() < ENTRY_FIXED_SIZE + EXTENDED_FLAGS_SIZE {
                return Err(anyhow::anyhow!("Truncated extended index entry"));
            }
            let extended = byteorder::NetworkEndian::read_u16(&bytes[62..64]) as u32;
            flags |= EntryFlags::from_bits_truncate(extended << 16);
            name_start += EXTENDED_FLAGS_SIZE;
        }

        // Extract the entry name, which is null-terminated
        let name_end = bytes[name_start..]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| anyhow::anyhow!("Missing null terminator in entry name"))?;
        let name_bytes = &bytes[name_start..name_start + name_end];
        let name = PathBuf::from(
            std::str::from_utf8(name_bytes)
                .map_err(|_| anyhow::anyhow!("Invalid UTF-8 in entry name"))?,
        );

        Ok(IndexEntry {
            name,
            oid,
            metadata: EntryMetadata {
                ctime,
                ctime_nsec,
                mtime,
                mtime_nsec,
                dev,
                ino,
                mode,
                uid,
                gid,
                size,
            },
            stage: Stage::from_flags(raw_flags),
            flags,
        })
    }
}

impl TryFrom<(&Path, Metadata)> for EntryMetadata {
    type Error = anyhow::Error;

    fn try_from((file_path, metadata): (&Path, Metadata)) -> Result<Self, Self::Error> {
        let file_type = metadata.file_type();
        let mode = if file_type.is_symlink() {
            EntryMode::Symlink
        } else if file_type.is_dir() {
            EntryMode::Directory
        } else {
            match file_path.is_executable() {
                true => EntryMode::File(FileMode::Executable),
                false => EntryMode::File(FileMode::Regular),
            }
        };

        Ok(Self {
            ctime: metadata.ctime(),
            ctime_nsec: metadata.ctime_nsec(),
            mtime: metadata.mtime(),
            mtime_nsec: metadata.mtime_nsec(),
            dev: metadata.dev(),
            ino: metadata.ino(),
            mode,
            uid: metadata.uid(),
            gid: metadata.gid(),
            size: metadata.size(),
        })
    }
}
