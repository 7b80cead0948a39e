//! Git index file format
//!
//! The index (also called staging area or cache) records what the next commit
//! will contain. The status engine only reads it.
//!
//! ## File Format (Versions 2 and 3)
//!
//! ```text
//! Header (12 bytes):
//!   - Signature: "DIRC" (4 bytes)
//!   - Version: 2 or 3 (4 bytes)
//!   - Entry count (4 bytes)
//!
//! Entries (variable length):
//!   - 62 bytes of stat data, object id and flags
//!   - 2 more bytes of extended flags when the extended bit is set (v3)
//!   - NUL-padded path to an 8-byte boundary
//!
//! Extensions (optional, skipped):
//!   - 4-byte signature, 4-byte size, payload
//!
//! Checksum (20 bytes):
//!   - SHA-1 hash of all preceding bytes
//! ```

pub mod checksum;
pub mod entry_mode;
pub mod index_entry;
pub mod index_header;

/// Size of SHA-1 checksum in bytes
pub const CHECKSUM_SIZE: usize = 20;

/// Size of index header in bytes
pub const HEADER_SIZE: usize = 12; // 4 bytes for marker, 4 for version, 4 for entries_count

/// Size of an extension header (signature + payload size)
pub const EXTENSION_HEADER_SIZE: usize = 8;

/// Magic signature identifying index files
pub const SIGNATURE: &str = "DIRC";

/// Index file format versions this reader understands
pub const SUPPORTED_VERSIONS: [u32; 2] = [2, 3];
