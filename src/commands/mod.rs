//! Command implementations behind the `bit-status` binary
//!
//! - `plumbing`: low-level helpers (hash-object)
//! - `porcelain`: user-facing reports (status, conflicts, ignore editing,
//!   revision comparison)
//!
//! Each command is an `impl Repository` block writing to the repository's
//! writer.

pub mod plumbing;
pub mod porcelain;
