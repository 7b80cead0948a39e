//! Three-way status of working tree paths
//!
//! Paths are classified against the base tree (HEAD unless another revision
//! is asked for), the index and the working tree.
//!
//! ## Components
//!
//! - `comparator`: lock-step walk producing one record per path
//! - `identity`: content identity of working entries
//! - `inspector`: pairwise comparisons between the three snapshots
//! - `notifier`: listener delivery and cancellation
//! - `file_change` / `status_record`: the record types

pub mod comparator;
pub mod error;
pub mod file_change;
pub mod identity;
pub mod inspector;
pub mod notifier;
pub mod status_record;

/// Knobs of one status invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusOptions {
    /// Descend below the direct children of directory roots
    pub recursive: bool,
    /// Mark untracked files identical to in-scope index entries as renames
    /// or copies
    pub detect_renames: bool,
}

impl Default for StatusOptions {
    fn default() -> Self {
        StatusOptions {
            recursive: true,
            detect_renames: true,
        }
    }
}
