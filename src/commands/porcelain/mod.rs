//! Porcelain commands
//!
//! - `status`: three-column status of working tree paths
//! - `conflicts`: unresolved merge paths
//! - `ignore`: check-ignore, ignore and unignore
//! - `compare`: name-status between two revisions

pub mod compare;
pub mod conflicts;
pub mod ignore;
pub mod status;
