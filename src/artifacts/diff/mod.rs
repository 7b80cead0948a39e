//! Tree-to-tree comparison
//!
//! Name-status differences between two revisions, the two-revision form of
//! status that leaves the index and the working tree out.

pub mod tree_diff;
