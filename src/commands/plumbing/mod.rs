//! Plumbing commands
//!
//! - `hash_object`: content identity of a working tree entry

pub mod hash_object;
