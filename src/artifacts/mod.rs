//! Git data structures and the status engine built on them
//!
//! - `branch`: ref names and revision parsing
//! - `database`: tree entry type
//! - `diff`: tree-to-tree comparison
//! - `ignore`: ignore rules, decisions and editing
//! - `index`: index entry types
//! - `objects`: blob, tree and commit objects
//! - `status`: three-way status engine

pub mod branch;
pub mod database;
pub mod diff;
pub mod ignore;
pub mod index;
pub mod objects;
pub mod status;
