//! Ignore rules: compiling, resolving and editing them
//!
//! - `pattern`: one line of an ignore file as a matchable rule
//! - `resolver`: the combined decision of every ignore source for a path
//! - `editor`: adding and removing rules so a path becomes (un)ignored

pub mod editor;
pub mod pattern;
pub mod resolver;

/// Per-directory ignore file name
pub const IGNORE_FILE_NAME: &str = ".gitignore";

/// Repository-local exclude file, relative to the git directory
pub const EXCLUDE_FILE: &str = "info/exclude";
