//! Storage areas of a repository, all read-only except ignore files
//!
//! - `config`: `[core]` settings status depends on
//! - `database`: loose object store (blobs, trees, commits, tags)
//! - `index`: staging area with merge stages
//! - `refs`: HEAD, branches and tags
//! - `repository`: entry point coordinating the areas
//! - `workspace`: working tree listing and reads

pub mod config;
pub(crate) mod database;
pub(crate) mod index;
pub(crate) mod refs;
pub mod repository;
pub(crate) mod workspace;
