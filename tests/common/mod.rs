#![allow(dead_code)]

pub mod command;
pub mod file;

use bit_status::areas::repository::Repository;
use bit_status::artifacts::status::notifier::NoopListener;
use bit_status::artifacts::status::status_record::StatusRecord;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub fn open_repository(dir: &Path) -> Repository {
    Repository::new(dir, Box::new(std::io::sink()))
        .unwrap_or_else(|e| panic!("Failed to open repository at {:?}: {}", dir, e))
}

/// Full status map of `roots`, against HEAD, with default options
pub fn statuses(repository: &Repository, roots: &[&str]) -> BTreeMap<PathBuf, StatusRecord> {
    let roots = roots.iter().map(PathBuf::from).collect::<Vec<_>>();

    repository
        .get_status(&roots, None, &mut NoopListener)
        .unwrap_or_else(|e| panic!("Status failed: {}", e))
}

/// `(path, code)` pairs of the records that are not unchanged
pub fn changed_codes(statuses: &BTreeMap<PathBuf, StatusRecord>) -> Vec<(String, String)> {
    statuses
        .values()
        .filter(|record| !record.is_unchanged())
        .map(|record| (record.path.display().to_string(), record.short_code()))
        .collect()
}

pub fn record<'s>(statuses: &'s BTreeMap<PathBuf, StatusRecord>, path: &str) -> &'s StatusRecord {
    statuses
        .get(Path::new(path))
        .unwrap_or_else(|| panic!("No status record for {path}"))
}
