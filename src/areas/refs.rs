//! Git references (branches, HEAD, tags), read-only
//!
//! References are human-readable names pointing to commits. They can be:
//! - Direct: Containing a commit SHA-1
//! - Symbolic: Pointing to another reference (e.g., HEAD -> refs/heads/master)
//!
//! ## File Format
//!
//! Loose references are text files holding either a 40-character SHA-1 or
//! `ref: <path>`. References that were packed live in `.git/packed-refs` as
//! `<sha1> <path>` lines; loose files take precedence over packed lines.

use crate::artifacts::branch::branch_name::{BranchName, SymRefName};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use std::path::Path;

/// Git references reader
#[derive(Debug, new)]
pub struct Refs {
    /// Path to the git directory (typically `.git`)
    path: Box<Path>,
}

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// Symbolic refs deeper than this are treated as a loop
const MAX_SYMREF_DEPTH: usize = 5;

/// Places a short ref name is looked up, in git's order
const REF_SEARCH_PATHS: [&str; 5] = ["", "refs/", "refs/tags/", "refs/heads/", "refs/remotes/"];

/// Internal representation of a reference value
#[derive(Debug, Clone)]
enum SymRefOrOid {
    /// Symbolic reference pointing to another ref
    SymRef { sym_ref_name: SymRefName },
    /// Direct object ID
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read_symref_or_oid(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {path:?}"))?;
        let content = content.trim();

        if content.is_empty() {
            return Ok(None);
        }

        let symref_match = regex::Regex::new(SYMREF_REGEX)?.captures(content);
        if let Some(symref_match) = symref_match {
            Ok(Some(SymRefOrOid::SymRef {
                sym_ref_name: SymRefName::new(symref_match[1].to_string()),
            }))
        } else {
            Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?)))
        }
    }
}

impl Refs {
    /// Follow symbolic references from `source` (HEAD if None) to the final
    /// ref name, e.g. HEAD -> refs/heads/main
    pub fn current_ref(&self, source: Option<SymRefName>) -> anyhow::Result<SymRefName> {
        let mut current = source.unwrap_or_else(|| SymRefName::new(HEAD_REF_NAME.to_string()));

        for _ in 0..MAX_SYMREF_DEPTH {
            match SymRefOrOid::read_symref_or_oid(&self.path.join(current.as_ref_path()))? {
                Some(SymRefOrOid::SymRef { sym_ref_name }) => current = sym_ref_name,
                Some(SymRefOrOid::Oid(_)) | None => return Ok(current),
            }
        }

        anyhow::bail!("symbolic ref loop at {}", current.as_ref_path())
    }

    /// Commit HEAD points to; None on an unborn branch
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.read_symref(&SymRefName::new(HEAD_REF_NAME.to_string()))
    }

    /// Resolve a full ref path, loose or packed, following indirection
    pub fn read_symref(&self, sym_ref_name: &SymRefName) -> anyhow::Result<Option<ObjectId>> {
        let target = self.current_ref(Some(sym_ref_name.clone()))?;

        match SymRefOrOid::read_symref_or_oid(&self.path.join(target.as_ref_path()))? {
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            _ => self.read_packed_ref(target.as_ref_path()),
        }
    }

    /// Resolve a short ref name the way git does: `<name>`, `refs/<name>`,
    /// `refs/tags/<name>`, `refs/heads/<name>`, `refs/remotes/<name>`
    ///
    /// Fails when no such ref exists; an existing symbolic ref whose target
    /// is unborn yields None.
    pub fn read_ref(&self, branch_name: &BranchName) -> anyhow::Result<Option<ObjectId>> {
        let packed = self.packed_refs()?;

        for prefix in REF_SEARCH_PATHS {
            // only pseudo refs such as HEAD or ORIG_HEAD live at the top level
            if prefix.is_empty() && !Self::is_pseudo_ref(branch_name.as_ref()) {
                continue;
            }

            let ref_path = format!("{prefix}{}", branch_name.as_ref());
            let loose = self.path.join(&ref_path);

            if loose.is_file() {
                return self.read_symref(&SymRefName::new(ref_path));
            }
            if let Some((oid, _)) = packed.iter().find(|(_, name)| name == &ref_path) {
                return Ok(Some(oid.clone()));
            }
        }

        anyhow::bail!("ref {} not found", branch_name)
    }

    fn is_pseudo_ref(name: &str) -> bool {
        name.chars().all(|c| c.is_ascii_uppercase() || c == '_')
    }

    fn read_packed_ref(&self, ref_path: &str) -> anyhow::Result<Option<ObjectId>> {
        Ok(self
            .packed_refs()?
            .into_iter()
            .find(|(_, name)| name == ref_path)
            .map(|(oid, _)| oid))
    }

    /// Entries of `.git/packed-refs`; peeled `^` lines and comments are skipped
    fn packed_refs(&self) -> anyhow::Result<Vec<(ObjectId, String)>> {
        let packed_path = self.path.join("packed-refs");
        if !packed_path.is_file() {
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&packed_path)
            .with_context(|| format!("failed to read {packed_path:?}"))?;

        Ok(content
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .filter_map(|line| line.split_once(' '))
            .filter_map(|(oid, name)| {
                ObjectId::try_parse(oid.to_string())
                    .ok()
                    .map(|oid| (oid, name.trim().to_string()))
            })
            .collect())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }
}
