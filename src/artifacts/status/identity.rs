//! Canonical content identity of working tree entries
//!
//! The identity is what the entry would hash to once staged: a blob id for
//! files and symbolic links, the checked-out commit for nested repositories.

use crate::areas::config::{LineEndingPolicy, RepositoryConfig};
use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::areas::workspace::{Workspace, git_dir_of};
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::EntryMetadata;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::object::Object;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Bytes inspected when deciding whether content is binary
const BINARY_PROBE_LEN: usize = 8000;

/// Kind of entry found at a working tree path
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkingEntry {
    Missing,
    File(EntryMetadata),
    Symlink(EntryMetadata),
    Directory,
    /// Directory that is the root of another repository
    NestedRepository,
}

impl WorkingEntry {
    pub fn is_present(&self) -> bool {
        !matches!(self, WorkingEntry::Missing)
    }

    /// Entries compared as a single unit against index and tree entries
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            WorkingEntry::File(_) | WorkingEntry::Symlink(_) | WorkingEntry::NestedRepository
        )
    }

    pub fn mode(&self) -> Option<EntryMode> {
        match self {
            WorkingEntry::File(stat) | WorkingEntry::Symlink(stat) => Some(stat.mode),
            WorkingEntry::NestedRepository => Some(EntryMode::Gitlink),
            WorkingEntry::Directory => Some(EntryMode::Directory),
            WorkingEntry::Missing => None,
        }
    }

    pub fn stat(&self) -> Option<&EntryMetadata> {
        match self {
            WorkingEntry::File(stat) | WorkingEntry::Symlink(stat) => Some(stat),
            _ => None,
        }
    }
}

/// Staged identity of working content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentIdentity {
    pub oid: ObjectId,
    pub size: u64,
}

pub struct IdentityComputer<'r> {
    workspace: &'r Workspace,
    database: &'r Database,
    config: &'r RepositoryConfig,
    /// Leading directories already checked, and whether each is a symlink
    symlinked_dirs: RefCell<HashMap<PathBuf, bool>>,
}

impl<'r> IdentityComputer<'r> {
    pub fn new(workspace: &'r Workspace, database: &'r Database, config: &'r RepositoryConfig) -> Self {
        IdentityComputer {
            workspace,
            database,
            config,
            symlinked_dirs: RefCell::new(HashMap::new()),
        }
    }

    /// Inspect what is at `path` without reading content
    pub fn classify(&self, path: &Path) -> anyhow::Result<WorkingEntry> {
        // content reached through a symlinked directory is not in the tree
        if self.has_symlink_leading_path(path) {
            return Ok(WorkingEntry::Missing);
        }

        let Some(metadata) = self
            .workspace
            .lstat(path)
            .with_context(|| format!("Unable to stat {path:?}"))?
        else {
            return Ok(WorkingEntry::Missing);
        };

        let file_type = metadata.file_type();
        if file_type.is_dir() {
            if self.workspace.is_nested_repository(path) {
                return Ok(WorkingEntry::NestedRepository);
            }
            return Ok(WorkingEntry::Directory);
        }

        if !file_type.is_file() && !file_type.is_symlink() {
            anyhow::bail!("{path:?} is not a regular file, a directory or a symbolic link");
        }

        let stat = self.workspace.stat_file(path, metadata)?;
        if file_type.is_symlink() {
            Ok(WorkingEntry::Symlink(stat))
        } else {
            Ok(WorkingEntry::File(stat))
        }
    }

    fn has_symlink_leading_path(&self, path: &Path) -> bool {
        path.ancestors()
            .skip(1)
            .filter(|dir| !dir.as_os_str().is_empty())
            .any(|dir| self.is_symlinked_dir(dir))
    }

    fn is_symlinked_dir(&self, dir: &Path) -> bool {
        if let Some(known) = self.symlinked_dirs.borrow().get(dir) {
            return *known;
        }

        let symlinked = matches!(
            self.workspace.lstat(dir),
            Ok(Some(metadata)) if metadata.file_type().is_symlink()
        );
        self.symlinked_dirs
            .borrow_mut()
            .insert(dir.to_path_buf(), symlinked);

        symlinked
    }

    /// Mode the entry would be staged with, given the mode already recorded
    pub fn effective_mode(&self, entry: &WorkingEntry, recorded: Option<EntryMode>) -> Option<EntryMode> {
        let mode = entry.mode()?;
        match (self.config.trust_executable_bit, recorded) {
            (false, Some(recorded)) => Some(mode.with_executable_bit_of(recorded)),
            _ => Some(mode),
        }
    }

    /// Identity of the working entry at `path`; `staged` is the blob the
    /// path currently has in the index, used by line-ending normalization
    #[tracing::instrument(level = "trace", skip(self, entry))]
    pub fn identity_of(
        &self,
        path: &Path,
        entry: &WorkingEntry,
        staged: Option<&ObjectId>,
    ) -> anyhow::Result<ContentIdentity> {
        match entry {
            WorkingEntry::File(stat) => self.file_identity(path, stat.size, staged),
            WorkingEntry::Symlink(_) => {
                let target = self.workspace.read_link(path)?;
                let target = target.as_os_str().as_bytes();
                let blob = Blob::new(Bytes::copy_from_slice(target));

                Ok(ContentIdentity {
                    oid: blob.object_id()?,
                    size: target.len() as u64,
                })
            }
            WorkingEntry::NestedRepository => {
                let worktree = self.workspace.absolute(path);
                let git_dir = git_dir_of(&worktree)
                    .with_context(|| format!("{path:?} has no git directory"))?;
                // an unborn nested repository has no commit to record yet
                let head = Refs::new(git_dir.into_boxed_path())
                    .read_head()?
                    .unwrap_or_else(ObjectId::zero);

                Ok(ContentIdentity { oid: head, size: 0 })
            }
            WorkingEntry::Directory | WorkingEntry::Missing => {
                anyhow::bail!("{path:?} has no content identity")
            }
        }
    }

    fn file_identity(
        &self,
        path: &Path,
        size: u64,
        staged: Option<&ObjectId>,
    ) -> anyhow::Result<ContentIdentity> {
        if !self.config.line_endings.is_active() {
            let file = self.workspace.open_file(path)?;
            let oid = Blob::hash_stream(size, file)
                .with_context(|| format!("Unable to hash {path:?}"))?;
            return Ok(ContentIdentity { oid, size });
        }

        let content = self.workspace.read_file(path)?;
        let content = match self.normalize(path, &content, staged)? {
            Some(normalized) => normalized,
            None => content,
        };

        let blob = Blob::new(content);
        Ok(ContentIdentity {
            oid: blob.object_id()?,
            size: blob.len() as u64,
        })
    }

    /// CRLF -> LF conversion, or None when the content must be hashed as-is
    fn normalize(
        &self,
        path: &Path,
        content: &Bytes,
        staged: Option<&ObjectId>,
    ) -> anyhow::Result<Option<Bytes>> {
        if !contains_crlf(content) {
            return Ok(None);
        }
        if is_binary(content) {
            tracing::debug!(?path, "binary content, line endings kept");
            return Ok(None);
        }

        if let Some(staged) = staged.filter(|oid| self.database.has_object(oid)) {
            let blob = self.database.read_blob(staged)?;
            if blob.content().contains(&b'\r') {
                tracing::debug!(?path, "staged content has CR, line endings kept");
                return Ok(None);
            }
        }

        let normalized = crlf_to_lf(content);
        if self.config.line_endings == LineEndingPolicy::Native
            && lf_to_crlf(&normalized) != content.as_ref()
        {
            tracing::debug!(?path, "mixed line endings, normalization would be lossy");
            return Ok(None);
        }

        Ok(Some(Bytes::from(normalized)))
    }
}

fn is_binary(content: &[u8]) -> bool {
    content.iter().take(BINARY_PROBE_LEN).any(|&b| b == 0)
}

fn contains_crlf(content: &[u8]) -> bool {
    content.windows(2).any(|pair| pair == b"\r\n")
}

fn crlf_to_lf(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len());
    let mut bytes = content.iter().peekable();
    while let Some(&b) = bytes.next() {
        if b == b'\r' && bytes.peek() == Some(&&b'\n') {
            continue;
        }
        out.push(b);
    }
    out
}

fn lf_to_crlf(content: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(content.len() + content.len() / 16);
    for &b in content {
        if b == b'\n' {
            out.push(b'\r');
        }
        out.push(b);
    }
    out
}
