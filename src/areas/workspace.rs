use crate::artifacts::index::index_entry::EntryMetadata;
use anyhow::Context;
use bytes::Bytes;
use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name of the git directory, never listed as working tree content
pub const GIT_DIR_NAME: &str = ".git";

const GITDIR_FILE_PREFIX: &str = "gitdir:";

#[derive(Debug)]
pub struct Workspace {
    path: Box<Path>,
}

impl Workspace {
    pub fn new(path: Box<Path>) -> Self {
        Workspace { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn absolute(&self, path: &Path) -> PathBuf {
        self.path.join(path)
    }

    /// Direct children of `dir_path`, sorted by name, without `.git`
    pub fn list_dir(&self, dir_path: &Path) -> anyhow::Result<Vec<PathBuf>> {
        let root = self.path.join(dir_path);

        WalkDir::new(&root)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| entry.file_name() != GIT_DIR_NAME)
            .map(|entry| {
                let entry = entry.with_context(|| format!("Unable to list {root:?}"))?;
                Ok(dir_path.join(entry.file_name()))
            })
            .collect()
    }

    /// `lstat` of a working tree path; None when it does not exist
    pub fn lstat(&self, file_path: &Path) -> std::io::Result<Option<Metadata>> {
        match std::fs::symlink_metadata(self.path.join(file_path)) {
            Ok(metadata) => Ok(Some(metadata)),
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::NotADirectory) => {
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    pub fn stat_file(&self, file_path: &Path, metadata: Metadata) -> anyhow::Result<EntryMetadata> {
        (self.path.join(file_path).as_path(), metadata).try_into()
    }

    /// A directory holding its own `.git` is the root of another repository
    pub fn is_nested_repository(&self, dir_path: &Path) -> bool {
        !dir_path.as_os_str().is_empty()
            && std::fs::symlink_metadata(self.path.join(dir_path).join(GIT_DIR_NAME)).is_ok()
    }

    pub fn read_link(&self, file_path: &Path) -> anyhow::Result<PathBuf> {
        std::fs::read_link(self.path.join(file_path))
            .with_context(|| format!("Unable to read symbolic link {file_path:?}"))
    }

    pub fn open_file(&self, file_path: &Path) -> anyhow::Result<std::fs::File> {
        std::fs::File::open(self.path.join(file_path))
            .with_context(|| format!("Unable to open {file_path:?}"))
    }

    pub fn read_file(&self, file_path: &Path) -> anyhow::Result<Bytes> {
        let content = std::fs::read(self.path.join(file_path))
            .with_context(|| format!("Unable to read {file_path:?}"))?;

        Ok(Bytes::from(content))
    }
}

/// Locate the git directory of the working tree rooted at `worktree`.
///
/// `.git` is either the directory itself or a file holding `gitdir: <path>`,
/// as written for submodules and linked worktrees.
pub fn git_dir_of(worktree: &Path) -> Option<PathBuf> {
    let dot_git = worktree.join(GIT_DIR_NAME);
    let metadata = std::fs::metadata(&dot_git).ok()?;

    if metadata.is_dir() {
        return Some(dot_git);
    }

    let content = std::fs::read_to_string(&dot_git).ok()?;
    let target = content.trim().strip_prefix(GITDIR_FILE_PREFIX)?.trim();
    let target = Path::new(target);

    Some(if target.is_absolute() {
        target.to_path_buf()
    } else {
        worktree.join(target)
    })
}
