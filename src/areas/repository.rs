//! Entry point tying the storage areas to the status engine
//!
//! A `Repository` is opened once and queried many times. Every query reads
//! the index, the base tree, the configuration and the ignore files afresh,
//! so consecutive calls see each other's effects and nothing is cached
//! between them.

use crate::areas::config::RepositoryConfig;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::refs::Refs;
use crate::areas::workspace::{GIT_DIR_NAME, Workspace, git_dir_of};
use crate::artifacts::branch::revision::Revision;
use crate::artifacts::diff::tree_diff::{FileDifference, TreeDiff};
use crate::artifacts::ignore::editor::IgnoreEditor;
use crate::artifacts::ignore::resolver::{IgnoreDecision, IgnoreResolver};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::StatusOptions;
use crate::artifacts::status::comparator::{BaseTree, TreeComparator};
use crate::artifacts::status::error::{StatusError, StatusResult};
use crate::artifacts::status::notifier::{
    CancellationToken, NoopListener, StatusListener, StatusNotifier, StatusReport,
};
use crate::artifacts::status::status_record::StatusRecord;
use std::cell::{RefCell, RefMut};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

const DEFAULT_REVISION: &str = "HEAD";

pub struct Repository {
    /// Root of the working tree
    path: Box<Path>,
    git_dir: Box<Path>,
    writer: RefCell<Box<dyn std::io::Write>>,
    database: Database,
    workspace: Workspace,
    refs: Refs,
    /// Replaces `.git/config` when set
    config: Option<RepositoryConfig>,
}

impl Repository {
    /// Open the repository containing `path`, searching upwards for a
    /// directory holding `.git`
    pub fn new(path: &Path, writer: Box<dyn std::io::Write>) -> StatusResult<Self> {
        let start = path
            .canonicalize()
            .map_err(|_| StatusError::NotARepository(path.to_path_buf()))?;

        let (worktree, git_dir) = start
            .ancestors()
            .find_map(|dir| git_dir_of(dir).map(|git_dir| (dir.to_path_buf(), git_dir)))
            .ok_or_else(|| StatusError::NotARepository(path.to_path_buf()))?;
        tracing::debug!(?worktree, ?git_dir, "opened repository");

        Ok(Repository {
            database: Database::new(git_dir.join("objects").into_boxed_path()),
            workspace: Workspace::new(worktree.clone().into_boxed_path()),
            refs: Refs::new(git_dir.clone().into_boxed_path()),
            path: worktree.into_boxed_path(),
            git_dir: git_dir.into_boxed_path(),
            writer: RefCell::new(writer),
            config: None,
        })
    }

    /// Use `config` instead of reading `.git/config` on every query
    pub fn with_config(mut self, config: RepositoryConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn git_dir(&self) -> &Path {
        &self.git_dir
    }

    pub fn writer(&'_ self) -> RefMut<'_, Box<dyn std::io::Write>> {
        self.writer.borrow_mut()
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }

    pub fn config(&self) -> anyhow::Result<RepositoryConfig> {
        match &self.config {
            Some(config) => Ok(config.clone()),
            None => RepositoryConfig::load(&self.git_dir),
        }
    }

    pub(crate) fn load_index(&self) -> anyhow::Result<Index> {
        let mut index = Index::new(self.git_dir.join("index").into_boxed_path());
        index.rehydrate()?;
        Ok(index)
    }

    fn ignore_resolver(&self, config: &RepositoryConfig) -> IgnoreResolver {
        IgnoreResolver::new(&self.path, &self.git_dir, config.excludes_file.as_deref())
    }

    /// Stream the status of everything below `roots` to `listener`.
    ///
    /// An empty `roots` means the whole working tree. The base revision
    /// defaults to HEAD; an unborn branch compares against an empty tree.
    #[tracing::instrument(level = "debug", skip(self, listener, cancel))]
    pub fn status(
        &self,
        roots: &[PathBuf],
        base_revision: Option<&str>,
        options: StatusOptions,
        listener: &mut dyn StatusListener,
        cancel: CancellationToken,
    ) -> StatusResult<StatusReport> {
        let roots = roots
            .iter()
            .map(|root| self.relativize(root))
            .collect::<StatusResult<Vec<_>>>()?;

        let config = self.config()?;
        let index = self.load_index()?;
        let base_tree = self.base_tree(base_revision)?;
        let resolver = self.ignore_resolver(&config);
        let notifier = StatusNotifier::new(listener, cancel);

        let comparator = TreeComparator::new(
            &self.workspace,
            &self.database,
            &index,
            &config,
            &base_tree,
            resolver,
            notifier,
            options,
        );
        let report = comparator.run(&roots)?;
        tracing::debug!(
            records = report.statuses.len(),
            cancelled = report.cancelled,
            "status finished"
        );

        Ok(report)
    }

    /// Status with default options and no way to cancel
    pub fn get_status(
        &self,
        roots: &[PathBuf],
        base_revision: Option<&str>,
        listener: &mut dyn StatusListener,
    ) -> StatusResult<BTreeMap<PathBuf, StatusRecord>> {
        let report = self.status(
            roots,
            base_revision,
            StatusOptions::default(),
            listener,
            CancellationToken::new(),
        )?;

        Ok(report.statuses)
    }

    /// Paths below `roots` with unresolved merge stages
    pub fn get_conflicts(
        &self,
        roots: &[PathBuf],
    ) -> StatusResult<BTreeMap<PathBuf, StatusRecord>> {
        let options = StatusOptions {
            detect_renames: false,
            ..StatusOptions::default()
        };
        let report = self.status(
            roots,
            None,
            options,
            &mut NoopListener,
            CancellationToken::new(),
        )?;

        Ok(report
            .statuses
            .into_iter()
            .filter(|(_, record)| record.conflict)
            .collect())
    }

    pub fn is_ignored(&self, path: &Path) -> StatusResult<IgnoreDecision> {
        let path = self.relativize(path)?;
        let config = self.config()?;
        let is_dir = self.is_directory(&path)?;

        Ok(self.ignore_resolver(&config).is_ignored(&path, is_dir))
    }

    /// Make `path` ignored; returns the ignore files that changed
    pub fn add_ignore_rule(&self, path: &Path) -> StatusResult<Vec<PathBuf>> {
        let path = self.relativize(path)?;
        let config = self.config()?;
        let is_dir = self.is_directory(&path)?;
        let mut resolver = self.ignore_resolver(&config);

        Ok(IgnoreEditor::new(&mut resolver).add(&path, is_dir)?)
    }

    /// Make `path` no longer ignored; returns the ignore files that changed
    pub fn remove_ignore_rule(&self, path: &Path) -> StatusResult<Vec<PathBuf>> {
        let path = self.relativize(path)?;
        let config = self.config()?;
        let is_dir = self.is_directory(&path)?;
        let mut resolver = self.ignore_resolver(&config);

        Ok(IgnoreEditor::new(&mut resolver).remove(&path, is_dir)?)
    }

    /// Name-status differences between the trees of two revisions, limited
    /// to `roots`
    #[tracing::instrument(level = "debug", skip(self))]
    pub fn compare_revisions(
        &self,
        roots: &[PathBuf],
        first: &str,
        second: &str,
    ) -> StatusResult<BTreeMap<PathBuf, FileDifference>> {
        let roots = roots
            .iter()
            .map(|root| self.relativize(root))
            .collect::<StatusResult<Vec<_>>>()?;
        let first = self.resolve_revision(first)?;
        let second = self.resolve_revision(second)?;

        let mut diff = TreeDiff::new(&self.database);
        diff.compare_oids(first.as_ref(), second.as_ref(), Path::new(""))?;

        Ok(diff
            .into_changes()
            .into_iter()
            .filter(|(path, _)| {
                roots.is_empty() || roots.iter().any(|root| path.starts_with(root))
            })
            .collect())
    }

    /// Commit named by `revision`; None for an unborn branch
    pub fn resolve_revision(&self, revision: &str) -> StatusResult<Option<ObjectId>> {
        let unknown = |err: anyhow::Error| StatusError::UnknownRevision {
            revision: revision.to_string(),
            reason: format!("{err:#}"),
        };

        Revision::try_parse(revision)
            .and_then(|parsed| parsed.resolve(self))
            .map_err(unknown)
    }

    fn base_tree(&self, revision: Option<&str>) -> StatusResult<BaseTree> {
        match self.resolve_revision(revision.unwrap_or(DEFAULT_REVISION))? {
            Some(commit_oid) => Ok(self.database.load_commit_tree(&commit_oid)?),
            None => Ok(BaseTree::new()),
        }
    }

    fn is_directory(&self, path: &Path) -> anyhow::Result<bool> {
        if path.as_os_str().is_empty() {
            return Ok(true);
        }

        match self.workspace.lstat(path)? {
            Some(metadata) => Ok(metadata.is_dir()),
            None => Ok(self.load_index()?.is_tracked_directory(path)),
        }
    }

    /// Repository-relative form of `path`, which is either absolute or
    /// relative to the working tree root
    pub fn relativize(&self, path: &Path) -> StatusResult<PathBuf> {
        let outside = || StatusError::OutsideWorkingTree {
            path: path.to_path_buf(),
            worktree: self.path.to_path_buf(),
        };

        let relative = if path.is_absolute() {
            match path.strip_prefix(&self.path) {
                Ok(relative) => relative.to_path_buf(),
                Err(_) => {
                    // the worktree is canonical; the caller's path may not be
                    let canonical = canonicalize_lenient(path).ok_or_else(outside)?;
                    canonical
                        .strip_prefix(&self.path)
                        .map_err(|_| outside())?
                        .to_path_buf()
                }
            }
        } else {
            path.to_path_buf()
        };

        let mut normalized = PathBuf::new();
        for component in relative.components() {
            match component {
                Component::Normal(name) => normalized.push(name),
                Component::CurDir => {}
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(outside());
                    }
                }
                Component::RootDir | Component::Prefix(_) => return Err(outside()),
            }
        }

        if normalized.starts_with(GIT_DIR_NAME) {
            return Err(outside());
        }

        Ok(normalized)
    }
}

/// Canonical form of `path`, resolving the deepest existing ancestor when
/// the path itself does not exist
fn canonicalize_lenient(path: &Path) -> Option<PathBuf> {
    let mut missing = Vec::new();
    let mut existing = path;

    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return Some(missing.into_iter().rev().fold(canonical, |acc, name| acc.join(name)));
        }
        missing.push(existing.file_name()?);
        existing = existing.parent()?;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repository_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        dir.child(".git/objects").create_dir_all().unwrap();
        dir.child(".git/HEAD")
            .write_str("ref: refs/heads/main\n")
            .unwrap();
        dir
    }

    fn open(dir: &TempDir) -> Repository {
        Repository::new(dir.path(), Box::new(std::io::sink())).unwrap()
    }

    #[rstest]
    fn discovers_the_repository_from_a_subdirectory(repository_dir: TempDir) {
        repository_dir.child("a/b").create_dir_all().unwrap();

        let repository =
            Repository::new(&repository_dir.path().join("a/b"), Box::new(std::io::sink())).unwrap();

        assert_eq!(
            repository.path(),
            repository_dir.path().canonicalize().unwrap()
        );
    }

    #[test]
    fn directories_without_git_are_not_repositories() {
        let dir = TempDir::new().unwrap();
        let result = Repository::new(&dir.path().join("missing"), Box::new(std::io::sink()));

        assert!(matches!(result, Err(StatusError::NotARepository(_))));
    }

    #[rstest]
    #[case("a/b", "a/b")]
    #[case("./a/../b", "b")]
    #[case("", "")]
    fn relativizes_worktree_paths(
        repository_dir: TempDir,
        #[case] input: &str,
        #[case] expected: &str,
    ) {
        let repository = open(&repository_dir);

        assert_eq!(
            repository.relativize(Path::new(input)).unwrap(),
            PathBuf::from(expected)
        );
    }

    #[rstest]
    #[case("../outside")]
    #[case(".git/config")]
    #[case("/definitely/not/here")]
    fn rejects_paths_outside_the_worktree(repository_dir: TempDir, #[case] input: &str) {
        let repository = open(&repository_dir);

        assert!(matches!(
            repository.relativize(Path::new(input)),
            Err(StatusError::OutsideWorkingTree { .. })
        ));
    }

    #[rstest]
    fn absolute_paths_inside_the_worktree_are_accepted(repository_dir: TempDir) {
        let repository = open(&repository_dir);
        let absolute = repository_dir.path().join("new/file.txt");

        assert_eq!(
            repository.relativize(&absolute).unwrap(),
            PathBuf::from("new/file.txt")
        );
    }

    #[rstest]
    fn unborn_head_has_an_empty_base_tree(repository_dir: TempDir) {
        let repository = open(&repository_dir);

        assert_eq!(repository.resolve_revision("HEAD").unwrap(), None);
        assert!(repository.base_tree(None).unwrap().is_empty());
    }

    #[rstest]
    fn unknown_revisions_are_reported(repository_dir: TempDir) {
        let repository = open(&repository_dir);

        assert!(matches!(
            repository.resolve_revision("no-such-branch"),
            Err(StatusError::UnknownRevision { .. })
        ));
    }
}
