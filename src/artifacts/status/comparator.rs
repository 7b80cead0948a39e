//! Lock-step walk over the base tree, the index and the working tree
//!
//! Every directory level visits the sorted union of the names found on disk,
//! in the index and in the base tree, so that paths present in only one of
//! the three snapshots are still reported. Records go to the notifier as
//! soon as a path is classified.

use crate::areas::config::RepositoryConfig;
use crate::areas::database::Database;
use crate::areas::index::Index;
use crate::areas::workspace::Workspace;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::ignore::resolver::IgnoreResolver;
use crate::artifacts::index::entry_mode::EntryMode;
use crate::artifacts::index::index_entry::{EntryFlags, Stage};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::status::StatusOptions;
use crate::artifacts::status::file_change::Classification;
use crate::artifacts::status::identity::{IdentityComputer, WorkingEntry};
use crate::artifacts::status::inspector::{Inspector, WorkingSide};
use crate::artifacts::status::notifier::{StatusNotifier, StatusReport};
use crate::artifacts::status::status_record::StatusRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub type BaseTree = BTreeMap<PathBuf, DatabaseEntry>;

/// Index entries an untracked file may have been renamed or copied from
#[derive(Debug, Default)]
struct RenameSources {
    by_oid: HashMap<ObjectId, Vec<RenameSource>>,
    sizes: HashSet<u64>,
    consumed: HashSet<PathBuf>,
}

#[derive(Debug)]
struct RenameSource {
    path: PathBuf,
    /// Gone from the working tree, so a match is a rename rather than a copy
    missing: bool,
}

impl RenameSources {
    fn might_match(&self, size: u64) -> bool {
        self.sizes.contains(&size)
    }

    /// Source for `oid`; a missing path is claimed by at most one rename
    fn take(&mut self, oid: &ObjectId) -> Option<(PathBuf, bool)> {
        let sources = self.by_oid.get(oid)?;

        if let Some(source) = sources
            .iter()
            .find(|source| source.missing && !self.consumed.contains(&source.path))
        {
            self.consumed.insert(source.path.clone());
            return Some((source.path.clone(), true));
        }

        sources
            .iter()
            .find(|source| !source.missing)
            .map(|source| (source.path.clone(), false))
    }
}

pub struct TreeComparator<'r, 'l> {
    workspace: &'r Workspace,
    index: &'r Index,
    base_tree: &'r BaseTree,
    base_children: BTreeMap<PathBuf, BTreeSet<OsString>>,
    identity: IdentityComputer<'r>,
    resolver: IgnoreResolver,
    notifier: StatusNotifier<'l>,
    options: StatusOptions,
    renames: RenameSources,
}

impl<'r, 'l> TreeComparator<'r, 'l> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        workspace: &'r Workspace,
        database: &'r Database,
        index: &'r Index,
        config: &'r RepositoryConfig,
        base_tree: &'r BaseTree,
        resolver: IgnoreResolver,
        notifier: StatusNotifier<'l>,
        options: StatusOptions,
    ) -> Self {
        TreeComparator {
            workspace,
            index,
            base_tree,
            base_children: children_of(base_tree),
            identity: IdentityComputer::new(workspace, database, config),
            resolver,
            notifier,
            options,
            renames: RenameSources::default(),
        }
    }

    /// Classify everything below `roots`; no roots means the whole tree
    #[tracing::instrument(level = "debug", skip_all, fields(roots = roots.len()))]
    pub fn run(mut self, roots: &[PathBuf]) -> anyhow::Result<StatusReport> {
        let roots = if roots.is_empty() {
            vec![PathBuf::new()]
        } else {
            roots.to_vec()
        };

        if self.options.detect_renames {
            self.collect_rename_sources(&roots);
        }

        for root in &roots {
            if self.notifier.should_stop() {
                break;
            }
            self.visit_root(root)?;
        }

        Ok(self.notifier.finish())
    }

    fn collect_rename_sources(&mut self, roots: &[PathBuf]) {
        let index = self.index;
        let in_scope = roots
            .iter()
            .flat_map(|root| index.paths_under(root))
            .collect::<BTreeSet<_>>();

        for path in in_scope {
            let Some(entry) = index.entry_by_path(path) else {
                continue;
            };
            let candidate = entry.stage == Stage::Merged
                && entry.metadata.size > 0
                && matches!(entry.metadata.mode, EntryMode::File(_))
                && !entry.flags.contains(EntryFlags::INTENT_TO_ADD);
            if !candidate {
                continue;
            }

            let missing = !self
                .identity
                .classify(path)
                .is_ok_and(|working| working.is_leaf());

            self.renames.sizes.insert(entry.metadata.size);
            self.renames
                .by_oid
                .entry(entry.oid.clone())
                .or_default()
                .push(RenameSource {
                    path: path.to_path_buf(),
                    missing,
                });
        }
    }

    fn visit_root(&mut self, root: &Path) -> anyhow::Result<()> {
        if let Some(nested) = self.enclosing_nested_repository(root) {
            tracing::debug!(?root, ?nested, "root collapsed to nested repository");
            return self.compare_file(&nested, Ok(WorkingEntry::NestedRepository));
        }
        if root.as_os_str().is_empty() {
            return self.walk_dir(root, true, 0);
        }

        match self.identity.classify(root) {
            Ok(WorkingEntry::Directory) => self.visit_directory(root, 0),
            Ok(WorkingEntry::Missing) if self.is_tracked_directory(root) => {
                self.walk_dir(root, false, 0)
            }
            entry => self.compare_file(root, entry),
        }
    }

    fn enclosing_nested_repository(&self, path: &Path) -> Option<PathBuf> {
        let mut ancestors = path
            .ancestors()
            .filter(|dir| !dir.as_os_str().is_empty())
            .collect::<Vec<_>>();
        ancestors.reverse();

        ancestors
            .into_iter()
            .find(|dir| self.workspace.is_nested_repository(dir))
            .map(Path::to_path_buf)
    }

    fn visit_directory(&mut self, dir: &Path, depth: usize) -> anyhow::Result<()> {
        let below_limit = depth > 0 && !self.options.recursive;

        if !self.is_tracked_directory(dir) {
            if self.resolver.is_ignored(dir, true).ignored {
                self.notify_folder(dir, Classification::Ignored, false);
                return Ok(());
            }
            if below_limit {
                self.notify_folder(dir, Classification::Added, false);
                return Ok(());
            }
        } else if below_limit {
            // contents are not compared at this depth
            self.notify_folder(dir, Classification::Normal, true);
            return Ok(());
        }

        self.walk_dir(dir, true, depth)
    }

    fn walk_dir(&mut self, dir: &Path, on_disk: bool, depth: usize) -> anyhow::Result<()> {
        let mut names = BTreeSet::new();

        if on_disk {
            match self.workspace.list_dir(dir) {
                Ok(paths) => names.extend(
                    paths
                        .iter()
                        .filter_map(|path| path.file_name())
                        .map(|name| name.to_os_string()),
                ),
                Err(err) => tracing::warn!(?dir, "unable to list directory: {err:#}"),
            }
        }
        names.extend(self.index.child_names(dir));
        if let Some(children) = self.base_children.get(dir) {
            names.extend(children.iter().cloned());
        }

        for name in names {
            if self.notifier.should_stop() {
                return Ok(());
            }
            self.visit_child(&dir.join(name), depth + 1)?;
        }

        Ok(())
    }

    fn visit_child(&mut self, path: &Path, depth: usize) -> anyhow::Result<()> {
        let tracked_file = self.is_tracked_file(path);

        match self.identity.classify(path) {
            Ok(WorkingEntry::Directory) => {
                // a tracked file replaced by a directory
                if tracked_file {
                    self.compare_file(path, Ok(WorkingEntry::Missing))?;
                }
                self.visit_directory(path, depth)
            }
            Ok(WorkingEntry::NestedRepository) => {
                // opaque even where the outer index still tracks content below
                self.compare_file(path, Ok(WorkingEntry::NestedRepository))
            }
            Ok(entry) => {
                let tracked_dir = self.is_tracked_directory(path);

                if entry.is_present() || tracked_file {
                    self.compare_file(path, Ok(entry))?;
                }
                // tracked content below a path that is now a file, or gone
                if tracked_dir && self.options.recursive {
                    self.walk_dir(path, false, depth)?;
                }
                Ok(())
            }
            Err(err) => self.compare_file(path, Err(err)),
        }
    }

    fn compare_file(
        &mut self,
        path: &Path,
        entry: anyhow::Result<WorkingEntry>,
    ) -> anyhow::Result<()> {
        let record = match entry.and_then(|entry| self.classify_path(path, &entry)) {
            Ok(record) => record,
            Err(err) => {
                tracing::warn!(?path, "unreadable working entry: {err:#}");
                let mut record = self.classify_path(path, &WorkingEntry::Missing)?;
                record.error = Some(format!("{err:#}"));
                record
            }
        };

        self.notifier.notify(record);
        Ok(())
    }

    fn classify_path(&mut self, path: &Path, entry: &WorkingEntry) -> anyhow::Result<StatusRecord> {
        let index = self.index;
        let stages = index.entries_for(path);
        let index_entry = index.entry_by_path(path);
        let head_entry = self.base_tree.get(path).filter(|entry| !entry.is_tree());

        let mut record = StatusRecord::new(path.to_path_buf());
        record.tracked = !stages.is_empty() || head_entry.is_some();
        record.is_folder = matches!(entry, WorkingEntry::NestedRepository) && !record.tracked;
        record.index_entry_modification_timestamp =
            index_entry.map_or(-1, |entry| entry.mtime_millis());

        let inspector = Inspector::new(index, &self.identity);
        let mut working = WorkingSide::new(path, entry);

        if let Some(descriptor) = inspector.conflict_of(stages) {
            record.conflict = true;
            record.conflict_descriptor = Some(descriptor);
        }

        record.head_vs_index = inspector.check_index_against_head_tree(index_entry, head_entry);
        record.index_vs_working = match index_entry {
            Some(index_entry) => inspector.check_index_against_workspace(index_entry, &mut working)?,
            None => Classification::from_presence(false, working.is_present(), || true),
        };
        record.head_vs_working =
            inspector.check_head_tree_against_workspace(head_entry, index_entry, &mut working)?;

        if record.tracked || !working.is_present() {
            return Ok(record);
        }

        let is_dir = matches!(entry, WorkingEntry::NestedRepository);
        if self.resolver.is_ignored(path, is_dir).ignored {
            record.index_vs_working = Classification::Ignored;
            record.head_vs_working = Classification::Ignored;
            return Ok(record);
        }

        if let WorkingEntry::File(stat) = entry {
            if self.options.detect_renames && stat.size > 0 && self.renames.might_match(stat.size) {
                let identity = working.identity(&self.identity, None)?;
                if let Some((source, renamed)) = self.renames.take(&identity.oid) {
                    tracing::debug!(?path, ?source, renamed, "similar to an index entry");
                    record.renamed = renamed;
                    record.copied = !renamed;
                    record.original_path = Some(source);
                }
            }
        }

        Ok(record)
    }

    fn notify_folder(&mut self, dir: &Path, classification: Classification, tracked: bool) {
        let mut record = StatusRecord::new(dir.to_path_buf());
        record.is_folder = true;
        record.tracked = tracked;
        record.index_vs_working = classification;
        record.head_vs_working = classification;

        self.notifier.notify(record);
    }

    fn is_tracked_file(&self, path: &Path) -> bool {
        self.index.is_tracked_file(path)
            || self
                .base_tree
                .get(path)
                .is_some_and(|entry| !entry.is_tree())
    }

    fn is_tracked_directory(&self, path: &Path) -> bool {
        self.index.is_tracked_directory(path) || self.base_children.contains_key(path)
    }
}

/// Names directly inside every directory of a flattened tree
fn children_of(tree: &BaseTree) -> BTreeMap<PathBuf, BTreeSet<OsString>> {
    let mut children: BTreeMap<PathBuf, BTreeSet<OsString>> = BTreeMap::new();

    for path in tree.keys() {
        if let (Some(parent), Some(name)) = (path.parent(), path.file_name()) {
            children
                .entry(parent.to_path_buf())
                .or_default()
                .insert(name.to_os_string());
        }
    }

    children
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::index::entry_mode::FileMode;
    use pretty_assertions::assert_eq;

    fn oid(byte: char) -> ObjectId {
        ObjectId::try_parse(byte.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn lists_children_of_every_tree_level() {
        let file = DatabaseEntry::new(oid('a'), EntryMode::File(FileMode::Regular));
        let dir = DatabaseEntry::new(oid('b'), EntryMode::Directory);
        let tree = BaseTree::from([
            (PathBuf::from("README"), file.clone()),
            (PathBuf::from("src"), dir),
            (PathBuf::from("src/lib.rs"), file.clone()),
            (PathBuf::from("src/main.rs"), file),
        ]);

        let children = children_of(&tree);

        assert_eq!(
            children[Path::new("")],
            BTreeSet::from([OsString::from("README"), OsString::from("src")])
        );
        assert_eq!(
            children[Path::new("src")],
            BTreeSet::from([OsString::from("lib.rs"), OsString::from("main.rs")])
        );
        assert!(!children.contains_key(Path::new("README")));
    }

    #[test]
    fn missing_sources_are_renamed_once_then_copied() {
        let mut sources = RenameSources::default();
        sources.by_oid.insert(
            oid('c'),
            vec![
                RenameSource {
                    path: "old".into(),
                    missing: true,
                },
                RenameSource {
                    path: "kept".into(),
                    missing: false,
                },
            ],
        );

        assert_eq!(sources.take(&oid('c')), Some(("old".into(), true)));
        assert_eq!(sources.take(&oid('c')), Some(("kept".into(), false)));
        assert_eq!(sources.take(&oid('d')), None);
    }
}
