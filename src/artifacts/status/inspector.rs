use crate::areas::index::Index;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::index::index_entry::{EntryFlags, IndexEntry, Stage};
use crate::artifacts::status::file_change::{Classification, ConflictDescriptor};
use crate::artifacts::status::identity::{ContentIdentity, IdentityComputer, WorkingEntry};
use derive_new::new;
use std::path::Path;

/// A working entry together with its identity, hashed at most once
#[derive(Debug)]
pub struct WorkingSide<'e> {
    path: &'e Path,
    entry: &'e WorkingEntry,
    identity: Option<ContentIdentity>,
}

impl<'e> WorkingSide<'e> {
    pub fn new(path: &'e Path, entry: &'e WorkingEntry) -> Self {
        WorkingSide {
            path,
            entry,
            identity: None,
        }
    }

    pub fn entry(&self) -> &WorkingEntry {
        self.entry
    }

    pub fn is_present(&self) -> bool {
        self.entry.is_leaf()
    }

    pub fn identity(
        &mut self,
        computer: &IdentityComputer<'_>,
        staged: Option<&IndexEntry>,
    ) -> anyhow::Result<&ContentIdentity> {
        if self.identity.is_none() {
            let staged = staged.map(|entry| &entry.oid);
            self.identity = Some(computer.identity_of(self.path, self.entry, staged)?);
        }

        self.identity
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("identity of {:?} was not computed", self.path))
    }
}

/// Pairwise comparisons between the base tree, the index and the working tree
#[derive(new)]
pub struct Inspector<'r> {
    index: &'r Index,
    identity: &'r IdentityComputer<'r>,
}

impl<'r> Inspector<'r> {
    /// Index entries recorded for a merge in progress describe a conflict
    pub fn conflict_of(&self, stages: &[IndexEntry]) -> Option<ConflictDescriptor> {
        if !stages.iter().any(IndexEntry::is_conflicted) {
            return None;
        }

        let has = |stage: Stage| stages.iter().any(|entry| entry.stage == stage);
        ConflictDescriptor::from_stages(has(Stage::Base), has(Stage::Ours), has(Stage::Theirs))
    }

    /// Intent-to-add entries hold a placeholder, not staged content
    pub fn staged<'i>(&self, index_entry: Option<&'i IndexEntry>) -> Option<&'i IndexEntry> {
        index_entry.filter(|entry| !entry.flags.contains(EntryFlags::INTENT_TO_ADD))
    }

    pub fn check_index_against_head_tree(
        &self,
        index_entry: Option<&IndexEntry>,
        head_entry: Option<&DatabaseEntry>,
    ) -> Classification {
        let index_entry = self.staged(index_entry);

        Classification::from_presence(head_entry.is_some(), index_entry.is_some(), || {
            match (head_entry, index_entry) {
                (Some(head), Some(index)) => {
                    head.oid == index.oid && head.mode == index.metadata.mode
                }
                _ => false,
            }
        })
    }

    /// Index against working tree for a path present in the index
    pub fn check_index_against_workspace(
        &self,
        index_entry: &IndexEntry,
        working: &mut WorkingSide<'_>,
    ) -> anyhow::Result<Classification> {
        if !working.is_present() {
            return Ok(Classification::Removed);
        }
        if index_entry.flags.contains(EntryFlags::INTENT_TO_ADD) {
            return Ok(Classification::Added);
        }
        if index_entry.flags.assumes_unchanged() {
            return Ok(Classification::Normal);
        }

        let mode = self
            .identity
            .effective_mode(working.entry(), Some(index_entry.metadata.mode));
        if mode != Some(index_entry.metadata.mode) {
            return Ok(Classification::Modified);
        }

        if let Some(stat) = working.entry().stat() {
            if index_entry.stat_match(stat)
                && index_entry.times_match(stat)
                && !self.index.is_racily_clean(index_entry)
            {
                return Ok(Classification::Normal);
            }
        }

        let identity = working.identity(self.identity, Some(index_entry))?;
        if identity.oid == index_entry.oid {
            Ok(Classification::Normal)
        } else {
            Ok(Classification::Modified)
        }
    }

    /// Base tree against working tree, ignoring the index altogether
    pub fn check_head_tree_against_workspace(
        &self,
        head_entry: Option<&DatabaseEntry>,
        index_entry: Option<&IndexEntry>,
        working: &mut WorkingSide<'_>,
    ) -> anyhow::Result<Classification> {
        let Some(head_entry) = head_entry else {
            return Ok(Classification::from_presence(false, working.is_present(), || true));
        };
        if !working.is_present() {
            return Ok(Classification::Removed);
        }

        let mode = self
            .identity
            .effective_mode(working.entry(), Some(head_entry.mode));
        if mode != Some(head_entry.mode) {
            return Ok(Classification::Modified);
        }

        // a clean index entry equal to the base entry spares hashing the file
        if let Some(index_entry) = self.staged(index_entry) {
            let unchanged_since_staged = index_entry.oid == head_entry.oid
                && index_entry.metadata.mode == head_entry.mode
                && working.entry().stat().is_some_and(|stat| {
                    index_entry.stat_match(stat)
                        && index_entry.times_match(stat)
                        && !self.index.is_racily_clean(index_entry)
                });
            if unchanged_since_staged {
                return Ok(Classification::Normal);
            }
        }

        let identity = working.identity(self.identity, self.staged(index_entry))?;
        if identity.oid == head_entry.oid {
            Ok(Classification::Normal)
        } else {
            Ok(Classification::Modified)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::config::RepositoryConfig;
    use crate::areas::database::Database;
    use crate::areas::workspace::Workspace;
    use crate::artifacts::index::entry_mode::{EntryMode, FileMode};
    use crate::artifacts::index::index_entry::EntryMetadata;
    use crate::artifacts::objects::object_id::ObjectId;
    use assert_fs::TempDir;
    use assert_fs::prelude::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    const HELLO: &str = "ce013625030ba8dba906f756967f9e9ca394464a";
    const OTHER: &str = "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391";

    fn oid(hex: &str) -> ObjectId {
        ObjectId::try_parse(hex.to_string()).unwrap()
    }

    fn index_entry(hex: &str, stage: Stage) -> IndexEntry {
        let metadata = EntryMetadata {
            mode: EntryMode::File(FileMode::Regular),
            size: 6,
            ..Default::default()
        };
        let mut entry = IndexEntry::new("hello".into(), oid(hex), metadata);
        entry.stage = stage;
        entry
    }

    fn head_entry(hex: &str) -> DatabaseEntry {
        DatabaseEntry::new(oid(hex), EntryMode::File(FileMode::Regular))
    }

    struct Scene {
        _dir: TempDir,
        index: Index,
        workspace: Workspace,
        database: Database,
        config: RepositoryConfig,
    }

    fn scene() -> Scene {
        let dir = TempDir::new().unwrap();
        dir.child("hello").write_str("hello\n").unwrap();
        Scene {
            index: Index::new(dir.path().join("index").into()),
            workspace: Workspace::new(dir.path().into()),
            database: Database::new(dir.path().join("objects").into()),
            config: RepositoryConfig::default(),
            _dir: dir,
        }
    }

    #[rstest]
    #[case(None, None, Classification::Normal)]
    #[case(Some(HELLO), None, Classification::Removed)]
    #[case(None, Some(HELLO), Classification::Added)]
    #[case(Some(HELLO), Some(HELLO), Classification::Normal)]
    #[case(Some(HELLO), Some(OTHER), Classification::Modified)]
    fn compares_index_with_head(
        #[case] head: Option<&str>,
        #[case] staged: Option<&str>,
        #[case] expected: Classification,
    ) {
        let scene = scene();
        let computer = IdentityComputer::new(&scene.workspace, &scene.database, &scene.config);
        let inspector = Inspector::new(&scene.index, &computer);

        let head = head.map(head_entry);
        let staged = staged.map(|hex| index_entry(hex, Stage::Merged));

        assert_eq!(
            inspector.check_index_against_head_tree(staged.as_ref(), head.as_ref()),
            expected
        );
    }

    #[test]
    fn intent_to_add_is_not_staged() {
        let scene = scene();
        let computer = IdentityComputer::new(&scene.workspace, &scene.database, &scene.config);
        let inspector = Inspector::new(&scene.index, &computer);
        let mut entry = index_entry(OTHER, Stage::Merged);
        entry.flags = EntryFlags::EXTENDED | EntryFlags::INTENT_TO_ADD;

        let path = Path::new("hello");
        let working = computer.classify(path).unwrap();
        let mut side = WorkingSide::new(path, &working);

        assert_eq!(
            inspector.check_index_against_head_tree(Some(&entry), None),
            Classification::Normal
        );
        assert_eq!(
            inspector
                .check_index_against_workspace(&entry, &mut side)
                .unwrap(),
            Classification::Added
        );
    }

    #[rstest]
    #[case(HELLO, Classification::Normal)]
    #[case(OTHER, Classification::Modified)]
    fn hashes_when_stat_data_differs(#[case] staged: &str, #[case] expected: Classification) {
        let scene = scene();
        let computer = IdentityComputer::new(&scene.workspace, &scene.database, &scene.config);
        let inspector = Inspector::new(&scene.index, &computer);
        let entry = index_entry(staged, Stage::Merged);

        let path = Path::new("hello");
        let working = computer.classify(path).unwrap();
        let mut side = WorkingSide::new(path, &working);

        assert_eq!(
            inspector
                .check_index_against_workspace(&entry, &mut side)
                .unwrap(),
            expected
        );
        assert_eq!(
            inspector
                .check_head_tree_against_workspace(Some(&head_entry(HELLO)), None, &mut side)
                .unwrap(),
            Classification::Normal
        );
    }

    #[test]
    fn missing_working_entry_is_removed() {
        let scene = scene();
        let computer = IdentityComputer::new(&scene.workspace, &scene.database, &scene.config);
        let inspector = Inspector::new(&scene.index, &computer);

        let path = Path::new("gone");
        let working = WorkingEntry::Missing;
        let mut side = WorkingSide::new(path, &working);

        assert_eq!(
            inspector
                .check_index_against_workspace(&index_entry(HELLO, Stage::Merged), &mut side)
                .unwrap(),
            Classification::Removed
        );
        assert_eq!(
            inspector
                .check_head_tree_against_workspace(None, None, &mut side)
                .unwrap(),
            Classification::Normal
        );
    }

    #[rstest]
    #[case(&[Stage::Base, Stage::Ours, Stage::Theirs], Some(ConflictDescriptor::BothModified))]
    #[case(&[Stage::Ours, Stage::Theirs], Some(ConflictDescriptor::BothAdded))]
    #[case(&[Stage::Base], Some(ConflictDescriptor::BothDeleted))]
    #[case(&[Stage::Merged], None)]
    fn describes_conflicts(#[case] stages: &[Stage], #[case] expected: Option<ConflictDescriptor>) {
        let scene = scene();
        let computer = IdentityComputer::new(&scene.workspace, &scene.database, &scene.config);
        let inspector = Inspector::new(&scene.index, &computer);
        let entries = stages
            .iter()
            .map(|stage| index_entry(HELLO, *stage))
            .collect::<Vec<_>>();

        assert_eq!(inspector.conflict_of(&entries), expected);
    }
}
