use crate::areas::database::Database;
use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use colored::Colorize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// How one path differs between two trees
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileDifference {
    Added(DatabaseEntry),
    Deleted(DatabaseEntry),
    Modified {
        old: DatabaseEntry,
        new: DatabaseEntry,
    },
}

impl FileDifference {
    pub fn from_entries(old: Option<DatabaseEntry>, new: Option<DatabaseEntry>) -> Option<Self> {
        match (old, new) {
            (None, Some(new)) => Some(FileDifference::Added(new)),
            (Some(old), None) => Some(FileDifference::Deleted(old)),
            (Some(old), Some(new)) if old != new => Some(FileDifference::Modified { old, new }),
            _ => None,
        }
    }

    pub fn old_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            FileDifference::Deleted(entry) => Some(entry),
            FileDifference::Modified { old, .. } => Some(old),
            FileDifference::Added(_) => None,
        }
    }

    pub fn new_entry(&self) -> Option<&DatabaseEntry> {
        match self {
            FileDifference::Added(entry) => Some(entry),
            FileDifference::Modified { new, .. } => Some(new),
            FileDifference::Deleted(_) => None,
        }
    }

    pub fn status_char(&self) -> char {
        match self {
            FileDifference::Added(_) => 'A',
            FileDifference::Deleted(_) => 'D',
            FileDifference::Modified { .. } => 'M',
        }
    }
}

impl std::fmt::Display for FileDifference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.status_char().to_string();
        let code = match self {
            FileDifference::Added(_) => code.green(),
            FileDifference::Deleted(_) => code.red(),
            FileDifference::Modified { .. } => code.yellow(),
        };
        write!(f, "{code}")
    }
}

pub type ChangeSet = BTreeMap<PathBuf, FileDifference>;
type TreeEntryMap = BTreeMap<String, DatabaseEntry>;

/// Walks two trees side by side, descending only into subtrees whose ids
/// differ
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    change_set: ChangeSet,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            change_set: BTreeMap::new(),
        }
    }

    pub fn changes(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_changes(self) -> ChangeSet {
        self.change_set
    }

    /// Compare two trees (or the trees of two commits); None stands for an
    /// empty tree
    pub fn compare_oids(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        prefix: &Path,
    ) -> anyhow::Result<()> {
        if old == new {
            return Ok(());
        }

        let old_entries = self.inflate_tree_entries(old)?;
        let new_entries = self.inflate_tree_entries(new)?;

        self.detect_deletions(&old_entries, &new_entries, prefix)?;
        self.detect_additions(&old_entries, &new_entries, prefix)?;

        Ok(())
    }

    fn inflate_tree_entries(&self, oid: Option<&ObjectId>) -> anyhow::Result<TreeEntryMap> {
        let Some(oid) = oid else {
            return Ok(BTreeMap::new());
        };

        let tree_oid = match self.database.get_object_type(oid)? {
            ObjectType::Tree => oid.clone(),
            ObjectType::Commit => self
                .database
                .parse_object_as_commit(oid)?
                .ok_or_else(|| anyhow::anyhow!("Invalid commit object {oid}"))?
                .tree_oid()
                .clone(),
            other => anyhow::bail!("Object {oid} is a {}, not a tree", other.as_str()),
        };

        Ok(self
            .database
            .parse_object_as_tree(&tree_oid)?
            .ok_or_else(|| anyhow::anyhow!("Invalid tree object {tree_oid}"))?
            .into_entries()
            .collect())
    }

    fn detect_deletions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
    ) -> anyhow::Result<()> {
        for (name, entry) in old {
            let path = prefix.join(name);
            let other = new.get(name);

            if other == Some(entry) {
                continue;
            }

            let old_tree = entry.is_tree().then_some(&entry.oid);
            let new_tree = other.filter(|other| other.is_tree()).map(|other| &other.oid);
            self.compare_oids(old_tree, new_tree, &path)?;

            let old_blob = (!entry.is_tree()).then(|| entry.clone());
            let new_blob = other.filter(|other| !other.is_tree()).cloned();

            if let Some(difference) = FileDifference::from_entries(old_blob, new_blob) {
                self.change_set.insert(path, difference);
            }
        }

        Ok(())
    }

    fn detect_additions(
        &mut self,
        old: &TreeEntryMap,
        new: &TreeEntryMap,
        prefix: &Path,
    ) -> anyhow::Result<()> {
        for (name, entry) in new {
            if old.contains_key(name) {
                continue;
            }

            let path = prefix.join(name);
            if entry.is_tree() {
                self.compare_oids(None, Some(&entry.oid), &path)?;
            } else {
                self.change_set
                    .insert(path, FileDifference::Added(entry.clone()));
            }
        }

        Ok(())
    }
}
