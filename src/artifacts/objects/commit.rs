//! Git commit object
//!
//! Only the headers the status engine needs are kept: the root tree and the
//! parent commits (for `^` and `~n` revision suffixes).
//!
//! ## Format
//!
//! ```text
//! commit <size>\0
//! tree <tree-sha>
//! parent <parent-sha>
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::io::BufRead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    tree_oid: ObjectId,
    parents: Vec<ObjectId>,
}

impl Commit {
    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }
}

impl Unpackable for Commit {
    fn deserialize(reader: impl BufRead) -> anyhow::Result<Self> {
        let mut tree_oid = None;
        let mut parents = Vec::new();

        for line in reader.lines() {
            let line = line?;
            // headers end at the first blank line
            if line.is_empty() {
                break;
            }

            if let Some(oid) = line.strip_prefix("tree ") {
                tree_oid = Some(ObjectId::try_parse(oid.trim().to_string())?);
            } else if let Some(oid) = line.strip_prefix("parent ") {
                parents.push(ObjectId::try_parse(oid.trim().to_string())?);
            }
        }

        Ok(Commit {
            tree_oid: tree_oid.context("commit object has no tree header")?,
            parents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_tree_and_parents() {
        let content = "tree 4b825dc642cb6eb9a060e54bf8d69288fbee4904\n\
            parent 32f95c0d1244a78b2be1bab8de17906fabb2c4a8\n\
            parent e69de29bb2d1d6434b8b29ae775ad8c2e48c5391\n\
            author A <a@b.c> 1672574400 +0000\n\
            committer A <a@b.c> 1672574400 +0000\n\
            \n\
            tree 0000000000000000000000000000000000000000 in message\n";

        let commit = Commit::deserialize(content.as_bytes()).unwrap();

        assert_eq!(
            commit.tree_oid().as_ref(),
            "4b825dc642cb6eb9a060e54bf8d69288fbee4904"
        );
        assert_eq!(commit.parents().len(), 2);
        assert_eq!(
            commit.parent().map(|oid| oid.to_string()),
            Some("32f95c0d1244a78b2be1bab8de17906fabb2c4a8".to_string())
        );
    }

    #[test]
    fn commit_without_tree_is_rejected() {
        let content = "author A <a@b.c> 1672574400 +0000\n\nmessage\n";

        assert!(Commit::deserialize(content.as_bytes()).is_err());
    }
}
