//! Loose object database, read-only
//!
//! Objects live zlib-compressed under `.git/objects/<2 chars>/<38 chars>`.
//! The status engine only ever reads them: trees to know what the base
//! revision contains, commits to find those trees, and blobs to compare
//! line-ending-normalized content.

use crate::artifacts::database::database_entry::DatabaseEntry;
use crate::artifacts::objects::blob::Blob;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object::Unpackable;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use crate::artifacts::objects::tree::Tree;
use anyhow::Context;
use bytes::Bytes;
use std::collections::BTreeMap;
use std::io::{BufRead, Cursor, Read};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct Database {
    path: Box<Path>,
}

// TODO: read packfiles so repositories after `git gc` resolve their objects
impl Database {
    pub fn new(path: Box<Path>) -> Self {
        Database { path }
    }

    pub fn objects_path(&self) -> &Path {
        &self.path
    }

    pub fn has_object(&self, object_id: &ObjectId) -> bool {
        self.path.join(object_id.to_path()).is_file()
    }

    /// Raw decompressed object, header included
    pub fn load(&self, object_id: &ObjectId) -> anyhow::Result<Bytes> {
        let object_path = self.path.join(object_id.to_path());

        self.read_object(object_path)
    }

    /// Content of a blob, or an error if the object is something else
    pub fn read_blob(&self, object_id: &ObjectId) -> anyhow::Result<Blob> {
        self.parse_object_as_blob(object_id)?
            .with_context(|| format!("Object {object_id} is not a blob"))
    }

    pub fn parse_object_as_blob(&self, object_id: &ObjectId) -> anyhow::Result<Option<Blob>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Blob => Ok(Some(Blob::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_tree(&self, object_id: &ObjectId) -> anyhow::Result<Option<Tree>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Tree => Ok(Some(Tree::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    pub fn parse_object_as_commit(&self, object_id: &ObjectId) -> anyhow::Result<Option<Commit>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;

        match object_type {
            ObjectType::Commit => Ok(Some(Commit::deserialize(object_reader)?)),
            _ => Ok(None),
        }
    }

    /// Object an annotated tag points at
    pub fn read_tag_target(&self, object_id: &ObjectId) -> anyhow::Result<Option<ObjectId>> {
        let (object_type, object_reader) = self.parse_object_as_bytes(object_id)?;
        if object_type != ObjectType::Tag {
            return Ok(None);
        }

        for line in object_reader.lines() {
            let line = line?;
            if line.is_empty() {
                break;
            }
            if let Some(target) = line.strip_prefix("object ") {
                return Ok(Some(ObjectId::try_parse(target.to_string())?));
            }
        }

        anyhow::bail!("Tag {object_id} has no target")
    }

    /// Every entry reachable from the root tree of `commit_oid`, keyed by its
    /// repository-relative path. Subtrees appear as directory entries next to
    /// their contents.
    pub fn load_commit_tree(
        &self,
        commit_oid: &ObjectId,
    ) -> anyhow::Result<BTreeMap<PathBuf, DatabaseEntry>> {
        let commit = self
            .parse_object_as_commit(commit_oid)?
            .with_context(|| format!("Object {commit_oid} is not a commit"))?;

        let mut entries = BTreeMap::new();
        self.flatten_tree(commit.tree_oid(), Path::new(""), &mut entries)?;
        Ok(entries)
    }

    fn flatten_tree(
        &self,
        tree_oid: &ObjectId,
        prefix: &Path,
        entries: &mut BTreeMap<PathBuf, DatabaseEntry>,
    ) -> anyhow::Result<()> {
        let tree = self
            .parse_object_as_tree(tree_oid)?
            .with_context(|| format!("Object {tree_oid} is not a tree"))?;

        for (name, entry) in tree.into_entries() {
            let path = prefix.join(name);
            if entry.is_tree() {
                self.flatten_tree(&entry.oid, &path, entries)?;
            }
            entries.insert(path, entry);
        }

        Ok(())
    }

    fn parse_object_as_bytes(
        &self,
        object_id: &ObjectId,
    ) -> anyhow::Result<(ObjectType, impl BufRead)> {
        let object_content = self.load(object_id)?;
        let mut object_reader = Cursor::new(object_content);

        let (object_type, _) = ObjectType::parse_header(&mut object_reader)
            .with_context(|| format!("Corrupt object {object_id}"))?;

        Ok((object_type, object_reader))
    }

    fn read_object(&self, object_path: PathBuf) -> anyhow::Result<Bytes> {
        let object_content = std::fs::read(&object_path).context(format!(
            "Unable to read object file {}",
            object_path.display()
        ))?;

        Self::decompress(object_content.into())
    }

    fn decompress(data: Bytes) -> anyhow::Result<Bytes> {
        let mut decoder = flate2::read::ZlibDecoder::new(&*data);
        let mut decompressed_content = Vec::new();
        decoder
            .read_to_end(&mut decompressed_content)
            .context("Unable to decompress object content")?;

        Ok(decompressed_content.into())
    }

    /// Find all objects whose OID starts with the given prefix.
    ///
    /// More than one match means the prefix is ambiguous; the caller decides
    /// what to do about it.
    pub fn find_objects_by_prefix(&self, prefix: &str) -> anyhow::Result<Vec<ObjectId>> {
        let prefix = prefix.to_ascii_lowercase();
        let mut matches = Vec::new();

        let dir_names = if prefix.len() >= 2 {
            vec![prefix[..2].to_string()]
        } else {
            (0..=255u8).map(|i| format!("{i:02x}")).collect()
        };

        for dir_name in dir_names {
            let dir_path = self.path.join(&dir_name);
            if !dir_path.is_dir() {
                continue;
            }

            for entry in std::fs::read_dir(&dir_path)? {
                let entry = entry?;
                let full_oid = format!("{}{}", dir_name, entry.file_name().to_string_lossy());

                if full_oid.starts_with(&prefix) {
                    if let Ok(oid) = ObjectId::try_parse(full_oid) {
                        matches.push(oid);
                    }
                }
            }
        }

        matches.sort();
        Ok(matches)
    }

    pub fn get_object_type(&self, object_id: &ObjectId) -> anyhow::Result<ObjectType> {
        let (object_type, _) = self.parse_object_as_bytes(object_id)?;
        Ok(object_type)
    }
}
