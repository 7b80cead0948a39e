//! Git blob object
//!
//! Blobs store file content. They carry no name or permissions; those live
//! in trees and index entries.
//!
//! ## Format
//!
//! On disk: `blob <size>\0<content>`

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use bytes::Bytes;
use derive_new::new;
use sha1::{Digest, Sha1};
use std::io::{BufRead, Read, Write};

/// Git blob object holding raw file bytes
#[derive(Debug, Clone, new)]
pub struct Blob {
    content: Bytes,
}

impl Blob {
    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Hash `len` bytes pulled from `reader` as a blob without buffering them.
    ///
    /// Fails if the reader yields a different number of bytes than announced,
    /// since the header would then describe the wrong content.
    pub fn hash_stream(len: u64, reader: impl Read) -> anyhow::Result<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(format!("{} {}\0", ObjectType::Blob.as_str(), len).as_bytes());

        let copied = std::io::copy(&mut reader.take(len + 1), &mut hasher)?;
        if copied != len {
            anyhow::bail!("content length changed while hashing: expected {len}, read {copied}");
        }

        Ok(ObjectId::from_digest(hasher))
    }
}

impl Packable for Blob {
    fn serialize(&self) -> anyhow::Result<Bytes> {
        let mut blob_bytes = Vec::with_capacity(self.content.len() + 16);
        let header = format!("{} {}\0", self.object_type().as_str(), self.content.len());
        blob_bytes.write_all(header.as_bytes())?;
        blob_bytes.write_all(&self.content)?;

        Ok(Bytes::from(blob_bytes))
    }
}

impl Unpackable for Blob {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        // the header has already been read
        let mut content = Vec::new();
        reader.read_to_end(&mut content)?;

        Ok(Self::new(Bytes::from(content)))
    }
}

impl Object for Blob {
    fn object_type(&self) -> ObjectType {
        ObjectType::Blob
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn blob_id_matches_git_hash_object() {
        // `printf 'hi' | git hash-object --stdin`
        let blob = Blob::new(Bytes::from_static(b"hi"));

        assert_eq!(
            blob.object_id().unwrap().as_ref(),
            "32f95c0d1244a78b2be1bab8de17906fabb2c4a8"
        );
    }

    #[test]
    fn streamed_hash_equals_buffered_hash() {
        let content = b"line one\nline two\n".to_vec();
        let blob = Blob::new(Bytes::from(content.clone()));

        let streamed = Blob::hash_stream(content.len() as u64, content.as_slice()).unwrap();

        assert_eq!(streamed, blob.object_id().unwrap());
    }

    #[test]
    fn streamed_hash_rejects_length_mismatch() {
        let content = b"short".to_vec();

        assert!(Blob::hash_stream(10, content.as_slice()).is_err());
        assert!(Blob::hash_stream(2, content.as_slice()).is_err());
    }

    #[test]
    fn empty_blob_has_well_known_id() {
        let blob = Blob::new(Bytes::new());

        assert_eq!(
            blob.object_id().unwrap().as_ref(),
            "e69de29bb2d1d6434b8b29ae775ad8c2e48c5391"
        );
    }
}
