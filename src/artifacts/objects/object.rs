use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Result;
use bytes::Bytes;
use sha1::{Digest, Sha1};
use std::io::BufRead;

/// Produces the loose-object form `<type> <size>\0<content>`
pub trait Packable {
    fn serialize(&self) -> Result<Bytes>;
}

/// Parses an object's content, the header already stripped
pub trait Unpackable {
    fn deserialize(reader: impl BufRead) -> Result<Self>
    where
        Self: Sized;
}

pub trait Object: Packable {
    fn object_type(&self) -> ObjectType;

    /// Id the object has, or would have, in the database
    fn object_id(&self) -> Result<ObjectId> {
        let mut hasher = Sha1::new();
        hasher.update(self.serialize()?);

        Ok(ObjectId::from_digest(hasher))
    }
}
