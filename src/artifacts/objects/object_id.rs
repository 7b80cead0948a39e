//! Git object identifier (SHA-1 hash)
//!
//! Object IDs are 40-character hexadecimal strings representing SHA-1 hashes.
//! They identify blobs, trees and commits, and double as the content identity
//! the status engine compares.
//!
//! ## Storage
//!
//! Loose objects live in `.git/objects/<first-2-chars>/<remaining-38-chars>`

use crate::artifacts::objects::{OBJECT_ID_LENGTH, OBJECT_ID_RAW_LENGTH};
use sha1::{Digest, Sha1};
use std::io;
use std::path::PathBuf;

/// Git object identifier (SHA-1 hash)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse and validate an object ID from a 40-character hexadecimal string
    pub fn try_parse(id: String) -> anyhow::Result<Self> {
        if id.len() != OBJECT_ID_LENGTH {
            return Err(anyhow::anyhow!("Invalid object ID length: {}", id.len()));
        }
        if !id.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow::anyhow!("Invalid object ID characters: {}", id));
        }
        Ok(Self(id.to_ascii_lowercase()))
    }

    /// Build an object ID from a finished SHA-1 digest
    pub fn from_digest(digest: Sha1) -> Self {
        Self(format!("{:x}", digest.finalize()))
    }

    /// The all-zero id git writes for entries without content
    pub fn zero() -> Self {
        Self("0".repeat(OBJECT_ID_LENGTH))
    }

    pub fn is_zero(&self) -> bool {
        self.0.bytes().all(|b| b == b'0')
    }

    /// Write the object ID in binary format (20 bytes)
    pub fn write_h40_to<W: io::Write>(&self, writer: &mut W) -> anyhow::Result<()> {
        let hex40 = self.as_ref();

        for i in (0..OBJECT_ID_LENGTH).step_by(2) {
            let byte = u8::from_str_radix(&hex40[i..i + 2], 16)
                .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "Invalid hex digit"))?;
            writer.write_all(&[byte])?;
        }

        Ok(())
    }

    /// Read an object ID from binary format (20 bytes)
    ///
    /// Used by tree and index entry parsing.
    pub fn read_h40_from<R: io::Read + ?Sized>(reader: &mut R) -> anyhow::Result<Self> {
        let mut raw = [0u8; OBJECT_ID_RAW_LENGTH];
        reader.read_exact(&mut raw)?;

        Ok(Self::from_raw(&raw))
    }

    pub fn from_raw(raw: &[u8; OBJECT_ID_RAW_LENGTH]) -> Self {
        let hex40 = raw.iter().map(|byte| format!("{byte:02x}")).collect();
        Self(hex40)
    }

    /// Convert to file system path for loose object storage (`ab/c123...`)
    pub fn to_path(&self) -> PathBuf {
        let (dir, file) = self.0.split_at(2);
        PathBuf::from(dir).join(file)
    }

    /// First 7 characters of the hash (standard Git abbreviation)
    pub fn to_short_oid(&self) -> String {
        self.0.split_at(7).0.to_string()
    }
}

impl AsRef<str> for ObjectId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ObjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("ce013625030ba8dba906f756967f9e9ca394464a", true)]
    #[case("CE013625030BA8DBA906F756967F9E9CA394464A", true)]
    #[case("ce013625030ba8dba906f756967f9e9ca394464", false)]
    #[case("xe013625030ba8dba906f756967f9e9ca394464a", false)]
    fn validates_hex_ids(#[case] raw: &str, #[case] valid: bool) {
        assert_eq!(ObjectId::try_parse(raw.to_string()).is_ok(), valid);
    }

    #[test]
    fn binary_form_is_twenty_bytes() {
        let oid = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a".to_string()).unwrap();
        let mut raw = Vec::new();
        oid.write_h40_to(&mut raw).unwrap();

        assert_eq!(raw.len(), OBJECT_ID_RAW_LENGTH);
        assert_eq!(ObjectId::read_h40_from(&mut raw.as_slice()).unwrap(), oid);
    }

    #[test]
    fn loose_object_path_splits_after_two_characters() {
        let oid = ObjectId::try_parse("ce013625030ba8dba906f756967f9e9ca394464a".to_string()).unwrap();

        assert_eq!(
            oid.to_path(),
            PathBuf::from("ce").join("013625030ba8dba906f756967f9e9ca394464a")
        );
        assert_eq!(oid.to_short_oid(), "ce01362");
    }
}
