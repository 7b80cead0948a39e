use crate::artifacts::index::CHECKSUM_SIZE;
use anyhow::anyhow;
use bytes::Bytes;
use file_guard::FileGuard;
use sha1::{Digest, Sha1};
use std::io::Read;
use std::ops::DerefMut;

/// Reader over a locked index file that hashes everything it hands out
///
/// The trailing SHA-1 of the index covers every byte before it, so reads
/// must go through [`Checksum::read`] until [`Checksum::verify`] is called.
#[derive(Debug)]
pub struct Checksum<'f> {
    file: FileGuard<&'f mut std::fs::File>,
    digest: Sha1,
    consumed: u64,
    len: u64,
}

impl<'f> Checksum<'f> {
    pub(crate) fn new(file: FileGuard<&'f mut std::fs::File>, len: u64) -> Self {
        Checksum {
            file,
            digest: Sha1::new(),
            consumed: 0,
            len,
        }
    }

    pub(crate) fn read(&mut self, size: usize) -> anyhow::Result<Bytes> {
        let mut buffer = vec![0; size];
        self.file
            .deref_mut()
            .read_exact(&mut buffer)
            .map_err(|_| anyhow!("Unexpected end-of-file while reading index"))?;

        self.digest.update(&buffer);
        self.consumed += size as u64;
        Ok(Bytes::from(buffer))
    }

    /// Bytes left before the trailing checksum
    pub(crate) fn remaining(&self) -> u64 {
        self.len
            .saturating_sub(CHECKSUM_SIZE as u64)
            .saturating_sub(self.consumed)
    }

    pub(crate) fn verify(&mut self) -> anyhow::Result<()> {
        let mut expected_checksum = [0u8; CHECKSUM_SIZE];
        self.file.deref_mut().read_exact(&mut expected_checksum)?;

        let actual_checksum = self.digest.clone().finalize();
        let actual_checksum = actual_checksum.as_slice();

        if expected_checksum != actual_checksum {
            return Err(anyhow!("Checksum does not match value stored on disk"));
        }

        Ok(())
    }
}
