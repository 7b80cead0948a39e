use crate::areas::repository::Repository;
use crate::artifacts::status::identity::IdentityComputer;
use std::io::Write;
use std::path::Path;

impl Repository {
    /// Print the id `path` would be staged with, line-ending and
    /// nested-repository rules included
    pub fn hash_object(&self, path: &Path) -> anyhow::Result<()> {
        let path = self.relativize(path)?;
        let config = self.config()?;
        let computer = IdentityComputer::new(self.workspace(), self.database(), &config);

        let entry = computer.classify(&path)?;
        if !entry.is_leaf() {
            anyhow::bail!("{} is not a file", path.display());
        }

        let index = self.load_index()?;
        let staged = index.entry_by_path(&path).map(|entry| &entry.oid);

        let identity = computer.identity_of(&path, &entry, staged)?;
        writeln!(self.writer(), "{}", identity.oid)?;

        Ok(())
    }
}
