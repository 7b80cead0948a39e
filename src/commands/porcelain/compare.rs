use crate::areas::repository::Repository;
use std::io::Write;
use std::path::PathBuf;

impl Repository {
    /// Name-status lines between two revisions, as `git diff --name-status`
    pub fn print_comparison(
        &self,
        roots: &[PathBuf],
        first: &str,
        second: &str,
    ) -> anyhow::Result<()> {
        let differences = self.compare_revisions(roots, first, second)?;

        for (path, difference) in differences {
            writeln!(self.writer(), "{difference}\t{}", path.display())?;
        }

        Ok(())
    }
}
