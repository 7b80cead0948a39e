use crate::areas::repository::Repository;
use std::io::Write;
use std::path::PathBuf;

impl Repository {
    /// Print `<code> <path>` for every unresolved path, git's two-letter
    /// codes; `verbose` prints the descriptions instead
    pub fn print_conflicts(&self, roots: &[PathBuf], verbose: bool) -> anyhow::Result<usize> {
        let conflicts = self.get_conflicts(roots)?;

        for (path, record) in &conflicts {
            let Some(descriptor) = record.conflict_descriptor else {
                continue;
            };

            if verbose {
                writeln!(
                    self.writer(),
                    "{:<17}{}",
                    descriptor.description(),
                    path.display()
                )?;
            } else {
                writeln!(self.writer(), "{descriptor} {}", path.display())?;
            }
        }

        Ok(conflicts.len())
    }
}
