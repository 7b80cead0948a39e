use crate::areas::repository::Repository;
use std::io::Write;
use std::path::PathBuf;

impl Repository {
    /// Print the ignored ones among `paths`, with the deciding rule when
    /// `verbose`. Returns how many were ignored.
    pub fn check_ignore(&self, paths: &[PathBuf], verbose: bool) -> anyhow::Result<usize> {
        let mut ignored = 0;

        for path in paths {
            let decision = self.is_ignored(path)?;
            if !decision.ignored {
                continue;
            }
            ignored += 1;

            let relative = self.relativize(path)?;
            if verbose {
                let source = decision
                    .defining_file
                    .as_deref()
                    .map(|file| file.strip_prefix(self.path()).unwrap_or(file))
                    .map(|file| file.display().to_string())
                    .unwrap_or_default();

                writeln!(
                    self.writer(),
                    "{}:{}:{}\t{}",
                    source,
                    decision.line.unwrap_or_default(),
                    decision.pattern.unwrap_or_default(),
                    relative.display()
                )?;
            } else {
                writeln!(self.writer(), "{}", relative.display())?;
            }
        }

        Ok(ignored)
    }

    pub fn ignore_paths(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        for path in paths {
            let changed = self.add_ignore_rule(path)?;
            self.report_changed_files(&changed)?;
        }

        Ok(())
    }

    pub fn unignore_paths(&self, paths: &[PathBuf]) -> anyhow::Result<()> {
        for path in paths {
            let changed = self.remove_ignore_rule(path)?;
            self.report_changed_files(&changed)?;
        }

        Ok(())
    }

    fn report_changed_files(&self, changed: &[PathBuf]) -> anyhow::Result<()> {
        for file in changed {
            let file = file.strip_prefix(self.path()).unwrap_or(file);
            writeln!(self.writer(), "updated {}", file.display())?;
        }

        Ok(())
    }
}
