use colored::Colorize;
use crate::areas::repository::Repository;
use crate::artifacts::status::StatusOptions;
use crate::artifacts::status::notifier::CancellationToken;
use crate::artifacts::status::status_record::StatusRecord;
use std::io::Write;
use std::path::PathBuf;

/// Column codes colored per classification, then the rest of the record
fn colored_line(record: &StatusRecord) -> String {
    let codes = if record.conflict {
        record.short_code().red().to_string()
    } else {
        format!(
            "{}{}{}",
            record.head_vs_index, record.index_vs_working, record.head_vs_working
        )
    };

    let plain = record.to_string();
    let rest = plain.get(record.short_code().len()..).unwrap_or_default();

    format!("{codes}{rest}")
}

impl Repository {
    /// Print one line per changed path as records arrive; `show_all` also
    /// prints unchanged ones. Returns whether the walk was cancelled.
    pub fn print_status(
        &self,
        roots: &[PathBuf],
        revision: Option<&str>,
        options: StatusOptions,
        show_all: bool,
        cancel: CancellationToken,
    ) -> anyhow::Result<bool> {
        let mut write_error = None;
        let mut listener = |record: &StatusRecord| {
            if write_error.is_some() || (!show_all && record.is_unchanged()) {
                return;
            }
            if let Err(err) = writeln!(self.writer(), "{}", colored_line(record)) {
                write_error = Some(err);
            }
        };

        let report = self.status(roots, revision, options, &mut listener, cancel)?;
        if let Some(err) = write_error {
            return Err(err.into());
        }

        Ok(report.cancelled)
    }
}
