use crate::artifacts::status::file_change::{Classification, ConflictDescriptor};
use std::path::PathBuf;

/// Status of one path across HEAD (or the chosen base revision), the index
/// and the working tree
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatusRecord {
    /// Repository-relative path
    pub path: PathBuf,
    pub is_folder: bool,
    /// Present in the base tree or the index
    pub tracked: bool,
    pub head_vs_index: Classification,
    pub index_vs_working: Classification,
    pub head_vs_working: Classification,
    pub conflict: bool,
    pub conflict_descriptor: Option<ConflictDescriptor>,
    pub renamed: bool,
    pub copied: bool,
    /// Source of a detected rename or copy
    pub original_path: Option<PathBuf>,
    /// Recorded mtime of the index entry in milliseconds, -1 when unstaged
    pub index_entry_modification_timestamp: i64,
    /// Why the working entry could not be read, if it could not
    pub error: Option<String>,
}

impl StatusRecord {
    pub fn new(path: PathBuf) -> Self {
        StatusRecord {
            path,
            index_entry_modification_timestamp: -1,
            ..Default::default()
        }
    }

    /// Every pairwise comparison is NORMAL and nothing is in conflict
    pub fn is_unchanged(&self) -> bool {
        !self.conflict
            && self.head_vs_index.is_normal()
            && self.index_vs_working.is_normal()
            && self.head_vs_working.is_normal()
    }

    pub fn is_ignored(&self) -> bool {
        self.index_vs_working == Classification::Ignored
    }

    /// Three-column code: base/index, index/working, base/working; `U` in
    /// every column for conflicts
    pub fn short_code(&self) -> String {
        if self.conflict {
            return "UUU".to_string();
        }

        [self.head_vs_index, self.index_vs_working, self.head_vs_working]
            .iter()
            .map(Classification::code)
            .collect()
    }
}

impl std::fmt::Display for StatusRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut path = self.path.display().to_string();
        if self.is_folder {
            path.push('/');
        }

        match (&self.original_path, self.renamed, self.copied) {
            (Some(original), true, _) => write!(f, "{} {} -> {}", self.short_code(), original.display(), path),
            (Some(original), _, true) => write!(f, "{} {} => {}", self.short_code(), original.display(), path),
            _ => write!(f, "{} {}", self.short_code(), path),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fresh_record_is_unchanged_and_unstaged() {
        let record = StatusRecord::new(PathBuf::from("a.txt"));

        assert!(record.is_unchanged());
        assert_eq!(record.index_entry_modification_timestamp, -1);
        assert_eq!(record.to_string(), "    a.txt");
    }

    #[test]
    fn short_code_orders_the_three_comparisons() {
        let record = StatusRecord {
            head_vs_index: Classification::Added,
            index_vs_working: Classification::Modified,
            head_vs_working: Classification::Added,
            ..StatusRecord::new(PathBuf::from("f"))
        };

        assert_eq!(record.short_code(), "AMA");
    }

    #[test]
    fn renames_show_their_source() {
        let record = StatusRecord {
            index_vs_working: Classification::Added,
            head_vs_working: Classification::Added,
            renamed: true,
            original_path: Some(PathBuf::from("old.txt")),
            ..StatusRecord::new(PathBuf::from("new.txt"))
        };

        assert_eq!(record.to_string(), " AA old.txt -> new.txt");
    }
}
