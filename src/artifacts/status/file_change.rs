use colored::Colorize;

/// Relationship of one path between two snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Classification {
    #[default]
    Normal,
    Added,
    Modified,
    Removed,
    Ignored,
}

impl Classification {
    /// Classify a path from its presence in two snapshots and, when present
    /// in both, whether the contents are identical
    pub fn from_presence(in_base: bool, in_other: bool, identical: impl FnOnce() -> bool) -> Self {
        match (in_base, in_other) {
            (false, false) => Classification::Normal,
            (false, true) => Classification::Added,
            (true, false) => Classification::Removed,
            (true, true) if identical() => Classification::Normal,
            (true, true) => Classification::Modified,
        }
    }

    pub fn code(&self) -> char {
        match self {
            Classification::Normal => ' ',
            Classification::Added => 'A',
            Classification::Modified => 'M',
            Classification::Removed => 'D',
            Classification::Ignored => '!',
        }
    }

    pub fn is_normal(&self) -> bool {
        matches!(self, Classification::Normal)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let code = self.code().to_string();
        let colored_code = match self {
            Classification::Normal => code.normal(),
            Classification::Added => code.green(),
            Classification::Modified => code.yellow(),
            Classification::Removed => code.red(),
            Classification::Ignored => code.dimmed(),
        };
        write!(f, "{colored_code}")
    }
}

/// Which sides of a merge left an unresolved path, derived from the index
/// stages present (1 = base, 2 = ours, 3 = theirs)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConflictDescriptor {
    BothDeleted,
    AddedByUs,
    DeletedByThem,
    AddedByThem,
    DeletedByUs,
    BothAdded,
    BothModified,
}

impl ConflictDescriptor {
    pub fn from_stages(base: bool, ours: bool, theirs: bool) -> Option<Self> {
        match (base, ours, theirs) {
            (true, false, false) => Some(ConflictDescriptor::BothDeleted),
            (false, true, false) => Some(ConflictDescriptor::AddedByUs),
            (true, true, false) => Some(ConflictDescriptor::DeletedByThem),
            (false, false, true) => Some(ConflictDescriptor::AddedByThem),
            (true, false, true) => Some(ConflictDescriptor::DeletedByUs),
            (false, true, true) => Some(ConflictDescriptor::BothAdded),
            (true, true, true) => Some(ConflictDescriptor::BothModified),
            (false, false, false) => None,
        }
    }

    /// Two-letter code as shown by `git status --short`
    pub fn code(&self) -> &'static str {
        match self {
            ConflictDescriptor::BothDeleted => "DD",
            ConflictDescriptor::AddedByUs => "AU",
            ConflictDescriptor::DeletedByThem => "UD",
            ConflictDescriptor::AddedByThem => "UA",
            ConflictDescriptor::DeletedByUs => "DU",
            ConflictDescriptor::BothAdded => "AA",
            ConflictDescriptor::BothModified => "UU",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConflictDescriptor::BothDeleted => "both deleted:",
            ConflictDescriptor::AddedByUs => "added by us:",
            ConflictDescriptor::DeletedByThem => "deleted by them:",
            ConflictDescriptor::AddedByThem => "added by them:",
            ConflictDescriptor::DeletedByUs => "deleted by us:",
            ConflictDescriptor::BothAdded => "both added:",
            ConflictDescriptor::BothModified => "both modified:",
        }
    }
}

impl std::fmt::Display for ConflictDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code().red())
    }
}
