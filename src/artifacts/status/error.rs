use std::path::PathBuf;
use thiserror::Error;

/// Failures that abort a whole status or ignore operation.
///
/// Problems local to one working entry never surface here; they are
/// attached to that entry's record instead.
#[derive(Debug, Error)]
pub enum StatusError {
    #[error("{path:?} is outside the working tree {worktree:?}")]
    OutsideWorkingTree { path: PathBuf, worktree: PathBuf },

    #[error("not a git repository (or any of the parent directories): {0:?}")]
    NotARepository(PathBuf),

    #[error("unknown revision {revision}: {reason}")]
    UnknownRevision { revision: String, reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type StatusResult<T> = Result<T, StatusError>;
