use std::path::PathBuf;
use thiserror::Error;

/// Failures of the in-memory scan, before any path is involved.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("failed to read line {line_number}: {source}")]
    Read {
        line_number: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write line {line_number}: {source}")]
    Write {
        line_number: usize,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line_number} matches the defect signature but has no edit marker: {line}")]
    MalformedDefectLine { line_number: usize, line: String },
}

#[derive(Error, Debug)]
pub enum PatchError {
    #[error("cannot read {path}: {source}")]
    FileNotReadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot write staging file {path}: {source}")]
    StagingWriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("backup already exists: {path}")]
    BackupAlreadyExists { path: PathBuf },

    #[error("failed to rename {from} to {to}: {source}")]
    RenameFailure {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line_number} matches the defect signature but has no edit marker: {line}")]
    MalformedDefectLine { line_number: usize, line: String },

    #[error("no backup to restore: {path}")]
    BackupMissing { path: PathBuf },

    #[error("invalid path: {0}")]
    InvalidPath(PathBuf),

    #[error("{path} and {other} resolve to the same file; check the naming suffixes")]
    PathCollision { path: PathBuf, other: PathBuf },
}

impl PatchError {
    /// Failures after the corrected content was fully staged.
    ///
    /// The staging file is left in place and the source may already have been
    /// moved to the backup path.
    pub fn is_commit_failure(&self) -> bool {
        matches!(
            self,
            PatchError::BackupAlreadyExists { .. } | PatchError::RenameFailure { .. }
        )
    }

    pub(crate) fn from_scan(err: ScanError, source: PathBuf, staging: PathBuf) -> Self {
        match err {
            ScanError::Read { source: io, .. } => PatchError::FileNotReadable {
                path: source,
                source: io,
            },
            ScanError::Write { source: io, .. } => PatchError::StagingWriteFailure {
                path: staging,
                source: io,
            },
            ScanError::MalformedDefectLine { line_number, line } => {
                PatchError::MalformedDefectLine { line_number, line }
            }
        }
    }
}
