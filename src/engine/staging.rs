//! The staging file: a [`NamedTempFile`] pinned to the derived sibling name.
//!
//! The file is created exclusively, so a leftover link at the staging path is
//! never followed. Dropping a [`StagingFile`] deletes it unless it was promoted
//! over the source or explicitly kept.

use super::PatchError;
use std::fs::{self, File};
use std::io::{self, BufWriter};
use std::path::{Path, PathBuf};
use tempfile::{Builder, NamedTempFile};
use tracing::{debug, warn};

pub(crate) struct StagingFile {
    file: NamedTempFile,
}

impl StagingFile {
    /// Create the staging file at exactly `path`.
    ///
    /// A stale entry left at `path` by an interrupted run is unlinked first.
    pub(crate) fn create(path: &Path) -> Result<Self, PatchError> {
        let failure = |source| PatchError::StagingWriteFailure {
            path: path.to_path_buf(),
            source,
        };

        let name = path
            .file_name()
            .ok_or_else(|| PatchError::InvalidPath(path.to_path_buf()))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        remove_stale(path).map_err(failure)?;

        let file = Builder::new()
            .prefix(name)
            .rand_bytes(0)
            .tempfile_in(dir)
            .map_err(failure)?;
        debug!(path = %file.path().display(), "created staging file");

        Ok(Self { file })
    }

    pub(crate) fn path(&self) -> &Path {
        self.file.path()
    }

    /// Buffered writer over the staging file. The caller flushes it.
    pub(crate) fn writer(&mut self) -> BufWriter<&mut File> {
        BufWriter::new(self.file.as_file_mut())
    }

    /// Fsync the staged content.
    pub(crate) fn finish(&self) -> Result<(), PatchError> {
        self.file
            .as_file()
            .sync_all()
            .map_err(|source| PatchError::StagingWriteFailure {
                path: self.path().to_path_buf(),
                source,
            })
    }

    /// Delete the staging file now, reporting any failure.
    pub(crate) fn discard(self) -> io::Result<()> {
        let path = self.path().to_path_buf();
        self.file.close()?;
        debug!(path = %path.display(), "removed staging file");
        Ok(())
    }

    /// Leave the staging file on disk for manual inspection.
    pub(crate) fn keep(self) -> PathBuf {
        match self.file.keep() {
            Ok((_, path)) => path,
            Err(err) => {
                let path = err.file.path().to_path_buf();
                warn!(path = %path.display(), error = %err.error, "could not keep staging file");
                path
            }
        }
    }

    /// Rename the staging file to `target`.
    ///
    /// On failure the staging file is kept, since it holds the completed work.
    pub(crate) fn promote(self, target: &Path) -> Result<(), PatchError> {
        let from = self.path().to_path_buf();
        match self.file.persist(target) {
            Ok(_) => {
                debug!(from = %from.display(), to = %target.display(), "promoted staging file");
                Ok(())
            }
            Err(err) => {
                let from = StagingFile { file: err.file }.keep();
                Err(PatchError::RenameFailure {
                    from,
                    to: target.to_path_buf(),
                    source: err.error,
                })
            }
        }
    }
}

/// Unlink whatever an earlier run left at `path`. Links are removed, not followed.
fn remove_stale(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            "staging path is a directory",
        )),
        Ok(_) => {
            warn!(path = %path.display(), "removing stale staging file");
            fs::remove_file(path)
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err),
    }
}
