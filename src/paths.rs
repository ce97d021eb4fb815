//! Sibling path derivation for the backup and staging files.
//!
//! `project.pbxproj` becomes `project_OLD.pbxproj` (backup) and
//! `project_FIXED.pbxproj` (staging). Both live next to the source so the
//! final renames never cross a filesystem boundary.

use crate::engine::PatchError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

pub const DEFAULT_BACKUP_SUFFIX: &str = "_OLD";
pub const DEFAULT_STAGING_SUFFIX: &str = "_FIXED";

/// Suffixes spliced between a file's stem and its extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Naming {
    pub backup_suffix: String,
    pub staging_suffix: String,
}

impl Default for Naming {
    fn default() -> Self {
        Self {
            backup_suffix: DEFAULT_BACKUP_SUFFIX.to_string(),
            staging_suffix: DEFAULT_STAGING_SUFFIX.to_string(),
        }
    }
}

/// The source/backup/staging triad for a single run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchPaths {
    pub source: PathBuf,
    pub backup: PathBuf,
    pub staging: PathBuf,
}

impl PatchPaths {
    /// Fails with [`PatchError::PathCollision`] when two of the three paths
    /// coincide, which an empty or shared suffix would cause.
    pub fn derive(source: impl AsRef<Path>, naming: &Naming) -> Result<Self, PatchError> {
        let source = source.as_ref();
        let paths = Self {
            source: source.to_path_buf(),
            backup: with_suffix(source, &naming.backup_suffix)?,
            staging: with_suffix(source, &naming.staging_suffix)?,
        };

        let pairs = [
            (&paths.source, &paths.backup),
            (&paths.source, &paths.staging),
            (&paths.backup, &paths.staging),
        ];
        if let Some((path, other)) = pairs.into_iter().find(|(a, b)| a == b) {
            return Err(PatchError::PathCollision {
                path: path.clone(),
                other: other.clone(),
            });
        }

        Ok(paths)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> Result<PathBuf, PatchError> {
    let stem = path
        .file_stem()
        .ok_or_else(|| PatchError::InvalidPath(path.to_path_buf()))?;

    let mut name = OsString::from(stem);
    name.push(suffix);
    if let Some(ext) = path.extension() {
        name.push(".");
        name.push(ext);
    }

    Ok(path.with_file_name(name))
}
