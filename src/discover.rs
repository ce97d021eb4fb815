//! Locating the project file from a user-supplied path.
//!
//! Users tend to pass the exported Xcode folder rather than the file itself,
//! so a directory is searched for the configured file name. An explicit file
//! is checked against the same name before anything is written.

use crate::config::DiscoveryConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("no {file_name} found under {dir}")]
    NotFound { dir: PathBuf, file_name: String },

    #[error("found {} copies of {file_name} under {dir}, pass one explicitly", .candidates.len())]
    Ambiguous {
        dir: PathBuf,
        file_name: String,
        candidates: Vec<PathBuf>,
    },

    #[error("{path} does not look like a {expected} file (use --force to patch it anyway)")]
    UnexpectedFileName { path: PathBuf, expected: String },

    #[error("path does not exist: {0}")]
    Missing(PathBuf),

    #[error("failed to search directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// Resolve `path` to the single file to patch.
pub fn resolve_target(path: &Path, discovery: &DiscoveryConfig) -> Result<PathBuf, DiscoveryError> {
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.is_dir() {
        return Err(DiscoveryError::Missing(path.to_path_buf()));
    }

    let mut candidates = Vec::new();
    for entry in WalkDir::new(path).max_depth(discovery.max_depth) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.file_name().to_str() == Some(discovery.file_name.as_str())
        {
            candidates.push(entry.into_path());
        }
    }
    candidates.sort();

    match candidates.len() {
        0 => Err(DiscoveryError::NotFound {
            dir: path.to_path_buf(),
            file_name: discovery.file_name.clone(),
        }),
        1 => Ok(candidates.remove(0)),
        _ => Err(DiscoveryError::Ambiguous {
            dir: path.to_path_buf(),
            file_name: discovery.file_name.clone(),
            candidates,
        }),
    }
}

/// Reject files whose name does not contain the expected project file name.
pub fn ensure_expected_name(path: &Path, discovery: &DiscoveryConfig) -> Result<(), DiscoveryError> {
    let matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.contains(discovery.file_name.as_str()));

    if matches {
        Ok(())
    } else {
        Err(DiscoveryError::UnexpectedFileName {
            path: path.to_path_buf(),
            expected: discovery.file_name.clone(),
        })
    }
}
