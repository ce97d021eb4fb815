//! The scan-and-rewrite patch engine.
//!
//! A run streams the source into a sibling staging file, fixing the first line
//! that carries the defect signature. If nothing matched, the staging file is
//! deleted and the source is left alone. Otherwise the source is renamed to the
//! backup path and the staging file takes its place.
//!
//! The two commit renames are separate filesystem calls. A crash between them
//! leaves only the backup; [`PatchEngine::restore_backup`] puts it back.

mod errors;
mod staging;

pub use errors::{PatchError, ScanError};

use crate::defect::DefectSignature;
use crate::paths::{Naming, PatchPaths};
use staging::StagingFile;
use std::borrow::Cow;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

/// Details of the single line a run corrected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineFix {
    /// 1-based line number.
    pub line_number: usize,
    /// Byte offset of the removed character within the raw line.
    pub byte_offset: usize,
    /// Character column of the removed character in `original` (0-based).
    ///
    /// Invalid UTF-8 before the marker counts as one U+FFFD per bad sequence,
    /// the same way `original` and `corrected` decode it.
    pub column: usize,
    /// The character that was removed.
    pub removed: char,
    /// Line before the fix, without its terminator.
    pub original: String,
    /// Line after the fix, without its terminator.
    pub corrected: String,
}

impl LineFix {
    /// Reinsert the removed character into a corrected line.
    ///
    /// `revert_line(&fix.corrected)` reproduces `fix.original`.
    pub fn revert_line(&self, line: &str) -> String {
        let at = line
            .char_indices()
            .nth(self.column)
            .map_or(line.len(), |(idx, _)| idx);
        let mut reverted = line.to_string();
        reverted.insert(at, self.removed);
        reverted
    }
}

/// Outcome of a successful [`PatchEngine::patch_file`] run.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "PatchResult should be checked to see whether a patch was applied"]
pub enum PatchResult {
    /// No line carried the signature; nothing on disk changed.
    NoDefectFound { file: PathBuf },
    /// One line was corrected and the original moved to `backup`.
    Patched {
        file: PathBuf,
        backup: PathBuf,
        fix: LineFix,
    },
}

impl PatchResult {
    pub fn is_patched(&self) -> bool {
        matches!(self, PatchResult::Patched { .. })
    }
}

impl fmt::Display for PatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchResult::NoDefectFound { file } => {
                write!(f, "No defect found in {}", file.display())
            }
            PatchResult::Patched { file, backup, fix } => write!(
                f,
                "Patched {} at line {} (backup: {})",
                file.display(),
                fix.line_number,
                backup.display()
            ),
        }
    }
}

/// Detects and repairs the signature defect in a text file.
#[derive(Debug, Clone, Default)]
pub struct PatchEngine {
    signature: DefectSignature,
    naming: Naming,
}

impl PatchEngine {
    /// Engine for the `MapFileParser.sh` defect with default file naming.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_signature(signature: DefectSignature) -> Self {
        Self {
            signature,
            naming: Naming::default(),
        }
    }

    pub fn with_naming(mut self, naming: Naming) -> Self {
        self.naming = naming;
        self
    }

    pub fn signature(&self) -> &DefectSignature {
        &self.signature
    }

    pub fn naming(&self) -> &Naming {
        &self.naming
    }

    /// Backup and staging paths this engine uses for `source`.
    pub fn paths_for(&self, source: impl AsRef<Path>) -> Result<PatchPaths, PatchError> {
        PatchPaths::derive(source, &self.naming)
    }

    /// Byte offset of the defect signature in `line`, if the line is defective.
    pub fn locate_defect(&self, line: &str) -> Option<usize> {
        self.signature.find_pattern(line.as_bytes())
    }

    /// Remove one character at the first edit marker in `line`.
    ///
    /// Returns `None` when the line has no marker. Only call this on lines
    /// for which [`locate_defect`](Self::locate_defect) succeeded.
    pub fn apply_fix(&self, line: &str) -> Option<String> {
        let offset = self.signature.find_marker(line.as_bytes())?;
        let mut fixed = line.to_string();
        fixed.remove(offset);
        Some(fixed)
    }

    /// Copy `reader` to `writer` line by line, fixing the first defective line.
    ///
    /// Every other byte is passed through unchanged, including `\r\n`
    /// terminators and a missing final newline.
    pub fn rewrite<R: BufRead, W: Write>(
        &self,
        mut reader: R,
        mut writer: W,
    ) -> Result<Option<LineFix>, ScanError> {
        let mut fix = None;
        let mut line = Vec::new();
        let mut line_number = 0;

        loop {
            line.clear();
            let read = reader
                .read_until(b'\n', &mut line)
                .map_err(|source| ScanError::Read {
                    line_number: line_number + 1,
                    source,
                })?;
            if read == 0 {
                break;
            }
            line_number += 1;

            if fix.is_none() && self.signature.find_pattern(&line).is_some() {
                debug!(line_number, "defect signature matched");
                fix = Some(self.fix_line(line_number, &mut line)?);
            }

            writer
                .write_all(&line)
                .map_err(|source| ScanError::Write {
                    line_number,
                    source,
                })?;
        }

        writer
            .flush()
            .map_err(|source| ScanError::Write {
                line_number,
                source,
            })?;

        Ok(fix)
    }

    fn fix_line(&self, line_number: usize, line: &mut Vec<u8>) -> Result<LineFix, ScanError> {
        let original = display_line(line.as_slice()).into_owned();
        let Some((byte_offset, removed)) = self.signature.find_edit(line.as_slice()) else {
            return Err(ScanError::MalformedDefectLine {
                line_number,
                line: original,
            });
        };

        line.drain(byte_offset..byte_offset + removed.len_utf8());

        let column = String::from_utf8_lossy(&line[..byte_offset]).chars().count();
        Ok(LineFix {
            line_number,
            byte_offset,
            column,
            removed,
            original,
            corrected: display_line(line.as_slice()).into_owned(),
        })
    }

    /// Scan `source` without writing anything.
    ///
    /// Returns the fix [`patch_file`](Self::patch_file) would apply, if any.
    pub fn check_file(&self, source: impl AsRef<Path>) -> Result<Option<LineFix>, PatchError> {
        let paths = self.paths_for(source)?;
        let reader = open_source(&paths.source)?;
        self.rewrite(reader, io::sink())
            .map_err(|err| PatchError::from_scan(err, paths.source, paths.staging))
    }

    /// Fix the first defective line of `source`, keeping the original as a backup.
    pub fn patch_file(&self, source: impl AsRef<Path>) -> Result<PatchResult, PatchError> {
        let paths = self.paths_for(source)?;
        debug!(source = %paths.source.display(), "scanning");

        let reader = open_source(&paths.source)?;
        let mut staging = StagingFile::create(&paths.staging)?;

        let scanned = self.rewrite(reader, staging.writer());
        let fix = match scanned {
            Ok(fix) => fix,
            Err(err) => {
                warn!(error = %err, "scan aborted");
                return Err(PatchError::from_scan(
                    err,
                    paths.source,
                    staging.path().to_path_buf(),
                ));
            }
        };
        staging.finish()?;

        let Some(fix) = fix else {
            if let Err(err) = staging.discard() {
                warn!(path = %paths.staging.display(), error = %err, "failed to remove staging file");
            }
            info!(source = %paths.source.display(), "no defect found");
            return Ok(PatchResult::NoDefectFound { file: paths.source });
        };
        info!(
            line_number = fix.line_number,
            column = fix.column,
            "corrected line staged"
        );

        self.commit(&paths, staging)?;
        info!(
            source = %paths.source.display(),
            backup = %paths.backup.display(),
            "patched"
        );

        Ok(PatchResult::Patched {
            file: paths.source,
            backup: paths.backup,
            fix,
        })
    }

    fn commit(&self, paths: &PatchPaths, staging: StagingFile) -> Result<(), PatchError> {
        if backup_exists(&paths.backup) {
            let kept = staging.keep();
            error!(
                backup = %paths.backup.display(),
                staging = %kept.display(),
                "backup already exists; corrected content left in staging file"
            );
            return Err(PatchError::BackupAlreadyExists {
                path: paths.backup.clone(),
            });
        }

        if let Err(source) = fs::rename(&paths.source, &paths.backup) {
            let kept = staging.keep();
            error!(staging = %kept.display(), "could not move source to backup");
            return Err(PatchError::RenameFailure {
                from: paths.source.clone(),
                to: paths.backup.clone(),
                source,
            });
        }

        staging.promote(&paths.source).inspect_err(|_| {
            error!(
                source = %paths.source.display(),
                backup = %paths.backup.display(),
                "source was moved to backup but the corrected file could not take its place"
            );
        })
    }

    /// Move the backup of `source` back into place, replacing the patched file.
    pub fn restore_backup(&self, source: impl AsRef<Path>) -> Result<PathBuf, PatchError> {
        let paths = self.paths_for(source)?;
        if !backup_exists(&paths.backup) {
            return Err(PatchError::BackupMissing { path: paths.backup });
        }

        fs::rename(&paths.backup, &paths.source).map_err(|source| PatchError::RenameFailure {
            from: paths.backup.clone(),
            to: paths.source.clone(),
            source,
        })?;
        info!(
            source = %paths.source.display(),
            backup = %paths.backup.display(),
            "restored backup"
        );

        Ok(paths.source)
    }
}

fn open_source(path: &Path) -> Result<BufReader<File>, PatchError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| PatchError::FileNotReadable {
            path: path.to_path_buf(),
            source,
        })
}

fn backup_exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

fn display_line(line: &[u8]) -> Cow<'_, str> {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const DEFECTIVE: &str = r#"				shellScript = "\"$PROJECT_DIR/MapFileParser.sh\""";"#;
    const CORRECTED: &str = r#"				shellScript = "\"$PROJECT_DIR/MapFileParser.sh\"";"#;

    fn rewrite_str(engine: &PatchEngine, input: &str) -> (String, Option<LineFix>) {
        let mut out = Vec::new();
        let fix = engine.rewrite(Cursor::new(input), &mut out).unwrap();
        (String::from_utf8(out).unwrap(), fix)
    }

    #[test]
    fn test_locate_defect() {
        let engine = PatchEngine::new();
        assert!(engine.locate_defect(DEFECTIVE).is_some());
        assert!(engine.locate_defect(CORRECTED).is_none());
        assert!(engine.locate_defect("isa = PBXShellScriptBuildPhase;").is_none());
    }

    #[test]
    fn test_apply_fix_removes_one_quote() {
        let engine = PatchEngine::new();
        let fixed = engine.apply_fix(DEFECTIVE).unwrap();
        assert_eq!(fixed, CORRECTED);
        assert_eq!(fixed.len(), DEFECTIVE.len() - 1);
    }

    #[test]
    fn test_apply_fix_simple_scenario() {
        let engine = PatchEngine::new();
        let line = r#"foo "MapFileParser.sh\"""#;
        assert!(engine.locate_defect(line).is_some());
        assert_eq!(engine.apply_fix(line).unwrap(), r#"foo "MapFileParser.sh\""#);
    }

    #[test]
    fn test_apply_fix_edits_first_marker_even_before_signature() {
        let engine = PatchEngine::new();
        let line = r#"name = ""; path = "MapFileParser.sh\""";"#;
        assert_eq!(
            engine.apply_fix(line).unwrap(),
            r#"name = "; path = "MapFileParser.sh\""";"#
        );
    }

    #[test]
    fn test_apply_fix_without_marker() {
        let engine = PatchEngine::new();
        assert_eq!(engine.apply_fix("no marker at all"), None);
    }

    #[test]
    fn test_rewrite_passes_clean_input_through() {
        let engine = PatchEngine::new();
        let input = "// !$*UTF8*$!\n{\n\tarchiveVersion = 1;\n}";
        let (output, fix) = rewrite_str(&engine, input);
        assert_eq!(output, input);
        assert!(fix.is_none());
    }

    #[test]
    fn test_rewrite_fixes_first_match_only() {
        let engine = PatchEngine::new();
        let input = format!("a\n{DEFECTIVE}\nb\n{DEFECTIVE}\n");
        let (output, fix) = rewrite_str(&engine, &input);

        assert_eq!(output, format!("a\n{CORRECTED}\nb\n{DEFECTIVE}\n"));
        let fix = fix.unwrap();
        assert_eq!(fix.line_number, 2);
        assert_eq!(fix.original, DEFECTIVE);
        assert_eq!(fix.corrected, CORRECTED);
    }

    #[test]
    fn test_rewrite_preserves_crlf() {
        let engine = PatchEngine::new();
        let input = format!("a\r\n{DEFECTIVE}\r\nb\r\n");
        let (output, fix) = rewrite_str(&engine, &input);
        assert_eq!(output, format!("a\r\n{CORRECTED}\r\nb\r\n"));
        assert_eq!(fix.unwrap().corrected, CORRECTED);
    }

    #[test]
    fn test_fix_reports_char_column_for_multibyte_text() {
        let engine = PatchEngine::new();
        let line = r#"é "MapFileParser.sh\"""#;
        let (_, fix) = rewrite_str(&engine, line);
        let fix = fix.unwrap();
        assert_eq!(fix.byte_offset, line.find(r#""""#).unwrap());
        assert_eq!(fix.column, fix.byte_offset - 1);
        assert_eq!(fix.revert_line(&fix.corrected), line);
    }

    #[test]
    fn test_revert_line_with_invalid_utf8_before_marker() {
        let engine = PatchEngine::new();
        let mut input = b"\xff\xfe name ".to_vec();
        input.extend_from_slice(br#""MapFileParser.sh\"""#);
        input.push(b'\n');

        let mut out = Vec::new();
        let fix = engine.rewrite(Cursor::new(&input), &mut out).unwrap().unwrap();

        assert_eq!(fix.byte_offset, input.len() - 3);
        assert_eq!(fix.column, fix.original.chars().count() - 2);
        assert_eq!(fix.revert_line(&fix.corrected), fix.original);
        assert_eq!(out.len(), input.len() - 1);
    }

    #[test]
    fn test_custom_marker_removes_its_first_char() {
        let engine = PatchEngine::with_signature(DefectSignature::new("BROKEN", "é!"));
        let (output, fix) = rewrite_str(&engine, "BROKEN xé!\n");
        let fix = fix.unwrap();
        assert_eq!(output, "BROKEN x!\n");
        assert_eq!(fix.removed, 'é');
        assert_eq!(fix.revert_line(&fix.corrected), "BROKEN xé!");
    }

    #[test]
    fn test_malformed_defect_line() {
        let engine = PatchEngine::with_signature(DefectSignature::new("BROKEN", "##"));
        let mut out = Vec::new();
        let result = engine.rewrite(Cursor::new("ok\nBROKEN here\n"), &mut out);
        assert!(matches!(
            result,
            Err(ScanError::MalformedDefectLine { line_number: 2, .. })
        ));
    }

    #[test]
    fn test_patch_result_display() {
        let none = PatchResult::NoDefectFound {
            file: PathBuf::from("/tmp/project.pbxproj"),
        };
        assert!(none.to_string().contains("No defect found"));
        assert!(!none.is_patched());

        let patched = PatchResult::Patched {
            file: PathBuf::from("/tmp/project.pbxproj"),
            backup: PathBuf::from("/tmp/project_OLD.pbxproj"),
            fix: LineFix {
                line_number: 7,
                byte_offset: 0,
                column: 0,
                removed: '"',
                original: String::new(),
                corrected: String::new(),
            },
        };
        assert!(patched.to_string().contains("line 7"));
        assert!(patched.is_patched());
    }

    #[test]
    fn test_patch_file_round_trip_on_disk() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("project.pbxproj");
        let input = format!("{{\n{DEFECTIVE}\n}}\n");
        fs::write(&file, &input).unwrap();

        let engine = PatchEngine::new();
        let result = engine.patch_file(&file).unwrap();
        assert!(result.is_patched());

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            format!("{{\n{CORRECTED}\n}}\n")
        );
        assert_eq!(
            fs::read_to_string(temp_dir.path().join("project_OLD.pbxproj")).unwrap(),
            input
        );
        assert!(!temp_dir.path().join("project_FIXED.pbxproj").exists());
    }

    #[test]
    fn test_patch_file_missing_source() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("project.pbxproj");

        let result = PatchEngine::new().patch_file(&file);
        assert!(matches!(result, Err(PatchError::FileNotReadable { .. })));
        assert!(!temp_dir.path().join("project_FIXED.pbxproj").exists());
    }

    #[test]
    fn test_restore_without_backup() {
        let temp_dir = tempfile::tempdir().unwrap();
        let file = temp_dir.path().join("project.pbxproj");
        fs::write(&file, "{}\n").unwrap();

        let result = PatchEngine::new().restore_backup(&file);
        assert!(matches!(result, Err(PatchError::BackupMissing { .. })));
    }
}
