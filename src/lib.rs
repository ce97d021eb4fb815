//! pbxproj-fix: repairs the `MapFileParser.sh` quoting defect in Xcode projects
//!
//! iOS builds exported from a Windows editor produce a `project.pbxproj` whose
//! shell script phase ends in `MapFileParser.sh\"""`, one quote too many. Xcode
//! cannot open the project until the stray quote is removed.
//!
//! # Architecture
//!
//! [`PatchEngine`] streams the file line by line into a sibling staging file,
//! removing one character from the first line carrying the
//! [`DefectSignature`]. Nothing else is touched.
//!
//! # Safety
//!
//! - The source is never modified in place
//! - The staging file is deleted on every abort path
//! - The original is kept as a backup, which is never overwritten
//! - At most one line changes per run
//!
//! # Example
//!
//! ```no_run
//! use pbxproj_fix::{PatchEngine, PatchResult};
//!
//! let engine = PatchEngine::new();
//! match engine.patch_file("Unity-iPhone.xcodeproj/project.pbxproj") {
//!     Ok(PatchResult::Patched { fix, backup, .. }) => {
//!         println!("fixed line {} (backup at {})", fix.line_number, backup.display())
//!     }
//!     Ok(PatchResult::NoDefectFound { .. }) => println!("nothing to fix"),
//!     Err(e) => eprintln!("patch failed: {}", e),
//! }
//! ```

pub mod config;
pub mod defect;
pub mod discover;
pub mod engine;
pub mod logging;
pub mod paths;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, FixConfig};
pub use defect::DefectSignature;
pub use discover::{ensure_expected_name, resolve_target, DiscoveryError};
pub use engine::{LineFix, PatchEngine, PatchError, PatchResult, ScanError};
pub use paths::{Naming, PatchPaths};
