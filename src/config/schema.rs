use crate::paths::{Naming, DEFAULT_BACKUP_SUFFIX, DEFAULT_STAGING_SUFFIX};
use serde::Deserialize;
use std::fmt;

pub const DEFAULT_FILE_NAME: &str = "project.pbxproj";
pub const DEFAULT_MAX_DEPTH: usize = 4;

#[derive(Debug, Deserialize, Default, Clone, PartialEq, Eq)]
pub struct FixConfig {
    #[serde(default)]
    pub naming: NamingConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl FixConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        let suffixes = [
            ("naming.backup_suffix", &self.naming.backup_suffix),
            ("naming.staging_suffix", &self.naming.staging_suffix),
        ];
        for (field, suffix) in suffixes {
            if suffix.is_empty() {
                issues.push(ValidationIssue::MissingField { field });
            } else if suffix.contains(&['/', '\\'][..]) {
                issues.push(ValidationIssue::InvalidValue {
                    field,
                    message: format!("'{suffix}' must not contain a path separator"),
                });
            }
        }
        if !self.naming.backup_suffix.is_empty()
            && self.naming.backup_suffix == self.naming.staging_suffix
        {
            issues.push(ValidationIssue::InvalidValue {
                field: "naming.staging_suffix",
                message: "must differ from naming.backup_suffix".to_string(),
            });
        }

        if self.discovery.file_name.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                field: "discovery.file_name",
            });
        }
        if self.discovery.max_depth == 0 {
            issues.push(ValidationIssue::InvalidValue {
                field: "discovery.max_depth",
                message: "must be at least 1".to_string(),
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn naming(&self) -> Naming {
        Naming {
            backup_suffix: self.naming.backup_suffix.clone(),
            staging_suffix: self.naming.staging_suffix.clone(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct NamingConfig {
    #[serde(default = "default_backup_suffix")]
    pub backup_suffix: String,
    #[serde(default = "default_staging_suffix")]
    pub staging_suffix: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            backup_suffix: default_backup_suffix(),
            staging_suffix: default_staging_suffix(),
        }
    }
}

/// Where the CLI looks for the project file when handed a directory.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DiscoveryConfig {
    #[serde(default = "default_file_name")]
    pub file_name: String,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            file_name: default_file_name(),
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

fn default_backup_suffix() -> String {
    DEFAULT_BACKUP_SUFFIX.to_string()
}

fn default_staging_suffix() -> String {
    DEFAULT_STAGING_SUFFIX.to_string()
}

fn default_file_name() -> String {
    DEFAULT_FILE_NAME.to_string()
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    MissingField {
        field: &'static str,
    },
    InvalidValue {
        field: &'static str,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::MissingField { field } => {
                write!(f, "config field '{field}' must not be empty")
            }
            ValidationIssue::InvalidValue { field, message } => {
                write!(f, "config field '{field}' is invalid: {message}")
            }
        }
    }
}
