use crate::config::schema::{FixConfig, ValidationError};
use std::env;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV_VAR: &str = "PBXPROJ_FIX_CONFIG";

/// Where a config document came from. Errors name it so the user knows
/// which file (or variable) to fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigOrigin {
    Inline,
    File(PathBuf),
    Env(PathBuf),
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigOrigin::Inline => f.write_str("inline config"),
            ConfigOrigin::File(path) => write!(f, "{}", path.display()),
            ConfigOrigin::Env(path) => write!(f, "{} (from ${CONFIG_ENV_VAR})", path.display()),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cannot read config {origin}: {source}")]
    Read {
        origin: ConfigOrigin,
        #[source]
        source: io::Error,
    },

    #[error("{origin} is not valid TOML: {source}")]
    Parse {
        origin: ConfigOrigin,
        #[source]
        source: toml_edit::de::Error,
    },

    #[error("{origin} was rejected:\n{source}")]
    Invalid {
        origin: ConfigOrigin,
        #[source]
        source: ValidationError,
    },
}

impl ConfigError {
    pub fn origin(&self) -> &ConfigOrigin {
        match self {
            ConfigError::Read { origin, .. }
            | ConfigError::Parse { origin, .. }
            | ConfigError::Invalid { origin, .. } => origin,
        }
    }
}

/// Parse and validate a config document held in memory.
pub fn load_from_str(input: &str) -> Result<FixConfig, ConfigError> {
    parse(input, ConfigOrigin::Inline)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<FixConfig, ConfigError> {
    let path = path.as_ref();
    load(path, ConfigOrigin::File(path.to_path_buf()))
}

/// Load the effective configuration.
///
/// Priority order:
/// 1. Explicit path (the `--config` flag)
/// 2. `PBXPROJ_FIX_CONFIG` environment variable
/// 3. Built-in defaults
pub fn resolve(explicit: Option<&Path>) -> Result<FixConfig, ConfigError> {
    if let Some(path) = explicit {
        return load_from_path(path);
    }

    match env::var_os(CONFIG_ENV_VAR) {
        Some(path) if !path.is_empty() => {
            let path = PathBuf::from(path);
            load(&path, ConfigOrigin::Env(path.clone()))
        }
        _ => {
            debug!("no config file; using built-in settings");
            Ok(FixConfig::default())
        }
    }
}

fn load(path: &Path, origin: ConfigOrigin) -> Result<FixConfig, ConfigError> {
    match fs::read_to_string(path) {
        Ok(contents) => {
            debug!(config = %origin, "loading config");
            parse(&contents, origin)
        }
        Err(source) => Err(ConfigError::Read { origin, source }),
    }
}

fn parse(input: &str, origin: ConfigOrigin) -> Result<FixConfig, ConfigError> {
    let config: FixConfig = match toml_edit::de::from_str(input) {
        Ok(config) => config,
        Err(source) => return Err(ConfigError::Parse { origin, source }),
    };
    match config.validate() {
        Ok(()) => Ok(config),
        Err(source) => Err(ConfigError::Invalid { origin, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_defaults() {
        let config = load_from_str("").unwrap();
        assert_eq!(config, FixConfig::default());
    }

    #[test]
    fn test_partial_tables_keep_defaults() {
        let config = load_from_str(
            r#"
[naming]
backup_suffix = ".orig"
"#,
        )
        .unwrap();

        assert_eq!(config.naming.backup_suffix, ".orig");
        assert_eq!(config.naming.staging_suffix, "_FIXED");
        assert_eq!(config.discovery.max_depth, 4);
    }

    #[test]
    fn test_invalid_toml() {
        let err = load_from_str("[naming\nbackup_suffix = 1").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert_eq!(err.origin(), &ConfigOrigin::Inline);
    }

    #[test]
    fn test_validation_error_names_the_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("pbxproj-fix.toml");
        fs::write(&path, "[discovery]\nmax_depth = 0\n").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { .. }));
        assert_eq!(err.origin(), &ConfigOrigin::File(path.clone()));
        assert!(err.to_string().contains("pbxproj-fix.toml"));
        assert!(err.to_string().contains("discovery.max_depth"));
    }

    #[test]
    fn test_env_origin_mentions_variable() {
        let origin = ConfigOrigin::Env(PathBuf::from("/etc/pbxproj-fix.toml"));
        assert_eq!(
            origin.to_string(),
            "/etc/pbxproj-fix.toml (from $PBXPROJ_FIX_CONFIG)"
        );
    }

    #[test]
    fn test_resolve_explicit_path_wins() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("custom.toml");
        fs::write(&path, "[discovery]\nfile_name = \"other.pbxproj\"\n").unwrap();

        let config = resolve(Some(&path)).unwrap();
        assert_eq!(config.discovery.file_name, "other.pbxproj");
    }

    #[test]
    fn test_missing_file() {
        let err = load_from_path("/nonexistent/pbxproj-fix.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
