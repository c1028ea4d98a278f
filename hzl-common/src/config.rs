//! Bootstrap configuration loading and directory resolution
//!
//! Each setting resolves in priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Environment variable overriding the definition root
pub const BASE_DIR_ENV: &str = "HZL_BASE_DIR";
/// Environment variable overriding the output root
pub const OUTPUT_DIR_ENV: &str = "HZL_OUTPUT_DIR";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// Root of `<namespace>/<name>.yaml` definition files
    #[serde(default)]
    pub base_dir: Option<PathBuf>,

    /// Root that compiled partial state sets are written under
    #[serde(default)]
    pub output_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl CompilerConfig {
    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Cannot read config file {}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config file {}: {}", path.display(), e)))
    }

    /// Load the explicitly named file, or the platform default if one exists
    ///
    /// An explicit path must exist and parse. A missing default file only
    /// produces a warning and built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }

        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            Some(path) => {
                warn!("No config file at {}, using defaults", path.display());
                Ok(Self::default())
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Definition root: CLI, then `HZL_BASE_DIR`, then TOML, then `.`
    pub fn resolve_base_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_dir(cli_arg, BASE_DIR_ENV, self.base_dir.as_deref(), PathBuf::from("."))
    }

    /// Output root: CLI, then `HZL_OUTPUT_DIR`, then TOML, then `./compiled`
    pub fn resolve_output_dir(&self, cli_arg: Option<&Path>) -> PathBuf {
        resolve_dir(
            cli_arg,
            OUTPUT_DIR_ENV,
            self.output_dir.as_deref(),
            PathBuf::from("compiled"),
        )
    }
}

fn resolve_dir(
    cli_arg: Option<&Path>,
    env_var_name: &str,
    from_file: Option<&Path>,
    default: PathBuf,
) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(env_var_name) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = from_file {
        return path.to_path_buf();
    }

    // Priority 4: compiled default
    default
}

/// `<user config dir>/hzl/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("hzl").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let config: CompilerConfig = toml::from_str(
            r#"
            base_dir = "definitions"
            output_dir = "out"

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_dir, Some(PathBuf::from("definitions")));
        assert_eq!(config.output_dir, Some(PathBuf::from("out")));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: CompilerConfig = toml::from_str("").unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_cli_argument_wins() {
        let config = CompilerConfig {
            base_dir: Some(PathBuf::from("from-toml")),
            ..Default::default()
        };
        let resolved = config.resolve_base_dir(Some(Path::new("from-cli")));
        assert_eq!(resolved, PathBuf::from("from-cli"));
    }
}
