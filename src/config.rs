//! Persistent settings, stored as TOML in `$XDG_CONFIG_HOME/cspscope/config.toml`.

use std::path::{Path, PathBuf};

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::{DEFAULT_PACKAGE_URL, DEFAULT_SCHEMA_EXTENSION};

/// Errors from reading or writing the config file.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("failed to read config: {path}")]
    #[diagnostic(
        code(cspscope::config::read),
        help("Ensure the config file exists and is readable, or run `cspscope config init`.")
    )]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {path}: {message}")]
    #[diagnostic(
        code(cspscope::config::parse),
        help("Check the TOML syntax in the config file.")
    )]
    Parse { path: String, message: String },

    #[error("failed to write config: {path}")]
    #[diagnostic(
        code(cspscope::config::write),
        help("Ensure you have write permissions to the config directory.")
    )]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// User-tunable settings. Missing keys take their defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// DDF package download location.
    pub package_url: String,
    /// Archive entries ending in this suffix are parsed (case-insensitive).
    pub schema_extension: String,
    /// Report progress every N entries.
    pub progress_interval: usize,
    pub http_timeout_secs: u64,
    /// Where `--export` writes when given no explicit file.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export_dir: Option<PathBuf>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            package_url: DEFAULT_PACKAGE_URL.to_string(),
            schema_extension: DEFAULT_SCHEMA_EXTENSION.to_string(),
            progress_interval: 20,
            http_timeout_secs: 120,
            export_dir: None,
        }
    }
}

impl ProbeConfig {
    /// Load from a TOML file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    /// Load from `path` if it exists, otherwise defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if path.is_file() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Save to a TOML file, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::Write {
                path: parent.display().to_string(),
                source: e,
            })?;
        }
        std::fs::write(path, content).map_err(|e| ConfigError::Write {
            path: path.display().to_string(),
            source: e,
        })
    }
}
