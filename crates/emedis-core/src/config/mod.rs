//! Engine configuration.
//! Reads emedis.toml from the current directory or the path in the EMEDIS_CONFIG env var.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::extractor::{FindingMatcher, MatcherKind, DEFAULT_FUZZY_THRESHOLD};
use crate::knowledge::TablePaths;
use crate::scorer::MAX_TOP;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "EMEDIS_CONFIG";

/// Config file read when [`CONFIG_ENV`] is unset.
pub const DEFAULT_CONFIG_FILE: &str = "emedis.toml";

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EngineConfig {
    /// Candidates returned per case
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub matcher: MatcherKind,
    /// Minimum Jaro-Winkler similarity for the fuzzy matcher
    #[serde(default = "default_fuzzy_threshold")]
    pub fuzzy_threshold: f64,
    /// Root for the CSV table paths
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// SQLite reference store; takes precedence over the CSV tables when set
    #[serde(default)]
    pub database: Option<PathBuf>,
    #[serde(default)]
    pub tables: TablePaths,
}

fn default_top_k()            -> usize   { MAX_TOP }
fn default_fuzzy_threshold()  -> f64     { DEFAULT_FUZZY_THRESHOLD }
fn default_data_dir()         -> PathBuf { PathBuf::from(".") }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            matcher: MatcherKind::default(),
            fuzzy_threshold: default_fuzzy_threshold(),
            data_dir: default_data_dir(),
            database: None,
            tables: TablePaths::default(),
        }
    }
}


impl EngineConfig {
    /// Load configuration from emedis.toml.
    /// Checks EMEDIS_CONFIG env var first, then current directory.
    /// A file named by EMEDIS_CONFIG must exist; a missing emedis.toml yields the defaults.
    pub fn load() -> ConfigResult<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) if !path.is_empty() => Self::from_path(Path::new(&path)),
            _ => Self::load_or_default(Path::new(DEFAULT_CONFIG_FILE)),
        }
    }

    /// Load `path` if it exists, otherwise return the defaults.
    pub fn load_or_default(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file; using defaults");
            return Ok(Self::default());
        }
        Self::from_path(path)
    }

    /// Load a config file that must exist.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Parse and validate a TOML document.
    pub fn from_toml(content: &str) -> ConfigResult<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.top_k == 0 {
            return Err(ConfigError::Invalid("top_k must be at least 1".into()));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "fuzzy_threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        Ok(())
    }

    /// Matcher selected by this configuration.
    pub fn matcher(&self) -> Box<dyn FindingMatcher> {
        self.matcher.build(self.fuzzy_threshold)
    }
}
