//! Configuration loading and data folder resolution
//!
//! Bootstrap settings come from a TOML file. Everything has a compiled
//! default, so a missing config file is a warning, not a startup failure.
//!
//! Data folder resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `ALAAB_DATA_FOLDER` environment variable
//! 3. `data_folder` key in the TOML config file
//! 4. OS-dependent compiled default (fallback)

use crate::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the data folder
pub const DATA_FOLDER_ENV: &str = "ALAAB_DATA_FOLDER";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Folder holding the SQLite database (optional)
    pub data_folder: Option<PathBuf>,

    /// Database file name inside the data folder
    pub database_file: String,

    /// Interface the HTTP server binds to
    pub bind_address: String,

    /// HTTP server port
    pub port: u16,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Similarity matching weights and threshold
    pub matching: MatchingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            data_folder: None,
            database_file: "alaab.db".to_string(),
            bind_address: "127.0.0.1".to_string(),
            port: 5730,
            logging: LoggingConfig::default(),
            matching: MatchingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

/// Similarity scoring weights and match threshold
///
/// overall = structural_weight × structural
///         + semantic_weight × semantic
///         + heritage_weight × heritage
///
/// The semantic score itself mixes name and description similarity with
/// `name_weight` / `description_weight`; the heritage score adds fixed
/// credits for agreement on heritage field, country and region.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MatchingConfig {
    pub structural_weight: f64,
    pub semantic_weight: f64,
    pub heritage_weight: f64,

    /// Minimum overall score for a pair to enter the review queue
    pub threshold: f64,

    pub name_weight: f64,
    pub description_weight: f64,

    pub heritage_field_credit: f64,
    pub same_country_credit: f64,
    pub same_region_credit: f64,

    /// Algorithm identifier recorded on every similarity row
    pub algorithm: String,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            structural_weight: 0.35,
            semantic_weight: 0.40,
            heritage_weight: 0.25,
            threshold: 0.75,
            name_weight: 0.6,
            description_weight: 0.4,
            heritage_field_credit: 0.5,
            same_country_credit: 0.5,
            same_region_credit: 0.25,
            algorithm: "lexical-overlap-v1".to_string(),
        }
    }
}

impl MatchingConfig {
    /// Check weights and threshold are usable
    pub fn validate(&self) -> Result<()> {
        let unit_values = [
            ("structural_weight", self.structural_weight),
            ("semantic_weight", self.semantic_weight),
            ("heritage_weight", self.heritage_weight),
            ("threshold", self.threshold),
            ("name_weight", self.name_weight),
            ("description_weight", self.description_weight),
            ("heritage_field_credit", self.heritage_field_credit),
            ("same_country_credit", self.same_country_credit),
            ("same_region_credit", self.same_region_credit),
        ];
        for (name, value) in unit_values {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::Config(format!(
                    "matching.{} must be within [0, 1], got {}",
                    name, value
                )));
            }
        }

        let total = self.structural_weight + self.semantic_weight + self.heritage_weight;
        if (total - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "matching weights must sum to 1.0, got {:.4}",
                total
            )));
        }

        let semantic_total = self.name_weight + self.description_weight;
        if (semantic_total - 1.0).abs() > 1e-6 {
            return Err(Error::Config(format!(
                "matching.name_weight + matching.description_weight must sum to 1.0, got {:.4}",
                semantic_total
            )));
        }

        if self.algorithm.trim().is_empty() {
            return Err(Error::Config("matching.algorithm must not be empty".to_string()));
        }

        Ok(())
    }
}

impl TomlConfig {
    /// Parse and validate a TOML config string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.matching.validate()?;
        Ok(config)
    }

    /// Load configuration
    ///
    /// An explicit path must exist. Without one, the default locations are
    /// searched and compiled defaults are used when none is present.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let path = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(Error::Config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                path.to_path_buf()
            }
            None => match default_config_file() {
                Some(path) => path,
                None => {
                    warn!("No config file found, using built-in defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }
}

/// Locate the first existing default config file
///
/// `~/.config/alaab/config.toml` first, then `/etc/alaab/config.toml`.
fn default_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("alaab").join("config.toml"));
    if let Some(path) = user_config {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/alaab/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Resolve the data folder following the priority order above
pub fn resolve_data_folder(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_FOLDER_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.data_folder {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_data_folder()
}

/// Get OS-dependent default data folder path
fn default_data_folder() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("alaab"))
        .unwrap_or_else(|| PathBuf::from("./alaab_data"))
}
