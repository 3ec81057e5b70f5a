use anyhow::{anyhow, Context, Result};
use log::{warn, LevelFilter};
use serde::{Deserialize, Serialize};
use std::default::Default;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::export::{TEMPLATE_PLACEHOLDERS, TEMPLATE_PLACEHOLDER_REGEX};

/// Application configuration module
/// This module handles the CLI configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,

    /// Output file settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// Export configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct ExportConfig {
    // @field: Tiers left out of every export
    #[serde(default)]
    pub filter: Vec<String>,

    // @field: Text export line template, `{tier} {start}-{end}: {text}` when unset
    #[serde(default)]
    pub text_template: Option<String>,
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct OutputConfig {
    // @field: Replace existing output files
    #[serde(default)]
    pub overwrite: bool,

    // @field: Directory for exported files, next to the input when unset
    #[serde(default)]
    pub output_dir: Option<PathBuf>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    // @returns: Matching `log` filter
    pub fn to_level_filter(self) -> LevelFilter {
        match self {
            Self::Error => LevelFilter::Error,
            Self::Warn => LevelFilter::Warn,
            Self::Info => LevelFilter::Info,
            Self::Debug => LevelFilter::Debug,
            Self::Trace => LevelFilter::Trace,
        }
    }
}

// @const: Config file name
pub const CONFIG_FILE_NAME: &str = "conf.json";

impl Config {
    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if let Some(template) = &self.export.text_template {
            validate_template(template)?;
        }

        if self.export.filter.iter().any(|tier| tier.trim().is_empty()) {
            return Err(anyhow!("Export filter contains an empty tier name"));
        }

        if let Some(dir) = &self.output.output_dir {
            if dir.exists() && !dir.is_dir() {
                return Err(anyhow!("Output path is not a directory: {}", dir.display()));
            }
        }

        Ok(())
    }

    /// Default location: `conf.json` in the working directory if present,
    /// otherwise the user config directory
    pub fn default_path() -> PathBuf {
        let local = PathBuf::from(CONFIG_FILE_NAME);
        if local.exists() {
            return local;
        }

        dirs::config_dir()
            .map(|dir| dir.join("elan-data").join(CONFIG_FILE_NAME))
            .unwrap_or(local)
    }

    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).context(format!("Failed to open config file: {}", path.display()))?;

        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).context(format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load a configuration file, writing a default one first if it is missing
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }

        warn!("Config file not found at '{}', creating default config.", path.display());
        let config = Config::default();
        config.save(path)?;
        Ok(config)
    }

    /// Save as pretty-printed JSON
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .context(format!("Failed to create config directory: {}", parent.display()))?;
        }

        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json).context(format!("Failed to write config to file: {}", path.display()))?;

        Ok(())
    }
}

/// Check that a text template only uses known placeholders
pub fn validate_template(template: &str) -> Result<()> {
    if template.trim().is_empty() {
        return Err(anyhow!("Text template is empty"));
    }

    let unknown: Vec<&str> = TEMPLATE_PLACEHOLDER_REGEX
        .captures_iter(template)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|name| !TEMPLATE_PLACEHOLDERS.contains(name))
        .collect();

    if !unknown.is_empty() {
        return Err(anyhow!(
            "Unknown text template placeholder(s): {}; expected one of {}",
            unknown.join(", "),
            TEMPLATE_PLACEHOLDERS.join(", ")
        ));
    }

    Ok(())
}
