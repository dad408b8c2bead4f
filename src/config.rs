/* src/config.rs */
//! Application configuration, loaded from YAML or JSON.
//!
//! Every section has defaults, so a file only needs the keys it changes.
/*▫~•◦────────────────────────────────────────────────────────────────────────────────────‣
 * © 2025 ArcMoon Studios ◦ SPDX-License-Identifier MIT OR Apache-2.0 ◦ Author: Lord Xyn ✶
 *///◦────────────────────────────────────────────────────────────────────────────────────‣

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::Level;

use crate::error::{Result, SquiggleError};

// =====================================================================================
// APPLICATION CONFIGURATION
// =====================================================================================

/// Application configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Network topology and weight source
    pub model: ModelConfig,

    /// Logging configuration
    pub logging: LoggingConfig,

    /// Report settings
    pub output: OutputConfig,
}

/// Network topology and weight source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Weight table file; seeded placeholder weights are used when absent
    pub weights: Option<PathBuf>,
    /// Seed for placeholder weights
    pub seed: u64,
    /// Context window width in bases (odd)
    pub window: usize,
    /// Hidden units per layer
    pub hidden: usize,
    /// Matrix-multiply workers; 0 uses every core, 1 is sequential
    pub gemm_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            weights: None,
            seed: 0,
            window: 5,
            hidden: 32,
            gemm_threads: 1,
        }
    }
}

#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file_logging: bool,
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: false,
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl LoggingConfig {
    /// The configured `level`; an unknown name is a configuration error.
    pub fn tracing_level(&self) -> Result<Level> {
        self.level.parse().map_err(|_| SquiggleError::Config {
            message: format!("unknown log level \"{}\"", self.level),
        })
    }
}

/// Per-position report layout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    /// `#name` header then one tab-separated line per position
    #[default]
    Tsv,
    /// One JSON object per record
    Json,
}

/// Report settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Apply the exponential rescale to the spread and dwell rows
    pub rescale: bool,
    /// Text prepended to every record name
    pub prefix: String,
    /// Maximum number of records to start; 0 is unlimited
    pub limit: usize,
    /// Report layout
    pub format: ReportFormat,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            rescale: true,
            prefix: String::new(),
            limit: 0,
            format: ReportFormat::Tsv,
        }
    }
}

/// `true` for `.yaml` and `.yml` paths.
pub(crate) fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    )
}

/// Load application configuration; `None` yields the defaults.
pub fn load_config(config_path: Option<&Path>) -> Result<AppConfig> {
    let Some(path) = config_path else {
        return Ok(AppConfig::default());
    };

    let content = fs::read_to_string(path)?;
    let parsed: std::result::Result<AppConfig, String> = if is_yaml(path) {
        serde_yaml::from_str(&content).map_err(|e| e.to_string())
    } else {
        serde_json::from_str(&content).map_err(|e| e.to_string())
    };
    let config = parsed.map_err(|message| SquiggleError::Config {
        message: format!("{}: {message}", path.display()),
    })?;
    config.logging.tracing_level()?;
    Ok(config)
}
