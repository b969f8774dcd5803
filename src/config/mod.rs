//! Configuration management for stockroom
//!
//! Handles loading, saving, and validating configuration from TOML files.

mod defaults;

pub use defaults::*;

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Upload acceptance rules
    #[serde(default)]
    pub upload: UploadConfig,

    /// PDF report configuration
    #[serde(default)]
    pub report: ReportConfig,

    /// Paths configuration (internal, not user-editable)
    #[serde(skip)]
    pub paths: PathsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to listen on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Include internal error details in 500 responses
    #[serde(default = "default_dev_mode")]
    pub dev_mode: bool,
}

/// Upload acceptance rules
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Maximum accepted file size in bytes
    #[serde(default = "default_upload_max_bytes")]
    pub max_bytes: usize,

    /// Accepted MIME types
    #[serde(default = "default_upload_mime_types")]
    pub allowed_mime_types: Vec<String>,

    /// Accepted file extensions, including the leading dot
    #[serde(default = "default_upload_extensions")]
    pub allowed_extensions: Vec<String>,
}

/// PDF report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Timeout for fetching a store logo, in seconds
    #[serde(default = "default_logo_timeout")]
    pub logo_timeout_secs: u64,

    /// User agent for logo requests
    #[serde(default = "default_report_user_agent")]
    pub user_agent: String,

    /// Rows per report table
    #[serde(default = "default_report_top_n")]
    pub top_n: usize,
}

/// Internal paths configuration
#[derive(Debug, Clone, Default)]
pub struct PathsConfig {
    /// Base directory for stockroom data
    pub base_dir: PathBuf,

    /// Path to config file
    pub config_file: PathBuf,

    /// Path to SQLite database
    pub db_file: PathBuf,

    /// Directory holding upload scratch files
    pub scratch_dir: PathBuf,
}

impl PathsConfig {
    fn under(base: &Path) -> Self {
        Self {
            config_file: base.join("config.toml"),
            db_file: base.join("inventory.db"),
            scratch_dir: base.join("scratch"),
            base_dir: base.to_path_buf(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            upload: UploadConfig::default(),
            report: ReportConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            dev_mode: default_dev_mode(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_upload_max_bytes(),
            allowed_mime_types: default_upload_mime_types(),
            allowed_extensions: default_upload_extensions(),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            logo_timeout_secs: default_logo_timeout(),
            user_agent: default_report_user_agent(),
            top_n: default_report_top_n(),
        }
    }
}

impl Config {
    /// Get the default base directory for stockroom (~/.stockroom)
    pub fn default_base_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".stockroom")
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        Self::default_base_dir().join("config.toml")
    }

    /// Build a default configuration rooted at `base_dir`
    pub fn with_base_dir(base_dir: &Path) -> Self {
        Self {
            paths: PathsConfig::under(base_dir),
            ..Self::default()
        }
    }

    /// Load configuration from a specific file path
    pub fn load(config_path: &Path) -> Result<Self> {
        debug!("Loading config from {:?}", config_path);

        if !config_path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        let content = std::fs::read_to_string(config_path)?;
        let mut config: Config = toml::from_str(&content)?;

        // Data files live next to the config file
        let base = config_path.parent().unwrap_or(Path::new("."));
        config.paths = PathsConfig {
            config_file: config_path.to_path_buf(),
            ..PathsConfig::under(base)
        };

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a base directory, falling back to defaults
    pub fn load_from(base_dir: Option<PathBuf>) -> Result<Self> {
        let base = base_dir.unwrap_or_else(Self::default_base_dir);
        let config_file = base.join("config.toml");

        if config_file.exists() {
            Self::load(&config_file)
        } else {
            debug!("No config file found, using defaults");
            Ok(Self::with_base_dir(&base))
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.paths.config_file.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&self.paths.config_file, content)?;
        info!("Saved config to {:?}", self.paths.config_file);
        Ok(())
    }

    /// Check if stockroom is initialized (config and DB exist)
    pub fn is_initialized(&self) -> bool {
        self.paths.config_file.exists() && self.paths.db_file.exists()
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.upload.max_bytes == 0 {
            return Err(Error::Config("upload.max_bytes must be positive".to_string()));
        }

        if self.upload.allowed_mime_types.is_empty() {
            return Err(Error::Config(
                "upload.allowed_mime_types must not be empty".to_string(),
            ));
        }

        if self.upload.allowed_extensions.is_empty() {
            return Err(Error::Config(
                "upload.allowed_extensions must not be empty".to_string(),
            ));
        }

        if self
            .upload
            .allowed_extensions
            .iter()
            .any(|ext| !ext.starts_with('.'))
        {
            return Err(Error::Config(
                "upload.allowed_extensions entries must start with '.'".to_string(),
            ));
        }

        if self.report.top_n == 0 {
            return Err(Error::Config("report.top_n must be positive".to_string()));
        }

        if self.report.logo_timeout_secs == 0 {
            return Err(Error::Config(
                "report.logo_timeout_secs must be positive".to_string(),
            ));
        }

        Ok(())
    }
}
