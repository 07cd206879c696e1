//! Service Configuration - TOML-backed settings for the inference service
//!
//! Every struct implements `Default`, so a missing file (or a file that sets
//! only a few keys) behaves exactly like the built-in deployment layout.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;

/// Environment variable pointing at an explicit config file.
pub const CONFIG_ENV_VAR: &str = "NEURALTRACK_CONFIG";

/// Config file looked up in the working directory when the env var is unset.
pub const LOCAL_CONFIG_FILE: &str = "neuraltrack.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a NeuralTrack deployment.
///
/// Load with `ServiceConfig::load()` which searches:
/// 1. `$NEURALTRACK_CONFIG` env var
/// 2. `./neuraltrack.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Model bundle locations
    #[serde(default)]
    pub models: ModelsConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Load configuration using the standard search order, then apply
    /// `NEURALTRACK_*` environment overrides and validate the result.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_file_or_default().with_env_overrides()
    }

    fn load_file_or_default() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded service config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        // 2. Check ./neuraltrack.toml
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded service config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        // 3. Defaults
        info!("No {} found - using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Parse(_, inner) => ConfigError::Parse(path.to_path_buf(), inner),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings (with a suggestion when one is
    /// close enough) and never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self =
            toml::from_str(contents).map_err(|e| ConfigError::Parse(PathBuf::new(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `NEURALTRACK_SERVER_ADDR`, `NEURALTRACK_CURRENT_MODEL` and
    /// `NEURALTRACK_PROJECTION_MODEL` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, then re-validate. Override values go
    /// through the same checks as file values.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(addr) = lookup("NEURALTRACK_SERVER_ADDR") {
            self.server.addr = addr;
        }
        if let Some(path) = lookup("NEURALTRACK_CURRENT_MODEL") {
            self.models.current_path = PathBuf::from(path);
        }
        if let Some(path) = lookup("NEURALTRACK_PROJECTION_MODEL") {
            self.models.projection_path = PathBuf::from(path);
        }
        self.validate()?;
        Ok(self)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Validate all settings.
    ///
    /// Rules:
    /// - Server address must parse as `host:port`
    /// - Body limit must be > 0
    /// - Both model paths must be non-empty
    /// - Log format must be `pretty` or `json`
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.server.addr.parse::<SocketAddr>().is_err() {
            errors.push(format!(
                "server.addr '{}' is not a valid socket address (expected host:port)",
                self.server.addr
            ));
        }
        if self.server.max_body_bytes == 0 {
            errors.push("server.max_body_bytes must be > 0".to_string());
        }
        for origin in &self.server.cors_origins {
            if !origin.starts_with("http://") && !origin.starts_with("https://") {
                errors.push(format!(
                    "server.cors_origins entry '{origin}' must start with http:// or https://"
                ));
            }
        }

        if self.models.current_path.as_os_str().is_empty() {
            errors.push("models.current_path must not be empty".to_string());
        }
        if self.models.projection_path.as_os_str().is_empty() {
            errors.push("models.projection_path must not be empty".to_string());
        }

        if !matches!(self.logging.format.as_str(), "pretty" | "json") {
            errors.push(format!(
                "logging.format '{}' must be \"pretty\" or \"json\"",
                self.logging.format
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),
    #[error("Config parse error ({}): {}", .0.display(), .1)]
    Parse(PathBuf, #[source] toml::de::Error),
    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation failed:\n  - {}", .0.join("\n  - "))]
    Validation(Vec<String>),
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by `NEURALTRACK_SERVER_ADDR` or `--addr`.
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Maximum accepted request body size (bytes).
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,

    /// Origins allowed for cross-origin requests. Empty = same-origin only.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_server_addr() -> String {
    defaults::DEFAULT_SERVER_ADDR.to_string()
}
fn default_max_body_bytes() -> usize {
    defaults::DEFAULT_MAX_BODY_BYTES
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            max_body_bytes: default_max_body_bytes(),
            cors_origins: Vec::new(),
        }
    }
}

// ============================================================================
// Models Config
// ============================================================================

/// Locations of the two persisted model bundles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelsConfig {
    /// Current-state CDR classifier bundle.
    #[serde(default = "default_current_path")]
    pub current_path: PathBuf,

    /// One-year projection CDR classifier bundle.
    #[serde(default = "default_projection_path")]
    pub projection_path: PathBuf,
}

fn default_current_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_CURRENT_MODEL_PATH)
}
fn default_projection_path() -> PathBuf {
    PathBuf::from(defaults::DEFAULT_PROJECTION_MODEL_PATH)
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            current_path: default_current_path(),
            projection_path: default_projection_path(),
        }
    }
}

// ============================================================================
// Logging Config
// ============================================================================

/// Log output format. Verbosity is controlled by `RUST_LOG`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `pretty` (human-readable) or `json` (one object per line).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
        }
    }
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format == "json"
    }
}

// ============================================================================
// Tests
// ============================================================================
