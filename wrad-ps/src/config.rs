//! Configuration loading
//!
//! A single TOML file carries all sections; credentials and addresses can be
//! overridden without touching the file.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (--port, --backend-addr)
//! 2. Environment variables (WRAD_SOURCE_URL, WRAD_SOURCE_USERNAME, ...)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! The file cannot change while running; restart to pick up edits.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::scheduler::SchedulerSettings;

/// Service configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// HTTP control surface binding
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Content source account and endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct SourceConfig {
    /// API base URL, e.g. `https://radio.example.com/api`.
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// Request timeout in seconds.
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            username: String::new(),
            password: String::new(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Playback backend connection
#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Daemon address, host:port.
    #[serde(default = "default_backend_addr")]
    pub addr: String,

    /// Nudge the play position back to the stream start before resuming.
    /// Some daemons otherwise resume a stale stream offset.
    #[serde(default = "default_resume_rewind")]
    pub resume_rewind: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            addr: default_backend_addr(),
            resume_rewind: default_resume_rewind(),
        }
    }
}

/// Scheduling knobs
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Tracks requested per batch from the source.
    #[serde(default = "default_look_ahead")]
    pub look_ahead: usize,

    /// Safety pad added to every advance countdown, in milliseconds.
    #[serde(default = "default_advance_margin_ms")]
    pub advance_margin_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            look_ahead: default_look_ahead(),
            advance_margin_ms: default_advance_margin_ms(),
        }
    }
}

impl SchedulerConfig {
    pub fn settings(&self) -> SchedulerSettings {
        SchedulerSettings {
            look_ahead: self.look_ahead,
            advance_margin: Duration::from_millis(self.advance_margin_ms),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5745
}

fn default_backend_addr() -> String {
    "127.0.0.1:6600".to_string()
}

fn default_resume_rewind() -> bool {
    true
}

fn default_look_ahead() -> usize {
    4
}

fn default_advance_margin_ms() -> u64 {
    1000
}

fn default_source_timeout_secs() -> u64 {
    30
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub backend_addr: Option<String>,
}

impl Config {
    /// Load configuration with the documented priority order.
    ///
    /// `path` of `None` falls back to the per-user location; a missing file
    /// is not an error, built-in defaults apply.
    pub fn load(path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let mut config = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(file) if file.exists() => {
                let content = std::fs::read_to_string(&file).map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", file, e))
                })?;
                let config: Config = toml::from_str(&content).map_err(|e| {
                    Error::Config(format!("Failed to parse {:?}: {}", file, e))
                })?;
                info!("Loaded configuration from {:?}", file);
                config
            }
            Some(file) => {
                info!("Config file {:?} not found, using defaults", file);
                Config::default()
            }
            None => {
                warn!("Could not determine config directory, using defaults");
                Config::default()
            }
        };

        config.apply_env();

        if let Some(port) = overrides.port {
            config.server.port = port;
        }
        if let Some(addr) = overrides.backend_addr {
            config.backend.addr = addr;
        }

        config.validate()?;
        Ok(config)
    }

    /// Environment overrides, applied above the file and below the CLI.
    fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("WRAD_SOURCE_URL") {
            self.source.base_url = url;
        }
        if let Ok(username) = std::env::var("WRAD_SOURCE_USERNAME") {
            self.source.username = username;
        }
        if let Ok(password) = std::env::var("WRAD_SOURCE_PASSWORD") {
            self.source.password = password;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.source.base_url.trim().is_empty() {
            return Err(Error::Config(
                "Content source not configured. Set one of:\n\
                 1. TOML config: [source] base_url = \"https://...\"\n\
                 2. Environment: WRAD_SOURCE_URL=https://..."
                    .to_string(),
            ));
        }
        if self.source.username.trim().is_empty() || self.source.password.trim().is_empty() {
            return Err(Error::Config(
                "Source credentials not configured. Set [source] username/password \
                 or WRAD_SOURCE_USERNAME / WRAD_SOURCE_PASSWORD"
                    .to_string(),
            ));
        }
        if self.scheduler.look_ahead == 0 {
            return Err(Error::Config(
                "scheduler.look_ahead must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Per-user config file location (`~/.config/wrad/ps.toml` on Linux).
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("wrad").join("ps.toml"))
}
