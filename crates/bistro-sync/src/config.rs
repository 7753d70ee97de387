//! # Sync Configuration
//!
//! Configuration for the sync engine.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     BISTRO_HOST_PORT=7641                                              │
//! │     BISTRO_HOST_ADDR=192.168.1.20                                      │
//! │     BISTRO_DEVICE_NAME="Kitchen Tablet"                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/family-bistro/sync.toml (Linux)                          │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     auto-generated device id, port 7641, localhost kitchen             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # sync.toml
//! [device]
//! id = "550e8400-e29b-41d4-a716-446655440000"
//! name = "Kitchen Tablet"
//!
//! [host]
//! port = 7641        # the well-known kitchen identity
//! bind_addr = "0.0.0.0"
//!
//! [client]
//! host_addr = "192.168.1.20"
//! connect_timeout_secs = 3
//! retry_interval_secs = 3
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Defaults
// =============================================================================

/// The well-known kitchen port. Every device on the LAN agrees on this; the
/// device that manages to bind it *is* the kitchen.
pub const DEFAULT_HOST_PORT: u16 = 7641;

/// WebSocket path of the sync endpoint.
pub const SYNC_PATH: &str = "/sync";

fn default_device_name() -> String {
    "Bistro Device".to_string()
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_host_addr() -> String {
    "127.0.0.1".to_string()
}

fn default_host_port() -> u16 {
    DEFAULT_HOST_PORT
}

fn default_connect_timeout() -> u64 {
    3
}

fn default_retry_interval() -> u64 {
    3
}

// =============================================================================
// Device Configuration
// =============================================================================

/// Configuration for this device.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Unique device identifier (UUID v4).
    /// Auto-generated on first run if not provided.
    pub id: String,

    /// Human-readable device name (e.g., "Kitchen Tablet", "Maya's Phone").
    #[serde(default = "default_device_name")]
    pub name: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: Uuid::new_v4().to_string(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Host Settings
// =============================================================================

/// Settings used when this device claims the kitchen identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostSettings {
    /// Port for the WebSocket server — the well-known identity.
    #[serde(default = "default_host_port")]
    pub port: u16,

    /// Bind address (default: 0.0.0.0 for all interfaces).
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

impl Default for HostSettings {
    fn default() -> Self {
        HostSettings {
            port: default_host_port(),
            bind_addr: default_bind_addr(),
        }
    }
}

// =============================================================================
// Client Settings
// =============================================================================

/// Settings used when this device connects to the kitchen as a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Address where the kitchen is expected to live.
    #[serde(default = "default_host_addr")]
    pub host_addr: String,

    /// How long a connect attempt may take before the device falls back to
    /// local mode.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Fixed delay between reconnect attempts.
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            host_addr: default_host_addr(),
            connect_timeout_secs: default_connect_timeout(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

// =============================================================================
// Sync Configuration
// =============================================================================

/// Complete configuration for a sync session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncConfig {
    /// This device.
    #[serde(default)]
    pub device: DeviceConfig,

    /// Kitchen host settings.
    #[serde(default)]
    pub host: HostSettings,

    /// Client connection settings.
    #[serde(default)]
    pub client: ClientSettings,
}

impl SyncConfig {
    /// Loads configuration from the given path, or the default location, or
    /// falls back to defaults when no file exists. Environment overrides are
    /// applied last.
    pub fn load_or_default(path: Option<PathBuf>) -> Self {
        let path = path.or_else(Self::default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => match Self::load(p) {
                Ok(config) => {
                    info!(path = %p.display(), "Loaded sync config");
                    config
                }
                Err(e) => {
                    warn!(path = %p.display(), ?e, "Failed to load sync config, using defaults");
                    SyncConfig::default()
                }
            },
            _ => {
                debug!("No sync config file, using defaults");
                SyncConfig::default()
            }
        };

        config.apply_env_overrides();
        config
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: &PathBuf) -> SyncResult<Self> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| SyncError::ConfigLoadFailed(e.to_string()))?;
        Ok(toml::from_str(&contents)?)
    }

    /// Saves configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: &PathBuf) -> SyncResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(path = %path.display(), "Saved sync config");
        Ok(())
    }

    /// Returns the platform config file location
    /// (e.g. `~/.config/family-bistro/sync.toml` on Linux).
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "family-bistro", "bistro")
            .map(|dirs| dirs.config_dir().join("sync.toml"))
    }

    /// Applies environment variable overrides (highest priority).
    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("BISTRO_HOST_PORT") {
            match port.parse() {
                Ok(port) => self.host.port = port,
                Err(_) => warn!(value = %port, "Ignoring invalid BISTRO_HOST_PORT"),
            }
        }
        if let Ok(addr) = std::env::var("BISTRO_HOST_ADDR") {
            self.client.host_addr = addr;
        }
        if let Ok(name) = std::env::var("BISTRO_DEVICE_NAME") {
            self.device.name = name;
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.client.host_addr.trim().is_empty() {
            return Err(SyncError::InvalidConfig("client.host_addr is empty".into()));
        }
        if self.client.connect_timeout_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "client.connect_timeout_secs must be at least 1".into(),
            ));
        }
        if self.client.retry_interval_secs == 0 {
            return Err(SyncError::InvalidConfig(
                "client.retry_interval_secs must be at least 1".into(),
            ));
        }

        // The derived host URL must parse, or every connect attempt is doomed.
        Url::parse(&self.host_url())?;

        Ok(())
    }

    /// The well-known kitchen endpoint this device dials as a client.
    pub fn host_url(&self) -> String {
        format!("ws://{}:{}{}", self.client.host_addr, self.host.port, SYNC_PATH)
    }

    /// The address the host server binds.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host.bind_addr, self.host.port)
    }

    /// Connect timeout as a Duration.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.client.connect_timeout_secs)
    }

    /// Reconnect interval as a Duration.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.client.retry_interval_secs)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
