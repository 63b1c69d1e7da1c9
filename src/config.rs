//! Configuration module
//!
//! Defines the configuration structures used throughout the flow engine:
//! history persistence, progress reset timing, simulation debouncing and the
//! settlement service endpoint.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Main configuration structure for the flow engine
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// General settings
    pub general: GeneralConfig,

    /// Transaction history persistence settings
    pub history: HistoryConfig,

    /// Progress tracking settings
    pub progress: ProgressConfig,

    /// Cost-preview simulation settings
    pub simulation: SimulationConfig,

    /// Settlement service endpoint settings
    pub sdk: SdkConfig,
}

/// General settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Application name/identifier
    pub app_name: String,

    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: "unibridge".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// Transaction history persistence settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Path of the persisted history slot
    pub storage_path: PathBuf,

    /// Maximum number of entries kept, newest first
    pub max_entries: usize,

    /// Pending records older than this many hours are flipped to failed
    /// by the startup sweep
    pub stale_pending_hours: i64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("unibridge-history.json"),
            max_entries: 100,
            stale_pending_hours: 24,
        }
    }
}

/// Progress tracking settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// Delay before clearing the step list after fulfillment, so the UI
    /// can show 100% before the reset
    pub reset_delay_ms: u64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            reset_delay_ms: 2000,
        }
    }
}

/// Cost-preview simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Debounce window for form-change triggered simulations
    pub debounce_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 500,
        }
    }
}

/// Settlement service endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Base URL of the settlement service
    pub base_url: String,

    /// Target network ("mainnet" or "testnet")
    pub network: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            base_url: "https://settlement.example.com".to_string(),
            network: "mainnet".to_string(),
            request_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a YAML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: AppConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;

        Ok(config)
    }
}

/// Configuration manager providing shared access to the active configuration
pub struct ConfigManager {
    config: Arc<RwLock<AppConfig>>,
}

impl ConfigManager {
    /// Create a manager wrapping the given configuration
    pub fn new(config: AppConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Create a manager from a YAML file, falling back to defaults if the
    /// file is missing or malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Self {
        match AppConfig::load_from_file(path.as_ref()) {
            Ok(config) => {
                info!(path = %path.as_ref().display(), "Configuration loaded");
                Self::new(config)
            }
            Err(e) => {
                warn!(
                    path = %path.as_ref().display(),
                    error = %e,
                    "Could not load configuration, using defaults"
                );
                Self::new(AppConfig::default())
            }
        }
    }

    /// Get a snapshot of the current configuration
    pub async fn get_config(&self) -> AppConfig {
        self.config.read().await.clone()
    }

    /// Replace the current configuration
    pub async fn update(&self, config: AppConfig) {
        let mut current = self.config.write().await;
        *current = config;
        info!("Configuration updated");
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}
