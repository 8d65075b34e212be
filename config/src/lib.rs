//! Darkpool Configuration
//!
//! Shared configuration crate for all darkpool components.
//!
//! Handles loading configuration from:
//! 1. DP_CONFIG env var (explicit path)
//! 2. ./config.toml (current directory)
//! 3. ~/.darkpool/config.toml (user home)
//!
//! Environment variables take precedence over TOML config.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::{env, fs};

const CONFIG_FILE_NAME: &str = "config.toml";
const CONFIG_DIR_NAME: &str = ".darkpool";

// ============================================================================
// Default Constants
// ============================================================================

const DEFAULT_CONTRACT: &str = "0xDa8kP0015eCretA9CtIoN0rDeRb00k0000000000";
const DEFAULT_WALLET: &str = "0xA11ce00000000000000000000000000000000001";
const DEFAULT_CONFIRM_LATENCY_MS: u64 = 50;

// ============================================================================
// Config Structs
// ============================================================================

/// Root configuration structure (matches TOML layout)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DarkpoolConfig {
    #[serde(default)]
    pub contract: ContractConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
}

/// Target contract configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    /// Address of the order-book contract all ciphertexts are scoped to
    #[serde(default = "default_contract")]
    pub address: String,
}

impl Default for ContractConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_CONTRACT.into(),
        }
    }
}

fn default_contract() -> String {
    DEFAULT_CONTRACT.into()
}

/// Wallet configuration for the demo binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletConfig {
    #[serde(default = "default_wallet")]
    pub address: String,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_WALLET.into(),
        }
    }
}

fn default_wallet() -> String {
    DEFAULT_WALLET.into()
}

/// In-memory ledger simulation knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Artificial delay before a staged write confirms (ms)
    #[serde(default = "default_confirm_latency")]
    pub confirm_latency_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            confirm_latency_ms: DEFAULT_CONFIRM_LATENCY_MS,
        }
    }
}

fn default_confirm_latency() -> u64 {
    DEFAULT_CONFIRM_LATENCY_MS
}

// ============================================================================
// Environment Variable Helpers
// ============================================================================

/// Set field from env var if present
fn env_string(key: &str, field: &mut String) {
    if let Ok(v) = env::var(key) {
        *field = v;
    }
}

/// Set field from env var if present and parseable
fn env_parse<T: std::str::FromStr>(key: &str, field: &mut T) {
    if let Ok(v) = env::var(key) {
        if let Ok(parsed) = v.parse() {
            *field = parsed;
        }
    }
}

// ============================================================================
// Implementation
// ============================================================================

impl DarkpoolConfig {
    /// Load configuration from config file with env var overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                log::info!("Loading config from: {}", path.display());
                let contents = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                toml::from_str(&contents)
                    .with_context(|| format!("Failed to parse config file: {}", path.display()))?
            }
            None => {
                log::info!("No config file found, using defaults and environment variables");
                Self::default()
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Load configuration from a specific file path
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.apply_env_overrides();
        Ok(config)
    }

    /// Find the config file path
    fn find_config_file() -> Option<PathBuf> {
        // 1. Check DP_CONFIG env var
        if let Ok(path) = env::var("DP_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        // 2. Check ./config.toml (current directory)
        let local_path = PathBuf::from(CONFIG_FILE_NAME);
        if local_path.exists() {
            return Some(local_path);
        }

        // 3. Check ~/.darkpool/config.toml
        dirs::home_dir()
            .map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .filter(|p| p.exists())
    }

    /// Apply environment variable overrides
    fn apply_env_overrides(&mut self) {
        env_string("DP_CONTRACT", &mut self.contract.address);
        env_string("DP_WALLET", &mut self.wallet.address);
        env_parse(
            "DP_CONFIRM_LATENCY_MS",
            &mut self.simulation.confirm_latency_ms,
        );
    }

    /// Get the default config file path
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
    }

    /// Generate a sample config file
    pub fn generate_sample() -> String {
        toml::to_string_pretty(&Self::default()).unwrap_or_default()
    }
}

// ============================================================================
// Tests
// ============================================================================
