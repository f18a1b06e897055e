//! Configuration management with validation and defaults
//!
//! Sectioned configuration loadable from a TOML file. Every section has
//! usable defaults so the binary runs with no file at all.

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct VelvetConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub chain: ChainConfig,
    #[serde(default)]
    pub wager: WagerConfig,
    #[serde(default)]
    pub referral: ReferralConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

/// HTTP server configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// RocksDB storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    pub max_write_buffer_number: i32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_directory: "./data/ledger".to_string(),
            write_buffer_size_mb: 64,
            max_write_buffer_number: 4,
        }
    }
}

/// Chain collaborator configuration (Solana RPC)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChainConfig {
    pub rpc_url: String,
    /// Treasury signer service that holds the hot wallet and broadcasts
    /// withdrawal transfers.
    pub treasury_url: String,
    /// House wallet address deposits must land on.
    pub house_wallet: String,
    pub rpc_timeout_secs: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            rpc_url: "https://api.mainnet-beta.solana.com".to_string(),
            treasury_url: "http://127.0.0.1:7070".to_string(),
            house_wallet: String::new(),
            rpc_timeout_secs: 15,
        }
    }
}

/// Wager and withdrawal bounds, in lamports.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WagerConfig {
    pub min_bet: u64,
    pub max_bet: u64,
    pub min_withdrawal: u64,
    pub max_withdrawal: u64,
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self {
            min_bet: 10_000,                // 0.00001 SOL
            max_bet: 100_000_000_000,       // 100 SOL
            min_withdrawal: 1_000_000,      // 0.001 SOL
            max_withdrawal: 500_000_000_000,
        }
    }
}

/// Referral commission configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReferralConfig {
    /// Fraction of a referred player's net loss paid to the referrer.
    pub commission_rate: f64,
}

impl Default for ReferralConfig {
    fn default() -> Self {
        Self {
            commission_rate: 0.10,
        }
    }
}

/// Per-client token bucket settings for the wager endpoints.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: u32,
    /// Idle buckets older than this are swept from the store.
    pub idle_eviction_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 120,
            burst_capacity: 20,
            idle_eviction_secs: 600,
        }
    }
}

impl VelvetConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| format!("failed to read {}: {}", path.as_ref().display(), e))?;
        let config: VelvetConfig =
            toml::from_str(&raw).map_err(|e| format!("failed to parse config: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.wager.min_bet == 0 {
            return Err("wager.min_bet must be positive".to_string());
        }
        if self.wager.min_bet > self.wager.max_bet {
            return Err("wager.min_bet must be <= wager.max_bet".to_string());
        }
        if self.wager.min_withdrawal > self.wager.max_withdrawal {
            return Err("wager.min_withdrawal must be <= wager.max_withdrawal".to_string());
        }
        if !(0.0..=1.0).contains(&self.referral.commission_rate) {
            return Err("referral.commission_rate must be within [0, 1]".to_string());
        }
        if self.rate_limit.requests_per_minute == 0 {
            return Err("rate_limit.requests_per_minute must be positive".to_string());
        }
        Ok(())
    }
}
