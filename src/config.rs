//! Runtime configuration for the key lottery.

use std::time::Duration;

use clap::Parser;

use crate::balance::{BackoffConfig, LookupConfig, ProviderKind, GENESIS_ADDRESS};
use crate::crypto::{Address, CryptoError};

/// Bitcoin key lottery: draw random keys and check their balances
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Number of keys to draw
    #[arg(short = 'n', long, default_value = "1")]
    pub count: u64,

    /// Covalent API key (ckey_...); selects covalenthq.com in auto mode
    #[arg(short = 'k', long, env = "COVALENT_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Balance provider: auto, blockchain, blockstream or covalent
    #[arg(short = 'p', long, default_value = "auto")]
    pub provider: ProviderKind,

    /// Override the provider's base URL (e.g. a self-hosted Esplora)
    #[arg(long)]
    pub base_url: Option<String>,

    /// Number of worker threads (also sizes the offline generation pool)
    #[arg(short = 'w', long, default_value = "1")]
    pub workers: usize,

    /// Pause between two lookups of the same worker, in milliseconds
    #[arg(short = 'd', long, default_value = "300")]
    pub delay_ms: u64,

    /// Lookup attempts per key, including the first
    #[arg(long, default_value = "3")]
    pub max_retries: u32,

    /// HTTP request timeout in seconds
    #[arg(long, default_value = "15")]
    pub timeout_secs: u64,

    /// Progress report interval in seconds
    #[arg(short = 'r', long, default_value = "5")]
    pub report_interval: u64,

    /// Address looked up before the run to check the provider
    #[arg(long, default_value = GENESIS_ADDRESS)]
    pub probe_address: String,

    /// Skip the provider check
    #[arg(long, default_value = "false")]
    pub skip_health_check: bool,

    /// Abort when the provider check reports a zero balance
    #[arg(long, default_value = "false")]
    pub strict_health: bool,

    /// Only generate keys; no balance lookups
    #[arg(long, default_value = "false")]
    pub offline: bool,
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.count == 0 {
            return Err(ConfigError::InvalidValue(
                "count must be at least 1".into(),
            ));
        }

        if self.workers == 0 {
            return Err(ConfigError::InvalidValue(
                "workers must be at least 1".into(),
            ));
        }

        if self.offline {
            return Ok(());
        }

        if self.max_retries == 0 {
            return Err(ConfigError::InvalidValue(
                "max-retries must be at least 1".into(),
            ));
        }

        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "timeout-secs must be at least 1".into(),
            ));
        }

        if self.provider_kind() == ProviderKind::Covalent && self.api_key().is_none() {
            return Err(ConfigError::MissingApiKey);
        }

        self.probe_address()?;
        Ok(())
    }

    /// Returns the API key, treating an empty value as absent.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }

    /// Whether the API key has the shape Covalent hands out.
    pub fn api_key_looks_valid(&self) -> bool {
        self.api_key().map_or(true, |k| k.starts_with("ckey_"))
    }

    /// Returns the provider with `auto` resolved.
    pub fn provider_kind(&self) -> ProviderKind {
        self.provider.resolve(self.api_key())
    }

    /// Returns the parsed probe address.
    pub fn probe_address(&self) -> Result<Address, ConfigError> {
        self.probe_address
            .parse()
            .map_err(ConfigError::InvalidProbeAddress)
    }

    /// Returns the per-worker pause between lookups.
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Returns the progress report interval.
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval.max(1))
    }

    /// Returns the retry policy, paced from the configured delay.
    pub fn backoff(&self) -> BackoffConfig {
        BackoffConfig::default()
            .with_initial_delay(self.delay().max(Duration::from_millis(100)) * 2)
            .with_max_attempts(self.max_retries)
    }

    /// Returns the settings used to build the balance provider.
    pub fn lookup_config(&self) -> LookupConfig {
        LookupConfig {
            kind: self.provider_kind(),
            api_key: self.api_key().map(str::to_string),
            base_url: self.base_url.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            backoff: self.backoff(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("The covalent provider requires an API key (--api-key or COVALENT_API_KEY)")]
    MissingApiKey,

    #[error("Invalid probe address: {0}")]
    InvalidProbeAddress(#[source] CryptoError),
}
