//! Balance lookups against third-party block explorers.
//!
//! The key pipeline never touches the network. Everything here sits behind
//! the [`BalanceLookup`] trait so the draw pool can be driven by any provider,
//! a retry decorator, or a test double.

mod health;
mod providers;
mod retry;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::crypto::Address;

pub use health::{probe, HealthStatus, GENESIS_ADDRESS};
pub use providers::{
    parse_blockchain_info, parse_blockstream, parse_covalent, BlockchainInfo, Blockstream,
    Covalent,
};
pub use retry::{BackoffConfig, ExponentialBackoff, RetryingLookup};

/// Satoshis per whole coin.
pub const SATS_PER_BTC: f64 = 100_000_000.0;

/// Converts an amount in satoshis into whole coins.
#[inline]
pub fn sats_to_btc(sats: u64) -> f64 {
    sats as f64 / SATS_PER_BTC
}

/// Errors reported by a balance provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    #[error("request failed: {0}")]
    Transport(String),

    #[error("provider rejected the credentials (HTTP {0})")]
    Unauthorized(u16),

    #[error("provider rate limit reached")]
    RateLimited,

    #[error("unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl BalanceError {
    /// Whether retrying the same request later may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            BalanceError::Transport(_) | BalanceError::RateLimited => true,
            BalanceError::Status { status, .. } => *status >= 500,
            BalanceError::Unauthorized(_) | BalanceError::MalformedResponse(_) => false,
        }
    }

    /// Maps a non-success HTTP status onto an error.
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        match status {
            401 | 403 => BalanceError::Unauthorized(status),
            429 => BalanceError::RateLimited,
            _ => BalanceError::Status {
                status,
                body: body.into().chars().take(200).collect(),
            },
        }
    }
}

impl From<reqwest::Error> for BalanceError {
    fn from(e: reqwest::Error) -> Self {
        BalanceError::Transport(e.to_string())
    }
}

impl From<serde_json::Error> for BalanceError {
    fn from(e: serde_json::Error) -> Self {
        BalanceError::MalformedResponse(e.to_string())
    }
}

/// A service that reports the confirmed balance of an address.
pub trait BalanceLookup: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Returns the balance of `address` in whole coins.
    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError>;

    /// Advice shown to the user when lookups keep failing.
    fn error_hint(&self) -> &str;
}

impl<L: BalanceLookup + ?Sized> BalanceLookup for Arc<L> {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn lookup_balance(&self, address: &Address) -> Result<f64, BalanceError> {
        (**self).lookup_balance(address)
    }

    fn error_hint(&self) -> &str {
        (**self).error_hint()
    }
}

/// Which balance provider to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    /// Covalent when an API key is configured, blockchain.info otherwise
    #[default]
    Auto,
    /// blockchain.info (free)
    BlockchainInfo,
    /// blockstream.info (free)
    Blockstream,
    /// covalenthq.com (API key)
    Covalent,
}

impl ProviderKind {
    /// Resolves [`ProviderKind::Auto`] against the configured API key.
    pub fn resolve(self, api_key: Option<&str>) -> ProviderKind {
        match self {
            ProviderKind::Auto if api_key.is_some_and(|k| !k.is_empty()) => ProviderKind::Covalent,
            ProviderKind::Auto => ProviderKind::BlockchainInfo,
            other => other,
        }
    }

    /// Whether the provider works without an API key.
    pub fn is_free(self) -> bool {
        !matches!(self, ProviderKind::Covalent)
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(ProviderKind::Auto),
            "blockchain" | "blockchain.info" => Ok(ProviderKind::BlockchainInfo),
            "blockstream" | "blockstream.info" | "esplora" => Ok(ProviderKind::Blockstream),
            "covalent" | "covalenthq" | "covalenthq.com" => Ok(ProviderKind::Covalent),
            _ => Err(format!("Unknown provider: {}", s)),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderKind::Auto => write!(f, "auto"),
            ProviderKind::BlockchainInfo => write!(f, "blockchain.info"),
            ProviderKind::Blockstream => write!(f, "blockstream.info"),
            ProviderKind::Covalent => write!(f, "covalenthq.com"),
        }
    }
}

/// Everything needed to build a provider client.
#[derive(Debug, Clone)]
pub struct LookupConfig {
    /// Provider selection (may be `Auto`)
    pub kind: ProviderKind,
    /// Covalent API key
    pub api_key: Option<String>,
    /// Override of the provider's base URL
    pub base_url: Option<String>,
    /// Per-request timeout
    pub timeout: Duration,
    /// Retry policy wrapped around every lookup
    pub backoff: BackoffConfig,
}

/// Builds the configured provider, wrapped in the retry policy.
pub fn build_lookup(config: &LookupConfig) -> Result<Arc<dyn BalanceLookup>, BalanceError> {
    let client = reqwest::blocking::Client::builder()
        .timeout(config.timeout)
        .user_agent(concat!("btc-lottery/", env!("CARGO_PKG_VERSION")))
        .build()?;

    let base_url = config.base_url.clone();
    let lookup: Arc<dyn BalanceLookup> = match config.kind.resolve(config.api_key.as_deref()) {
        ProviderKind::Covalent => {
            let api_key = config
                .api_key
                .clone()
                .filter(|k| !k.is_empty())
                .ok_or(BalanceError::Unauthorized(401))?;
            Arc::new(RetryingLookup::new(
                Covalent::new(client, base_url, api_key),
                config.backoff.clone(),
            ))
        }
        ProviderKind::Blockstream => Arc::new(RetryingLookup::new(
            Blockstream::new(client, base_url),
            config.backoff.clone(),
        )),
        ProviderKind::BlockchainInfo | ProviderKind::Auto => Arc::new(RetryingLookup::new(
            BlockchainInfo::new(client, base_url),
            config.backoff.clone(),
        )),
    };

    tracing::info!(provider = lookup.name(), "balance provider selected");
    Ok(lookup)
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted lookup for exercising callers without a network.

    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Replays queued responses, then falls back to a fixed balance.
    pub struct ScriptedLookup {
        responses: Mutex<VecDeque<Result<f64, BalanceError>>>,
        fallback: Result<f64, BalanceError>,
        calls: AtomicUsize,
    }

    impl ScriptedLookup {
        pub fn always(result: Result<f64, BalanceError>) -> Self {
            Self::scripted(Vec::new(), result)
        }

        pub fn scripted(
            responses: Vec<Result<f64, BalanceError>>,
            fallback: Result<f64, BalanceError>,
        ) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                fallback,
                calls: AtomicUsize::new(0),
            }
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl BalanceLookup for ScriptedLookup {
        fn name(&self) -> &str {
            "scripted"
        }

        fn lookup_balance(&self, _address: &Address) -> Result<f64, BalanceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next = self.responses.lock().unwrap().pop_front();
            next.unwrap_or_else(|| self.fallback.clone())
        }

        fn error_hint(&self) -> &str {
            "scripted failure"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_resolution() {
        assert_eq!(
            ProviderKind::Auto.resolve(Some("ckey_abc")),
            ProviderKind::Covalent
        );
        assert_eq!(ProviderKind::Auto.resolve(Some("")), ProviderKind::BlockchainInfo);
        assert_eq!(ProviderKind::Auto.resolve(None), ProviderKind::BlockchainInfo);
        assert_eq!(
            ProviderKind::Blockstream.resolve(Some("ckey_abc")),
            ProviderKind::Blockstream
        );
    }

    #[test]
    fn test_provider_parsing() {
        assert_eq!("Blockstream".parse(), Ok(ProviderKind::Blockstream));
        assert_eq!("covalenthq.com".parse(), Ok(ProviderKind::Covalent));
        assert!("etherscan".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(BalanceError::from_status(401, ""), BalanceError::Unauthorized(401));
        assert_eq!(BalanceError::from_status(429, ""), BalanceError::RateLimited);
        assert!(BalanceError::from_status(503, "down").is_transient());
        assert!(!BalanceError::from_status(404, "missing").is_transient());
        assert!(!BalanceError::Unauthorized(403).is_transient());
    }

    #[test]
    fn test_sats_conversion() {
        assert_eq!(sats_to_btc(0), 0.0);
        assert_eq!(sats_to_btc(150_000_000), 1.5);
        assert_eq!(sats_to_btc(1), 0.00000001);
    }

    #[test]
    fn test_covalent_requires_key() {
        let config = LookupConfig {
            kind: ProviderKind::Covalent,
            api_key: None,
            base_url: None,
            timeout: Duration::from_secs(1),
            backoff: BackoffConfig::default(),
        };
        assert!(matches!(
            build_lookup(&config),
            Err(BalanceError::Unauthorized(_))
        ));
    }
}
