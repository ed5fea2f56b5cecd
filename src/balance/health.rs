//! Provider health probe.
//!
//! A well-known funded address is looked up before a run. A failed request
//! means the provider is unusable. A zero balance only makes the provider
//! suspicious: the probe address could have been emptied, so a zero answer
//! does not prove the lookup is broken.

use std::fmt;

use super::{BalanceError, BalanceLookup};
use crate::crypto::Address;

/// Address of the genesis block coinbase. It has never been spent from.
pub const GENESIS_ADDRESS: &str = "1A1zP1eP5QGefi2DMPTfTL5SLmv7DivfNa";

/// Outcome of a successful probe request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HealthStatus {
    /// The probe address reported a positive balance
    Healthy { balance: f64 },
    /// The request worked but reported nothing at the probe address
    Suspicious,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        matches!(self, HealthStatus::Healthy { .. })
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HealthStatus::Healthy { balance } => write!(f, "healthy ({} BTC at probe)", balance),
            HealthStatus::Suspicious => write!(f, "suspicious (zero balance at probe)"),
        }
    }
}

/// Looks up `probe_address` and classifies the answer.
pub fn probe(
    lookup: &dyn BalanceLookup,
    probe_address: &Address,
) -> Result<HealthStatus, BalanceError> {
    let balance = lookup.lookup_balance(probe_address)?;
    let status = if balance > 0.0 {
        HealthStatus::Healthy { balance }
    } else {
        HealthStatus::Suspicious
    };

    tracing::info!(
        provider = lookup.name(),
        address = %probe_address,
        %status,
        "provider probe finished"
    );
    Ok(status)
}
