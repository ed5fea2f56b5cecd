//! Draw orchestration.
//!
//! This module provides:
//! - A pool of worker threads that draw a requested number of keys
//! - Per-draw balance lookups through any [`BalanceLookup`](crate::balance::BalanceLookup)
//! - A constant-size tally of the results
//! - Offline batch generation without lookups

mod draw;
mod offline;
mod pool;
mod tally;

use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::balance::BalanceError;
use crate::crypto::{CryptoError, Keypair};

pub use draw::{DrawSettings, DrawStats, DrawWorker};
pub use offline::{draw_offline, offline_pool};
pub use pool::{DrawPool, PoolEvent};
pub use tally::Tally;

/// Result of one completed draw.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DrawResult {
    /// The ID of the worker that drew the key
    pub worker_id: usize,
    /// Base-58-check address
    pub address: String,
    /// Compressed public key (hex)
    pub public_key_hex: String,
    /// Balance in whole coins
    pub balance: f64,
    /// Private key (hex), kept only for funded addresses
    pub private_key_hex: Option<String>,
}

impl DrawResult {
    pub fn new(worker_id: usize, keypair: &Keypair, balance: f64) -> Self {
        Self {
            worker_id,
            address: keypair.address().to_string(),
            public_key_hex: keypair.public_key().to_hex(),
            balance,
            private_key_hex: (balance > 0.0).then(|| keypair.private_key_hex()),
        }
    }

    pub fn is_funded(&self) -> bool {
        self.balance > 0.0
    }
}

impl fmt::Debug for DrawResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DrawResult")
            .field("worker_id", &self.worker_id)
            .field("address", &self.address)
            .field("balance", &self.balance)
            .finish_non_exhaustive()
    }
}

/// Why a draw did not produce a result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DrawError {
    #[error("key generation failed: {0}")]
    Crypto(#[from] CryptoError),

    #[error("balance lookup failed: {0}")]
    Balance(#[from] BalanceError),
}

/// What a worker reports for each ticket.
#[derive(Debug)]
pub enum DrawOutcome {
    Drawn(DrawResult),
    Failed { worker_id: usize, error: DrawError },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unfunded_result_drops_private_key() {
        let keypair = Keypair::from_secret_bytes([0x01; 32]).unwrap();
        let result = DrawResult::new(0, &keypair, 0.0);
        assert!(!result.is_funded());
        assert!(result.private_key_hex.is_none());
        assert_eq!(result.address, "1C6Rc3w25VHud3dLDamutaqfKWqhrLRTaD");
    }

    #[test]
    fn test_funded_result_keeps_private_key() {
        let keypair = Keypair::from_secret_bytes([0x01; 32]).unwrap();
        let result = DrawResult::new(3, &keypair, 0.25);
        assert!(result.is_funded());
        assert_eq!(result.private_key_hex, Some("01".repeat(32)));
    }
}
