//! Worker that draws keys and checks their balances.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::balance::BalanceLookup;
use crate::crypto::Keypair;

use super::{DrawError, DrawOutcome, DrawResult};

/// Counters shared by all workers of a pool.
#[derive(Debug, Default)]
pub struct DrawStats {
    /// Tickets handed out (may overshoot the target by one per worker)
    pub claimed: AtomicU64,
    /// Draws whose lookup completed
    pub drawn: AtomicU64,
    /// Draws with a positive balance
    pub funded: AtomicU64,
}

impl DrawStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_drawn(&self) -> u64 {
        self.drawn.load(Ordering::Relaxed)
    }

    pub fn total_funded(&self) -> u64 {
        self.funded.load(Ordering::Relaxed)
    }

    /// Claims the next ticket; `None` once `target` tickets are out.
    fn claim(&self, target: u64) -> Option<u64> {
        let ticket = self.claimed.fetch_add(1, Ordering::Relaxed);
        (ticket < target).then_some(ticket)
    }
}

/// Settings shared by the workers of one pool.
#[derive(Debug, Clone)]
pub struct DrawSettings {
    /// Number of draws requested
    pub target: u64,
    /// Pause between two lookups of the same worker
    pub delay: Duration,
}

/// A worker thread's loop state.
pub struct DrawWorker {
    id: usize,
    settings: DrawSettings,
    lookup: Arc<dyn BalanceLookup>,
    result_tx: Sender<DrawOutcome>,
    stop_flag: Arc<AtomicBool>,
    stats: Arc<DrawStats>,
}

impl DrawWorker {
    pub fn new(
        id: usize,
        settings: DrawSettings,
        lookup: Arc<dyn BalanceLookup>,
        result_tx: Sender<DrawOutcome>,
        stop_flag: Arc<AtomicBool>,
        stats: Arc<DrawStats>,
    ) -> Self {
        Self {
            id,
            settings,
            lookup,
            result_tx,
            stop_flag,
            stats,
        }
    }

    /// Runs the worker loop.
    ///
    /// Draws until:
    /// - all tickets are claimed
    /// - the stop flag is set
    /// - a draw fails (the failure is sent first)
    /// - the result channel is closed
    pub fn run(&self) {
        let mut first = true;

        while !self.stop_flag.load(Ordering::Relaxed) {
            let Some(ticket) = self.stats.claim(self.settings.target) else {
                break;
            };

            if !first && !self.settings.delay.is_zero() {
                thread::sleep(self.settings.delay);
                if self.stop_flag.load(Ordering::Relaxed) {
                    break;
                }
            }
            first = false;

            let outcome = self.draw(ticket);
            let failed = matches!(outcome, DrawOutcome::Failed { .. });

            if self.result_tx.send(outcome).is_err() || failed {
                break;
            }
        }

        tracing::trace!(worker = self.id, "worker finished");
    }

    /// Generates one keypair and looks up its balance.
    ///
    /// The keypair, and with it the private key, is dropped before returning
    /// unless the address turned out to be funded.
    fn draw(&self, ticket: u64) -> DrawOutcome {
        let keypair = match Keypair::generate() {
            Ok(keypair) => keypair,
            Err(e) => return self.failed(DrawError::Crypto(e)),
        };

        match self.lookup.lookup_balance(keypair.address()) {
            Ok(balance) => {
                self.stats.drawn.fetch_add(1, Ordering::Relaxed);
                if balance > 0.0 {
                    self.stats.funded.fetch_add(1, Ordering::Relaxed);
                    tracing::info!(
                        worker = self.id,
                        address = %keypair.address(),
                        balance,
                        "funded address found"
                    );
                } else {
                    tracing::debug!(
                        worker = self.id,
                        ticket,
                        address = %keypair.address(),
                        "empty address"
                    );
                }
                DrawOutcome::Drawn(DrawResult::new(self.id, &keypair, balance))
            }
            Err(e) => {
                tracing::warn!(
                    worker = self.id,
                    provider = self.lookup.name(),
                    error = %e,
                    "balance lookup failed"
                );
                self.failed(DrawError::Balance(e))
            }
        }
    }

    fn failed(&self, error: DrawError) -> DrawOutcome {
        DrawOutcome::Failed {
            worker_id: self.id,
            error,
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }
}
