//! Draw pool management.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};

use crate::balance::BalanceLookup;

use super::draw::{DrawSettings, DrawStats, DrawWorker};
use super::DrawOutcome;

/// What the pool reports to its owner.
#[derive(Debug)]
pub enum PoolEvent {
    /// A worker finished a draw
    Outcome(DrawOutcome),
    /// Nothing arrived within the timeout
    Timeout,
    /// All workers exited and every outcome has been received
    Finished,
}

/// Runs `target` draws across a pool of worker threads.
///
/// Workers claim tickets from a shared counter, so exactly `target` draws
/// are attempted no matter how many workers there are. Outcomes arrive
/// through [`DrawPool::wait_for_event`]; the channel closes once every
/// worker has exited.
pub struct DrawPool {
    /// Number of workers
    num_workers: usize,
    /// Number of draws requested
    target: u64,
    /// Worker thread handles (Option to allow taking during join)
    handles: Option<Vec<JoinHandle<()>>>,
    /// Channel receiver for outcomes (dropped before joining so blocked
    /// senders fail instead of waiting forever)
    result_rx: Option<Receiver<DrawOutcome>>,
    /// Shared stop flag
    stop_flag: Arc<AtomicBool>,
    /// Shared statistics
    stats: Arc<DrawStats>,
    /// Start time
    start_time: Instant,
}

impl DrawPool {
    /// Starts `num_workers` workers drawing `settings.target` keys.
    pub fn new(
        num_workers: usize,
        settings: DrawSettings,
        lookup: Arc<dyn BalanceLookup>,
    ) -> Self {
        let (result_tx, result_rx) = bounded(100);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stats = Arc::new(DrawStats::new());
        let target = settings.target;

        let handles = Self::spawn_workers(
            num_workers,
            settings,
            lookup,
            result_tx,
            stop_flag.clone(),
            stats.clone(),
        );

        Self {
            num_workers,
            target,
            handles: Some(handles),
            result_rx: Some(result_rx),
            stop_flag,
            stats,
            start_time: Instant::now(),
        }
    }

    /// Spawns worker threads.
    fn spawn_workers(
        num_workers: usize,
        settings: DrawSettings,
        lookup: Arc<dyn BalanceLookup>,
        result_tx: Sender<DrawOutcome>,
        stop_flag: Arc<AtomicBool>,
        stats: Arc<DrawStats>,
    ) -> Vec<JoinHandle<()>> {
        (0..num_workers)
            .map(|id| {
                let settings = settings.clone();
                let lookup = lookup.clone();
                let result_tx = result_tx.clone();
                let stop_flag = stop_flag.clone();
                let stats = stats.clone();

                thread::Builder::new()
                    .name(format!("lottery-worker-{}", id))
                    .spawn(move || {
                        let worker =
                            DrawWorker::new(id, settings, lookup, result_tx, stop_flag, stats);
                        worker.run();
                    })
                    .expect("Failed to spawn worker thread")
            })
            .collect()
    }

    /// Waits for the next outcome, at most `timeout`.
    pub fn wait_for_event(&self, timeout: Duration) -> PoolEvent {
        let Some(result_rx) = &self.result_rx else {
            return PoolEvent::Finished;
        };
        match result_rx.recv_timeout(timeout) {
            Ok(outcome) => PoolEvent::Outcome(outcome),
            Err(RecvTimeoutError::Timeout) => PoolEvent::Timeout,
            Err(RecvTimeoutError::Disconnected) => PoolEvent::Finished,
        }
    }

    /// Returns an iterator over outcomes, ending when all workers are done.
    pub fn outcomes(&self) -> impl Iterator<Item = DrawOutcome> + '_ {
        self.result_rx.iter().flat_map(|rx| rx.iter())
    }

    /// Signals all workers to stop after their current draw.
    pub fn stop(&self) {
        self.stop_flag.store(true, Ordering::Relaxed);
    }

    /// Stops the pool and waits for all workers to exit.
    ///
    /// Outcomes not yet received are discarded.
    pub fn join(mut self) {
        self.stop();
        self.join_handles();
    }

    fn join_handles(&mut self) {
        drop(self.result_rx.take());
        if let Some(handles) = self.handles.take() {
            for handle in handles {
                let _ = handle.join();
            }
        }
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Number of draws requested.
    pub fn target(&self) -> u64 {
        self.target
    }

    /// Number of draws whose lookup completed.
    pub fn total_drawn(&self) -> u64 {
        self.stats.total_drawn()
    }

    /// Number of funded addresses found.
    pub fn total_funded(&self) -> u64 {
        self.stats.total_funded()
    }

    /// Returns the elapsed time since the pool was created.
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Returns the current draw rate (draws per second).
    pub fn draws_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.total_drawn() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Returns a clone of the stop flag for external use (e.g., signal handlers).
    pub fn stop_flag_clone(&self) -> Arc<AtomicBool> {
        self.stop_flag.clone()
    }

    /// Returns true if the pool has been signaled to stop.
    pub fn is_stopped(&self) -> bool {
        self.stop_flag.load(Ordering::Relaxed)
    }
}

impl Drop for DrawPool {
    fn drop(&mut self) {
        self.stop();
        self.join_handles();
    }
}
