//! Running summary of a lottery run.

use super::DrawResult;

/// Constant-size summary of the draws seen so far.
///
/// Only the best funded result is retained; every other result is dropped
/// as soon as it has been recorded.
#[derive(Debug, Default)]
pub struct Tally {
    draws: u64,
    funded: u64,
    best: Option<DrawResult>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one draw.
    pub fn record(&mut self, result: DrawResult) {
        self.draws += 1;
        if !result.is_funded() {
            return;
        }

        self.funded += 1;
        let better = self
            .best
            .as_ref()
            .map_or(true, |best| result.balance > best.balance);
        if better {
            self.best = Some(result);
        }
    }

    /// Number of draws recorded.
    pub fn draws(&self) -> u64 {
        self.draws
    }

    /// Number of funded draws recorded.
    pub fn funded(&self) -> u64 {
        self.funded
    }

    /// The funded draw with the highest balance, if any.
    pub fn best(&self) -> Option<&DrawResult> {
        self.best.as_ref()
    }

    /// The highest balance seen (0 when nothing was funded).
    pub fn highest_balance(&self) -> f64 {
        self.best.as_ref().map_or(0.0, |r| r.balance)
    }

    /// Completion in percent of `target` draws.
    pub fn progress(&self, target: u64) -> f64 {
        if target == 0 {
            return 100.0;
        }
        (self.draws as f64 / target as f64 * 100.0).min(100.0)
    }
}
