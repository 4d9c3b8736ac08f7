use std::time::{Duration, Instant};

const REPORT_EVERY: usize = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub elapsed: Duration,
    pub remaining: Duration,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            self.completed as f64 * 100.0 / self.total as f64
        }
    }
}

/// Linear estimate: average time per finished host times hosts left.
pub fn estimate_remaining(elapsed: Duration, completed: usize, total: usize) -> Duration {
    if completed == 0 {
        return Duration::ZERO;
    }
    let left = total.saturating_sub(completed) as f64;
    elapsed.div_f64(completed as f64).mul_f64(left)
}

#[derive(Debug)]
pub struct ProgressTracker {
    total: usize,
    completed: usize,
    started_at: Instant,
}

impl ProgressTracker {
    pub fn new(total: usize) -> Self {
        Self::starting_at(total, Instant::now())
    }

    pub fn starting_at(total: usize, started_at: Instant) -> Self {
        Self {
            total,
            completed: 0,
            started_at,
        }
    }

    pub fn completed(&self) -> usize {
        self.completed
    }

    /// Counts one finished host. Returns a snapshot every fifth completion
    /// and on the last one.
    pub fn record_completion(&mut self) -> Option<Progress> {
        self.completed += 1;
        if self.completed % REPORT_EVERY != 0 && self.completed != self.total {
            return None;
        }
        let elapsed = self.started_at.elapsed();
        Some(Progress {
            completed: self.completed,
            total: self.total,
            elapsed,
            remaining: estimate_remaining(elapsed, self.completed, self.total),
        })
    }
}
