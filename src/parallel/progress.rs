//! Progress and cancellation shared between a running simulation and its host.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Completed/total counter for batch work. Cloning shares the counter.
#[derive(Debug, Clone)]
pub struct Progress {
    done: Arc<AtomicUsize>,
    total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self {
            done: Arc::new(AtomicUsize::new(0)),
            total,
        }
    }

    /// Marks one unit done and returns the new completed count.
    pub fn advance(&self) -> usize {
        self.done.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::Relaxed).min(self.total)
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// In [0, 1]; an empty batch counts as complete.
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            return 1.0;
        }
        self.done() as f64 / self.total as f64
    }
}

/// Cooperative stop flag. The simulator checks it once per tick.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Emits run fractions no more often than every `step` and never backwards.
#[derive(Debug, Clone)]
pub struct ProgressThrottle {
    step: f64,
    last: Option<f64>,
}

impl ProgressThrottle {
    pub fn new(step: f64) -> Self {
        Self {
            step: step.max(0.0),
            last: None,
        }
    }

    /// Returns the clamped fraction when it should be reported.
    pub fn offer(&mut self, fraction: f64) -> Option<f64> {
        let fraction = fraction.clamp(0.0, 1.0);
        let report = match self.last {
            None => true,
            Some(last) => fraction > last && (fraction - last >= self.step || fraction >= 1.0),
        };
        if report {
            self.last = Some(fraction);
            Some(fraction)
        } else {
            None
        }
    }
}
