use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Shared flag a caller raises to stop a run before its next solver call.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Global wall-clock budget of one run.
#[derive(Debug, Clone)]
pub struct Budget {
    start: Instant,
    limit: Duration,
    cancel: Option<CancelFlag>,
}

impl Budget {
    pub fn new(limit: Duration, cancel: Option<CancelFlag>) -> Self {
        Self::starting_at(Instant::now(), limit, cancel)
    }

    /// Budget whose clock has been running since `start`.
    pub fn starting_at(start: Instant, limit: Duration, cancel: Option<CancelFlag>) -> Self {
        Self {
            start,
            limit,
            cancel,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn remaining(&self) -> Duration {
        self.limit.saturating_sub(self.start.elapsed())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining().is_zero()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(|c| c.is_cancelled())
    }
}
