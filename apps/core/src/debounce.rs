use std::time::{Duration, Instant};

/// Holds the latest pushed value until `delay` passes without a newer push.
#[derive(Debug, Clone)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replaces any pending value and restarts the timer.
    pub fn push(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now + self.delay));
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Time left before the pending value settles; `None` when idle.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.pending
            .as_ref()
            .map(|(_, deadline)| deadline.saturating_duration_since(now))
    }

    /// Yields the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        let settled = matches!(&self.pending, Some((_, deadline)) if now >= *deadline);
        if settled {
            self.flush()
        } else {
            None
        }
    }

    /// Yields the pending value immediately.
    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }
}
