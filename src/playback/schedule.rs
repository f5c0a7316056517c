use std::time::{Duration, Instant};

/// A repeating deadline, polled from the event loop.
///
/// Dropping it is cancelling it. Missed periods are skipped rather than
/// replayed, so a stalled loop fires once and then resumes the cadence.
#[derive(Debug, Clone)]
pub struct Interval {
    period: Duration,
    next: Instant,
}

impl Interval {
    /// First fire one `period` after `now`.
    pub fn starting_after(now: Instant, period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        Self {
            period,
            next: now + period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Instant {
        self.next
    }

    /// Returns true if the deadline has passed, and moves it past `now`.
    pub fn poll(&mut self, now: Instant) -> bool {
        if now < self.next {
            return false;
        }
        while self.next <= now {
            self.next += self.period;
        }
        true
    }
}
