//! Sliding-window limiter for outbound chat lines.
//!
//! Twitch allows a bounded number of messages per period (750 per 30 s for
//! verified bots). The transport waits on [`Throttle::acquire`] before
//! writing every line.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

/// Sliding-window rate limiter.
#[derive(Debug)]
pub struct Throttle {
    capacity: usize,
    period: Duration,
    sent: VecDeque<Instant>,
}

impl Throttle {
    /// Allows at most `capacity` sends in any window of length `period`.
    /// A capacity of zero is treated as one.
    #[must_use]
    pub fn new(capacity: usize, period: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            period,
            sent: VecDeque::with_capacity(capacity.min(1024)),
        }
    }

    /// Returns how long a send at `now` must wait, or `None` if it may
    /// proceed immediately. Does not record anything.
    pub fn delay(&mut self, now: Instant) -> Option<Duration> {
        while let Some(&oldest) = self.sent.front() {
            if now.saturating_duration_since(oldest) >= self.period {
                self.sent.pop_front();
            } else {
                break;
            }
        }
        if self.sent.len() < self.capacity {
            return None;
        }
        let oldest = *self.sent.front()?;
        Some(
            oldest
                .checked_add(self.period)
                .map_or(self.period, |free_at| free_at.saturating_duration_since(now)),
        )
    }

    /// Records a send at `now`.
    pub fn record(&mut self, now: Instant) {
        self.sent.push_back(now);
    }

    /// Waits until a send is allowed, then records it.
    pub async fn acquire(&mut self) {
        loop {
            let now = Instant::now();
            match self.delay(now) {
                None => {
                    self.record(now);
                    return;
                }
                Some(wait) => {
                    tracing::debug!(wait_ms = wait.as_millis(), "outbound chat rate limit reached");
                    tokio::time::sleep(wait).await;
                }
            }
        }
    }

    /// Number of sends inside the current window (as of the last check).
    #[must_use]
    pub fn in_window(&self) -> usize {
        self.sent.len()
    }
}
