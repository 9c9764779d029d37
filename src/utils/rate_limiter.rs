//! Rolling-window admission counter for dispatch starts

use std::collections::VecDeque;
use std::time::Duration;
use tokio::time::Instant;

/// Admits at most `max_events` starts in any `window`-long span
#[derive(Debug)]
pub struct RateLimiter {
    events: VecDeque<Instant>,
    max_events: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_events: usize, window: Duration) -> Self {
        Self {
            events: VecDeque::with_capacity(max_events),
            max_events,
            window,
        }
    }

    /// Unlimited limiter for maintenance work
    pub fn unlimited() -> Self {
        Self {
            events: VecDeque::new(),
            max_events: usize::MAX,
            window: Duration::ZERO,
        }
    }

    fn evict(&mut self, now: Instant) {
        while let Some(front) = self.events.front() {
            if now.duration_since(*front) >= self.window {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    /// How many starts may happen right now
    pub fn available(&mut self, now: Instant) -> usize {
        if self.max_events == usize::MAX {
            return usize::MAX;
        }
        self.evict(now);
        self.max_events.saturating_sub(self.events.len())
    }

    /// Record one start
    pub fn record(&mut self, now: Instant) {
        if self.max_events == usize::MAX {
            return;
        }
        self.events.push_back(now);
    }
}
