//! Rate limiting for inbound WebSocket commands.
//!
//! Keeps one misbehaving connection from flooding its room with command
//! traffic. Sliding window: a command is allowed while fewer than `limit`
//! commands landed within the trailing window.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Sliding-window command limiter, one per connection.
#[derive(Debug)]
pub struct CommandRateLimiter {
    sent: VecDeque<Instant>,
    limit: usize,
    window: Duration,
}

impl CommandRateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self {
            sent: VecDeque::with_capacity(limit),
            limit,
            window,
        }
    }

    /// Limiter sized for a betting UI: a human clicking fast stays well
    /// under this, a script hammering the socket does not.
    pub fn per_connection() -> Self {
        Self::new(15, Duration::from_secs(1))
    }

    /// Record a command attempt; returns `false` when it should be dropped.
    pub fn allow(&mut self) -> bool {
        let now = Instant::now();
        while let Some(oldest) = self.sent.front() {
            if now.duration_since(*oldest) > self.window {
                self.sent.pop_front();
            } else {
                break;
            }
        }

        if self.sent.len() >= self.limit {
            return false;
        }
        self.sent.push_back(now);
        true
    }
}
