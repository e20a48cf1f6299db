//! # Sliding-Window Rate Limiter
//!
//! Caps outbound requests to `N` per rolling window (one second by default).
//! Unlike a fixed bucket that resets on the second, the window slides with
//! every admission, so bursts straddling a bucket boundary are still bounded.

use crate::clock::{Clock, SystemClock};
use crate::constants::RATE_WINDOW;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// The admission timestamps inside the trailing window.
///
/// All methods take the current instant as an argument, so the arithmetic is
/// independent of any real clock.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    capacity: usize,
    window: Duration,
    admissions: VecDeque<Instant>,
}

impl SlidingWindow {
    pub fn new(capacity: usize, window: Duration) -> Self {
        Self {
            capacity: capacity.max(1),
            window,
            admissions: VecDeque::with_capacity(capacity.max(1)),
        }
    }

    /// Drops admissions that are a full window or more older than `now`.
    pub fn evict(&mut self, now: Instant) {
        while let Some(&oldest) = self.admissions.front() {
            if now.saturating_duration_since(oldest) >= self.window {
                self.admissions.pop_front();
            } else {
                break;
            }
        }
    }

    /// How long a caller arriving at `now` must wait before it may be
    /// admitted. Zero means it may go immediately.
    pub fn wait_time(&mut self, now: Instant) -> Duration {
        self.evict(now);
        if self.admissions.len() < self.capacity {
            return Duration::ZERO;
        }
        self.admissions
            .front()
            .map(|&oldest| self.window.saturating_sub(now.saturating_duration_since(oldest)))
            .unwrap_or(Duration::ZERO)
    }

    /// Records an admission at `now`.
    pub fn record(&mut self, now: Instant) {
        self.admissions.push_back(now);
    }

    pub fn len(&self) -> usize {
        self.admissions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.admissions.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Serializes callers through a [`SlidingWindow`], suspending them on the
/// injected [`Clock`] until admission is safe.
///
/// The window lock is held across the wait, so concurrent callers sharing one
/// limiter queue up behind each other instead of double-admitting past `N`.
pub struct RateLimiter {
    window: Mutex<SlidingWindow>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// A limiter of `per_second` requests per second on the system clock.
    pub fn new(per_second: usize) -> Self {
        Self::with_clock(per_second, Arc::new(SystemClock))
    }

    pub fn with_clock(per_second: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            window: Mutex::new(SlidingWindow::new(per_second, RATE_WINDOW)),
            clock,
        }
    }

    /// Returns once issuing one more request keeps the window within its
    /// capacity, and records that request.
    pub async fn admit(&self) {
        let mut window = self.window.lock().await;
        loop {
            let wait = window.wait_time(self.clock.now());
            if wait.is_zero() {
                break;
            }
            debug!("Rate limit reached, waiting {wait:?}");
            self.clock.sleep(wait).await;
        }
        window.record(self.clock.now());
    }
}
