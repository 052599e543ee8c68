//! Shared fixed-interval gate for stage-2 requests
//!
//! One limiter is shared by every fetch worker, so the pool as a whole makes
//! at most one request per interval no matter how many workers run.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Interval, MissedTickBehavior};

/// Smallest interval accepted; tokio rejects a zero period
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A ticking gate; each tick lets exactly one caller through
#[derive(Debug)]
pub struct RateLimiter {
    ticker: Mutex<Interval>,
    period: Duration,
}

impl RateLimiter {
    /// Creates a limiter whose first tick is immediate
    pub fn new(period: Duration) -> Self {
        let period = period.max(MIN_INTERVAL);
        let mut ticker = tokio::time::interval(period);
        // Idle time does not bank ticks for a later burst
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Self {
            ticker: Mutex::new(ticker),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Waits for the next tick
    ///
    /// Waiters are served in arrival order; the ticker lock is fair.
    pub async fn tick(&self) {
        self.ticker.lock().await.tick().await;
    }
}
