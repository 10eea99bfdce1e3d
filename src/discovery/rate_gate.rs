//! Request quota gate
//!
//! Every remote call in the criteria chain is preceded by
//! [`RateGate::check_and_wait`]. When the remaining quota drops below the
//! safety margin the caller is suspended once, until the provider's reset time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::github::{ApiResult, RateLimitState, RepositoryHost};

pub const DEFAULT_SAFETY_MARGIN: u64 = 50;
pub const DEFAULT_RESET_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug)]
pub struct RateGate {
    safety_margin: u64,
    reset_grace: Duration,
    waits: AtomicUsize,
}

impl Default for RateGate {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_MARGIN, DEFAULT_RESET_GRACE)
    }
}

impl RateGate {
    pub fn new(safety_margin: u64, reset_grace: Duration) -> Self {
        Self {
            safety_margin,
            reset_grace,
            waits: AtomicUsize::new(0),
        }
    }

    pub fn safety_margin(&self) -> u64 {
        self.safety_margin
    }

    /// Number of quota sleeps performed so far
    pub fn waits(&self) -> usize {
        self.waits.load(Ordering::Relaxed)
    }

    /// Read the quota and, when it is below the margin, sleep until reset
    pub async fn check_and_wait<H>(&self, host: &H) -> ApiResult<RateLimitState>
    where
        H: RepositoryHost + ?Sized,
    {
        let state = host.rate_limit().await?;
        debug!("Requests remaining: {} (resets at {})", state.remaining, state.reset_at);

        if state.remaining >= self.safety_margin {
            return Ok(state);
        }

        let pause = until(state.reset_at);
        if pause.is_zero() {
            debug!("Quota below margin but reset time {} has passed", state.reset_at);
            return Ok(state);
        }

        warn!(
            "Only {} requests remaining, sleeping {}s until {}",
            state.remaining,
            pause.as_secs(),
            state.reset_at
        );
        self.waits.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(pause).await;

        host.rate_limit().await
    }

    /// Sleep until `reset_at` plus the reset grace, for rate-limit errors that
    /// got past the gate. Returns the time slept.
    pub async fn wait_for_reset(&self, reset_at: DateTime<Utc>) -> Duration {
        let pause = until(reset_at) + self.reset_grace;
        warn!("Rate limit exceeded, sleeping {}s until {}", pause.as_secs(), reset_at);
        self.waits.fetch_add(1, Ordering::Relaxed);
        tokio::time::sleep(pause).await;
        pause
    }
}

/// Time from now until `instant`, zero if it is already past
fn until(instant: DateTime<Utc>) -> Duration {
    (instant - Utc::now()).to_std().unwrap_or(Duration::ZERO)
}
