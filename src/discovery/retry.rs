//! Per-candidate retry decisions
//!
//! Each recoverable failure class has its own budget. Timeouts retry without
//! limit unless capped, dropped connections retry a fixed number of times, and
//! an exhausted quota waits for the reset before trying again.

use chrono::{DateTime, Utc};

use crate::github::FailureKind;

pub const DEFAULT_CONNECTION_RESET_RETRIES: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Run the same work again immediately
    Retry,
    /// Sleep until the quota resets, then run the same work again
    WaitUntil(DateTime<Utc>),
    /// Stop retrying this unit of work
    GiveUp,
    /// Stop the whole run
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub connection_reset_retries: usize,
    /// `None` retries timeouts without limit
    pub max_timeout_retries: Option<usize>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            connection_reset_retries: DEFAULT_CONNECTION_RESET_RETRIES,
            max_timeout_retries: None,
        }
    }
}

/// Attempts already spent on one unit of work
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryBudget {
    pub timeouts: usize,
    pub connection_resets: usize,
    pub quota_waits: usize,
}

impl RetryBudget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retries(&self) -> usize {
        self.timeouts + self.connection_resets
    }
}

impl RetryPolicy {
    /// Decide what to do about a failure, charging it to `budget`
    pub fn decide(&self, kind: FailureKind, budget: &mut RetryBudget) -> RetryDecision {
        match kind {
            FailureKind::Timeout => {
                if self.max_timeout_retries.is_some_and(|max| budget.timeouts >= max) {
                    return RetryDecision::GiveUp;
                }
                budget.timeouts += 1;
                RetryDecision::Retry
            }
            FailureKind::ConnectionReset => {
                if budget.connection_resets >= self.connection_reset_retries {
                    return RetryDecision::GiveUp;
                }
                budget.connection_resets += 1;
                RetryDecision::Retry
            }
            FailureKind::QuotaExhausted(reset_at) => {
                budget.quota_waits += 1;
                RetryDecision::WaitUntil(reset_at)
            }
            FailureKind::Fatal => RetryDecision::Abort,
            // Never retried; only one request is affected
            FailureKind::Permanent => RetryDecision::GiveUp,
        }
    }
}
