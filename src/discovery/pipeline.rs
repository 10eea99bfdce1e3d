//! Discovery loop
//!
//! Pulls candidates from the search stream one at a time, validates each with
//! the retry policy applied, and checkpoints every acceptance. Stops when the
//! target count is reached or the stream ends.

use std::fmt;

use futures::StreamExt;
use log::{info, warn};

use super::error::{DiscoveryError, DiscoveryResult};
use super::retry::{RetryBudget, RetryDecision, RetryPolicy};
use super::validator::{CandidateValidator, Verdict};
use crate::checkpoint::{CandidateRecord, CheckpointStore};
use crate::github::{CandidateStream, RawCandidate, RepositoryHost};

pub const DEFAULT_TARGET_COUNT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    TargetReached,
    SourceExhausted,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::TargetReached => write!(f, "target count reached"),
            StopReason::SourceExhausted => write!(f, "search results exhausted"),
        }
    }
}

/// Totals for one discovery run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryReport {
    pub examined: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Candidates dropped after their retry budget ran out
    pub skipped: usize,
    pub retries: usize,
    pub quota_waits: usize,
    pub stop_reason: StopReason,
}

impl DiscoveryReport {
    fn new() -> Self {
        Self {
            examined: 0,
            accepted: 0,
            rejected: 0,
            skipped: 0,
            retries: 0,
            quota_waits: 0,
            stop_reason: StopReason::SourceExhausted,
        }
    }
}

pub struct DiscoveryLoop<H: ?Sized> {
    validator: CandidateValidator<H>,
    policy: RetryPolicy,
    target_count: usize,
}

impl<H: RepositoryHost + ?Sized> DiscoveryLoop<H> {
    pub fn new(validator: CandidateValidator<H>, policy: RetryPolicy, target_count: usize) -> Self {
        Self {
            validator,
            policy,
            target_count,
        }
    }

    pub async fn run(
        &self,
        mut candidates: CandidateStream<'_>,
        store: &mut CheckpointStore,
    ) -> DiscoveryResult<DiscoveryReport> {
        let mut report = DiscoveryReport::new();
        let mut search_budget = RetryBudget::new();

        loop {
            if report.accepted >= self.target_count {
                report.stop_reason = StopReason::TargetReached;
                break;
            }

            let candidate = match candidates.next().await {
                None => {
                    report.stop_reason = StopReason::SourceExhausted;
                    break;
                }
                Some(Ok(candidate)) => {
                    search_budget = RetryBudget::new();
                    candidate
                }
                Some(Err(e)) => {
                    match self.policy.decide(e.kind(), &mut search_budget) {
                        RetryDecision::Retry => {
                            warn!("Search request failed: {} - trying again", e);
                            report.retries += 1;
                        }
                        RetryDecision::WaitUntil(reset_at) => {
                            self.validator.gate().wait_for_reset(reset_at).await;
                        }
                        RetryDecision::GiveUp | RetryDecision::Abort => return Err(DiscoveryError::Search(e)),
                    }
                    continue;
                }
            };

            report.examined += 1;
            info!(
                "{} {} {}",
                candidate.full_name,
                candidate.language.as_deref().unwrap_or("-"),
                candidate.created_at
            );

            match self.validate_with_retry(&candidate, &mut report).await? {
                Some(Verdict::Accepted { contributor_count }) => {
                    store.append(CandidateRecord::from_candidate(&candidate, contributor_count))?;
                    report.accepted += 1;
                    info!("found {} candidate repos", report.accepted);
                }
                Some(Verdict::Rejected(_)) => report.rejected += 1,
                None => report.skipped += 1,
            }
        }

        report.quota_waits = self.validator.gate().waits();
        Ok(report)
    }

    /// Validate `candidate` until it gets a verdict; `None` means it was skipped
    async fn validate_with_retry(
        &self,
        candidate: &RawCandidate,
        report: &mut DiscoveryReport,
    ) -> DiscoveryResult<Option<Verdict>> {
        let mut budget = RetryBudget::new();

        loop {
            let error = match self.validator.validate(candidate).await {
                Ok(verdict) => return Ok(Some(verdict)),
                Err(e) => e,
            };

            match self.policy.decide(error.kind(), &mut budget) {
                RetryDecision::Retry => {
                    warn!("{}: {} - trying again", candidate.full_name, error);
                    report.retries += 1;
                }
                RetryDecision::WaitUntil(reset_at) => {
                    warn!("{}: {} - waiting and then trying again", candidate.full_name, error);
                    self.validator.gate().wait_for_reset(reset_at).await;
                }
                RetryDecision::GiveUp => {
                    warn!("{}: {} - skipping", candidate.full_name, error);
                    return Ok(None);
                }
                RetryDecision::Abort => {
                    return Err(DiscoveryError::Fatal {
                        candidate: candidate.full_name.clone(),
                        source: error,
                    })
                }
            }
        }
    }
}
