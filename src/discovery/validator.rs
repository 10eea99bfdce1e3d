//! Criteria chain for a single candidate
//!
//! Checks run cheapest first and stop at the first failed threshold:
//!
//! 1. first contributor page holds more than `min_contributors`
//! 2. first page of commits since the cutoff holds more than `min_commits_last_month`
//! 3. sampled commit count is at least `min_total_commits`
//! 4. depth-first file walk reaches at least `min_files`
//! 5. full contributor enumeration for the accepted record
//!
//! The rate gate is consulted before every remote call.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, info, warn};

use super::criteria::ValidationCriteria;
use super::rate_gate::RateGate;
use super::sampler::{PageSampler, PageSource};
use crate::github::{ApiResult, FailureKind, RawCandidate, RepositoryHost};

/// Why a candidate was turned down
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    TooFewContributors { found: usize, required: usize },
    TooFewRecentCommits { found: usize, required: usize },
    TooFewCommits { found: usize, required: usize },
    TooFewFiles { found: usize, required: usize },
    /// The provider refused one of the listings outright
    Unavailable { reason: String },
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::TooFewContributors { found, required } => {
                write!(f, "not enough contributors ({} on first page, need more than {})", found, required)
            }
            Rejection::TooFewRecentCommits { found, required } => {
                write!(f, "not enough commits last month ({}, need more than {})", found, required)
            }
            Rejection::TooFewCommits { found, required } => {
                write!(f, "not enough commits ({}, need {})", found, required)
            }
            Rejection::TooFewFiles { found, required } => {
                write!(f, "not enough files ({}, need {})", found, required)
            }
            Rejection::Unavailable { reason } => write!(f, "listing unavailable: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Accepted { contributor_count: usize },
    Rejected(Rejection),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted { .. })
    }

    /// Exact contributor count when accepted, zero otherwise
    pub fn contributor_count(&self) -> usize {
        match self {
            Verdict::Accepted { contributor_count } => *contributor_count,
            Verdict::Rejected(_) => 0,
        }
    }
}

pub struct CandidateValidator<H: ?Sized> {
    host: Arc<H>,
    criteria: ValidationCriteria,
    gate: RateGate,
}

impl<H: RepositoryHost + ?Sized> CandidateValidator<H> {
    pub fn new(host: Arc<H>, criteria: ValidationCriteria, gate: RateGate) -> Self {
        Self { host, criteria, gate }
    }

    pub fn criteria(&self) -> &ValidationCriteria {
        &self.criteria
    }

    pub fn gate(&self) -> &RateGate {
        &self.gate
    }

    /// Run the full chain from step 1
    ///
    /// Permanent provider failures become [`Rejection::Unavailable`]. Retryable
    /// and fatal failures are returned for the caller's retry policy.
    pub async fn validate(&self, candidate: &RawCandidate) -> ApiResult<Verdict> {
        match self.run_chain(candidate).await {
            Err(e) if e.kind() == FailureKind::Permanent => {
                warn!("{}: {} - rejecting", candidate.full_name, e);
                Ok(Verdict::Rejected(Rejection::Unavailable { reason: e.to_string() }))
            }
            result => result,
        }
    }

    async fn run_chain(&self, candidate: &RawCandidate) -> ApiResult<Verdict> {
        let criteria = &self.criteria;

        debug!("Checking contributors of {}", candidate.full_name);
        self.gate.check_and_wait(&*self.host).await?;
        let contributors = self.host.contributors_page(candidate, 1).await?.len();
        if contributors <= criteria.min_contributors {
            return Ok(reject(Rejection::TooFewContributors {
                found: contributors,
                required: criteria.min_contributors,
            }));
        }

        debug!("Checking commits since {} of {}", criteria.last_month_cutoff, candidate.full_name);
        self.gate.check_and_wait(&*self.host).await?;
        let recent = self
            .host
            .commits_page(candidate, Some(criteria.last_month_cutoff), 1)
            .await?
            .len();
        if recent <= criteria.min_commits_last_month {
            return Ok(reject(Rejection::TooFewRecentCommits {
                found: recent,
                required: criteria.min_commits_last_month,
            }));
        }

        debug!("Checking total commits of {}", candidate.full_name);
        let mut history = CommitHistory {
            host: &*self.host,
            gate: &self.gate,
            candidate,
        };
        let commits =
            PageSampler::count_at_least(&mut history, criteria.page_probe_size, criteria.min_total_commits).await?;
        if commits < criteria.min_total_commits {
            return Ok(reject(Rejection::TooFewCommits {
                found: commits,
                required: criteria.min_total_commits,
            }));
        }

        debug!("Checking files of {}", candidate.full_name);
        let files = self.count_files(candidate).await?;
        if files < criteria.min_files {
            return Ok(reject(Rejection::TooFewFiles {
                found: files,
                required: criteria.min_files,
            }));
        }

        let contributor_count = self.count_all_contributors(candidate).await?;
        debug!("{} has {} contributors", candidate.full_name, contributor_count);
        Ok(Verdict::Accepted { contributor_count })
    }

    /// Depth-first walk over directory entries, stopping once the count passes
    /// the walk limit
    async fn count_files(&self, candidate: &RawCandidate) -> ApiResult<usize> {
        let limit = self.criteria.file_walk_limit();
        let mut count = 0;

        self.gate.check_and_wait(&*self.host).await?;
        let root = self.host.contents(candidate, "").await?;
        let mut stack = vec![root.into_iter()];

        while let Some(level) = stack.last_mut() {
            let Some(entry) = level.next() else {
                stack.pop();
                continue;
            };

            count += 1;
            if count > limit {
                break;
            }
            if entry.is_dir() {
                self.gate.check_and_wait(&*self.host).await?;
                let children = self.host.contents(candidate, &entry.path).await?;
                stack.push(children.into_iter());
            }
        }

        debug!("Files retrieved: {}", count);
        Ok(count)
    }

    async fn count_all_contributors(&self, candidate: &RawCandidate) -> ApiResult<usize> {
        let page_size = self.host.page_size();
        let mut total = 0;
        let mut page = 1;

        loop {
            self.gate.check_and_wait(&*self.host).await?;
            let size = self.host.contributors_page(candidate, page).await?.len();
            total += size;
            if size == 0 || size < page_size {
                return Ok(total);
            }
            page += 1;
        }
    }
}

fn reject(reason: Rejection) -> Verdict {
    info!("{}", reason);
    Verdict::Rejected(reason)
}

/// Unfiltered commit listing of one candidate, gated page by page
struct CommitHistory<'a, H: ?Sized> {
    host: &'a H,
    gate: &'a RateGate,
    candidate: &'a RawCandidate,
}

#[async_trait]
impl<H: RepositoryHost + ?Sized> PageSource for CommitHistory<'_, H> {
    async fn fetch_page(&mut self, page: u32) -> ApiResult<usize> {
        self.gate.check_and_wait(self.host).await?;
        Ok(self.host.commits_page(self.candidate, None, page).await?.len())
    }
}
