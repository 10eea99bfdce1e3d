//! Eligibility thresholds
//!
//! One immutable record shared by every validation in a run.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest `per_page` the provider honours
pub const MAX_PAGE_SIZE: usize = 100;

/// Thresholds a candidate must clear to be accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationCriteria {
    /// First contributor page must hold more than this many entries
    pub min_contributors: usize,
    /// First page of commits since `last_month_cutoff` must hold more than this
    pub min_commits_last_month: usize,
    /// Sampled commit count must be at least this
    pub min_total_commits: usize,
    /// File tree walk must reach at least this many entries
    pub min_files: usize,
    /// Start of the recent-activity window
    pub last_month_cutoff: DateTime<Utc>,
    /// Full-page size used by the page-sampling heuristic
    pub page_probe_size: usize,
}

impl Default for ValidationCriteria {
    fn default() -> Self {
        Self {
            min_contributors: 10,
            min_commits_last_month: 1,
            min_total_commits: 100,
            min_files: 50,
            last_month_cutoff: Utc.with_ymd_and_hms(2017, 3, 22, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::MIN_UTC),
            page_probe_size: 30,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CriteriaError {
    #[error("Invalid page-probe-size: {0} must be greater than 0")]
    InvalidProbeSize(usize),
    #[error("Invalid page-probe-size: {0} exceeds the provider page limit of 100")]
    ProbeSizeTooLarge(usize),
    #[error("Cutoff {0} lies in the future")]
    FutureCutoff(DateTime<Utc>),
}

impl ValidationCriteria {
    pub fn validate(&self) -> Result<(), CriteriaError> {
        if self.page_probe_size == 0 {
            return Err(CriteriaError::InvalidProbeSize(self.page_probe_size));
        }
        // A larger probe would make every full provider page look short
        if self.page_probe_size > MAX_PAGE_SIZE {
            return Err(CriteriaError::ProbeSizeTooLarge(self.page_probe_size));
        }
        if self.last_month_cutoff > Utc::now() {
            return Err(CriteriaError::FutureCutoff(self.last_month_cutoff));
        }
        Ok(())
    }

    /// Running file count at which the tree walk stops early
    pub fn file_walk_limit(&self) -> usize {
        self.min_files + 1
    }
}
