//! Repository host trait
//!
//! The seam between the discovery pipeline and the hosting provider. The
//! production implementation is [`GitHubClient`](super::GitHubClient); tests
//! use [`FakeHost`](super::fakes::FakeHost).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::error::ApiResult;
use super::types::{CommitRef, ContentEntry, Contributor, RateLimitState, RawCandidate, SearchQuery};

/// Paged read access to a repository hosting provider
///
/// All page numbers are 1-based. A page shorter than the provider's page size
/// is the last page of its collection.
#[async_trait]
pub trait RepositoryHost: Send + Sync {
    /// Number of items the provider returns on a full page
    fn page_size(&self) -> usize;

    /// One page of repository search results
    async fn search_page(&self, query: &SearchQuery, page: u32) -> ApiResult<Vec<RawCandidate>>;

    /// One page of the contributor listing
    async fn contributors_page(&self, repo: &RawCandidate, page: u32) -> ApiResult<Vec<Contributor>>;

    /// One page of the commit listing, optionally restricted to commits after `since`
    async fn commits_page(
        &self,
        repo: &RawCandidate,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> ApiResult<Vec<CommitRef>>;

    /// Entries of one directory of the default branch; `""` is the root
    async fn contents(&self, repo: &RawCandidate, path: &str) -> ApiResult<Vec<ContentEntry>>;

    /// Current request quota
    async fn rate_limit(&self) -> ApiResult<RateLimitState>;
}
