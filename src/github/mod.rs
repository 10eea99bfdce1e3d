//! Remote hosting provider access
//!
//! Search and per-repository listings from the GitHub REST API, behind the
//! [`RepositoryHost`] trait so the discovery pipeline can run against the
//! in-memory [`fakes::FakeHost`] as well.

pub mod client;
pub mod error;
pub mod fakes;
pub mod host;
pub mod search;
pub mod types;

pub use client::{ClientSettings, GitHubClient};
pub use error::{ApiError, ApiResult, FailureKind};
pub use host::RepositoryHost;
pub use search::{search_candidates, CandidateStream};
pub use types::{CommitRef, ContentEntry, Contributor, EntryKind, RateLimitState, RawCandidate, SearchQuery};
