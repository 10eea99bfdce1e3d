//! Remote record types
//!
//! Shapes returned by the hosting provider's REST API. Only the fields the
//! discovery pipeline reads are modelled; everything else is ignored during
//! deserialization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cli::date_parser::format_search_date;

/// One repository record from a search result page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    pub id: u64,
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Null for repositories that never received a push
    pub pushed_at: Option<DateTime<Utc>>,
    pub language: Option<String>,
    pub stargazers_count: u64,
    pub watchers_count: u64,
    pub default_branch: String,
}

/// Search result envelope
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total_count: u64,
    #[serde(default)]
    pub incomplete_results: bool,
    pub items: Vec<RawCandidate>,
}

/// A contributor listing entry (anonymous contributors carry no login)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Contributor {
    pub login: Option<String>,
    #[serde(default)]
    pub contributions: u64,
}

/// A commit listing entry
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommitRef {
    pub sha: String,
}

/// Type of a repository tree entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

/// One entry of a directory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentEntry {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
}

impl ContentEntry {
    pub fn file(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::File }
    }

    pub fn dir(path: impl Into<String>) -> Self {
        Self { path: path.into(), kind: EntryKind::Dir }
    }

    pub fn is_dir(&self) -> bool {
        self.kind == EntryKind::Dir
    }
}

/// Remaining request quota and the instant it resets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitState {
    pub remaining: u64,
    pub reset_at: DateTime<Utc>,
}

impl RateLimitState {
    pub fn new(remaining: u64, reset_at: DateTime<Utc>) -> Self {
        Self { remaining, reset_at }
    }
}

/// Search predicate for candidate repositories
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    /// Only repositories created strictly before this date
    pub created_before: DateTime<Utc>,
    pub language: String,
    pub sort: String,
    pub order: String,
}

impl SearchQuery {
    /// Render the `q` parameter, e.g. `created:<2016-04-22 language:Java`
    pub fn qualifiers(&self) -> String {
        format!(
            "created:<{} language:{}",
            format_search_date(&self.created_before),
            self.language
        )
    }
}
