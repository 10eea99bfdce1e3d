//! Error Recovery Tests
//!
//! Transient failures are retried, exhausted budgets skip the candidate, and
//! fatal failures stop the run with everything accepted so far on disk.

use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use repo_scout::app::{self, RunSettings};
use repo_scout::checkpoint::CheckpointStore;
use repo_scout::config::DiscoverySettings;
use repo_scout::discovery::{DiscoveryError, ValidationCriteria};
use repo_scout::github::fakes::{sample_candidate, sample_query, Endpoint, FakeHost, RepoScript};
use repo_scout::github::{ApiError, ClientSettings, RateLimitState};
use tempfile::TempDir;

fn settings(dir: &TempDir, target: usize) -> RunSettings {
    RunSettings {
        criteria: ValidationCriteria::default(),
        query: sample_query(),
        discovery: DiscoverySettings {
            target_count: target,
            output: dir.path().join("repo-candidates.json"),
            ..DiscoverySettings::default()
        },
        client: ClientSettings::default(),
        credentials_path: dir.path().join("config"),
    }
}

fn passing_host(count: u64) -> Arc<FakeHost> {
    let host = Arc::new(FakeHost::new());
    host.set_search_results((1..=count).map(sample_candidate).collect());
    for id in 1..=count {
        host.set_repo(id, RepoScript::passing());
    }
    host
}

fn saved_ids(settings: &RunSettings) -> Vec<u64> {
    CheckpointStore::load(&settings.discovery.output)
        .unwrap()
        .iter()
        .map(|r| r.candidate.id)
        .collect()
}

#[tokio::test]
async fn test_timeouts_are_retried() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(2);
    host.fail_next(Endpoint::Contributors, ApiError::Timeout("read timed out".into()));
    host.fail_next(Endpoint::Contributors, ApiError::Timeout("read timed out".into()));

    let report = app::discover(host, &settings).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(report.retries, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(saved_ids(&settings), vec![1, 2]);
}

#[tokio::test]
async fn test_repeated_connection_reset_skips_candidate() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(2);
    host.fail_next(Endpoint::Commits, ApiError::ConnectionReset("connection reset by peer".into()));
    host.fail_next(Endpoint::Commits, ApiError::ConnectionReset("connection reset by peer".into()));

    let report = app::discover(host, &settings).await.unwrap();

    assert_eq!(report.examined, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.retries, 1);
    assert_eq!(saved_ids(&settings), vec![2]);
}

#[tokio::test]
async fn test_single_connection_reset_recovers() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(1);
    host.fail_next(Endpoint::Contents, ApiError::ConnectionReset("connection reset by peer".into()));

    let report = app::discover(host, &settings).await.unwrap();

    assert_eq!(report.accepted, 1);
    assert_eq!(report.skipped, 0);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_quota_waits_for_reset() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(1);
    host.fail_next(
        Endpoint::Contributors,
        ApiError::RateLimited { reset_at: Utc::now() + ChronoDuration::seconds(3) },
    );

    let start = tokio::time::Instant::now();
    let report = app::discover(host, &settings).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(3));
    assert_eq!(report.accepted, 1);
    assert_eq!(report.quota_waits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_low_quota_suspends_before_request() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(1);
    host.push_rate_limit(RateLimitState::new(3, Utc::now() + ChronoDuration::seconds(20)));
    host.push_rate_limit(RateLimitState::new(5000, Utc::now() + ChronoDuration::hours(1)));

    let start = tokio::time::Instant::now();
    let report = app::discover(host, &settings).await.unwrap();

    assert!(start.elapsed() >= Duration::from_secs(19));
    assert_eq!(report.accepted, 1);
    assert!(report.quota_waits >= 1);
}

#[tokio::test]
async fn test_search_timeout_requests_same_page_again() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 100);
    let host = passing_host(35);
    host.fail_search_page(2, ApiError::Timeout("read timed out".into()));

    let report = app::discover(host.clone(), &settings).await.unwrap();

    assert_eq!(report.accepted, 35);
    assert_eq!(report.retries, 1);
    assert_eq!(host.search_pages_requested(), vec![1, 2, 2]);
}

#[tokio::test]
async fn test_revoked_credentials_stop_run_with_partial_results() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 100);
    let host = passing_host(35);
    host.fail_search_page(2, ApiError::Unauthorized("bad credentials".into()));

    let err = app::discover(host, &settings).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DiscoveryError>(),
        Some(DiscoveryError::Search(ApiError::Unauthorized(_)))
    ));
    assert_eq!(saved_ids(&settings), (1..=30).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_unauthorized_listing_is_fatal() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(2);
    host.fail_next(Endpoint::Contributors, ApiError::Unauthorized("bad credentials".into()));

    let err = app::discover(host.clone(), &settings).await.unwrap_err();

    assert!(matches!(
        err.downcast_ref::<DiscoveryError>(),
        Some(DiscoveryError::Fatal { .. })
    ));
    assert_eq!(host.calls().contributors, 1);
}

#[tokio::test]
async fn test_server_error_on_first_search_page_is_fatal() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(3);
    host.fail_search_page(1, ApiError::status(500, "internal server error"));

    let err = app::discover(host.clone(), &settings).await.unwrap_err();

    assert!(matches!(err.downcast_ref::<DiscoveryError>(), Some(DiscoveryError::Search(_))));
    assert_eq!(host.calls().detail_calls(), 0);
}

#[tokio::test]
async fn test_missing_repository_is_rejected_not_fatal() {
    let dir = TempDir::new().unwrap();
    let settings = settings(&dir, 10);
    let host = passing_host(2);
    host.set_search_results(vec![sample_candidate(1), sample_candidate(99), sample_candidate(2)]);

    let report = app::discover(host, &settings).await.unwrap();

    assert_eq!(report.rejected, 1);
    assert_eq!(saved_ids(&settings), vec![1, 2]);
}
