//! End-to-end discovery runs against the in-memory host
//!
//! Configuration file, CLI overrides, the search stream, the criteria chain,
//! the checkpoint file and the summary report, wired as `main` wires them.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use repo_scout::app::{self, RunSettings};
use repo_scout::checkpoint::CheckpointStore;
use repo_scout::cli::Args;
use repo_scout::config::ConfigManager;
use repo_scout::discovery::StopReason;
use repo_scout::display::ColourManager;
use repo_scout::github::fakes::{flat_tree, sample_candidate, FakeHost, RepoScript};
use tempfile::TempDir;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("repo-scout.toml");
    fs::write(&path, content).expect("Failed to write config file");
    path
}

fn settings_for(dir: &TempDir, config: &str) -> RunSettings {
    let args = Args {
        config_file: Some(write_config(dir, config)),
        output: Some(dir.path().join("data").join("repo-candidates.json")),
        ..Args::default()
    };
    let config = app::load_configuration(&args).expect("Failed to load configuration");
    app::resolve_settings(&args, &config).expect("Failed to resolve settings")
}

/// A host serving `count` passing candidates with ids 1..=count
fn passing_host(count: u64) -> Arc<FakeHost> {
    let host = Arc::new(FakeHost::new());
    host.set_search_results((1..=count).map(sample_candidate).collect());
    for id in 1..=count {
        host.set_repo(id, RepoScript::passing());
    }
    host
}

#[tokio::test]
async fn test_mixed_candidates_only_accepted_are_saved() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(
        &dir,
        r#"
[criteria]
min-files = 40

[discovery]
target-count = 10
"#,
    );
    assert_eq!(settings.criteria.min_files, 40);

    let host = Arc::new(FakeHost::new());
    host.set_search_results((1..=6).map(sample_candidate).collect());
    host.set_repo(1, RepoScript::passing());
    host.set_repo(2, RepoScript::passing().contributors(5));
    host.set_repo(3, RepoScript::passing().recent_commits(0));
    host.set_repo(4, RepoScript::passing().tree(flat_tree(20)));
    host.set_repo(5, RepoScript::passing().contributors(12));
    // 6 has no listings at all and is reported as unavailable

    let report = app::discover(host.clone(), &settings).await.unwrap();

    assert_eq!(report.examined, 6);
    assert_eq!(report.accepted, 2);
    assert_eq!(report.rejected, 4);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.stop_reason, StopReason::SourceExhausted);
    assert_eq!(host.calls().search, 1);

    let records = CheckpointStore::load(&settings.discovery.output).unwrap();
    let saved: Vec<(u64, usize)> = records
        .iter()
        .map(|r| (r.candidate.id, r.contributor_count))
        .collect();
    assert_eq!(saved, vec![(1, 45), (5, 12)]);
}

#[tokio::test]
async fn test_target_count_stops_search_paging() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "[discovery]\ntarget-count = 2\n");

    let host = passing_host(90);
    let report = app::discover(host.clone(), &settings).await.unwrap();

    assert_eq!(report.accepted, 2);
    assert_eq!(report.examined, 2);
    assert_eq!(report.stop_reason, StopReason::TargetReached);
    assert_eq!(host.search_pages_requested(), vec![1]);
}

#[tokio::test]
async fn test_results_span_search_pages() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "[discovery]\ntarget-count = 100\n");

    let host = passing_host(35);
    let report = app::discover(host.clone(), &settings).await.unwrap();

    assert_eq!(report.accepted, 35);
    assert_eq!(host.search_pages_requested(), vec![1, 2]);

    let ids: Vec<u64> = CheckpointStore::load(&settings.discovery.output)
        .unwrap()
        .iter()
        .map(|r| r.candidate.id)
        .collect();
    assert_eq!(ids, (1..=35).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_requests_are_sequential() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "");

    let host = passing_host(5);
    app::discover(host.clone(), &settings).await.unwrap();

    assert_eq!(host.max_in_flight(), 1);
    // Every listing request was preceded by a quota check
    assert_eq!(host.calls().rate_limit, host.calls().detail_calls());
}

#[tokio::test]
async fn test_output_file_layout() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "");

    app::discover(passing_host(1), &settings).await.unwrap();

    let content = fs::read_to_string(&settings.discovery.output).unwrap();
    let value: serde_json::Value = serde_json::from_str(&content).unwrap();
    let entry = &value.as_array().unwrap()[0];

    assert_eq!(entry["id"], 1);
    assert_eq!(entry["full_name"], "owner1/project-1");
    assert_eq!(entry["stargazers_count"], 10);
    assert_eq!(entry["num_contributors"], 45);
}

#[tokio::test]
async fn test_summary_reads_discovery_output() {
    let dir = TempDir::new().unwrap();
    let settings = settings_for(&dir, "");

    let host = Arc::new(FakeHost::new());
    host.set_search_results(vec![sample_candidate(1), sample_candidate(5)]);
    host.set_repo(1, RepoScript::passing().contributors(20));
    host.set_repo(5, RepoScript::passing().contributors(40));
    app::discover(host, &settings).await.unwrap();

    let summary = app::run_summary(&settings.discovery.output, &ColourManager::with_colours(false)).unwrap();

    assert_eq!(summary.rows.len(), 2);
    let stars = summary.stars.unwrap();
    assert_eq!((stars.min, stars.max), (10, 50));
    assert_eq!(summary.contributors.unwrap().mean, 30.0);
}

#[test]
fn test_summary_of_missing_file_fails() {
    let dir = TempDir::new().unwrap();
    let err = app::run_summary(&dir.path().join("absent.json"), &ColourManager::with_colours(false)).unwrap_err();
    assert!(err.to_string().contains("Failed to read candidates"));
}

#[test]
fn test_section_selection_overrides_criteria() {
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[criteria]
min-contributors = 10

[strict]
min-contributors = 25
"#,
    );

    let mut config = ConfigManager::load_from_file(path).unwrap();
    assert_eq!(config.get_criteria().unwrap().min_contributors, 10);

    config.select_section("strict".to_string());
    assert_eq!(config.get_criteria().unwrap().min_contributors, 25);
}
