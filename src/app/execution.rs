//! Discovery and summary commands

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use log::{debug, info};

use super::initialization::RunSettings;
use crate::checkpoint::CheckpointStore;
use crate::credentials::Credentials;
use crate::discovery::{CandidateValidator, DiscoveryLoop, DiscoveryReport};
use crate::display::ColourManager;
use crate::github::{search_candidates, GitHubClient, RepositoryHost};
use crate::summary::CandidateSummary;

/// Run discovery against GitHub with the configured credentials
pub async fn run_discovery(settings: &RunSettings) -> Result<DiscoveryReport> {
    let credentials = Credentials::load(&settings.credentials_path)
        .with_context(|| format!("Failed to load credentials from {}", settings.credentials_path.display()))?;
    debug!("Authenticating as {}", credentials.principal());

    let client = GitHubClient::new(settings.client.clone(), credentials).context("Failed to create GitHub client")?;
    discover(Arc::new(client), settings).await
}

/// Run discovery against any repository host
pub async fn discover<H>(host: Arc<H>, settings: &RunSettings) -> Result<DiscoveryReport>
where
    H: RepositoryHost + ?Sized,
{
    let mut store = CheckpointStore::create(&settings.discovery.output)
        .with_context(|| format!("Failed to prepare output {}", settings.discovery.output.display()))?;

    info!(
        "Searching for {} candidates matching {}",
        settings.discovery.target_count,
        settings.query.qualifiers()
    );

    let validator = CandidateValidator::new(
        Arc::clone(&host),
        settings.criteria.clone(),
        settings.discovery.rate_gate(),
    );
    let discovery = DiscoveryLoop::new(
        validator,
        settings.discovery.retry_policy(),
        settings.discovery.target_count,
    );

    let stream = search_candidates(host, settings.query.clone());
    let report = discovery.run(stream, &mut store).await?;

    info!(
        "Discovery finished ({}): examined {}, accepted {}, rejected {}, skipped {}, retries {}, quota waits {}",
        report.stop_reason,
        report.examined,
        report.accepted,
        report.rejected,
        report.skipped,
        report.retries,
        report.quota_waits
    );
    info!("Candidates saved to {}", store.path().display());
    Ok(report)
}

/// Print id, stars and contributors for every candidate in `path`
pub fn run_summary(path: &Path, colours: &ColourManager) -> Result<CandidateSummary> {
    let records = CheckpointStore::load(path)
        .with_context(|| format!("Failed to read candidates from {}", path.display()))?;
    debug!("Loaded {} candidates from {}", records.len(), path.display());

    let summary = CandidateSummary::from_records(&records);
    print!("{}", summary.render(colours));
    Ok(summary)
}
