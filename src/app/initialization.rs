//! Application initialization and configuration

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use log::{debug, LevelFilter};

use crate::cli::date_parser::parse_date;
use crate::config::DiscoverySettings;
use crate::discovery::ValidationCriteria;
use crate::github::{ClientSettings, SearchQuery};
use crate::{cli, config, display, logging};

/// Everything a discovery or summary run needs, after CLI overrides
#[derive(Debug, Clone)]
pub struct RunSettings {
    pub criteria: ValidationCriteria,
    pub query: SearchQuery,
    pub discovery: DiscoverySettings,
    pub client: ClientSettings,
    pub credentials_path: PathBuf,
}

pub fn load_configuration(args: &cli::Args) -> Result<config::ConfigManager> {
    let mut manager = if let Some(config_file) = &args.config_file {
        debug!("Loading configuration from explicit file: {}", config_file.display());
        config::ConfigManager::load_from_file(config_file.clone())?
    } else {
        config::ConfigManager::load()?
    };

    if let Some(section_name) = &args.config_name {
        manager.select_section(section_name.clone());
    }

    Ok(manager)
}

/// Merge config file settings with CLI overrides; flags win
pub fn resolve_settings(args: &cli::Args, config: &config::ConfigManager) -> Result<RunSettings> {
    let mut criteria = config.get_criteria()?;
    let mut query = config.get_search_query()?;
    let mut discovery = config.get_discovery_settings()?;

    if let Some(n) = args.min_contributors {
        criteria.min_contributors = n;
    }
    if let Some(n) = args.min_commits_last_month {
        criteria.min_commits_last_month = n;
    }
    if let Some(n) = args.min_total_commits {
        criteria.min_total_commits = n;
    }
    if let Some(n) = args.min_files {
        criteria.min_files = n;
    }
    if let Some(cutoff) = &args.last_month_cutoff {
        criteria.last_month_cutoff = parse_date(cutoff).context("Invalid --last-month-cutoff")?;
    }
    criteria.validate().context("Invalid criteria")?;

    if let Some(language) = &args.language {
        query.language = language.clone();
    }
    if let Some(created) = &args.created_before {
        query.created_before = parse_date(created).context("Invalid --created-before")?;
    }

    if let Some(output) = &args.output {
        discovery.output = output.clone();
    }
    if let Some(target) = args.target {
        discovery.target_count = target;
    }
    discovery.validate()?;

    let mut client = config.get_client_settings(criteria.page_probe_size)?;
    if let Some(url) = &args.api_url {
        client.api_url = url.trim_end_matches('/').to_string();
    }

    let credentials_path = args
        .credentials
        .clone()
        .unwrap_or_else(|| config.get_credentials_path());

    debug!("Criteria: {:?}", criteria);
    debug!("Search: {}", query.qualifiers());
    debug!("Discovery settings: {:?}", discovery);

    Ok(RunSettings {
        criteria,
        query,
        discovery,
        client,
        credentials_path,
    })
}

pub fn configure_logging(args: &cli::Args, config: &config::ConfigManager) -> Result<logging::LogConfig> {
    let console_level = if args.debug {
        LevelFilter::Trace
    } else if args.verbose {
        LevelFilter::Debug
    } else if args.quiet {
        LevelFilter::Error
    } else {
        config.get_log_level("base", "console-level")?.unwrap_or(LevelFilter::Info)
    };

    let format = if args.log_format != "text" {
        logging::LogFormat::from_str(&args.log_format).map_err(|e| anyhow::anyhow!(e))?
    } else {
        match config.get_value("base", "log-format") {
            Some(format_str) => logging::LogFormat::from_str(format_str).map_err(|e| anyhow::anyhow!(e))?,
            None => logging::LogFormat::Text,
        }
    };

    let log_file_path = args.log_file.clone().or_else(|| config.get_path("base", "log-file"));

    let file_log_level = match &args.log_file_level {
        Some(level_str) => Some(logging::parse_log_level(level_str)?),
        None => config.get_log_level("base", "file-log-level")?,
    };

    let (destination, file_level) = match (log_file_path, file_log_level) {
        (Some(file_path), level) => (
            logging::LogDestination::Both(file_path),
            Some(level.unwrap_or(console_level)),
        ),
        (None, None) => (logging::LogDestination::Console, None),
        (None, Some(_)) => {
            return Err(anyhow::anyhow!("file-log-level is set but no log file was given"));
        }
    };

    Ok(logging::LogConfig {
        console_level,
        file_level,
        format,
        destination,
    })
}

pub fn create_colour_manager(args: &cli::Args, config: &config::ConfigManager) -> display::ColourManager {
    let config_enabled = config.get_bool("base", "color").ok().flatten();
    display::ColourManager::from_args(args.no_color, config_enabled)
}
