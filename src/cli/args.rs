use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::{debug, info};

use super::date_parser::parse_date;

/// Repository candidate discovery tool
#[derive(Parser, Debug, Default)]
#[command(name = "repo-scout")]
#[command(about = "Discovers GitHub repositories meeting age, contributor, commit and file-count criteria and checkpoints them for metrics collection")]
#[command(version)]
pub struct Args {
    /// Verbose output (debug level logging)
    #[arg(short, long)]
    pub verbose: bool,

    /// Quiet output (error level logging only)
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug output (trace level logging)
    #[arg(long)]
    pub debug: bool,

    /// Log format: text or json
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log file path for file output
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Log level for file output (independent of console level)
    #[arg(long, value_name = "LEVEL")]
    pub log_file_level: Option<String>,

    /// Configuration file path
    #[arg(long, value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Configuration section name
    #[arg(long, value_name = "SECTION")]
    pub config_name: Option<String>,

    /// Disable coloured output
    #[arg(long)]
    pub no_color: bool,

    // ============ DISCOVERY ============

    /// Credentials file: principal on the first line, secret on the second
    #[arg(short = 'c', long = "credentials", value_name = "FILE")]
    pub credentials: Option<PathBuf>,

    /// Candidate output file (JSON array, rewritten after every acceptance)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Stop after this many accepted candidates
    #[arg(short = 't', long = "target", value_name = "N")]
    pub target: Option<usize>,

    /// Repository language qualifier for the search
    #[arg(short = 'l', long = "language", value_name = "LANG")]
    pub language: Option<String>,

    /// Only consider repositories created before this date
    #[arg(long = "created-before", value_name = "DATE")]
    pub created_before: Option<String>,

    /// Start of the recent-activity window (ISO 8601 or relative like "1 month ago")
    #[arg(long = "last-month-cutoff", value_name = "DATE")]
    pub last_month_cutoff: Option<String>,

    /// Contributor first page must exceed this count
    #[arg(long = "min-contributors", value_name = "N")]
    pub min_contributors: Option<usize>,

    /// Commits since the cutoff must exceed this count
    #[arg(long = "min-commits-last-month", value_name = "N")]
    pub min_commits_last_month: Option<usize>,

    /// Minimum total commit count
    #[arg(long = "min-total-commits", value_name = "N")]
    pub min_total_commits: Option<usize>,

    /// Minimum file count in the default branch tree
    #[arg(long = "min-files", value_name = "N")]
    pub min_files: Option<usize>,

    /// Base URL of the hosting provider's REST API
    #[arg(long = "api-url", value_name = "URL")]
    pub api_url: Option<String>,

    /// Summarize an existing candidate file instead of running discovery
    #[arg(long)]
    pub summarize: bool,
}

/// Parse command line arguments
pub fn parse_args() -> Args {
    let args = Args::parse();
    debug!("Parsed CLI arguments: {:?}", args);
    args
}

/// Validate CLI argument combinations
pub fn validate_args(args: &Args) -> Result<()> {
    debug!("Validating CLI argument combinations");

    let log_flags_count = [args.verbose, args.quiet, args.debug]
        .iter()
        .filter(|&&flag| flag)
        .count();

    if log_flags_count > 1 {
        return Err(anyhow::anyhow!(
            "Conflicting log level flags: only one of --verbose, --quiet, or --debug may be specified"
        ));
    }

    match args.log_format.to_lowercase().as_str() {
        "text" | "json" => {},
        _ => return Err(anyhow::anyhow!(
            "Invalid log format '{}'. Valid options: text, json", args.log_format
        )),
    }

    if let Some(ref level) = args.log_file_level {
        match level.to_lowercase().as_str() {
            "error" | "warn" | "info" | "debug" | "trace" => {},
            _ => return Err(anyhow::anyhow!(
                "Invalid log file level '{}'. Valid levels: error, warn, info, debug, trace", level
            )),
        }
    }

    if args.log_file_level.is_some() && args.log_file.is_none() {
        return Err(anyhow::anyhow!(
            "--log-file-level requires --log-file to be specified"
        ));
    }

    if args.target == Some(0) {
        return Err(anyhow::anyhow!("--target must be greater than 0"));
    }

    for (flag, value) in [
        ("--created-before", &args.created_before),
        ("--last-month-cutoff", &args.last_month_cutoff),
    ] {
        if let Some(date) = value {
            parse_date(date).map_err(|e| anyhow::anyhow!("Invalid {} value: {}", flag, e))?;
        }
    }

    if args.summarize && args.credentials.is_some() {
        return Err(anyhow::anyhow!(
            "--summarize reads an existing candidate file and does not use --credentials"
        ));
    }

    info!("CLI arguments validated successfully");
    Ok(())
}
