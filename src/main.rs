use std::process;

use anyhow::Result;
use log::error;

use repo_scout::{app, cli, logging};

fn main() {
    if let Err(e) = run() {
        error!("Application error: {:#}", e);
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn run() -> Result<()> {
    let args = cli::args::parse_args();

    cli::args::validate_args(&args)?;

    let config_manager = app::load_configuration(&args)?;

    let log_config = app::configure_logging(&args, &config_manager)?;
    logging::init_logger(log_config)?;

    let settings = app::resolve_settings(&args, &config_manager)?;

    if args.summarize {
        let colours = app::create_colour_manager(&args, &config_manager);
        app::run_summary(&settings.discovery.output, &colours)?;
        return Ok(());
    }

    // Discovery is strictly sequential; one thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(app::run_discovery(&settings))?;
    Ok(())
}
