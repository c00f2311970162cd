use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use corpus_collector::{config::Config, info_time, process, Result};

/// Collect a subreddit's history into a CSV file
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to the TOML configuration
    #[arg(short, long, default_value = "collector.toml")]
    config: PathBuf,

    /// Write the corpus here instead of the configured path
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let start_time = Local::now();
    let mut config = Config::load(&cli.config)?;
    config.apply_env();
    if let Some(output) = cli.output {
        config.collect.output = output;
    }
    config.validate()?;
    log::info!("Loaded configuration from {}", cli.config.display());

    process::run(&config).await?;
    info_time!(start_time, "Full program time:");

    Ok(())
}
