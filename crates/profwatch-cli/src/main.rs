mod logging;
mod run;
mod status;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "profwatch")]
#[command(about = "Polls a listing page and records newly discovered profiles")]
struct Cli {
    /// Directory holding the database, snapshots, link index and log file.
    #[arg(long, global = true, value_name = "PATH")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Subcommand)]
enum Commands {
    /// Scrape the listing once and record new profiles (the default).
    Run,
    /// Print how many profiles and links are already recorded.
    Status,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = profwatch_core::load_app_config().context("failed to load configuration")?;
    if let Some(dir) = cli.data_dir {
        config = config.with_data_dir(dir);
    }
    std::fs::create_dir_all(config.data_dir()).with_context(|| {
        format!(
            "failed to create data directory {}",
            config.data_dir().display()
        )
    })?;
    logging::init_tracing(&config)?;

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run::run_command(&config).await,
        Commands::Status => status::print_status(&config),
    };
    if let Err(err) = &result {
        tracing::error!(error = %format!("{err:#}"), "profwatch aborted");
    }
    result
}

#[cfg(test)]
mod test_support;
