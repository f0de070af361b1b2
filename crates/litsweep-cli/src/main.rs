use anyhow::Context;
use clap::Parser;
use dotenvy::dotenv;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use litsweep_cli::harvest::resolve_output_dir;
use litsweep_cli::{print_summary, reset, run_harvest, show_status, Command, Config, HarvestPlan};
use litsweep_core::load_or_default;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load API keys from a .env file if present
    dotenv().ok();

    let config = Config::parse();

    // Logs go to stderr so the summary on stdout stays clean
    let subscriber = FmtSubscriber::builder()
        .with_max_level(if config.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to install tracing subscriber")?;

    match config.command {
        Command::Harvest(args) => {
            let file = load_or_default(args.config.as_deref()).context("Failed to load config")?;
            let plan = HarvestPlan::resolve(args, &file)?;
            let summary = run_harvest(plan, &file).await?;
            print_summary(&summary);
            if summary.failed_count() > 0 {
                std::process::exit(1);
            }
        }
        Command::Status { output_dir, config } => {
            let file = load_or_default(config.as_deref()).context("Failed to load config")?;
            show_status(&resolve_output_dir(output_dir, &file))?;
        }
        Command::Reset {
            backend,
            output_dir,
            config,
        } => {
            let file = load_or_default(config.as_deref()).context("Failed to load config")?;
            reset(&resolve_output_dir(output_dir, &file), backend)?;
        }
    }

    Ok(())
}
