mod collect;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "mdc-cli")]
#[command(about = "Marketplace dataset collector")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Publish the dataset now, then once per interval until interrupted
    Schedule {
        /// Hours between passes; overrides SCHEDULER_INTERVAL_HOURS
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        interval_hours: Option<u32>,
        /// Dataset CSV path; overrides DATASET_PATH
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Publish the dataset once and exit
    Once {
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
    /// Parse the dataset and report how many records it yields, without publishing
    Check {
        #[arg(long)]
        dataset: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    dotenvy::dotenv().ok();
    let mut config = mdc_core::load_app_config_from_env()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    match cli.command {
        Some(Commands::Schedule {
            interval_hours,
            dataset,
        }) => {
            collect::apply_overrides(&mut config, interval_hours, dataset);
            collect::run_schedule(&config).await
        }
        None => collect::run_schedule(&config).await,
        Some(Commands::Once { dataset }) => {
            collect::apply_overrides(&mut config, None, dataset);
            collect::run_once(&config).await
        }
        Some(Commands::Check { dataset }) => {
            collect::apply_overrides(&mut config, None, dataset);
            collect::run_check(&config)
        }
    }
}
