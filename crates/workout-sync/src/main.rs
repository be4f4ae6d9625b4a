use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use workout_core::PipelineOrchestrator;
use workout_sync::build_pipeline;
use workout_sync::config::Config;

#[derive(Parser)]
#[command(name = "workout-sync")]
#[command(about = "Copy Strong workout emails onto matching Strava activities")]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "WORKOUT_SYNC_CONFIG", default_value = "config.toml")]
    config: PathBuf,

    /// Print an example configuration and exit
    #[arg(long)]
    print_example_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.print_example_config {
        println!("{}", toml::to_string_pretty(&Config::example())?);
        return Ok(());
    }

    let config = Config::load(&cli.config)?;
    let pipeline = build_pipeline(&config)?;

    tracing::info!("Starting workout sync using {}", cli.config.display());

    match config.poll_interval_secs {
        None => {
            run_once(&pipeline).await?;
        }
        Some(secs) => {
            tracing::info!("Polling every {}s", secs);
            let mut interval = interval(Duration::from_secs(secs.max(1)));
            loop {
                interval.tick().await;

                if let Err(e) = run_once(&pipeline).await {
                    tracing::error!("Error syncing workouts: {}", e);
                }
            }
        }
    }

    Ok(())
}

async fn run_once(pipeline: &PipelineOrchestrator) -> Result<()> {
    let summary = pipeline.run().await?;
    tracing::info!(
        candidates = summary.candidates,
        marked_read = summary.marked_read,
        notifications = summary.notifications_sent,
        undelivered = summary.notifications_failed,
        skipped = summary.skipped,
        "Sync pass finished"
    );
    Ok(())
}
