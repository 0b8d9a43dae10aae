// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Strava-Sync command line
//!
//! Mirrors an athlete's Strava activities and activity streams into a local
//! data directory, fetching only what is missing on each run.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use strava_sync::{
    config::{ConfigError, LoadOptions},
    services::{ConsolePrompt, StravaClient},
    Settings, SyncError, SyncPipeline,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "strava-sync")]
#[command(version)]
#[command(about = "Fetch and synchronize data from the Strava API")]
#[command(after_long_help = r#"CONFIGURATION
    Settings are layered, later sources winning:
      1. Built-in defaults (data in ~/.strava_fetcher/data)
      2. YAML file given with --config-file
      3. Environment variables (STRAVA_* prefix), .env file honoured
      4. --client-id / --client-secret

ENVIRONMENT VARIABLES
    STRAVA_CLIENT_ID                  Strava application client ID
    STRAVA_CLIENT_SECRET              Strava application client secret
    STRAVA_DATA_DIR                   Base directory for all data files
    STRAVA_MAX_PAGES                  Maximum activity pages to fetch
    STRAVA_RETRY_INTERVAL_SECONDS     Wait after a rate limit response
    STRAVA_SKIP_TRAINER_ACTIVITIES    Skip streams for trainer activities
    RUST_LOG                          Log filter (default: strava_sync=info)
"#)]
struct Cli {
    /// Log output format
    #[arg(long, value_enum, global = true, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full data synchronization pipeline
    ///
    /// Fetches and caches all new activity summaries, then fetches and saves
    /// streams for every activity that doesn't have them yet.
    Sync {
        /// Path to a YAML configuration file
        #[arg(long)]
        config_file: Option<PathBuf>,

        /// Your Strava application's Client ID
        #[arg(long)]
        client_id: Option<String>,

        /// Your Strava application's Client Secret
        #[arg(long)]
        client_secret: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    match cli.command {
        Commands::Sync {
            config_file,
            client_id,
            client_secret,
        } => {
            let options = LoadOptions {
                config_file,
                client_id,
                client_secret,
            };
            match sync(options).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    report_failure(&e);
                    ExitCode::FAILURE
                }
            }
        }
    }
}

async fn sync(options: LoadOptions) -> Result<(), SyncError> {
    println!("Starting the Strava data synchronization pipeline...");

    let settings = Settings::load(options)?;
    settings.ensure_paths_exist()?;
    println!("Data will be stored in: {}", settings.paths.data_dir.display());

    let client = StravaClient::new(&settings.strava_api);
    let mut pipeline = SyncPipeline::new(&settings, client, ConsolePrompt);
    pipeline.run().await?;

    println!(
        "{}",
        style("Synchronization completed successfully!").green()
    );
    Ok(())
}

fn report_failure(error: &SyncError) {
    let prefix = match error {
        SyncError::Config(ConfigError::FileNotFound(_)) => "Error:",
        SyncError::Internal(_) => "An unexpected error occurred:",
        _ => "A pipeline error occurred:",
    };
    eprintln!("{}", style(format!("{} {}", prefix, error)).red());
}

/// Initialize logging on stderr, keeping stdout for operator output.
fn init_logging(format: LogFormat) {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("strava_sync=info"),
    };
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(false)
                    .with_current_span(true)
                    .flatten_event(true)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }
}
