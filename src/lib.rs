//! socrata-loader: replace or append data in a Socrata dataset.
//!
//! The loader follows the SODA publishing workflow: it creates a draft copy
//! of the dataset, uploads and scans a file, imports it into the draft
//! (waiting on the import ticket when the server defers it) and optionally
//! publishes the draft.
//!
//! # Modules
//!
//! - [`http`]: authenticated SODA client, transports and multipart encoding
//! - [`batch`]: batch queue and `/batches` response decoding
//! - [`poll`]: the blocking retry loop used for asynchronous steps
//! - [`workflow`]: the publishing workflow itself
//! - [`config`]: YAML configuration
//! - [`error`]: error types for loader operations

pub mod batch;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod poll;
pub mod precommand;
pub mod workflow;

use std::path::PathBuf;

use clap::Parser;

pub use config::Config;
pub use error::LoaderError;
pub use workflow::{WorkflowDriver, WorkflowReport};

use http::{SodaClient, Transport, UreqTransport};
use poll::{Poller, Sleeper, ThreadSleeper};

/// The socrata-loader CLI application.
#[derive(Parser)]
#[command(name = "socrata-loader")]
#[command(version, author, about)]
struct Cli {
    /// YAML config describing the dataset, credentials and file to load.
    config: PathBuf,

    /// Log filter (e.g. 'debug', 'socrata_loader=trace'); RUST_LOG wins.
    #[arg(long, default_value = logging::DEFAULT_LOG_FILTER)]
    log_level: String,

    /// Override the configured poll delay, in seconds.
    #[arg(long)]
    delay: Option<u64>,

    /// Leave the draft copy unpublished, whatever the config says.
    #[arg(long)]
    no_publish: bool,
}

/// Run the socrata-loader CLI.
///
/// This is the main entry point for the CLI, called from `main.rs`.
pub fn run() -> Result<(), LoaderError> {
    let cli = Cli::parse();
    logging::init(&cli.log_level);

    let mut config = config::load_config(&cli.config).inspect_err(|err| {
        tracing::error!("Could not load config: {}", err);
    })?;
    if let Some(delay) = cli.delay {
        config.delay = Some(delay);
    }
    if cli.no_publish {
        config.publish = false;
    }

    let report = run_workflow(&config)?;
    tracing::info!("{}", report.to_string().trim_end());
    Ok(())
}

/// Runs the pre-command (if any) and the workflow against the live API.
pub fn run_workflow(config: &Config) -> Result<WorkflowReport, LoaderError> {
    run_workflow_with(
        config,
        UreqTransport::new(config.socrata.timeout()),
        ThreadSleeper,
    )
}

/// Runs the pre-command (if any) and the workflow over the given transport.
pub fn run_workflow_with<T: Transport, S: Sleeper>(
    config: &Config,
    transport: T,
    sleeper: S,
) -> Result<WorkflowReport, LoaderError> {
    if let Some(command) = config.pre_command.as_deref() {
        precommand::ensure_pre_command(command).inspect_err(|err| {
            tracing::error!("Error running pre-command: {}", err);
        })?;
    }

    let client = SodaClient::new(&config.socrata, transport);
    let poller = Poller::with_sleeper(config.poll_delay(), sleeper);
    WorkflowDriver::new(config, client, poller).run()
}
