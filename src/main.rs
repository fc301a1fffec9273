//! Tailcast - tail a growing file and stream new lines to live subscribers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use tailcast::config::{AppConfig, ConfigError, ConfigLoader};
use tailcast::hub::TailHub;
use tailcast::transport::{AppState, ServerError, TailServer};
use tailcast::watcher::WatcherError;

#[derive(Parser)]
#[command(
    name = "tailcast",
    about = "Tail a growing file and stream new lines to live subscribers",
    version
)]
struct Cli {
    /// File to tail.
    file: PathBuf,

    /// Host address to bind to.
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on.
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory with the static web client.
    #[arg(long)]
    web_root: Option<PathBuf>,

    /// Config file (defaults to .tailcast.toml, then the user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of recent lines replayed to new subscribers.
    #[arg(long)]
    history: Option<usize>,

    /// Delay between file checks, in milliseconds.
    #[arg(long)]
    poll_ms: Option<u64>,

    /// Increase verbosity (-v, -vv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(thiserror::Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Watcher(#[from] WatcherError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

fn load_config(cli: &Cli) -> Result<AppConfig, ConfigError> {
    let loader = match &cli.config {
        Some(path) => ConfigLoader::with_path(path.clone()),
        None => ConfigLoader::new(),
    };
    let mut config = loader.load()?;

    if let Some(host) = &cli.host {
        config.server.host.clone_from(host);
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(web_root) = &cli.web_root {
        config.server.web_root.clone_from(web_root);
    }
    if let Some(history) = cli.history {
        config.tail.history_capacity = history;
    }
    if let Some(poll_ms) = cli.poll_ms {
        config.tail.poll_interval_ms = poll_ms;
    }

    config.tail.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = load_config(&cli)?;
    let hub = TailHub::start(&cli.file, &config.tail)?;

    let state = AppState::from_hub(&hub);
    let cancel = state.cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            return;
        }
        tracing::info!("Received ctrl-c, shutting down");
        cancel.cancel();
    });

    let result = TailServer::new(state)
        .with_config(config.server)
        .run()
        .await;

    hub.shutdown().await;
    result.map_err(AppError::from)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "tailcast failed");
            ExitCode::FAILURE
        }
    }
}
