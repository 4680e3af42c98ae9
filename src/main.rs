use chrono::Utc;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

use stock_watcher::target_loader::load_targets;
use stock_watcher::{AppConfig, Monitor, RunMode};

/// Check monitored product pages and email on stock changes.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Check every target now, ignoring schedules
    #[arg(long, short = '1')]
    once: bool,

    /// Targets file (overrides MONITOR_CONFIG_FILE)
    #[arg(long)]
    targets: Option<PathBuf>,

    /// State file (overrides MONITOR_STATE_FILE)
    #[arg(long)]
    state: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load settings: {}", e);
            return ExitCode::from(2);
        }
    };
    if let Some(targets) = cli.targets {
        config.monitor.targets_file = targets;
    }
    if let Some(state) = cli.state {
        config.monitor.state_file = state;
    }

    let _guard = match stock_watcher::logging::init(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialise logging: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let mode = if cli.once { RunMode::Forced } else { RunMode::Scheduled };
    match run(&config, mode).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Run aborted: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(config: &AppConfig, mode: RunMode) -> stock_watcher::Result<()> {
    let targets = load_targets(&config.monitor.targets_file)?;
    info!(
        "Loaded {} target(s) from {} ({:?} run)",
        targets.len(),
        config.monitor.targets_file.display(),
        mode
    );

    let monitor = Monitor::from_config(config)?;
    monitor.run(&targets, mode, Utc::now()).await?;
    Ok(())
}
