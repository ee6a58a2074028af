//! distro-torrents command-line entry point
//!
//! Runs a single fetch pass and exits. Scheduling is left to cron or a
//! container restart policy.

use clap::Parser;
use distro_torrents::{Config, Runner};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_LOG_FILTER: &str = "distro_torrents=info";

/// Fetch the latest Linux distribution torrents into a watch directory
#[derive(Debug, Parser)]
#[command(name = "distro-torrents", version, about)]
struct Args {
    /// JSON configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory watched by the torrent client
    #[arg(long, value_name = "DIR")]
    watch_dir: Option<PathBuf>,

    /// Directory whose disk usage is reported
    #[arg(long, value_name = "DIR")]
    downloads_dir: Option<PathBuf>,

    /// Also append logs to this file
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Run only these providers (repeatable), e.g. `--only kali --only arch`
    #[arg(long = "only", value_name = "PROVIDER")]
    only: Vec<String>,

    /// Skip the Transmission seed-ratio report
    #[arg(long)]
    no_seed_ratios: bool,
}

fn init_logging(log_file: Option<&Path>) -> std::io::Result<Option<WorkerGuard>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path.file_name().ok_or_else(|| {
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "log file path has no file name")
            })?;
            std::fs::create_dir_all(dir)?;
            let appender = tracing_appender::rolling::never(dir, name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(guard)
}

fn load_config(args: &Args) -> distro_torrents::Result<Config> {
    let mut config = Config::load(args.config.as_deref(), |key| std::env::var(key).ok())?;
    if let Some(dir) = &args.watch_dir {
        config.watch_dir = dir.clone();
    }
    if let Some(dir) = &args.downloads_dir {
        config.downloads_dir = dir.clone();
    }
    if args.no_seed_ratios {
        config.transmission.seed_ratios = false;
    }
    if !args.only.is_empty() {
        config.restrict_to(&args.only)?;
    }
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let args = Args::parse();

    let _guard = match init_logging(args.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: cannot open log file: {e}");
            return ExitCode::FAILURE;
        }
    };

    let config = match load_config(&args) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let runner = match Runner::new(config) {
        Ok(runner) => runner,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = runner.run().await;
    info!(
        started_at = %summary.started_at,
        saved = summary.tally.torrents_saved,
        "done"
    );
    ExitCode::SUCCESS
}
