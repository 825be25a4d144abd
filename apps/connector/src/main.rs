//! # SyncBridge Connector
//!
//! One synchronization run per invocation.
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Connector Startup                                │
//! │                                                                         │
//! │  1. Initialize Logging      console + logs/syncbridge.<date>.log       │
//! │                             (RUST_LOG, default info,syncbridge=debug)  │
//! │  2. Parse the command line  malformed / missing / unknown mode         │
//! │                             → warning, exit 0                          │
//! │  3. Load configuration      file + environment                         │
//! │  4. Dispatcher::run(mode)   exactly one orchestrator                   │
//! │  5. Exit code               0, or 1 on a fatal error when              │
//! │                             Run.strictExitCode is set                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use syncbridge_sync::{Dispatcher, RunMode, SyncConfig};

/// Default log filter when RUST_LOG is not set.
const DEFAULT_LOG_FILTER: &str = "info,syncbridge=debug,sqlx=warn";

/// Overrides the directory of the rolling log file.
const LOG_DIR_ENV: &str = "SYNCBRIDGE_LOG_DIR";
const DEFAULT_LOG_DIR: &str = "logs";

#[derive(Parser, Debug)]
#[command(
    name = "syncbridge",
    version,
    about = "Synchronizes invoices and payments between the Source store and the Target accounting system"
)]
struct Cli {
    /// Run mode: ExportFactures, ImportReglements or ImportFacturesAchat
    mode: Option<String>,

    /// Run the whole pipeline without writing to the Target or the Source store
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Held until exit so buffered file lines are flushed.
    let _log_guard = init_tracing();

    let Some(cli) = parse_args(std::env::args_os()) else {
        return ExitCode::SUCCESS;
    };
    info!(version = env!("CARGO_PKG_VERSION"), "SyncBridge connector starting");

    let mode = match cli.mode.as_deref().map(str::parse::<RunMode>) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            warn!("{}", e);
            return ExitCode::SUCCESS;
        }
        None => {
            warn!(
                "No run mode given. Expected one of: {}",
                RunMode::ALL.map(|m| m.as_str()).join(", ")
            );
            return ExitCode::SUCCESS;
        }
    };

    // Without a configuration the strict exit policy is unknown: keep exit 0.
    let config = match SyncConfig::load(None) {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!(error = %e, "Configuration could not be loaded");
            return ExitCode::SUCCESS;
        }
    };
    let strict = config.run.strict_exit_code;

    match Dispatcher::new(config, cli.dry_run).run(mode).await {
        Ok(summary) => {
            info!(
                mode = %mode,
                succeeded = summary.succeeded(),
                failed = summary.failed(),
                "Run complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(mode = %mode, error = %e, "Run aborted");
            if strict && e.is_fatal() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            }
        }
    }
}

/// Parses the command line. `None` means the process should stop with exit 0.
fn parse_args<I, T>(args: I) -> Option<Cli>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match Cli::try_parse_from(args) {
        Ok(cli) => Some(cli),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            let _ = e.print();
            None
        }
        Err(e) => {
            warn!("Invalid command line: {}", e);
            None
        }
    }
}

/// Initializes console logging plus a daily rolling log file.
///
/// Set `RUST_LOG` to override the filter, e.g. `RUST_LOG=syncbridge=trace`,
/// and `SYNCBRIDGE_LOG_DIR` to move the log file.
fn init_tracing() -> Option<WorkerGuard> {
    let filter =
        || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let log_dir = std::env::var_os(LOG_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR));

    let (file_layer, guard, file_error) = match open_log_file(&log_dir) {
        Ok(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard), None)
        }
        Err(e) => (None, None, Some(e)),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_filter(filter()))
        .with(file_layer)
        .init();

    if let Some(e) = file_error {
        warn!(dir = %log_dir.display(), error = %e, "Log file unavailable, logging to console only");
    }

    guard
}

/// `<dir>/syncbridge.<yyyy-MM-dd>.log`, a new file each day.
fn open_log_file(dir: &Path) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix("syncbridge")
        .filename_suffix("log")
        .build(dir)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = parse_args(["syncbridge", "ImportReglements", "--dry-run"]).unwrap();
        assert_eq!(cli.mode.as_deref(), Some("ImportReglements"));
        assert!(cli.dry_run);

        let cli = parse_args(["syncbridge"]).unwrap();
        assert!(cli.mode.is_none());
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_malformed_command_line_stops_quietly() {
        assert!(parse_args(["syncbridge", "ExportFactures", "--force"]).is_none());
        assert!(parse_args(["syncbridge", "ExportFactures", "extra"]).is_none());
    }

    #[test]
    fn test_log_file_is_created_in_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        open_log_file(&log_dir).unwrap();

        let names: Vec<String> = std::fs::read_dir(&log_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names.len(), 1);
        assert!(names[0].starts_with("syncbridge."));
        assert!(names[0].ends_with(".log"));
    }

    #[test]
    fn test_log_dir_that_is_a_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("logs");
        std::fs::write(&blocker, b"not a directory").unwrap();

        assert!(open_log_file(&blocker).is_err());
    }
}
