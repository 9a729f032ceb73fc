//! Tracing setup for the webhook server and the search CLI.
//!
//! The server is long-running, so besides the console it writes a file that rotates daily under
//! `logs/` (`threadbrief.log.YYYY-MM-DD`). `THREADBRIEF_LOG_FILE` replaces the rotating file with
//! a single append-only path. The CLI prints its results table on stdout, so its console logs go
//! to stderr and it only writes a file when `THREADBRIEF_LOG_FILE` asks for one.
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const LOG_FILE_ENV: &str = "THREADBRIEF_LOG_FILE";
const LOG_DIR: &str = "logs";
const LOG_FILE_PREFIX: &str = "threadbrief.log";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Where the file layer writes.
#[derive(Debug, Clone, PartialEq, Eq)]
enum FileTarget {
    /// Append to one explicit file.
    Append(PathBuf),
    /// Rotate daily inside `logs/`.
    Daily,
    /// No file logging.
    Disabled,
}

impl FileTarget {
    fn resolve(explicit: Option<String>, rotate_by_default: bool) -> Self {
        match explicit.filter(|path| !path.trim().is_empty()) {
            Some(path) => Self::Append(PathBuf::from(path)),
            None if rotate_by_default => Self::Daily,
            None => Self::Disabled,
        }
    }
}

/// Server logging: `info` by default, stdout plus a daily log file.
pub fn init_tracing() {
    let target = FileTarget::resolve(std::env::var(LOG_FILE_ENV).ok(), true);
    install("info", target, false);
}

/// CLI logging at `default_level`: stderr, plus a file only when `THREADBRIEF_LOG_FILE` is set.
///
/// `RUST_LOG` wins over `default_level` when set.
pub fn init_tracing_with_level(default_level: &str) {
    let target = FileTarget::resolve(std::env::var(LOG_FILE_ENV).ok(), false);
    install(default_level, target, true);
}

fn install(default_level: &str, target: FileTarget, console_to_stderr: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let console_layer = if console_to_stderr {
        fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .compact()
            .boxed()
    } else {
        fmt::layer().with_target(false).compact().boxed()
    };
    let file_layer = file_writer(&target).map(|writer| {
        fmt::layer()
            .with_writer(writer)
            .with_target(true)
            .with_ansi(false)
            .compact()
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();
}

/// Returns `None` when file logging is off or the target cannot be opened.
fn file_writer(target: &FileTarget) -> Option<NonBlocking> {
    let (writer, guard) = match target {
        FileTarget::Disabled => return None,
        FileTarget::Append(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| eprintln!("Failed to open log file {}: {err}", path.display()))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        FileTarget::Daily => {
            std::fs::create_dir_all(LOG_DIR)
                .map_err(|err| eprintln!("Failed to create {LOG_DIR} directory: {err}"))
                .ok()?;
            tracing_appender::non_blocking(tracing_appender::rolling::daily(
                LOG_DIR,
                LOG_FILE_PREFIX,
            ))
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(writer)
}
