//! Tracing configuration and log routing.
//!
//! Batch runs log to stdout through a compact formatter and, unless disabled, to a log file.
//! `BIBSOLR_LOG_FILE` selects the file (`off` disables file logging); the default is
//! `logs/bibsolr.log`, which keeps a trail of long indexing runs next to the working directory.
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_LOG_FILE: &str = "bibsolr.log";

/// Where file logs should be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum LogTarget {
    /// File logging switched off.
    Disabled,
    /// Append to the given path.
    File(PathBuf),
}

/// Interpret the `BIBSOLR_LOG_FILE` value.
pub(crate) fn resolve_log_target(value: Option<&str>) -> LogTarget {
    match value.map(str::trim) {
        Some(raw) if raw.eq_ignore_ascii_case("off") || raw == "-" => LogTarget::Disabled,
        Some(raw) if !raw.is_empty() => LogTarget::File(PathBuf::from(raw)),
        _ => LogTarget::File(Path::new(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)),
    }
}

/// Configure tracing subscribers for stdout and optional file logging.
///
/// `RUST_LOG` wins over `default_level`, which the CLI raises to `debug` with `--verbose`.
pub fn init_tracing(default_level: &str) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    let target = resolve_log_target(std::env::var("BIBSOLR_LOG_FILE").ok().as_deref());
    match open_writer(&target) {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn open_writer(target: &LogTarget) -> Option<NonBlocking> {
    let LogTarget::File(path) = target else {
        return None;
    };

    if let Some(parent) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
        && let Err(err) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create log directory {}: {err}", parent.display());
        return None;
    }

    match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
    {
        Ok(file) => {
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            let _ = LOG_GUARD.set(guard);
            Some(non_blocking)
        }
        Err(err) => {
            eprintln!("Failed to open log file {}: {err}", path.display());
            None
        }
    }
}
