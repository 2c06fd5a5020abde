use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config;

const LOG_FILE: &str = "hollow-presence.log";

/// Used when `RUST_LOG` is unset; the Discord IPC layer is chatty at info
const DEFAULT_LOG_FILTER: &str = "info,discord_sdk=warn";

/// Rotated log files older than this are deleted at startup
const KEEP_LOG_DAYS: u64 = 7;

pub fn init_logging() -> WorkerGuard {
    let log_dir = get_log_directory();

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_writer(file_writer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    tracing::info!("Logging initialized, log directory: {}", log_dir.display());
    tracing::info!("HollowPresence version: {}", env!("CARGO_PKG_VERSION"));

    cleanup_old_logs(&log_dir, KEEP_LOG_DAYS, SystemTime::now());

    guard
}

fn get_log_directory() -> PathBuf {
    let log_dir = config::data_dir().join("logs");

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!("Warning: Failed to create log directory: {}", e);
    }

    log_dir
}

fn cleanup_old_logs(log_dir: &Path, keep_days: u64, now: SystemTime) {
    let cutoff = now - Duration::from_secs(keep_days * 24 * 60 * 60);

    let entries = match std::fs::read_dir(log_dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read log directory for cleanup: {}", e);
            return;
        }
    };

    for entry in entries.flatten() {
        let path = entry.path();

        let filename = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) if name.starts_with(LOG_FILE) => name,
            _ => continue,
        };

        if filename == LOG_FILE {
            continue;
        }

        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(m) => m,
            Err(_) => continue,
        };

        if modified < cutoff {
            if let Err(e) = std::fs::remove_file(&path) {
                tracing::warn!("Failed to remove old log file {:?}: {}", path, e);
            } else {
                tracing::debug!("Removed old log file: {:?}", path);
            }
        }
    }
}
