use crate::config::Config;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "jolt-dashboard.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Stderr,
    File(PathBuf),
    Discard,
}

/// The terminal belongs to the UI while the dashboard runs, so interactive
/// sessions only log to a file when one is configured.
pub fn log_target(config: &Config, interactive: bool) -> LogTarget {
    if config.log_stdout || !interactive {
        return LogTarget::Stderr;
    }
    match &config.log_dir {
        Some(dir) => LogTarget::File(dir.join(LOG_FILE_NAME)),
        None => LogTarget::Discard,
    }
}

pub fn init_logging(config: &Config, interactive: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.as_str()));
    match log_target(config, interactive) {
        LogTarget::Stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .try_init();
        }
        LogTarget::File(path) => match open_log_file(&path) {
            Ok(file) => {
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .try_init();
            }
            Err(err) => {
                eprintln!("jolt-dashboard: log file {} unavailable: {err}", path.display());
                let _ = tracing_subscriber::fmt()
                    .with_env_filter(filter)
                    .with_writer(io::sink)
                    .try_init();
            }
        },
        LogTarget::Discard => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::sink)
                .try_init();
        }
    }
}

fn open_log_file(path: &Path) -> io::Result<fs::File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}
