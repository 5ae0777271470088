//! File-backed tracing setup.
//!
//! The TUI owns the terminal, so diagnostics go to a log file instead of
//! stderr. Filtering follows `RUST_LOG` with an `info` default.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Default log location: `<state dir>/txdemo/txdemo.log`, falling back to the
/// current directory when no state dir is available.
pub fn default_log_path() -> PathBuf {
    dirs::state_dir()
        .or_else(dirs::data_local_dir)
        .unwrap_or_else(|| PathBuf::from("."))
        .join("txdemo")
        .join("txdemo.log")
}

/// Install the global subscriber writing to `path`.
pub fn init(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with_ansi(false)
        .with_writer(std::sync::Mutex::new(file))
        .init();

    Ok(())
}
