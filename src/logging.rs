//! Logging initialization.
//!
//! The session screen owns the terminal, so interactive runs log to a file;
//! the plain subcommands log to stderr. `PULSR_LOG` overrides the verbosity.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "PULSR_LOG";

/// Maps a `-v` count to a tracing directive string.
pub const fn verbosity_to_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(verbosity: u8) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(verbosity_to_directive(verbosity)))
}

/// Log to stderr. Repeated calls are ignored.
pub fn init_stderr(verbosity: u8) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Append logs to `path`, creating parent directories as needed.
pub fn init_file(verbosity: u8, path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(path)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(verbosity))
        .with_ansi(false)
        .with_target(verbosity >= 2)
        .with_writer(Mutex::new(file))
        .try_init();
    Ok(())
}
