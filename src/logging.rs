//! Tracing initialisation.
//!
//! `RUST_LOG` wins when set; otherwise the `-v` count picks the level. The TUI
//! owns the terminal, so in that mode logs only go to `--log-file`.

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub fn level_for(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Where log lines should go.
pub enum LogTarget<'a> {
    Stderr,
    File(&'a Path),
    Off,
}

pub fn init_tracing(target: LogTarget<'_>, level: Level) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    match target {
        LogTarget::Off => {}
        LogTarget::Stderr => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .try_init()
                .ok();
        }
        LogTarget::File(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open log file {}", path.display()))?;
            tracing_subscriber::registry()
                .with(env_filter)
                .with(
                    fmt::layer()
                        .with_target(false)
                        .with_ansi(false)
                        .with_writer(Mutex::new(file)),
                )
                .try_init()
                .ok();
        }
    }
    Ok(())
}
