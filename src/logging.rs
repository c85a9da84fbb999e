//! Tracing subscriber setup: console output plus the three log files.

use anyhow::{Context, Result};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::filter::{filter_fn, EnvFilter, LevelFilter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::config::LogSettings;

/// Target carrying authentication and authorization events.
pub const SECURITY_TARGET: &str = "security";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogKind {
    App,
    Error,
    Security,
}

impl LogKind {
    pub const ALL: [LogKind; 3] = [LogKind::App, LogKind::Error, LogKind::Security];

    pub fn file_name(&self) -> &'static str {
        match self {
            LogKind::App => "app.log",
            LogKind::Error => "error.log",
            LogKind::Security => "security.log",
        }
    }

    pub fn path(&self, directory: &Path) -> PathBuf {
        directory.join(self.file_name())
    }
}

fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file {}", path.display()))
}

/// Installs the global subscriber.
///
/// `RUST_LOG` drives the console; the files always get INFO and up
/// (`app.log`), WARN and up (`error.log`) and the security target.
pub fn init(settings: &LogSettings) -> Result<()> {
    fs::create_dir_all(&settings.directory)
        .with_context(|| format!("Failed to create log directory {}", settings.directory.display()))?;

    let console_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.level));
    let console = fmt::layer().with_target(true).with_filter(console_filter);

    let app = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(open_append(&LogKind::App.path(&settings.directory))?))
        .with_filter(LevelFilter::INFO);

    let errors = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(open_append(&LogKind::Error.path(&settings.directory))?))
        .with_filter(LevelFilter::WARN);

    let security = fmt::layer()
        .with_ansi(false)
        .with_writer(Mutex::new(open_append(&LogKind::Security.path(&settings.directory))?))
        .with_filter(filter_fn(|metadata| metadata.target() == SECURITY_TARGET));

    tracing_subscriber::registry()
        .with(console)
        .with(app)
        .with(errors)
        .with(security)
        .try_init()
        .context("Failed to install the tracing subscriber")?;
    Ok(())
}
