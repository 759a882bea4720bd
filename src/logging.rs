//! File logging. The terminal belongs to the UI, so nothing is written to stdout.

use color_eyre::{eyre::eyre, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Install the global subscriber writing daily-rolled files under `dir`.
///
/// The returned guard flushes buffered lines on drop and must be held for
/// the life of the program.
pub fn init(config: &LoggingConfig, dir: &Path) -> Result<WorkerGuard> {
  std::fs::create_dir_all(dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let filter = build_filter(&config.level)?;

  let (writer, guard) = tracing_appender::non_blocking(rolling::daily(dir, "walletq.log"));
  let file_layer = tracing_subscriber::fmt::layer()
    .with_writer(writer)
    .with_ansi(false)
    .with_target(true)
    .with_thread_ids(true);

  tracing_subscriber::registry()
    .with(filter)
    .with(file_layer)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}

/// RUST_LOG wins when set; otherwise `level` is the default directive.
fn build_filter(level: &str) -> Result<EnvFilter> {
  if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
    return Ok(EnvFilter::from_default_env());
  }
  EnvFilter::try_new(level).map_err(|e| eyre!("Invalid log level {:?}: {}", level, e))
}
