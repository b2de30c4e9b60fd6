use std::path::Path;
use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::AppError;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

pub fn init_logging(app_dir: &Path, config: &LoggingConfig) -> Result<(), AppError> {
  if LOG_GUARD.get().is_some() {
    tracing::debug!("logging already initialised");
    return Ok(());
  }
  let log_dir = app_dir.join("logs");
  std::fs::create_dir_all(&log_dir)?;
  let file_appender = tracing_appender::rolling::daily(log_dir, "painel.log");
  let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
  if LOG_GUARD.set(guard).is_err() {
    return Ok(());
  }

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

  let json_file = config
    .json
    .then(|| tracing_subscriber::fmt::layer().json().with_writer(non_blocking.clone()));
  let text_file = (!config.json).then(|| {
    tracing_subscriber::fmt::layer()
      .with_ansi(false)
      .with_writer(non_blocking)
  });

  tracing_subscriber::registry()
    .with(filter)
    .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
    .with(json_file)
    .with(text_file)
    .try_init()
    .map_err(|err| AppError::new("LOG_ERROR", err.to_string()))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_initialisation_keeps_the_first_writer() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = LoggingConfig::default();
    init_logging(dir.path(), &config).expect("first");
    init_logging(dir.path(), &config).expect("second is a no-op");
    assert!(LOG_GUARD.get().is_some());
    assert!(dir.path().join("logs").is_dir());
  }
}
