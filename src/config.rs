use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::AppError;

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
  #[serde(default)]
  pub server: ServerConfig,
  #[serde(default)]
  pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct LoggingConfig {
  #[serde(default = "default_level")]
  pub level: String,
  #[serde(default)]
  pub json: bool,
}

fn default_host() -> String {
  "0.0.0.0".to_string()
}

fn default_port() -> u16 {
  48080
}

fn default_level() -> String {
  "info".to_string()
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host: default_host(),
      port: default_port(),
    }
  }
}

impl Default for LoggingConfig {
  fn default() -> Self {
    Self {
      level: default_level(),
      json: false,
    }
  }
}

const DEFAULT_CONFIG: &str = r#"
[server]
host = "0.0.0.0"
port = 48080

[logging]
level = "info"
json = false
"#;

impl AppConfig {
  pub fn bind_address(&self) -> String {
    format!("{}:{}", self.server.host, self.server.port)
  }
}

/// Load configuration from config.toml
///
/// Search order:
/// 1. `PAINEL_CONFIG`
/// 2. The app data directory
/// 3. Next to the executable
/// 4. Embedded default
///
/// `PAINEL_HOST` and `PAINEL_PORT` override whatever was loaded.
pub fn load_config(app_dir: &Path) -> Result<AppConfig, AppError> {
  let mut candidates: Vec<PathBuf> = Vec::new();
  if let Ok(explicit) = std::env::var("PAINEL_CONFIG") {
    candidates.push(PathBuf::from(explicit));
  }
  candidates.push(app_dir.join(CONFIG_FILE));
  if let Some(exe_dir) = std::env::current_exe().ok().and_then(|exe| exe.parent().map(Path::to_path_buf)) {
    candidates.push(exe_dir.join(CONFIG_FILE));
  }

  let mut config = None;
  for path in candidates {
    if path.exists() {
      // tracing may not be initialised yet; the logging config comes from this file
      eprintln!("Loading config from: {}", path.display());
      let contents = std::fs::read_to_string(&path)?;
      config = Some(parse_config(&contents)?);
      break;
    }
  }
  let config = match config {
    Some(config) => config,
    None => parse_config(DEFAULT_CONFIG)?,
  };

  apply_overrides(
    config,
    std::env::var("PAINEL_HOST").ok(),
    std::env::var("PAINEL_PORT").ok(),
  )
}

pub fn parse_config(contents: &str) -> Result<AppConfig, AppError> {
  Ok(toml::from_str(contents)?)
}

pub fn apply_overrides(mut config: AppConfig, host: Option<String>, port: Option<String>) -> Result<AppConfig, AppError> {
  if let Some(host) = host.filter(|h| !h.trim().is_empty()) {
    config.server.host = host.trim().to_string();
  }
  if let Some(port) = port {
    config.server.port = port
      .trim()
      .parse()
      .map_err(|_| AppError::new("CONFIG_ERROR", format!("PAINEL_PORT invalida: {port}")))?;
  }
  Ok(config)
}
