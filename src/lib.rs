pub mod api;
pub mod audit;
pub mod commands;
pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod export;
pub mod files;
pub mod logging;
pub mod models;
pub mod store;

use std::path::PathBuf;

use config::AppConfig;
use store::SqliteStore;

pub struct AppState {
  pub store: SqliteStore,
  pub app_dir: PathBuf,
  pub config: AppConfig,
}
