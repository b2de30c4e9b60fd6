use std::process::ExitCode;

use painel_gestao::error::AppError;
use painel_gestao::{api, config, db, logging, AppState};

fn run() -> Result<(), AppError> {
  let app_dir = db::resolve_app_dir()?;
  let config = config::load_config(&app_dir)?;
  logging::init_logging(&app_dir, &config.logging)?;
  tracing::info!(app_dir = %app_dir.display(), version = env!("CARGO_PKG_VERSION"), "starting painel-gestao");

  let database = db::init_db(&app_dir)?;
  let state = AppState {
    store: painel_gestao::store::SqliteStore::new(database),
    app_dir,
    config,
  };
  api::serve(&state)
}

fn main() -> ExitCode {
  match run() {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      tracing::error!(code = %err.code, message = %err.message, "fatal");
      eprintln!("painel-gestao: {err}");
      ExitCode::FAILURE
    }
  }
}
