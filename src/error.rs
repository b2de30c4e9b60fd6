use serde::Serialize;
use thiserror::Error;

pub const VALIDATION: &str = "VALIDATION";
pub const NOT_FOUND: &str = "NOT_FOUND";
pub const SELECTION_FULL: &str = "SELECTION_FULL";
pub const INVALID_COLUMN: &str = "INVALID_COLUMN";
pub const INVALID_VALUE: &str = "INVALID_VALUE";
pub const SAVE_FAILED: &str = "SAVE_FAILED";
pub const LOAD_FAILED: &str = "LOAD_FAILED";

#[derive(Debug, Clone, Serialize, Error)]
#[error("{code}: {message}")]
pub struct AppError {
  pub code: String,
  pub message: String,
}

impl AppError {
  pub fn new(code: &str, message: impl Into<String>) -> Self {
    Self {
      code: code.to_string(),
      message: message.into(),
    }
  }

  pub fn validation(message: impl Into<String>) -> Self {
    Self::new(VALIDATION, message)
  }

  pub fn not_found(message: impl Into<String>) -> Self {
    Self::new(NOT_FOUND, message)
  }

  pub fn save_failed(entity: &str, cause: AppError) -> Self {
    if cause.is_user_facing() {
      return cause;
    }
    tracing::error!(entity, code = %cause.code, message = %cause.message, "save failed");
    Self::new(SAVE_FAILED, format!("Erro ao salvar {entity}. Tente novamente."))
  }

  pub fn load_failed(entity: &str, cause: AppError) -> Self {
    if cause.is_user_facing() {
      return cause;
    }
    tracing::error!(entity, code = %cause.code, message = %cause.message, "load failed");
    Self::new(LOAD_FAILED, format!("Erro ao carregar {entity}. Tente novamente."))
  }

  pub fn is_user_facing(&self) -> bool {
    matches!(
      self.code.as_str(),
      VALIDATION | NOT_FOUND | SELECTION_FULL | INVALID_COLUMN | INVALID_VALUE
    )
  }
}

impl From<rusqlite::Error> for AppError {
  fn from(err: rusqlite::Error) -> Self {
    match err {
      rusqlite::Error::QueryReturnedNoRows => AppError::not_found("Registro nao encontrado"),
      other => AppError::new("DB_ERROR", other.to_string()),
    }
  }
}

impl From<std::io::Error> for AppError {
  fn from(err: std::io::Error) -> Self {
    AppError::new("IO_ERROR", err.to_string())
  }
}

impl From<serde_json::Error> for AppError {
  fn from(err: serde_json::Error) -> Self {
    AppError::new("JSON_ERROR", err.to_string())
  }
}

impl From<zip::result::ZipError> for AppError {
  fn from(err: zip::result::ZipError) -> Self {
    AppError::new("ZIP_ERROR", err.to_string())
  }
}

impl From<toml::de::Error> for AppError {
  fn from(err: toml::de::Error) -> Self {
    AppError::new("CONFIG_ERROR", err.to_string())
  }
}

impl<T> From<std::sync::PoisonError<T>> for AppError {
  fn from(_: std::sync::PoisonError<T>) -> Self {
    AppError::new("LOCK_ERROR", "Database lock failed")
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn save_failed_hides_database_details() {
    let cause = AppError::new("DB_ERROR", "UNIQUE constraint failed: config_visualizacoes.pagina");
    let err = AppError::save_failed("widget", cause);
    assert_eq!(err.code, SAVE_FAILED);
    assert_eq!(err.message, "Erro ao salvar widget. Tente novamente.");
  }

  #[test]
  fn save_failed_keeps_validation_messages() {
    let err = AppError::save_failed("widget", AppError::validation("Nome obrigatorio"));
    assert_eq!(err.code, VALIDATION);
    assert_eq!(err.message, "Nome obrigatorio");
  }

  #[test]
  fn no_rows_maps_to_not_found() {
    let err: AppError = rusqlite::Error::QueryReturnedNoRows.into();
    assert_eq!(err.code, NOT_FOUND);
  }
}
