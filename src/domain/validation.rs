use chrono::NaiveDate;

use crate::error::AppError;

pub fn parse_date(date: &str) -> Result<NaiveDate, AppError> {
  NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
    .map_err(|_| AppError::validation("Data deve estar no formato AAAA-MM-DD"))
}

pub fn ensure_amount_positive(amount: f64) -> Result<(), AppError> {
  if !amount.is_finite() || amount <= 0.0 {
    Err(AppError::validation("Valor invalido"))
  } else {
    Ok(())
  }
}

pub fn ensure_percentual(percentual: f64) -> Result<(), AppError> {
  if !(0.0..=100.0).contains(&percentual) {
    Err(AppError::validation("Percentual deve estar entre 0 e 100"))
  } else {
    Ok(())
  }
}

pub fn require_text(value: &str, field: &str) -> Result<(), AppError> {
  if value.trim().is_empty() {
    Err(AppError::validation(format!("{field} obrigatorio")))
  } else {
    Ok(())
  }
}

pub fn blank_to_none(value: Option<String>) -> Option<String> {
  value.and_then(|value| {
    let trimmed = value.trim();
    if trimmed.is_empty() {
      None
    } else {
      Some(trimmed.to_string())
    }
  })
}
