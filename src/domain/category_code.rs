use crate::error::AppError;
use crate::models::CategoryType;
use crate::store::{Query, Store, Table};

const CODE_WIDTH: usize = 3;

pub fn code_prefix(tipo: CategoryType) -> char {
  match tipo {
    CategoryType::Receita => 'R',
    CategoryType::Despesa => 'D',
  }
}

pub fn format_code(tipo: CategoryType, sequence: u32) -> String {
  format!("{}{:0width$}", code_prefix(tipo), sequence, width = CODE_WIDTH)
}

pub fn parse_sequence(tipo: CategoryType, code: &str) -> Option<u32> {
  let digits = code.trim().strip_prefix(code_prefix(tipo))?;
  if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
    return None;
  }
  digits.parse().ok()
}

pub fn next_code_from<'a>(tipo: CategoryType, existing: impl IntoIterator<Item = &'a str>) -> String {
  let highest = existing
    .into_iter()
    .filter_map(|code| parse_sequence(tipo, code))
    .max()
    .unwrap_or(0);
  format_code(tipo, highest + 1)
}

pub fn next_code(store: &dyn Store, tipo: CategoryType) -> Result<String, AppError> {
  let rows = store.select(
    Table::Categorias,
    &Query::new().columns(&["codigo"]).eq("tipo", tipo.as_str()),
  )?;
  let codes: Vec<&str> = rows
    .iter()
    .filter_map(|row| row.get("codigo").and_then(|value| value.as_str()))
    .collect();
  Ok(next_code_from(tipo, codes))
}
