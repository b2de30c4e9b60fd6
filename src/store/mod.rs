pub mod schema;
pub mod sqlite;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use crate::error::AppError;

pub use schema::{ColumnKind, Table};
pub use sqlite::SqliteStore;

pub type Row = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
  Eq(String, Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Order {
  pub column: String,
  pub descending: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
  pub columns: Vec<String>,
  pub filters: Vec<Filter>,
  pub order: Vec<Order>,
  pub limit: Option<usize>,
  pub offset: Option<usize>,
}

impl Query {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn columns(mut self, columns: &[&str]) -> Self {
    self.columns = columns.iter().map(|column| column.to_string()).collect();
    self
  }

  pub fn eq(mut self, column: &str, value: impl Into<Value>) -> Self {
    self.filters.push(Filter::Eq(column.to_string(), value.into()));
    self
  }

  pub fn order_by(mut self, column: &str, descending: bool) -> Self {
    self.order.push(Order {
      column: column.to_string(),
      descending,
    });
    self
  }

  pub fn limit(mut self, limit: usize) -> Self {
    self.limit = Some(limit);
    self
  }

  pub fn offset(mut self, offset: usize) -> Self {
    self.offset = Some(offset);
    self
  }
}

pub trait Store: Send + Sync {
  fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, AppError>;

  fn insert(&self, table: Table, row: Row) -> Result<Row, AppError>;

  fn update(&self, table: Table, id: &str, patch: Row) -> Result<Row, AppError>;

  fn delete(&self, table: Table, id: &str) -> Result<(), AppError>;

  /// Inserts `row` with `sequence` set to one more than the highest value sharing the
  /// row's `scope` value, starting at 1. This default reads then writes and can hand
  /// out the same number to concurrent writers; implementations should override it.
  fn insert_sequenced(&self, table: Table, mut row: Row, sequence: &str, scope: &str) -> Result<Row, AppError> {
    let scope_value = row.get(scope).cloned().unwrap_or(Value::Null);
    let current = self.select(
      table,
      &Query::new()
        .columns(&[sequence])
        .eq(scope, scope_value)
        .order_by(sequence, true)
        .limit(1),
    )?;
    let next = current
      .first()
      .and_then(|top| top.get(sequence))
      .and_then(Value::as_i64)
      .unwrap_or(0)
      + 1;
    row.insert(sequence.to_string(), Value::from(next));
    self.insert(table, row)
  }

  fn delete_with_children(&self, table: Table, id: &str, children: &[(Table, &str)]) -> Result<(), AppError> {
    for (child, column) in children {
      for row in self.select(*child, &Query::new().columns(&["id"]).eq(column, id))? {
        if let Some(child_id) = row.get("id").and_then(Value::as_str) {
          self.delete(*child, child_id)?;
        }
      }
    }
    self.delete(table, id)
  }

  fn find_by_id(&self, table: Table, id: &str) -> Result<Option<Row>, AppError> {
    let mut rows = self.select(table, &Query::new().eq("id", id).limit(1))?;
    Ok(rows.pop())
  }
}

pub fn from_row<T: DeserializeOwned>(row: Row) -> Result<T, AppError> {
  Ok(serde_json::from_value(Value::Object(row))?)
}

pub fn from_rows<T: DeserializeOwned>(rows: Vec<Row>) -> Result<Vec<T>, AppError> {
  rows.into_iter().map(from_row).collect()
}

pub fn to_row<T: Serialize>(value: &T) -> Result<Row, AppError> {
  match serde_json::to_value(value)? {
    Value::Object(map) => Ok(map),
    _ => Err(AppError::new("JSON_ERROR", "Registro precisa ser um objeto")),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde::Deserialize;

  #[derive(Debug, Serialize, Deserialize, PartialEq)]
  struct Socio {
    nome: String,
    percentual: f64,
    cpf: Option<String>,
  }

  #[test]
  fn query_builder_collects_clauses_in_order() {
    let query = Query::new()
      .columns(&["ordem"])
      .eq("pagina", "home")
      .order_by("ordem", true)
      .limit(1);

    assert_eq!(query.columns, vec!["ordem".to_string()]);
    assert_eq!(query.filters, vec![Filter::Eq("pagina".into(), Value::from("home"))]);
    assert_eq!(query.order[0].column, "ordem");
    assert!(query.order[0].descending);
    assert_eq!(query.limit, Some(1));
    assert_eq!(query.offset, None);
  }

  #[test]
  fn typed_records_convert_through_rows() {
    let socio = Socio {
      nome: "Ana".into(),
      percentual: 40.0,
      cpf: None,
    };
    let row = to_row(&socio).expect("row");
    assert_eq!(row.get("cpf"), Some(&Value::Null));
    let back: Socio = from_row(row).expect("typed");
    assert_eq!(back, socio);
  }
}
