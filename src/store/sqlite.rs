use chrono::Utc;
use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{params, params_from_iter, Connection, TransactionBehavior};
use serde_json::{Number, Value};
use uuid::Uuid;

use super::schema::{ColumnKind, TableDef};
use super::{Filter, Query, Row, Store, Table};
use crate::db::{self, Db};
use crate::error::{AppError, INVALID_VALUE};

pub struct SqliteStore {
  db: Db,
}

impl SqliteStore {
  pub fn new(db: Db) -> Self {
    Self { db }
  }

  pub fn db(&self) -> &Db {
    &self.db
  }
}

impl Store for SqliteStore {
  fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, AppError> {
    db::with_conn(&self.db, |conn| select_rows(conn, table.def(), query))
  }

  fn insert(&self, table: Table, row: Row) -> Result<Row, AppError> {
    db::with_conn(&self.db, |conn| insert_row(conn, table.def(), row))
  }

  fn update(&self, table: Table, id: &str, patch: Row) -> Result<Row, AppError> {
    let def = table.def();
    db::with_conn(&self.db, |conn| {
      let mut patch = patch;
      patch.remove("id");
      if def.has_column("modificado_em") {
        patch.insert("modificado_em".into(), Value::from(Utc::now().to_rfc3339()));
      }
      if patch.is_empty() {
        return fetch_by_id(conn, def, id);
      }

      let mut assignments = Vec::with_capacity(patch.len());
      let mut values = Vec::with_capacity(patch.len() + 1);
      for (name, value) in &patch {
        let column = def.column(name)?;
        values.push(to_sql(column.kind, name, value)?);
        assignments.push(format!("{} = ?{}", column.name, values.len()));
      }
      values.push(SqlValue::Text(id.to_string()));
      let sql = format!(
        "UPDATE {} SET {} WHERE id = ?{}",
        def.name,
        assignments.join(", "),
        values.len()
      );

      let changed = conn.execute(&sql, params_from_iter(values.iter()))?;
      if changed == 0 {
        return Err(AppError::not_found(format!("Registro {id} nao encontrado em {}", def.name)));
      }
      fetch_by_id(conn, def, id)
    })
  }

  fn delete(&self, table: Table, id: &str) -> Result<(), AppError> {
    let def = table.def();
    db::with_conn(&self.db, |conn| {
      let removed = conn.execute(&format!("DELETE FROM {} WHERE id = ?1", def.name), params![id])?;
      if removed == 0 {
        tracing::debug!(table = def.name, id, "delete matched no row");
      }
      Ok(())
    })
  }

  fn delete_with_children(&self, table: Table, id: &str, children: &[(Table, &str)]) -> Result<(), AppError> {
    let def = table.def();
    let children = children
      .iter()
      .map(|(child, column)| {
        let child_def = child.def();
        child_def.column(column).map(|column| (child_def.name, column.name))
      })
      .collect::<Result<Vec<_>, _>>()?;
    db::with_conn(&self.db, |conn| {
      let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
      for (child, column) in &children {
        let removed = tx.execute(&format!("DELETE FROM {child} WHERE {column} = ?1"), params![id])?;
        tracing::debug!(table = child, removed, "child rows deleted");
      }
      tx.execute(&format!("DELETE FROM {} WHERE id = ?1", def.name), params![id])?;
      tx.commit()?;
      Ok(())
    })
  }

  // MAX + 1 and the insert share one immediate transaction.
  fn insert_sequenced(&self, table: Table, row: Row, sequence: &str, scope: &str) -> Result<Row, AppError> {
    let def = table.def();
    let sequence_column = def.column(sequence)?;
    let scope_column = def.column(scope)?;
    db::with_conn(&self.db, |conn| {
      let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
      let scope_value = row.get(scope).cloned().unwrap_or(Value::Null);
      let current: Option<i64> = if scope_value.is_null() {
        tx.query_row(
          &format!(
            "SELECT MAX({}) FROM {} WHERE {} IS NULL",
            sequence_column.name, def.name, scope_column.name
          ),
          [],
          |r| r.get(0),
        )?
      } else {
        let bound = to_sql(scope_column.kind, scope, &scope_value)?;
        tx.query_row(
          &format!(
            "SELECT MAX({}) FROM {} WHERE {} = ?1",
            sequence_column.name, def.name, scope_column.name
          ),
          params![bound],
          |r| r.get(0),
        )?
      };

      let mut row = row;
      row.insert(sequence.to_string(), Value::from(current.unwrap_or(0) + 1));
      let inserted = insert_row(&tx, def, row)?;
      tx.commit()?;
      Ok(inserted)
    })
  }
}

fn select_rows(conn: &Connection, def: &TableDef, query: &Query) -> Result<Vec<Row>, AppError> {
  let columns: Vec<_> = if query.columns.is_empty() {
    def.columns.iter().collect()
  } else {
    query
      .columns
      .iter()
      .map(|name| def.column(name))
      .collect::<Result<_, _>>()?
  };

  let mut sql = format!(
    "SELECT {} FROM {}",
    columns.iter().map(|column| column.name).collect::<Vec<_>>().join(", "),
    def.name
  );

  let mut clauses = Vec::new();
  let mut values = Vec::new();
  for filter in &query.filters {
    let Filter::Eq(name, value) = filter;
    let column = def.column(name)?;
    if value.is_null() {
      clauses.push(format!("{} IS NULL", column.name));
    } else {
      values.push(to_sql(column.kind, name, value)?);
      clauses.push(format!("{} = ?{}", column.name, values.len()));
    }
  }
  if !clauses.is_empty() {
    sql.push_str(" WHERE ");
    sql.push_str(&clauses.join(" AND "));
  }

  if !query.order.is_empty() {
    let order = query
      .order
      .iter()
      .map(|order| {
        def
          .column(&order.column)
          .map(|column| format!("{} {}", column.name, if order.descending { "DESC" } else { "ASC" }))
      })
      .collect::<Result<Vec<_>, _>>()?;
    sql.push_str(" ORDER BY ");
    sql.push_str(&order.join(", "));
  }

  match (query.limit, query.offset) {
    (Some(limit), Some(offset)) => sql.push_str(&format!(" LIMIT {limit} OFFSET {offset}")),
    (Some(limit), None) => sql.push_str(&format!(" LIMIT {limit}")),
    (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
    (None, None) => {}
  }

  let mut stmt = conn.prepare(&sql)?;
  let mut rows = stmt.query(params_from_iter(values.iter()))?;
  let mut out = Vec::new();
  while let Some(row) = rows.next()? {
    let mut record = Row::new();
    for (index, column) in columns.iter().enumerate() {
      record.insert(column.name.to_string(), from_sql(column.kind, row.get_ref(index)?));
    }
    out.push(record);
  }
  Ok(out)
}

fn insert_row(conn: &Connection, def: &TableDef, mut row: Row) -> Result<Row, AppError> {
  let id = match row.get("id").and_then(Value::as_str) {
    Some(id) if !id.trim().is_empty() => id.to_string(),
    _ => Uuid::new_v4().to_string(),
  };
  row.insert("id".into(), Value::from(id.clone()));

  let now = Utc::now().to_rfc3339();
  for stamp in ["criado_em", "modificado_em"] {
    if def.has_column(stamp) && row.get(stamp).map_or(true, Value::is_null) {
      row.insert(stamp.into(), Value::from(now.clone()));
    }
  }

  let mut names = Vec::with_capacity(row.len());
  let mut values = Vec::with_capacity(row.len());
  for (name, value) in &row {
    let column = def.column(name)?;
    names.push(column.name);
    values.push(to_sql(column.kind, name, value)?);
  }
  let placeholders = (1..=values.len()).map(|i| format!("?{i}")).collect::<Vec<_>>().join(", ");
  let sql = format!("INSERT INTO {} ({}) VALUES ({})", def.name, names.join(", "), placeholders);
  conn.execute(&sql, params_from_iter(values.iter()))?;

  fetch_by_id(conn, def, &id)
}

fn fetch_by_id(conn: &Connection, def: &TableDef, id: &str) -> Result<Row, AppError> {
  let mut rows = select_rows(conn, def, &Query::new().eq("id", id).limit(1))?;
  rows
    .pop()
    .ok_or_else(|| AppError::not_found(format!("Registro {id} nao encontrado em {}", def.name)))
}

fn to_sql(kind: ColumnKind, name: &str, value: &Value) -> Result<SqlValue, AppError> {
  let invalid = || AppError::new(INVALID_VALUE, format!("Valor invalido para {name}"));
  Ok(match (kind, value) {
    (_, Value::Null) => SqlValue::Null,
    (ColumnKind::Bool, Value::Bool(flag)) => SqlValue::Integer(i64::from(*flag)),
    (ColumnKind::Bool, Value::Number(n)) => match n.as_i64() {
      Some(0) => SqlValue::Integer(0),
      Some(1) => SqlValue::Integer(1),
      _ => return Err(invalid()),
    },
    (ColumnKind::Integer, Value::Number(n)) => SqlValue::Integer(n.as_i64().ok_or_else(invalid)?),
    (ColumnKind::Real, Value::Number(n)) => SqlValue::Real(n.as_f64().ok_or_else(invalid)?),
    (ColumnKind::Text, Value::String(s)) => SqlValue::Text(s.clone()),
    (ColumnKind::Text, Value::Number(n)) => SqlValue::Text(n.to_string()),
    _ => return Err(invalid()),
  })
}

fn from_sql(kind: ColumnKind, value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => match kind {
      ColumnKind::Bool => Value::Bool(i != 0),
      ColumnKind::Real => Number::from_f64(i as f64).map(Value::Number).unwrap_or(Value::Null),
      _ => Value::from(i),
    },
    ValueRef::Real(f) => Number::from_f64(f).map(Value::Number).unwrap_or(Value::Null),
    ValueRef::Text(bytes) => Value::from(String::from_utf8_lossy(bytes).into_owned()),
    ValueRef::Blob(_) => Value::Null,
  }
}
