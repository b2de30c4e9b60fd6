use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::{AuditLogEntry, Paginated};
use crate::store::{from_rows, Query, Row, Store, Table};

pub const MAX_PAGE_SIZE: i64 = 500;

// Runs after the audited write has landed, so a failure here is logged and never
// turned into an error for a change that is already saved.
pub fn append_audit<P: Serialize>(
  store: &dyn Store,
  actor: Option<String>,
  action: &str,
  entity_type: &str,
  entity_id: Option<String>,
  payload: &P,
) {
  let payload_json = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
  let mut row = Row::new();
  row.insert("ts".into(), Value::from(Utc::now().to_rfc3339()));
  row.insert("actor".into(), actor.map(Value::from).unwrap_or(Value::Null));
  row.insert("action".into(), Value::from(action));
  row.insert("entity_type".into(), Value::from(entity_type));
  row.insert("entity_id".into(), entity_id.clone().map(Value::from).unwrap_or(Value::Null));
  row.insert("payload_json".into(), Value::from(payload_json));
  if let Err(err) = store.insert(Table::AuditLog, row) {
    tracing::error!(
      action,
      entity_type,
      entity_id = entity_id.as_deref().unwrap_or(""),
      code = %err.code,
      message = %err.message,
      "audit entry not written"
    );
  }
}

pub fn list_audit_log(store: &dyn Store, page: i64, page_size: i64) -> Result<Paginated<AuditLogEntry>, AppError> {
  let page = page.max(1);
  let page_size = if page_size < 1 { 50 } else { page_size.min(MAX_PAGE_SIZE) };
  let offset = (page - 1)
    .checked_mul(page_size)
    .and_then(|offset| usize::try_from(offset).ok())
    .ok_or_else(|| AppError::validation("Pagina fora do intervalo"))?;
  let limit = usize::try_from(page_size).map_err(|_| AppError::validation("Tamanho de pagina invalido"))?;

  let total = store.select(Table::AuditLog, &Query::new().columns(&["id"]))?.len();
  let rows = store.select(
    Table::AuditLog,
    &Query::new().order_by("ts", true).limit(limit).offset(offset),
  )?;

  Ok(Paginated {
    total: i64::try_from(total).unwrap_or(i64::MAX),
    items: from_rows(rows)?,
  })
}
