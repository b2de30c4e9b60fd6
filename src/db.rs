use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use chrono::Utc;
use rusqlite::{params, Connection};
use uuid::Uuid;

use crate::error::AppError;

const DB_FILE: &str = "painel_gestao.sqlite";
const PRAGMAS: &str = "PRAGMA foreign_keys = ON; PRAGMA journal_mode = WAL; PRAGMA synchronous = NORMAL;";

pub struct Db {
  pub conn: Mutex<Connection>,
  pub db_path: PathBuf,
}

pub fn resolve_app_dir() -> Result<PathBuf, AppError> {
  if let Some(portable) = resolve_portable_dir()? {
    return Ok(portable);
  }

  let base = dirs_next::data_local_dir()
    .ok_or_else(|| AppError::new("PATH", "Diretorio de dados nao encontrado"))?;
  Ok(base.join("PainelGestao"))
}

pub fn init_db(app_dir: &Path) -> Result<Db, AppError> {
  fs::create_dir_all(app_dir)?;
  let db_path = app_dir.join(DB_FILE);
  let mut conn = open_connection(&db_path)?;

  run_migrations(&mut conn)?;
  seed_default_category_groups(&conn)?;

  tracing::info!(path = %db_path.display(), "database ready");
  Ok(Db {
    conn: Mutex::new(conn),
    db_path,
  })
}

pub fn with_conn<T>(db: &Db, f: impl FnOnce(&mut Connection) -> Result<T, AppError>) -> Result<T, AppError> {
  let mut guard = db.conn.lock()?;
  f(&mut guard)
}

pub fn reload_connection(db: &Db) -> Result<(), AppError> {
  let mut guard = db.conn.lock()?;
  let conn = open_connection(&db.db_path)?;
  *guard = conn;
  Ok(())
}

pub fn checkpoint(conn: &Connection) -> Result<(), AppError> {
  conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
  Ok(())
}

fn open_connection(db_path: &Path) -> Result<Connection, AppError> {
  let conn = Connection::open(db_path)?;
  conn.execute_batch(PRAGMAS)?;
  conn.busy_timeout(Duration::from_secs(5))?;
  Ok(conn)
}

fn run_migrations(conn: &mut Connection) -> Result<(), AppError> {
  conn.execute_batch(
    "CREATE TABLE IF NOT EXISTS schema_migrations (version TEXT PRIMARY KEY, applied_at TEXT NOT NULL)",
  )?;

  apply_migration(conn, "001_init", include_str!("../migrations/001_init.sql"))?;
  Ok(())
}

fn apply_migration(conn: &mut Connection, version: &str, sql: &str) -> Result<(), AppError> {
  let exists: i64 = conn.query_row(
    "SELECT COUNT(*) FROM schema_migrations WHERE version = ?1",
    params![version],
    |row| row.get(0),
  )?;
  if exists > 0 {
    return Ok(());
  }

  let tx = conn.transaction()?;
  tx.execute_batch(sql)?;
  tx.execute(
    "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, ?2)",
    params![version, Utc::now().to_rfc3339()],
  )?;
  tx.commit()?;
  tracing::info!(version, "migration applied");
  Ok(())
}

fn seed_default_category_groups(conn: &Connection) -> Result<(), AppError> {
  let count: i64 = conn.query_row("SELECT COUNT(*) FROM categorias_grupo", [], |row| row.get(0))?;
  if count > 0 {
    return Ok(());
  }

  let defaults = vec![
    ("Receitas Operacionais", "Receita", "Vendas de servicos e produtos"),
    ("Receitas Financeiras", "Receita", "Juros, rendimentos"),
    ("Despesas Operacionais", "Despesa", "Custos diretos da operacao"),
    ("Despesas Administrativas", "Despesa", "Aluguel, pessoal, escritorio"),
    ("Impostos", "Despesa", "Tributos sobre faturamento"),
  ];

  let now = Utc::now().to_rfc3339();
  for (nome, tipo, descricao) in defaults {
    conn.execute(
      "INSERT INTO categorias_grupo (id, nome, tipo, descricao, criado_em) VALUES (?1, ?2, ?3, ?4, ?5)",
      params![Uuid::new_v4().to_string(), nome, tipo, descricao, now],
    )?;
  }

  Ok(())
}

fn resolve_portable_dir() -> Result<Option<PathBuf>, AppError> {
  let env_enabled = std::env::var("PAINEL_PORTABLE")
    .ok()
    .map(|value| {
      let value = value.to_ascii_lowercase();
      value == "1" || value == "true" || value == "yes"
    })
    .unwrap_or(false);

  let exe_dir = std::env::current_exe()
    .ok()
    .and_then(|path| path.parent().map(|parent| parent.to_path_buf()));

  if let Some(exe_dir) = exe_dir {
    let flag = exe_dir.join("portable.flag");
    let data_dir = exe_dir.join("data");
    if env_enabled || flag.exists() || data_dir.exists() {
      fs::create_dir_all(&data_dir)?;
      return Ok(Some(data_dir));
    }
  }

  Ok(None)
}
