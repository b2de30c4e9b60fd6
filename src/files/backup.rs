use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::Connection;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

use crate::db::{self, Db};
use crate::error::AppError;

const DB_ENTRY: &str = "db.sqlite";

pub fn create_backup(app_dir: &Path, database: &Db, output_path: Option<String>) -> Result<String, AppError> {
  let backup_dir = app_dir.join("Backups");
  fs::create_dir_all(&backup_dir)?;

  let filename = output_path.unwrap_or_else(|| {
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    backup_dir
      .join(format!("backup_{stamp}.zip"))
      .to_string_lossy()
      .to_string()
  });
  if let Some(parent) = Path::new(&filename).parent() {
    fs::create_dir_all(parent)?;
  }

  // Hold the lock while reading so no write lands between checkpoint and copy.
  let buffer = db::with_conn(database, |conn| {
    db::checkpoint(conn)?;
    let mut buffer = Vec::new();
    File::open(&database.db_path)?.read_to_end(&mut buffer)?;
    Ok(buffer)
  })?;

  let file = File::create(&filename)?;
  let mut zip = ZipWriter::new(file);
  let options = FileOptions::<()>::default().compression_method(zip::CompressionMethod::Deflated);
  zip.start_file(DB_ENTRY, options)?;
  zip.write_all(&buffer)?;
  zip.finish()?;

  tracing::info!(path = %filename, bytes = buffer.len(), "backup written");
  Ok(filename)
}

pub fn restore_backup(archive_path: &str, database: &Db) -> Result<(), AppError> {
  let file = File::open(archive_path)?;
  let mut archive = ZipArchive::new(file)?;
  let mut entry = archive
    .by_name(DB_ENTRY)
    .map_err(|_| AppError::validation("Backup nao contem banco de dados"))?;

  let staged: PathBuf = database.db_path.with_extension("restore");
  {
    let mut outfile = File::create(&staged)?;
    std::io::copy(&mut entry, &mut outfile)?;
  }

  let swapped = db::with_conn(database, |conn| {
    db::checkpoint(conn)?;
    let previous = std::mem::replace(conn, Connection::open_in_memory()?);
    previous.close().map_err(|(_, err)| AppError::from(err))?;
    swap_database_file(&database.db_path, &staged)
  });

  // The shared connection is reopened on the file that is in place either way.
  let reloaded = db::reload_connection(database);
  if let Err(err) = swapped {
    if staged.exists() {
      if let Err(cleanup) = fs::remove_file(&staged) {
        tracing::warn!(path = %staged.display(), error = %cleanup, "staged restore not removed");
      }
    }
    if let Err(reload) = &reloaded {
      tracing::error!(code = %reload.code, message = %reload.message, "database not reopened after failed restore");
    }
    tracing::error!(archive = archive_path, code = %err.code, message = %err.message, "restore failed");
    return Err(err);
  }
  reloaded?;

  tracing::info!(archive = archive_path, "backup restored");
  Ok(())
}

fn swap_database_file(db_path: &Path, staged: &Path) -> Result<(), AppError> {
  if db_path.exists() {
    fs::copy(db_path, db_path.with_extension("bak"))?;
  }
  for suffix in ["sqlite-wal", "sqlite-shm"] {
    let side = db_path.with_extension(suffix);
    if side.exists() {
      fs::remove_file(side)?;
    }
  }
  fs::rename(staged, db_path)?;
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::store::{Query, Row, SqliteStore, Store, Table};
  use serde_json::Value;

  #[test]
  fn restore_brings_back_the_archived_rows() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::new(db::init_db(dir.path()).expect("db"));
    let company = {
      let mut row = Row::new();
      row.insert("razao_social".into(), Value::from("Antes"));
      row.insert("cnpj".into(), Value::from("1"));
      store.insert(Table::Empresas, row).expect("company")
    };

    let archive = create_backup(dir.path(), store.db(), None).expect("backup");
    let id = company.get("id").and_then(Value::as_str).expect("id").to_string();
    store.delete(Table::Empresas, &id).expect("delete");
    assert!(store.select(Table::Empresas, &Query::new()).expect("rows").is_empty());

    restore_backup(&archive, store.db()).expect("restore");
    let rows = store.select(Table::Empresas, &Query::new()).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("razao_social"), Some(&Value::from("Antes")));
    assert!(store.db().db_path.with_extension("bak").exists());
  }

  #[test]
  fn failed_restore_reopens_the_current_database() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = SqliteStore::new(db::init_db(dir.path()).expect("db"));
    let archive = create_backup(dir.path(), store.db(), None).expect("backup");

    let mut row = Row::new();
    row.insert("razao_social".into(), Value::from("Depois"));
    row.insert("cnpj".into(), Value::from("2"));
    store.insert(Table::Empresas, row).expect("company");

    // a directory where the .bak copy should go makes the swap fail
    let db_path = store.db().db_path.clone();
    fs::create_dir(db_path.with_extension("bak")).expect("blocker");

    let err = restore_backup(&archive, store.db()).unwrap_err();
    assert_eq!(err.code, "IO_ERROR");
    let rows = store.select(Table::Empresas, &Query::new()).expect("rows");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get("razao_social"), Some(&Value::from("Depois")));
    assert!(!db_path.with_extension("restore").exists());
  }

  #[test]
  fn archive_without_database_is_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let database = db::init_db(dir.path()).expect("db");
    let path = dir.path().join("vazio.zip");
    {
      let mut zip = ZipWriter::new(File::create(&path).expect("file"));
      zip.start_file("leia.txt", FileOptions::<()>::default()).expect("entry");
      zip.write_all(b"nada").expect("write");
      zip.finish().expect("finish");
    }
    let err = restore_backup(path.to_str().expect("utf8"), &database).unwrap_err();
    assert_eq!(err.code, crate::error::VALIDATION);
  }
}
