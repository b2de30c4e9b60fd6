use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use serde_json::Value;

use painel_gestao::commands;
use painel_gestao::db;
use painel_gestao::domain::widget::{self, WidgetDraft};
use painel_gestao::error::{AppError, SAVE_FAILED, VALIDATION};
use painel_gestao::models::*;
use painel_gestao::store::{Filter, Query, Row, SqliteStore, Store, Table};

fn sqlite_store() -> (tempfile::TempDir, SqliteStore) {
  let dir = tempfile::tempdir().expect("tempdir");
  let store = SqliteStore::new(db::init_db(dir.path()).expect("init db"));
  (dir, store)
}

fn indicator_card(nome: &str, indicador_id: &str) -> WidgetDraft {
  let mut draft = WidgetDraft::new(Page::Home);
  draft.nome_exibicao = nome.into();
  draft.tipo_visualizacao = Some(VisualizationType::Card);
  draft.set_source(DataSource::Indicadores);
  draft.toggle_item(indicador_id).expect("select");
  draft
}

/// Rows keyed by table, enough to exercise the trait's default methods.
#[derive(Default)]
struct MemoryStore {
  rows: Mutex<BTreeMap<&'static str, Vec<Row>>>,
  fail_inserts: bool,
}

impl MemoryStore {
  fn matches(row: &Row, query: &Query) -> bool {
    query.filters.iter().all(|Filter::Eq(column, value)| row.get(column).unwrap_or(&Value::Null) == value)
  }
}

impl Store for MemoryStore {
  fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, AppError> {
    let rows = self.rows.lock()?;
    let mut found: Vec<Row> = rows
      .get(table.name())
      .map(|rows| rows.iter().filter(|row| Self::matches(row, query)).cloned().collect())
      .unwrap_or_default();
    if let Some(order) = query.order.first() {
      found.sort_by_key(|row| row.get(&order.column).and_then(Value::as_i64).unwrap_or(0));
      if order.descending {
        found.reverse();
      }
    }
    if let Some(limit) = query.limit {
      found.truncate(limit);
    }
    Ok(found)
  }

  fn insert(&self, table: Table, mut row: Row) -> Result<Row, AppError> {
    if self.fail_inserts {
      return Err(AppError::new("DB_ERROR", "connection reset"));
    }
    let mut rows = self.rows.lock()?;
    let entries = rows.entry(table.name()).or_default();
    row.insert("id".into(), Value::from(format!("mem-{}", entries.len() + 1)));
    row.insert("criado_em".into(), Value::from("2024-01-01T00:00:00+00:00"));
    entries.push(row.clone());
    Ok(row)
  }

  fn update(&self, _table: Table, id: &str, _patch: Row) -> Result<Row, AppError> {
    Err(AppError::not_found(id))
  }

  fn delete(&self, table: Table, id: &str) -> Result<(), AppError> {
    let mut rows = self.rows.lock()?;
    if let Some(entries) = rows.get_mut(table.name()) {
      entries.retain(|row| row.get("id").and_then(Value::as_str) != Some(id));
    }
    Ok(())
  }
}

/// Wraps the SQLite store and fails inserts into one table once `allowed` of them went through.
struct FailingTable {
  inner: SqliteStore,
  table: Table,
  allowed: AtomicUsize,
}

impl FailingTable {
  fn new(inner: SqliteStore, table: Table, allowed: usize) -> Self {
    Self {
      inner,
      table,
      allowed: AtomicUsize::new(allowed),
    }
  }
}

impl Store for FailingTable {
  fn select(&self, table: Table, query: &Query) -> Result<Vec<Row>, AppError> {
    self.inner.select(table, query)
  }

  fn insert(&self, table: Table, row: Row) -> Result<Row, AppError> {
    if table == self.table
      && self
        .allowed
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_err()
    {
      return Err(AppError::new("DB_ERROR", "disk I/O error"));
    }
    self.inner.insert(table, row)
  }

  fn update(&self, table: Table, id: &str, patch: Row) -> Result<Row, AppError> {
    self.inner.update(table, id, patch)
  }

  fn delete(&self, table: Table, id: &str) -> Result<(), AppError> {
    self.inner.delete(table, id)
  }

  fn insert_sequenced(&self, table: Table, row: Row, sequence: &str, scope: &str) -> Result<Row, AppError> {
    self.inner.insert_sequenced(table, row, sequence, scope)
  }
}

fn partner(nome: &str, percentual: f64) -> PartnerInput {
  PartnerInput {
    nome: nome.into(),
    cpf: None,
    percentual,
  }
}

#[test]
fn sequential_widgets_on_a_page_get_consecutive_orders() {
  let (_dir, store) = sqlite_store();
  assert_eq!(widget::next_widget_order(&store, Page::Home).expect("preview"), 1);

  let orders: Vec<i64> = (1..=4)
    .map(|n| {
      commands::create_widget(&store, indicator_card(&format!("Widget {n}"), "ind-1"), None)
        .expect("create")
        .ordem
    })
    .collect();
  assert_eq!(orders, vec![1, 2, 3, 4]);

  // pages are numbered independently
  let mut other = indicator_card("Vendas", "ind-1");
  other.pagina = Page::Vendas;
  assert_eq!(commands::create_widget(&store, other, None).expect("vendas").ordem, 1);

  let listed = widget::list_widgets(&store, Page::Home, None).expect("list");
  assert_eq!(listed.iter().map(|w| w.ordem).collect::<Vec<_>>(), vec![1, 2, 3, 4]);
  assert_eq!(widget::next_widget_order(&store, Page::Home).expect("preview"), 5);
}

#[test]
fn deleting_a_widget_leaves_a_gap() {
  let (_dir, store) = sqlite_store();
  let first = commands::create_widget(&store, indicator_card("A", "i"), None).expect("a");
  commands::create_widget(&store, indicator_card("B", "i"), None).expect("b");
  commands::delete_widget(&store, &first.id, None).expect("delete");

  let next = commands::create_widget(&store, indicator_card("C", "i"), None).expect("c");
  assert_eq!(next.ordem, 3);
  let orders: Vec<i64> = widget::list_widgets(&store, Page::Home, None)
    .expect("list")
    .iter()
    .map(|w| w.ordem)
    .collect();
  assert_eq!(orders, vec![2, 3]);
}

#[test]
fn concurrent_widget_creation_never_duplicates_an_order() {
  let (_dir, store) = sqlite_store();
  let store = Arc::new(store);

  let handles: Vec<_> = (0..8)
    .map(|n| {
      let store = Arc::clone(&store);
      thread::spawn(move || {
        commands::create_widget(&*store, indicator_card(&format!("W{n}"), "ind"), None)
          .expect("create")
          .ordem
      })
    })
    .collect();

  let orders: HashSet<i64> = handles.into_iter().map(|h| h.join().expect("join")).collect();
  assert_eq!(orders, (1..=8).collect::<HashSet<i64>>());
}

#[test]
fn persisted_widget_row_carries_the_derived_fields() {
  let (_dir, store) = sqlite_store();
  let mut draft = WidgetDraft::new(Page::Graficos);
  draft.nome_exibicao = "  Top clientes ".into();
  draft.tipo_visualizacao = Some(VisualizationType::Grafico);
  draft.tipo_grafico = Some(ChartType::Radar);
  draft.set_source(DataSource::Clientes);
  draft.todos_clientes = true;

  let saved = commands::create_widget(&store, draft, Some("ana".into())).expect("create");
  assert_eq!(saved.nome_exibicao, "Top clientes");
  assert_eq!(saved.campo_exibicao, widget::FIELD_ALL);
  assert_eq!(saved.origem_id, None);
  assert_eq!(saved.tipo_grafico, Some(ChartType::Radar));
  assert!(saved.ativo);

  let row = store
    .find_by_id(Table::ConfigVisualizacoes, &saved.id)
    .expect("find")
    .expect("row");
  assert_eq!(row.get("fonte_dados"), Some(&Value::from("clientes")));
  assert_eq!(row.get("pagina"), Some(&Value::from("graficos")));
}

#[test]
fn invalid_draft_writes_nothing() {
  let (_dir, store) = sqlite_store();
  let mut draft = indicator_card("X", "ind");
  draft.nome_exibicao.clear();

  let err = commands::create_widget(&store, draft, None).unwrap_err();
  assert_eq!(err.code, VALIDATION);
  assert!(widget::list_widgets(&store, Page::Home, None).expect("list").is_empty());
}

#[test]
fn store_failure_becomes_the_generic_retry_message() {
  let store = MemoryStore {
    fail_inserts: true,
    ..MemoryStore::default()
  };
  let draft = indicator_card("Faturamento", "ind");
  let mut refreshed = false;

  let err = widget::create_widget(&store, &draft, |_| refreshed = true).unwrap_err();
  assert_eq!(err.code, SAVE_FAILED);
  assert_eq!(err.message, "Erro ao salvar widget. Tente novamente.");
  assert!(!refreshed);
  assert_eq!(draft.nome_exibicao, "Faturamento");
}

#[test]
fn default_sequencing_works_on_any_store() {
  let store = MemoryStore::default();
  let mut refreshed = 0;
  for n in 0..3 {
    let saved = widget::create_widget(&store, &indicator_card(&format!("W{n}"), "ind"), |_| refreshed += 1)
      .expect("create");
    assert_eq!(saved.ordem, n + 1);
  }
  assert_eq!(refreshed, 3);
}

#[test]
fn source_items_list_active_rows_by_label() {
  let (_dir, store) = sqlite_store();
  let empresa = commands::create_company(
    &store,
    CompanyInput {
      razao_social: "Empresa".into(),
      nome_fantasia: None,
      cnpj: "1".into(),
      email: None,
      telefone: None,
      data_inicio_contrato: None,
      socios: Vec::new(),
    },
    None,
  )
  .expect("company")
  .empresa;
  for nome in ["Zeta", "Alfa"] {
    commands::create_client(
      &store,
      ClientInput {
        empresa_id: empresa.id.clone(),
        razao_social: nome.into(),
        nome_fantasia: None,
        cnpj: None,
        email: None,
        telefone: None,
      },
      None,
    )
    .expect("client");
  }

  let items = widget::load_source_items(&store, DataSource::Clientes).expect("items");
  let labels: Vec<&str> = items.iter().map(|item| item.label()).collect();
  assert_eq!(labels, vec!["Alfa", "Zeta"]);
  assert!(widget::load_source_items(&store, DataSource::RegistroDeVendas)
    .expect("sales")
    .is_empty());
}

#[test]
fn company_and_partners_round_trip_through_the_api_models() {
  let (_dir, store) = sqlite_store();
  let created = commands::create_company(
    &store,
    CompanyInput {
      razao_social: "Sigma Ltda".into(),
      nome_fantasia: Some("Sigma".into()),
      cnpj: "55.666.777/0001-88".into(),
      email: None,
      telefone: None,
      data_inicio_contrato: Some("2023-09-01".into()),
      socios: vec![PartnerInput {
        nome: "Lia".into(),
        cpf: Some("123.456.789-00".into()),
        percentual: 100.0,
      }],
    },
    Some("admin".into()),
  )
  .expect("create");

  let json = serde_json::to_value(&created).expect("json");
  assert_eq!(json["razao_social"], "Sigma Ltda");
  assert_eq!(json["socios"][0]["nome"], "Lia");

  let extra = commands::add_partner(
    &store,
    &created.empresa.id,
    PartnerInput {
      nome: "Caio".into(),
      cpf: None,
      percentual: 0.0,
    },
    None,
  )
  .expect("partner");
  commands::delete_partner(&store, &extra.id, None).expect("remove");
  assert_eq!(commands::list_partners(&store, &created.empresa.id).expect("list").len(), 1);

  let missing = commands::add_partner(
    &store,
    "nao-existe",
    PartnerInput {
      nome: "X".into(),
      cpf: None,
      percentual: 10.0,
    },
    None,
  )
  .unwrap_err();
  assert_eq!(missing.code, painel_gestao::error::NOT_FOUND);
}

#[test]
fn failed_partner_insert_removes_the_company_again() {
  let (_dir, inner) = sqlite_store();
  let store = FailingTable::new(inner, Table::Socios, 1);

  let err = commands::create_company(
    &store,
    CompanyInput {
      razao_social: "Delta Ltda".into(),
      nome_fantasia: None,
      cnpj: "99.888.777/0001-66".into(),
      email: None,
      telefone: None,
      data_inicio_contrato: None,
      socios: vec![partner("Ana", 60.0), partner("Bia", 40.0)],
    },
    None,
  )
  .unwrap_err();

  assert_eq!(err.code, SAVE_FAILED);
  assert_eq!(err.message, "Erro ao salvar empresa. Tente novamente.");
  assert!(store.select(Table::Empresas, &Query::new()).expect("empresas").is_empty());
  assert!(store.select(Table::Socios, &Query::new()).expect("socios").is_empty());
}

#[test]
fn saved_widget_is_reported_even_when_the_audit_entry_fails() {
  let (_dir, inner) = sqlite_store();
  let store = FailingTable::new(inner, Table::AuditLog, 0);

  let saved = commands::create_widget(&store, indicator_card("Faturamento", "ind"), Some("ana".into()))
    .expect("widget saved");
  assert_eq!(saved.ordem, 1);

  let listed = widget::list_widgets(&store, Page::Home, None).expect("list");
  assert_eq!(listed.len(), 1);
  assert!(store.select(Table::AuditLog, &Query::new()).expect("audit").is_empty());
}

#[test]
fn deleting_a_company_takes_partners_and_indicator_links_along() {
  let (_dir, store) = sqlite_store();
  let created = commands::create_company(
    &store,
    CompanyInput {
      razao_social: "Omega".into(),
      nome_fantasia: None,
      cnpj: "3".into(),
      email: None,
      telefone: None,
      data_inicio_contrato: None,
      socios: vec![partner("Rui", 100.0)],
    },
    None,
  )
  .expect("company");
  let indicator = commands::create_indicator(
    &store,
    IndicatorInput {
      codigo: "MRG".into(),
      nome: "Margem".into(),
      descricao: None,
      tipo_estrutura: StructureType::Composto,
      tipo_dado: DataKind::Moeda,
    },
    None,
  )
  .expect("indicator");
  commands::link_indicator_company(&store, &indicator.id, &created.empresa.id, None).expect("link");

  commands::delete_company(&store, &created.empresa.id, None).expect("delete");
  assert!(store.select(Table::Empresas, &Query::new()).expect("empresas").is_empty());
  assert!(store.select(Table::Socios, &Query::new()).expect("socios").is_empty());
  assert!(store
    .select(Table::IndicadoresEmpresas, &Query::new())
    .expect("links")
    .is_empty());
}
