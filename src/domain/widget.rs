//! Dashboard widget builder.
//!
//! A [`WidgetDraft`] collects what the user picked in the "Novo Widget" form. The
//! draft is validated and turned into exactly one `config_visualizacoes` row whose
//! derived fields depend on the chosen data source:
//!
//! * `registro_de_vendas`: `campo_exibicao` is the chosen sales field, no linked row.
//! * `indicadores` / `categorias`: one linked row, `campo_exibicao = "primary"`.
//! * `clientes`: either every client (`origem_id = null`, `campo_exibicao = "all"`)
//!   or one linked client exactly like the other sources.

use serde::{Deserialize, Serialize};

use crate::domain::filter;
use crate::error::{AppError, SELECTION_FULL};
use crate::models::{
  ChartType, DataSource, NewWidgetConfig, Page, SalesField, VisualizationType, WidgetConfig,
};
use crate::store::{from_row, from_rows, to_row, Query, Store, Table};

pub const FIELD_PRIMARY: &str = "primary";
pub const FIELD_ALL: &str = "all";

const ORDER_COLUMN: &str = "ordem";
const PAGE_COLUMN: &str = "pagina";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WidgetDraft {
  pub pagina: Page,
  #[serde(default)]
  pub nome_exibicao: String,
  pub tipo_visualizacao: Option<VisualizationType>,
  pub tipo_grafico: Option<ChartType>,
  pub fonte_dados: Option<DataSource>,
  pub campo_exibicao: Option<SalesField>,
  #[serde(default)]
  pub todos_clientes: bool,
  #[serde(default)]
  pub selecionados: Vec<String>,
}

impl WidgetDraft {
  pub fn new(pagina: Page) -> Self {
    Self {
      pagina,
      nome_exibicao: String::new(),
      tipo_visualizacao: None,
      tipo_grafico: None,
      fonte_dados: None,
      campo_exibicao: None,
      todos_clientes: false,
      selecionados: Vec::new(),
    }
  }

  pub fn selection_capacity(&self) -> usize {
    match self.tipo_visualizacao {
      Some(VisualizationType::Grafico) => 3,
      _ => 1,
    }
  }

  pub fn toggle_item(&mut self, id: &str) -> Result<(), AppError> {
    if let Some(position) = self.selecionados.iter().position(|selected| selected == id) {
      self.selecionados.remove(position);
      return Ok(());
    }
    let capacity = self.selection_capacity();
    if self.selecionados.len() >= capacity {
      return Err(AppError::new(
        SELECTION_FULL,
        format!("Selecione no maximo {capacity} item(ns). Remova um antes de adicionar outro."),
      ));
    }
    self.selecionados.push(id.to_string());
    Ok(())
  }

  pub fn set_source(&mut self, fonte: DataSource) {
    if self.fonte_dados != Some(fonte) {
      self.fonte_dados = Some(fonte);
      self.campo_exibicao = None;
      self.todos_clientes = false;
      self.selecionados.clear();
    }
  }

  pub fn validate(&self) -> Result<(), AppError> {
    if self.nome_exibicao.trim().is_empty() {
      return Err(AppError::validation("Informe o nome do widget"));
    }
    let tipo = self
      .tipo_visualizacao
      .ok_or_else(|| AppError::validation("Selecione o tipo de visualizacao"))?;
    if tipo == VisualizationType::Grafico && self.tipo_grafico.is_none() {
      return Err(AppError::validation("Selecione o tipo de grafico"));
    }
    let fonte = self
      .fonte_dados
      .ok_or_else(|| AppError::validation("Selecione a fonte de dados"))?;

    match fonte {
      DataSource::RegistroDeVendas => {
        if self.campo_exibicao.is_none() {
          return Err(AppError::validation("Selecione o campo a exibir"));
        }
      }
      DataSource::Clientes if self.todos_clientes => {
        if !self.selecionados.is_empty() {
          return Err(AppError::validation(
            "Desmarque os clientes selecionados ou a opcao todos os clientes",
          ));
        }
      }
      _ => {
        if self.todos_clientes {
          return Err(AppError::validation("Todos os clientes so vale para a fonte clientes"));
        }
        if self.selecionados.is_empty() {
          return Err(AppError::validation("Selecione pelo menos um item"));
        }
      }
    }

    if self.selecionados.len() > self.selection_capacity() {
      return Err(AppError::new(
        SELECTION_FULL,
        format!("Selecione no maximo {} item(ns)", self.selection_capacity()),
      ));
    }
    Ok(())
  }

  pub fn build_record(&self) -> Result<NewWidgetConfig, AppError> {
    self.validate()?;
    let tipo_visualizacao = self
      .tipo_visualizacao
      .ok_or_else(|| AppError::validation("Selecione o tipo de visualizacao"))?;
    let fonte_dados = self
      .fonte_dados
      .ok_or_else(|| AppError::validation("Selecione a fonte de dados"))?;

    let (campo_exibicao, origem_id) = match fonte_dados {
      DataSource::RegistroDeVendas => (
        self.campo_exibicao.map(SalesField::as_str).unwrap_or_default().to_string(),
        None,
      ),
      DataSource::Clientes if self.todos_clientes => (FIELD_ALL.to_string(), None),
      _ => (FIELD_PRIMARY.to_string(), self.selecionados.first().cloned()),
    };

    if self.selecionados.len() > 1 && origem_id.is_some() {
      tracing::warn!(
        pagina = self.pagina.as_str(),
        discarded = ?&self.selecionados[1..],
        "only the first selected item is stored on the widget"
      );
    }

    Ok(NewWidgetConfig {
      pagina: self.pagina,
      nome_exibicao: self.nome_exibicao.trim().to_string(),
      tipo_visualizacao,
      tipo_grafico: match tipo_visualizacao {
        VisualizationType::Grafico => self.tipo_grafico,
        _ => None,
      },
      fonte_dados,
      campo_exibicao,
      origem_id,
      ativo: true,
    })
  }
}

pub fn next_widget_order(store: &dyn Store, pagina: Page) -> Result<i64, AppError> {
  let rows = store.select(
    Table::ConfigVisualizacoes,
    &Query::new()
      .columns(&[ORDER_COLUMN])
      .eq(PAGE_COLUMN, pagina.as_str())
      .order_by(ORDER_COLUMN, true)
      .limit(1),
  )?;
  Ok(
    rows
      .first()
      .and_then(|row| row.get(ORDER_COLUMN))
      .and_then(|value| value.as_i64())
      .unwrap_or(0)
      + 1,
  )
}

pub fn create_widget(
  store: &dyn Store,
  draft: &WidgetDraft,
  on_saved: impl FnOnce(&WidgetConfig),
) -> Result<WidgetConfig, AppError> {
  let record = draft.build_record()?;
  let saved = to_row(&record)
    .and_then(|row| store.insert_sequenced(Table::ConfigVisualizacoes, row, ORDER_COLUMN, PAGE_COLUMN))
    .and_then(from_row::<WidgetConfig>)
    .map_err(|err| AppError::save_failed("widget", err))?;

  tracing::info!(
    id = %saved.id,
    pagina = saved.pagina.as_str(),
    ordem = saved.ordem,
    "widget created"
  );
  on_saved(&saved);
  Ok(saved)
}

pub fn list_widgets(store: &dyn Store, pagina: Page, busca: Option<&str>) -> Result<Vec<WidgetConfig>, AppError> {
  let rows = store
    .select(
      Table::ConfigVisualizacoes,
      &Query::new().eq(PAGE_COLUMN, pagina.as_str()).order_by(ORDER_COLUMN, false),
    )
    .map_err(|err| AppError::load_failed("widgets", err))?;
  let widgets: Vec<WidgetConfig> = from_rows(rows)?;
  Ok(match busca {
    Some(term) => filter::filter_records(&widgets, term).into_iter().cloned().collect(),
    None => widgets,
  })
}

pub fn delete_widget(store: &dyn Store, id: &str) -> Result<(), AppError> {
  store
    .delete(Table::ConfigVisualizacoes, id)
    .map_err(|err| AppError::save_failed("widget", err))
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "tipo", rename_all = "snake_case")]
pub enum SourceItem {
  Indicator { id: String, nome: String },
  Category { id: String, nome: String },
  Client { id: String, razao_social: String },
}

impl SourceItem {
  pub fn id(&self) -> &str {
    match self {
      SourceItem::Indicator { id, .. } | SourceItem::Category { id, .. } | SourceItem::Client { id, .. } => id,
    }
  }

  pub fn label(&self) -> &str {
    match self {
      SourceItem::Indicator { nome, .. } | SourceItem::Category { nome, .. } => nome,
      SourceItem::Client { razao_social, .. } => razao_social,
    }
  }

  pub fn source(&self) -> DataSource {
    match self {
      SourceItem::Indicator { .. } => DataSource::Indicadores,
      SourceItem::Category { .. } => DataSource::Categorias,
      SourceItem::Client { .. } => DataSource::Clientes,
    }
  }
}

pub fn load_source_items(store: &dyn Store, fonte: DataSource) -> Result<Vec<SourceItem>, AppError> {
  let (table, label) = match fonte {
    DataSource::RegistroDeVendas => return Ok(Vec::new()),
    DataSource::Indicadores => (Table::Indicadores, "nome"),
    DataSource::Categorias => (Table::Categorias, "nome"),
    DataSource::Clientes => (Table::Clientes, "razao_social"),
  };

  let rows = store
    .select(
      table,
      &Query::new().columns(&["id", label]).eq("ativo", true).order_by(label, false),
    )
    .map_err(|err| AppError::load_failed("itens", err))?;

  let items = rows
    .into_iter()
    .filter_map(|row| {
      let id = row.get("id")?.as_str()?.to_string();
      let text = row.get(label)?.as_str()?.to_string();
      Some(match fonte {
        DataSource::Indicadores => SourceItem::Indicator { id, nome: text },
        DataSource::Categorias => SourceItem::Category { id, nome: text },
        _ => SourceItem::Client { id, razao_social: text },
      })
    })
    .collect();
  Ok(items)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn card_draft(fonte: DataSource) -> WidgetDraft {
    let mut draft = WidgetDraft::new(Page::Home);
    draft.nome_exibicao = "Faturamento".into();
    draft.tipo_visualizacao = Some(VisualizationType::Card);
    draft.set_source(fonte);
    draft
  }

  #[test]
  fn indicator_card_gets_primary_field_and_no_chart() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.tipo_grafico = Some(ChartType::Pie);
    draft.toggle_item("ind-42").expect("select");

    let record = draft.build_record().expect("record");
    assert_eq!(record.tipo_grafico, None);
    assert_eq!(record.campo_exibicao, FIELD_PRIMARY);
    assert_eq!(record.origem_id.as_deref(), Some("ind-42"));
    assert!(record.ativo);
  }

  #[test]
  fn chart_requires_chart_type_and_keeps_it() {
    let mut draft = card_draft(DataSource::Categorias);
    draft.tipo_visualizacao = Some(VisualizationType::Grafico);
    draft.toggle_item("cat-1").expect("select");
    assert_eq!(draft.validate().unwrap_err().message, "Selecione o tipo de grafico");

    draft.tipo_grafico = Some(ChartType::Funnel);
    let record = draft.build_record().expect("record");
    assert_eq!(record.tipo_grafico, Some(ChartType::Funnel));
  }

  #[test]
  fn sales_source_needs_a_field_and_links_nothing() {
    let mut draft = card_draft(DataSource::RegistroDeVendas);
    assert_eq!(draft.validate().unwrap_err().message, "Selecione o campo a exibir");

    draft.campo_exibicao = Some(SalesField::DataVenda);
    let record = draft.build_record().expect("record");
    assert_eq!(record.campo_exibicao, "data_venda");
    assert_eq!(record.origem_id, None);
  }

  #[test]
  fn all_clients_mode_stores_no_link() {
    let mut draft = card_draft(DataSource::Clientes);
    draft.todos_clientes = true;
    let record = draft.build_record().expect("record");
    assert_eq!(record.campo_exibicao, FIELD_ALL);
    assert_eq!(record.origem_id, None);

    draft.selecionados.push("cli-1".into());
    assert!(draft.validate().is_err());
  }

  #[test]
  fn single_client_mode_behaves_like_other_sources() {
    let mut draft = card_draft(DataSource::Clientes);
    assert_eq!(draft.validate().unwrap_err().message, "Selecione pelo menos um item");
    draft.toggle_item("cli-9").expect("select");
    let record = draft.build_record().expect("record");
    assert_eq!(record.campo_exibicao, FIELD_PRIMARY);
    assert_eq!(record.origem_id.as_deref(), Some("cli-9"));
  }

  #[test]
  fn all_clients_flag_is_rejected_for_other_sources() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.toggle_item("ind-1").expect("select");
    draft.todos_clientes = true;
    assert!(draft.validate().is_err());
  }

  #[test]
  fn blank_name_blocks_submit() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.toggle_item("ind-1").expect("select");
    draft.nome_exibicao = "   ".into();
    assert_eq!(draft.validate().unwrap_err().code, crate::error::VALIDATION);
  }

  #[test]
  fn full_selection_rejects_instead_of_dropping_the_oldest() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.toggle_item("a").expect("first");
    let err = draft.toggle_item("b").unwrap_err();
    assert_eq!(err.code, SELECTION_FULL);
    assert_eq!(draft.selecionados, vec!["a".to_string()]);

    draft.tipo_visualizacao = Some(VisualizationType::Grafico);
    draft.toggle_item("b").expect("second");
    draft.toggle_item("c").expect("third");
    assert!(draft.toggle_item("d").is_err());
    assert_eq!(draft.selecionados, vec!["a", "b", "c"]);
  }

  #[test]
  fn toggling_a_selected_item_removes_it() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.toggle_item("a").expect("select");
    draft.toggle_item("a").expect("deselect");
    assert!(draft.selecionados.is_empty());
  }

  #[test]
  fn changing_source_clears_previous_choices() {
    let mut draft = card_draft(DataSource::Clientes);
    draft.todos_clientes = true;
    draft.set_source(DataSource::Indicadores);
    assert!(!draft.todos_clientes);
    assert!(draft.selecionados.is_empty());
  }

  #[test]
  fn chart_persists_only_the_first_selection() {
    let mut draft = card_draft(DataSource::Indicadores);
    draft.tipo_visualizacao = Some(VisualizationType::Grafico);
    draft.tipo_grafico = Some(ChartType::Bar);
    for id in ["x", "y", "z"] {
      draft.toggle_item(id).expect("select");
    }
    let record = draft.build_record().expect("record");
    assert_eq!(record.origem_id.as_deref(), Some("x"));
  }

  #[test]
  fn source_items_serialise_with_a_discriminant() {
    let item = SourceItem::Client {
      id: "c1".into(),
      razao_social: "Cliente Um".into(),
    };
    let json = serde_json::to_value(&item).expect("json");
    assert_eq!(json["tipo"], "client");
    assert_eq!(item.label(), "Cliente Um");
    assert_eq!(item.source(), DataSource::Clientes);
  }
}
