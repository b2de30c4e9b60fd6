use std::collections::{BTreeSet, HashMap};

use chrono::{Datelike, Utc};
use serde_json::Value;

use crate::audit::log::append_audit;
use crate::domain::{category_code, filter, validation, widget};
use crate::error::AppError;
use crate::models::*;
use crate::store::{from_row, from_rows, to_row, Query, Row, Store, Table};

// Companies and partners

pub fn list_companies(store: &dyn Store, busca: Option<&str>) -> Result<Vec<Company>, AppError> {
  let rows = store
    .select(Table::Empresas, &Query::new().order_by("razao_social", false))
    .map_err(|err| AppError::load_failed("empresas", err))?;
  let companies: Vec<Company> = from_rows(rows)?;
  Ok(match busca {
    Some(term) => filter::filter_records(&companies, term).into_iter().cloned().collect(),
    None => companies,
  })
}

pub fn get_company(store: &dyn Store, id: &str) -> Result<CompanyWithPartners, AppError> {
  let row = store
    .find_by_id(Table::Empresas, id)?
    .ok_or_else(|| AppError::not_found("Empresa nao encontrada"))?;
  Ok(CompanyWithPartners {
    empresa: from_row(row)?,
    socios: list_partners(store, id)?,
  })
}

fn validate_company(input: &CompanyInput) -> Result<(), AppError> {
  validation::require_text(&input.razao_social, "Razao social")?;
  validation::require_text(&input.cnpj, "CNPJ")?;
  if let Some(date) = input.data_inicio_contrato.as_deref().filter(|d| !d.trim().is_empty()) {
    validation::parse_date(date)?;
  }
  Ok(())
}

fn company_row(input: &CompanyInput) -> Result<Row, AppError> {
  let mut cleaned = input.clone();
  cleaned.razao_social = cleaned.razao_social.trim().to_string();
  cleaned.cnpj = cleaned.cnpj.trim().to_string();
  cleaned.nome_fantasia = validation::blank_to_none(cleaned.nome_fantasia);
  cleaned.email = validation::blank_to_none(cleaned.email);
  cleaned.telefone = validation::blank_to_none(cleaned.telefone);
  cleaned.data_inicio_contrato = validation::blank_to_none(cleaned.data_inicio_contrato);
  to_row(&cleaned)
}

pub fn create_company(store: &dyn Store, input: CompanyInput, actor: Option<String>) -> Result<CompanyWithPartners, AppError> {
  validate_company(&input)?;
  for socio in &input.socios {
    validate_partner(socio)?;
  }

  let empresa: Company = store
    .insert(Table::Empresas, company_row(&input)?)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("empresa", err))?;

  let mut socios = Vec::with_capacity(input.socios.len());
  for socio in &input.socios {
    match insert_partner(store, &empresa.id, socio) {
      Ok(partner) => socios.push(partner),
      Err(err) => {
        tracing::warn!(empresa_id = %empresa.id, "partner insert failed, removing company");
        for partner in &socios {
          if let Err(cleanup) = store.delete(Table::Socios, &partner.id) {
            tracing::error!(socio_id = %partner.id, error = %cleanup, "partner cleanup failed");
          }
        }
        if let Err(cleanup) = store.delete(Table::Empresas, &empresa.id) {
          tracing::error!(empresa_id = %empresa.id, error = %cleanup, "company cleanup failed");
        }
        return Err(AppError::save_failed("empresa", err));
      }
    }
  }

  append_audit(store, actor, "CREATE", "EMPRESA", Some(empresa.id.clone()), &input);
  tracing::info!(id = %empresa.id, socios = socios.len(), "company created");
  Ok(CompanyWithPartners { empresa, socios })
}

pub fn update_company(store: &dyn Store, id: &str, input: CompanyInput, actor: Option<String>) -> Result<Company, AppError> {
  validate_company(&input)?;
  let company: Company = store
    .update(Table::Empresas, id, company_row(&input)?)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("empresa", err))?;
  append_audit(store, actor, "UPDATE", "EMPRESA", Some(id.to_string()), &input);
  Ok(company)
}

pub fn delete_company(store: &dyn Store, id: &str, actor: Option<String>) -> Result<(), AppError> {
  for table in [
    Table::Clientes,
    Table::Pessoas,
    Table::Servicos,
    Table::RegistroDeVendas,
    Table::Lancamentos,
  ] {
    let dependents = store.select(table, &Query::new().columns(&["id"]).eq("empresa_id", id).limit(1))?;
    if !dependents.is_empty() {
      return Err(AppError::validation(format!(
        "Empresa possui registros em {}. Remova-os antes de excluir.",
        table.name()
      )));
    }
  }

  store
    .delete_with_children(
      Table::Empresas,
      id,
      &[(Table::Socios, "empresa_id"), (Table::IndicadoresEmpresas, "empresa_id")],
    )
    .map_err(|err| AppError::save_failed("empresa", err))?;
  append_audit(store, actor, "DELETE", "EMPRESA", Some(id.to_string()), &serde_json::json!({ "id": id }));
  Ok(())
}

fn validate_partner(input: &PartnerInput) -> Result<(), AppError> {
  validation::require_text(&input.nome, "Nome do socio")?;
  validation::ensure_percentual(input.percentual)
}

fn insert_partner(store: &dyn Store, empresa_id: &str, input: &PartnerInput) -> Result<Partner, AppError> {
  let mut row = Row::new();
  row.insert("empresa_id".into(), Value::from(empresa_id));
  row.insert("nome".into(), Value::from(input.nome.trim()));
  row.insert(
    "cpf".into(),
    validation::blank_to_none(input.cpf.clone()).map(Value::from).unwrap_or(Value::Null),
  );
  row.insert("percentual".into(), Value::from(input.percentual));
  store.insert(Table::Socios, row).and_then(from_row)
}

pub fn list_partners(store: &dyn Store, empresa_id: &str) -> Result<Vec<Partner>, AppError> {
  let rows = store
    .select(Table::Socios, &Query::new().eq("empresa_id", empresa_id).order_by("nome", false))
    .map_err(|err| AppError::load_failed("socios", err))?;
  from_rows(rows)
}

pub fn add_partner(store: &dyn Store, empresa_id: &str, input: PartnerInput, actor: Option<String>) -> Result<Partner, AppError> {
  validate_partner(&input)?;
  if store.find_by_id(Table::Empresas, empresa_id)?.is_none() {
    return Err(AppError::not_found("Empresa nao encontrada"));
  }
  let partner = insert_partner(store, empresa_id, &input).map_err(|err| AppError::save_failed("socio", err))?;
  append_audit(store, actor, "CREATE", "SOCIO", Some(partner.id.clone()), &input);
  Ok(partner)
}

pub fn delete_partner(store: &dyn Store, id: &str, actor: Option<String>) -> Result<(), AppError> {
  store
    .delete(Table::Socios, id)
    .map_err(|err| AppError::save_failed("socio", err))?;
  append_audit(store, actor, "DELETE", "SOCIO", Some(id.to_string()), &serde_json::json!({ "id": id }));
  Ok(())
}

// Categories

pub fn list_category_groups(store: &dyn Store) -> Result<Vec<CategoryGroup>, AppError> {
  let rows = store
    .select(Table::CategoriasGrupo, &Query::new().order_by("nome", false))
    .map_err(|err| AppError::load_failed("grupos", err))?;
  from_rows(rows)
}

pub fn create_category_group(store: &dyn Store, input: CategoryGroupInput, actor: Option<String>) -> Result<CategoryGroup, AppError> {
  validation::require_text(&input.nome, "Nome do grupo")?;
  let mut cleaned = input.clone();
  cleaned.nome = cleaned.nome.trim().to_string();
  cleaned.descricao = validation::blank_to_none(cleaned.descricao);
  let group: CategoryGroup = to_row(&cleaned)
    .and_then(|row| store.insert(Table::CategoriasGrupo, row))
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("grupo", err))?;
  append_audit(store, actor, "CREATE", "CATEGORIA_GRUPO", Some(group.id.clone()), &input);
  Ok(group)
}

pub fn list_categories(store: &dyn Store, only_active: bool) -> Result<Vec<Category>, AppError> {
  let mut query = Query::new().order_by("nome", false);
  if only_active {
    query = query.eq("ativo", true);
  }
  let rows = store
    .select(Table::Categorias, &query)
    .map_err(|err| AppError::load_failed("categorias", err))?;
  from_rows(rows)
}

pub fn next_category_code(store: &dyn Store, tipo: CategoryType) -> Result<String, AppError> {
  category_code::next_code(store, tipo).map_err(|err| {
    if err.is_user_facing() {
      return err;
    }
    tracing::error!(code = %err.code, message = %err.message, "category code lookup failed");
    AppError::new(crate::error::LOAD_FAILED, "Erro ao gerar codigo da categoria. Tente novamente.")
  })
}

pub fn create_category(store: &dyn Store, input: CategoryInput, actor: Option<String>) -> Result<Category, AppError> {
  validation::require_text(&input.nome, "Nome")?;
  validation::require_text(&input.grupo_id, "Grupo")?;
  let group: CategoryGroup = store
    .find_by_id(Table::CategoriasGrupo, &input.grupo_id)?
    .map(from_row)
    .transpose()?
    .ok_or_else(|| AppError::validation("Grupo nao encontrado"))?;
  if group.tipo != input.tipo {
    return Err(AppError::validation("Grupo pertence a outro tipo"));
  }

  let category = (|| -> Result<Category, AppError> {
    let codigo = category_code::next_code(store, input.tipo)?;
    let mut row = Row::new();
    row.insert("codigo".into(), Value::from(codigo));
    row.insert("nome".into(), Value::from(input.nome.trim()));
    row.insert(
      "descricao".into(),
      validation::blank_to_none(input.descricao.clone()).map(Value::from).unwrap_or(Value::Null),
    );
    row.insert("tipo".into(), Value::from(input.tipo.as_str()));
    row.insert("grupo_id".into(), Value::from(input.grupo_id.as_str()));
    row.insert("ativo".into(), Value::Bool(true));
    store.insert(Table::Categorias, row).and_then(from_row)
  })()
  .map_err(|err| AppError::save_failed("categoria", err))?;

  append_audit(store, actor, "CREATE", "CATEGORIA", Some(category.id.clone()), &input);
  tracing::info!(id = %category.id, codigo = %category.codigo, "category created");
  Ok(category)
}

pub fn deactivate_category(store: &dyn Store, id: &str, actor: Option<String>) -> Result<Category, AppError> {
  let mut patch = Row::new();
  patch.insert("ativo".into(), Value::Bool(false));
  let category: Category = store
    .update(Table::Categorias, id, patch)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("categoria", err))?;
  append_audit(
    store,
    actor,
    "DEACTIVATE",
    "CATEGORIA",
    Some(id.to_string()),
    &serde_json::json!({ "action": "deactivate" }),
  );
  Ok(category)
}

// Indicators

pub fn list_indicators(store: &dyn Store, only_active: bool) -> Result<Vec<Indicator>, AppError> {
  let mut query = Query::new().order_by("nome", false);
  if only_active {
    query = query.eq("ativo", true);
  }
  let rows = store
    .select(Table::Indicadores, &query)
    .map_err(|err| AppError::load_failed("indicadores", err))?;
  from_rows(rows)
}

fn indicator_row(input: &IndicatorInput) -> Result<Row, AppError> {
  validation::require_text(&input.codigo, "Codigo")?;
  validation::require_text(&input.nome, "Nome")?;
  let mut cleaned = input.clone();
  cleaned.codigo = cleaned.codigo.trim().to_string();
  cleaned.nome = cleaned.nome.trim().to_string();
  cleaned.descricao = validation::blank_to_none(cleaned.descricao);
  to_row(&cleaned)
}

pub fn create_indicator(store: &dyn Store, input: IndicatorInput, actor: Option<String>) -> Result<Indicator, AppError> {
  let mut row = indicator_row(&input)?;
  row.insert("ativo".into(), Value::Bool(true));
  let indicator: Indicator = store
    .insert(Table::Indicadores, row)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("indicador", err))?;
  append_audit(store, actor, "CREATE", "INDICADOR", Some(indicator.id.clone()), &input);
  Ok(indicator)
}

pub fn update_indicator(store: &dyn Store, id: &str, input: IndicatorInput, actor: Option<String>) -> Result<Indicator, AppError> {
  let row = indicator_row(&input)?;
  let indicator: Indicator = store
    .update(Table::Indicadores, id, row)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("indicador", err))?;
  append_audit(store, actor, "UPDATE", "INDICADOR", Some(id.to_string()), &input);
  Ok(indicator)
}

pub fn list_indicator_companies(store: &dyn Store, indicador_id: &str) -> Result<Vec<LinkedCompany>, AppError> {
  let links: Vec<IndicatorCompanyLink> = store
    .select(Table::IndicadoresEmpresas, &Query::new().eq("indicador_id", indicador_id))
    .and_then(from_rows)
    .map_err(|err| AppError::load_failed("empresas vinculadas", err))?;

  let names: HashMap<String, String> = list_companies(store, None)?
    .into_iter()
    .map(|company| (company.id, company.razao_social))
    .collect();

  let mut linked: Vec<LinkedCompany> = links
    .into_iter()
    .map(|link| LinkedCompany {
      razao_social: names.get(&link.empresa_id).cloned().unwrap_or_default(),
      link_id: link.id,
      empresa_id: link.empresa_id,
    })
    .collect();
  linked.sort_by(|a, b| a.razao_social.cmp(&b.razao_social));
  Ok(linked)
}

pub fn link_indicator_company(
  store: &dyn Store,
  indicador_id: &str,
  empresa_id: &str,
  actor: Option<String>,
) -> Result<IndicatorCompanyLink, AppError> {
  validation::require_text(empresa_id, "Empresa")?;
  let existing = store.select(
    Table::IndicadoresEmpresas,
    &Query::new().eq("indicador_id", indicador_id).eq("empresa_id", empresa_id).limit(1),
  )?;
  if let Some(row) = existing.into_iter().next() {
    return from_row(row);
  }

  let mut row = Row::new();
  row.insert("indicador_id".into(), Value::from(indicador_id));
  row.insert("empresa_id".into(), Value::from(empresa_id));
  let link: IndicatorCompanyLink = store
    .insert(Table::IndicadoresEmpresas, row)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("vinculo", err))?;
  append_audit(store, actor, "LINK", "INDICADOR_EMPRESA", Some(link.id.clone()), &link);
  Ok(link)
}

pub fn unlink_indicator_company(
  store: &dyn Store,
  indicador_id: &str,
  empresa_id: &str,
  actor: Option<String>,
) -> Result<(), AppError> {
  let links = store.select(
    Table::IndicadoresEmpresas,
    &Query::new().columns(&["id"]).eq("indicador_id", indicador_id).eq("empresa_id", empresa_id),
  )?;
  for link in links {
    if let Some(id) = link.get("id").and_then(Value::as_str) {
      store
        .delete(Table::IndicadoresEmpresas, id)
        .map_err(|err| AppError::save_failed("vinculo", err))?;
    }
  }
  append_audit(
    store,
    actor,
    "UNLINK",
    "INDICADOR_EMPRESA",
    None,
    &serde_json::json!({ "indicador_id": indicador_id, "empresa_id": empresa_id }),
  );
  Ok(())
}

// Clients, people and services

pub fn list_clients(store: &dyn Store, empresa_id: &str) -> Result<Vec<Client>, AppError> {
  let rows = store
    .select(
      Table::Clientes,
      &Query::new().eq("empresa_id", empresa_id).eq("ativo", true).order_by("razao_social", false),
    )
    .map_err(|err| AppError::load_failed("clientes", err))?;
  from_rows(rows)
}

pub fn create_client(store: &dyn Store, input: ClientInput, actor: Option<String>) -> Result<Client, AppError> {
  validation::require_text(&input.empresa_id, "Empresa")?;
  validation::require_text(&input.razao_social, "Razao social")?;
  let mut cleaned = input.clone();
  cleaned.razao_social = cleaned.razao_social.trim().to_string();
  cleaned.nome_fantasia = validation::blank_to_none(cleaned.nome_fantasia);
  cleaned.cnpj = validation::blank_to_none(cleaned.cnpj);
  cleaned.email = validation::blank_to_none(cleaned.email);
  cleaned.telefone = validation::blank_to_none(cleaned.telefone);

  let client: Client = to_row(&cleaned)
    .and_then(|mut row| {
      row.insert("ativo".into(), Value::Bool(true));
      store.insert(Table::Clientes, row)
    })
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("cliente", err))?;
  append_audit(store, actor, "CREATE", "CLIENTE", Some(client.id.clone()), &input);
  Ok(client)
}

pub fn list_people(store: &dyn Store, empresa_id: &str) -> Result<Vec<Person>, AppError> {
  let rows = store
    .select(Table::Pessoas, &Query::new().eq("empresa_id", empresa_id).order_by("nome", false))
    .map_err(|err| AppError::load_failed("pessoas", err))?;
  from_rows(rows)
}

pub fn sales_team(store: &dyn Store, empresa_id: &str) -> Result<SalesTeam, AppError> {
  let people = list_people(store, empresa_id)?;
  Ok(SalesTeam {
    vendedores: people.iter().filter(|p| p.cargo.sells()).cloned().collect(),
    sdrs: people.into_iter().filter(|p| p.cargo.prospects()).collect(),
  })
}

pub fn create_person(store: &dyn Store, input: PersonInput, actor: Option<String>) -> Result<Person, AppError> {
  validation::require_text(&input.empresa_id, "Empresa")?;
  validation::require_text(&input.nome, "Nome")?;
  let mut cleaned = input.clone();
  cleaned.nome = cleaned.nome.trim().to_string();
  cleaned.email = validation::blank_to_none(cleaned.email);
  let person: Person = to_row(&cleaned)
    .and_then(|row| store.insert(Table::Pessoas, row))
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("pessoa", err))?;
  append_audit(store, actor, "CREATE", "PESSOA", Some(person.id.clone()), &input);
  Ok(person)
}

pub fn list_services(store: &dyn Store, empresa_id: &str) -> Result<Vec<Service>, AppError> {
  let rows = store
    .select(
      Table::Servicos,
      &Query::new().eq("empresa_id", empresa_id).eq("ativo", true).order_by("nome", false),
    )
    .map_err(|err| AppError::load_failed("servicos", err))?;
  from_rows(rows)
}

pub fn create_service(store: &dyn Store, input: ServiceInput, actor: Option<String>) -> Result<Service, AppError> {
  validation::require_text(&input.empresa_id, "Empresa")?;
  validation::require_text(&input.nome, "Nome")?;
  let mut cleaned = input.clone();
  cleaned.nome = cleaned.nome.trim().to_string();
  cleaned.descricao = validation::blank_to_none(cleaned.descricao);
  let service: Service = to_row(&cleaned)
    .and_then(|mut row| {
      row.insert("ativo".into(), Value::Bool(true));
      store.insert(Table::Servicos, row)
    })
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("servico", err))?;
  append_audit(store, actor, "CREATE", "SERVICO", Some(service.id.clone()), &input);
  Ok(service)
}

// Sales

pub fn list_sales(store: &dyn Store, empresa_id: &str, busca: Option<&str>) -> Result<Vec<SaleListItem>, AppError> {
  let items = (|| -> Result<Vec<SaleListItem>, AppError> {
    let sales: Vec<Sale> = from_rows(store.select(
      Table::RegistroDeVendas,
      &Query::new()
        .eq("empresa_id", empresa_id)
        .order_by("data_venda", true)
        .order_by("criado_em", true),
    )?)?;
    let scoped = |table: Table, label: &str| -> Result<HashMap<String, String>, AppError> {
      Ok(
        store
          .select(table, &Query::new().columns(&["id", label]).eq("empresa_id", empresa_id))?
          .into_iter()
          .filter_map(|row| {
            let id = row.get("id")?.as_str()?.to_string();
            let name = row.get(label)?.as_str()?.to_string();
            Some((id, name))
          })
          .collect(),
      )
    };
    let clients = scoped(Table::Clientes, "razao_social")?;
    let people = scoped(Table::Pessoas, "nome")?;
    let services = scoped(Table::Servicos, "nome")?;
    let lookup = |names: &HashMap<String, String>, id: &Option<String>| id.as_ref().and_then(|id| names.get(id).cloned());

    Ok(
      sales
        .into_iter()
        .map(|venda| SaleListItem {
          cliente_razao_social: lookup(&clients, &venda.cliente_id),
          vendedor_nome: lookup(&people, &venda.vendedor_id),
          sdr_nome: lookup(&people, &venda.sdr_id),
          servico_nome: services.get(&venda.servico_id).cloned(),
          venda,
        })
        .collect(),
    )
  })()
  .map_err(|err| AppError::load_failed("vendas", err))?;

  Ok(match busca {
    Some(term) => filter::filter_records(&items, term).into_iter().cloned().collect(),
    None => items,
  })
}

fn sale_row(input: &SaleInput) -> Result<Row, AppError> {
  validation::require_text(&input.empresa_id, "Empresa")?;
  validation::require_text(&input.servico_id, "Servico")?;
  validation::require_text(&input.registro_venda, "Registro da venda")?;
  validation::ensure_amount_positive(input.valor)?;
  validation::parse_date(&input.data_venda)?;

  let mut cleaned = input.clone();
  cleaned.cliente_id = validation::blank_to_none(cleaned.cliente_id);
  cleaned.nome_cliente = validation::blank_to_none(cleaned.nome_cliente);
  cleaned.vendedor_id = validation::blank_to_none(cleaned.vendedor_id);
  cleaned.sdr_id = validation::blank_to_none(cleaned.sdr_id);
  cleaned.registro_venda = cleaned.registro_venda.trim().to_string();
  cleaned.data_venda = cleaned.data_venda.trim().to_string();
  if cleaned.cliente_id.is_none() && cleaned.nome_cliente.is_none() {
    return Err(AppError::validation("Informe o cliente"));
  }
  to_row(&cleaned)
}

pub fn create_sale(store: &dyn Store, input: SaleInput, actor: Option<String>) -> Result<Sale, AppError> {
  let row = sale_row(&input)?;
  let sale: Sale = store
    .insert(Table::RegistroDeVendas, row)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("venda", err))?;
  append_audit(store, actor, "CREATE", "VENDA", Some(sale.id.clone()), &input);
  tracing::info!(id = %sale.id, empresa_id = %sale.empresa_id, valor = sale.valor, "sale recorded");
  Ok(sale)
}

pub fn update_sale(store: &dyn Store, id: &str, input: SaleInput, actor: Option<String>) -> Result<Sale, AppError> {
  let row = sale_row(&input)?;
  let sale: Sale = store
    .update(Table::RegistroDeVendas, id, row)
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("venda", err))?;
  append_audit(store, actor, "UPDATE", "VENDA", Some(id.to_string()), &input);
  Ok(sale)
}

pub fn delete_sale(store: &dyn Store, id: &str, actor: Option<String>) -> Result<(), AppError> {
  store
    .delete(Table::RegistroDeVendas, id)
    .map_err(|err| AppError::save_failed("venda", err))?;
  append_audit(store, actor, "DELETE", "VENDA", Some(id.to_string()), &serde_json::json!({ "id": id }));
  Ok(())
}

// Ledger entries

pub fn create_ledger_entry(store: &dyn Store, input: LedgerEntryInput, actor: Option<String>) -> Result<LedgerEntry, AppError> {
  validation::ensure_amount_positive(input.valor)?;
  let date = validation::parse_date(&input.data)?;

  let mut cleaned = input.clone();
  cleaned.data = date.format("%Y-%m-%d").to_string();
  cleaned.descricao = validation::blank_to_none(cleaned.descricao);
  cleaned.empresa_id = validation::blank_to_none(cleaned.empresa_id);
  cleaned.categoria_id = validation::blank_to_none(cleaned.categoria_id);
  cleaned.indicador_id = validation::blank_to_none(cleaned.indicador_id);
  cleaned.cliente_id = validation::blank_to_none(cleaned.cliente_id);

  let entry: LedgerEntry = to_row(&cleaned)
    .and_then(|mut row| {
      row.insert("ano".into(), Value::from(date.year()));
      row.insert("mes".into(), Value::from(date.month()));
      store.insert(Table::Lancamentos, row)
    })
    .and_then(from_row)
    .map_err(|err| AppError::save_failed("lancamento", err))?;
  append_audit(store, actor, "CREATE", "LANCAMENTO", Some(entry.id.clone()), &input);
  Ok(entry)
}

pub fn list_ledger_entries(store: &dyn Store, filter: &LedgerFilter) -> Result<Vec<LedgerEntry>, AppError> {
  if let Some(mes) = filter.mes {
    if !(1..=12).contains(&mes) {
      return Err(AppError::validation("Mes deve estar entre 1 e 12"));
    }
  }

  let mut query = Query::new().order_by("data", true);
  if let Some(ano) = filter.ano {
    query = query.eq("ano", ano);
  }
  if let Some(mes) = filter.mes {
    query = query.eq("mes", mes);
  }
  if let Some(tipo) = filter.tipo {
    query = query.eq("tipo", serde_json::to_value(tipo)?);
  }
  for (column, value) in [
    ("categoria_id", &filter.categoria_id),
    ("indicador_id", &filter.indicador_id),
    ("empresa_id", &filter.empresa_id),
  ] {
    if let Some(value) = value {
      query = query.eq(column, value.as_str());
    }
  }

  let rows = store
    .select(Table::Lancamentos, &query)
    .map_err(|err| AppError::load_failed("lancamentos", err))?;
  from_rows(rows)
}

pub fn available_ledger_years(store: &dyn Store) -> Result<Vec<i32>, AppError> {
  let rows = store
    .select(Table::Lancamentos, &Query::new().columns(&["ano"]))
    .map_err(|err| AppError::load_failed("anos", err))?;
  let years: BTreeSet<i32> = rows
    .iter()
    .filter_map(|row| row.get("ano").and_then(Value::as_i64))
    .map(|year| year as i32)
    .collect();
  if years.is_empty() {
    return Ok(vec![Utc::now().year()]);
  }
  Ok(years.into_iter().rev().collect())
}

// Dashboard widgets

pub fn create_widget(store: &dyn Store, draft: widget::WidgetDraft, actor: Option<String>) -> Result<WidgetConfig, AppError> {
  let mut saved = None;
  let config = widget::create_widget(store, &draft, |config| saved = Some(config.id.clone()))?;
  append_audit(store, actor, "CREATE", "WIDGET", saved, &draft);
  Ok(config)
}

pub fn delete_widget(store: &dyn Store, id: &str, actor: Option<String>) -> Result<(), AppError> {
  widget::delete_widget(store, id)?;
  append_audit(store, actor, "DELETE", "WIDGET", Some(id.to_string()), &serde_json::json!({ "id": id }));
  Ok(())
}
