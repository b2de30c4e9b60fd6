use std::collections::HashMap;
use std::fs;
use std::io::{Cursor, Read};
use std::time::Instant;

use chrono::Utc;
use rand::{distributions::Alphanumeric, Rng};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tiny_http::{Header, Method, Request, Response, Server, StatusCode};

use crate::audit::log::{append_audit, list_audit_log};
use crate::commands;
use crate::domain::widget::{self, WidgetDraft};
use crate::error::{self, AppError};
use crate::export::csv;
use crate::files::backup;
use crate::models::{CategoryType, DataSource, LedgerFilter, LedgerKind, Page};
use crate::store::Store;
use crate::AppState;

type HttpResponse = Response<Cursor<Vec<u8>>>;
type Params = HashMap<String, String>;

const ACTOR_HEADER: &str = "X-Actor";
const MAX_UPLOAD_BYTES: u64 = 512 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct LinkRequest {
  empresa_id: String,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
  status: &'static str,
  version: &'static str,
  lan_address: String,
  last_change: Option<String>,
}

pub fn serve(state: &AppState) -> Result<(), AppError> {
  let address = state.config.bind_address();
  let server = Server::http(address.as_str()).map_err(|err| AppError::new("HTTP_ERROR", err.to_string()))?;
  tracing::info!(
    %address,
    lan = %format!("http://{}:{}", local_ip_string(), state.config.server.port),
    "api listening"
  );

  for request in server.incoming_requests() {
    handle_request(request, state);
  }
  tracing::warn!("api listener closed");
  Ok(())
}

pub fn local_ip_string() -> String {
  local_ip_address::local_ip()
    .map(|ip| ip.to_string())
    .unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn handle_request(mut request: Request, state: &AppState) {
  let started = Instant::now();
  let method = request.method().clone();
  let url = request.url().to_string();
  let (path, query) = url.split_once('?').unwrap_or((url.as_str(), ""));
  let params = parse_query(query);
  let actor = read_header(&request, ACTOR_HEADER);
  let segments: Vec<&str> = path.split('/').filter(|segment| !segment.is_empty()).collect();

  let result = match segments.split_first() {
    Some((&"api", rest)) => route(&mut request, state, method.clone(), rest, &params, actor),
    _ => Err(AppError::not_found("Rota nao encontrada")),
  };
  let response = result.unwrap_or_else(|err| error_response(&err));

  tracing::info!(
    method = %method,
    path,
    status = response.status_code().0,
    elapsed_ms = started.elapsed().as_millis() as u64,
    "request"
  );
  if let Err(err) = request.respond(response) {
    tracing::warn!(error = %err, "failed to write response");
  }
}

fn route(
  request: &mut Request,
  state: &AppState,
  method: Method,
  segments: &[&str],
  params: &Params,
  actor: Option<String>,
) -> Result<HttpResponse, AppError> {
  let store: &dyn Store = &state.store;
  match (method, segments) {
    (Method::Get, ["status"]) => ok(&status(state)),

    (Method::Get, ["empresas"]) => ok(&commands::list_companies(store, param(params, "busca"))?),
    (Method::Post, ["empresas"]) => created(&commands::create_company(store, read_json(request)?, actor)?),
    (Method::Get, ["empresas", id]) => ok(&commands::get_company(store, id)?),
    (Method::Put, ["empresas", id]) => ok(&commands::update_company(store, id, read_json(request)?, actor)?),
    (Method::Delete, ["empresas", id]) => {
      commands::delete_company(store, id, actor)?;
      Ok(no_content())
    }
    (Method::Get, ["empresas", id, "socios"]) => ok(&commands::list_partners(store, id)?),
    (Method::Post, ["empresas", id, "socios"]) => created(&commands::add_partner(store, id, read_json(request)?, actor)?),
    (Method::Delete, ["socios", id]) => {
      commands::delete_partner(store, id, actor)?;
      Ok(no_content())
    }

    (Method::Get, ["categorias-grupo"]) => ok(&commands::list_category_groups(store)?),
    (Method::Post, ["categorias-grupo"]) => created(&commands::create_category_group(store, read_json(request)?, actor)?),
    (Method::Get, ["categorias"]) => ok(&commands::list_categories(store, flag(params, "ativas"))?),
    (Method::Get, ["categorias", "proximo-codigo"]) => {
      let tipo = CategoryType::parse(required(params, "tipo")?)
        .ok_or_else(|| AppError::validation("Tipo deve ser Receita ou Despesa"))?;
      ok(&serde_json::json!({ "codigo": commands::next_category_code(store, tipo)? }))
    }
    (Method::Post, ["categorias"]) => created(&commands::create_category(store, read_json(request)?, actor)?),
    (Method::Delete, ["categorias", id]) => ok(&commands::deactivate_category(store, id, actor)?),

    (Method::Get, ["indicadores"]) => ok(&commands::list_indicators(store, flag(params, "ativos"))?),
    (Method::Post, ["indicadores"]) => created(&commands::create_indicator(store, read_json(request)?, actor)?),
    (Method::Put, ["indicadores", id]) => ok(&commands::update_indicator(store, id, read_json(request)?, actor)?),
    (Method::Get, ["indicadores", id, "empresas"]) => ok(&commands::list_indicator_companies(store, id)?),
    (Method::Post, ["indicadores", id, "empresas"]) => {
      let body: LinkRequest = read_json(request)?;
      created(&commands::link_indicator_company(store, id, &body.empresa_id, actor)?)
    }
    (Method::Delete, ["indicadores", id, "empresas", empresa_id]) => {
      commands::unlink_indicator_company(store, id, empresa_id, actor)?;
      Ok(no_content())
    }

    (Method::Get, ["vendas"]) => ok(&commands::list_sales(
      store,
      required(params, "empresa_id")?,
      param(params, "busca"),
    )?),
    (Method::Get, ["vendas", "export"]) => {
      let items = commands::list_sales(store, required(params, "empresa_id")?, param(params, "busca"))?;
      let mut response = Response::from_data(csv::sales_csv(&items)?);
      add_header(&mut response, "Content-Type", "text/csv; charset=utf-8");
      add_header(&mut response, "Content-Disposition", "attachment; filename=\"vendas.csv\"");
      Ok(response)
    }
    (Method::Post, ["vendas"]) => created(&commands::create_sale(store, read_json(request)?, actor)?),
    (Method::Put, ["vendas", id]) => ok(&commands::update_sale(store, id, read_json(request)?, actor)?),
    (Method::Delete, ["vendas", id]) => {
      commands::delete_sale(store, id, actor)?;
      Ok(no_content())
    }

    (Method::Get, ["clientes"]) => ok(&commands::list_clients(store, required(params, "empresa_id")?)?),
    (Method::Post, ["clientes"]) => created(&commands::create_client(store, read_json(request)?, actor)?),
    (Method::Get, ["pessoas"]) => ok(&commands::list_people(store, required(params, "empresa_id")?)?),
    (Method::Get, ["pessoas", "equipe"]) => ok(&commands::sales_team(store, required(params, "empresa_id")?)?),
    (Method::Post, ["pessoas"]) => created(&commands::create_person(store, read_json(request)?, actor)?),
    (Method::Get, ["servicos"]) => ok(&commands::list_services(store, required(params, "empresa_id")?)?),
    (Method::Post, ["servicos"]) => created(&commands::create_service(store, read_json(request)?, actor)?),

    (Method::Get, ["widgets"]) => ok(&widget::list_widgets(store, page_param(params)?, param(params, "busca"))?),
    (Method::Post, ["widgets"]) => {
      let draft: WidgetDraft = read_json(request)?;
      created(&commands::create_widget(store, draft, actor)?)
    }
    (Method::Delete, ["widgets", id]) => {
      commands::delete_widget(store, id, actor)?;
      Ok(no_content())
    }
    (Method::Get, ["widgets", "fontes"]) => {
      let fonte = DataSource::parse(required(params, "fonte")?)
        .ok_or_else(|| AppError::validation("Fonte de dados invalida"))?;
      ok(&widget::load_source_items(store, fonte)?)
    }
    (Method::Get, ["widgets", "proxima-ordem"]) => {
      ok(&serde_json::json!({ "ordem": widget::next_widget_order(store, page_param(params)?)? }))
    }

    (Method::Get, ["lancamentos"]) => ok(&commands::list_ledger_entries(store, &ledger_filter(params)?)?),
    (Method::Post, ["lancamentos"]) => created(&commands::create_ledger_entry(store, read_json(request)?, actor)?),
    (Method::Get, ["lancamentos", "anos"]) => ok(&commands::available_ledger_years(store)?),

    (Method::Get, ["audit"]) => ok(&list_audit_log(
      store,
      number(params, "page")?.unwrap_or(1),
      number(params, "page_size")?.unwrap_or(50),
    )?),

    (Method::Get, ["backup"]) => download_backup(state),
    (Method::Post, ["backup"]) => {
      let path = backup::create_backup(&state.app_dir, state.store.db(), None)?;
      append_audit(store, actor, "BACKUP", "DATABASE", None, &serde_json::json!({ "path": path }));
      created(&serde_json::json!({ "path": path }))
    }
    (Method::Post, ["backup", "restore"]) => restore_upload(request, state, actor),

    _ => Err(AppError::not_found("Rota nao encontrada")),
  }
}

fn status(state: &AppState) -> StatusResponse {
  let last_change = list_audit_log(&state.store, 1, 1)
    .ok()
    .and_then(|page| page.items.into_iter().next())
    .map(|entry| entry.ts);
  StatusResponse {
    status: "ok",
    version: env!("CARGO_PKG_VERSION"),
    lan_address: format!("{}:{}", local_ip_string(), state.config.server.port),
    last_change,
  }
}

fn download_backup(state: &AppState) -> Result<HttpResponse, AppError> {
  let temp_dir = state.app_dir.join("BackupTemp");
  fs::create_dir_all(&temp_dir)?;
  let filename = temp_dir.join(format!("backup_{}.zip", Utc::now().timestamp()));
  let path = backup::create_backup(&state.app_dir, state.store.db(), Some(filename.to_string_lossy().to_string()))?;
  let bytes = fs::read(&path)?;
  if let Err(err) = fs::remove_file(&path) {
    tracing::warn!(%path, error = %err, "temporary backup not removed");
  }

  let mut response = Response::from_data(bytes);
  add_header(&mut response, "Content-Type", "application/zip");
  add_header(&mut response, "Content-Disposition", "attachment; filename=\"painel_backup.zip\"");
  Ok(response)
}

fn restore_upload(request: &mut Request, state: &AppState, actor: Option<String>) -> Result<HttpResponse, AppError> {
  let mut body = Vec::new();
  request.as_reader().take(MAX_UPLOAD_BYTES).read_to_end(&mut body)?;
  if body.is_empty() {
    return Err(AppError::validation("Arquivo de backup vazio"));
  }

  let temp_dir = state.app_dir.join("RestoreTemp");
  fs::create_dir_all(&temp_dir)?;
  let archive = temp_dir.join(format!("restore_{}.zip", random_suffix(12)));
  fs::write(&archive, &body)?;
  let archive_path = archive.to_string_lossy().to_string();

  let result = backup::restore_backup(&archive_path, state.store.db());
  if let Err(err) = fs::remove_file(&archive) {
    tracing::warn!(path = %archive_path, error = %err, "restore upload not removed");
  }
  result?;

  append_audit(
    &state.store,
    actor,
    "RESTORE",
    "DATABASE",
    None,
    &serde_json::json!({ "bytes": body.len() }),
  );
  ok(&serde_json::json!({ "restored": true }))
}

fn ledger_filter(params: &Params) -> Result<LedgerFilter, AppError> {
  let tipo = match param(params, "tipo") {
    Some(value) => Some(
      serde_json::from_value::<LedgerKind>(serde_json::Value::from(value))
        .map_err(|_| AppError::validation("Tipo deve ser receita ou despesa"))?,
    ),
    None => None,
  };
  Ok(LedgerFilter {
    ano: number(params, "ano")?,
    mes: number(params, "mes")?,
    tipo,
    categoria_id: param(params, "categoria_id").map(str::to_string),
    indicador_id: param(params, "indicador_id").map(str::to_string),
    empresa_id: param(params, "empresa_id").map(str::to_string),
  })
}

fn page_param(params: &Params) -> Result<Page, AppError> {
  Page::parse(required(params, "pagina")?).ok_or_else(|| AppError::validation("Pagina invalida"))
}

fn param<'a>(params: &'a Params, name: &str) -> Option<&'a str> {
  params.get(name).map(String::as_str).filter(|value| !value.is_empty())
}

fn required<'a>(params: &'a Params, name: &str) -> Result<&'a str, AppError> {
  param(params, name).ok_or_else(|| AppError::validation(format!("Parametro {name} obrigatorio")))
}

fn flag(params: &Params, name: &str) -> bool {
  matches!(param(params, name), Some("true" | "1"))
}

fn number<T: std::str::FromStr>(params: &Params, name: &str) -> Result<Option<T>, AppError> {
  param(params, name)
    .map(|value| {
      value
        .parse()
        .map_err(|_| AppError::validation(format!("Parametro {name} invalido")))
    })
    .transpose()
}

fn parse_query(query: &str) -> Params {
  query
    .split('&')
    .filter(|pair| !pair.is_empty())
    .filter_map(|pair| {
      let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
      let key = urlencoding::decode(&key.replace('+', " ")).ok()?.into_owned();
      let value = urlencoding::decode(&value.replace('+', " ")).ok()?.into_owned();
      Some((key, value))
    })
    .collect()
}

fn read_json<T: DeserializeOwned>(request: &mut Request) -> Result<T, AppError> {
  let mut body = Vec::new();
  request
    .as_reader()
    .read_to_end(&mut body)
    .map_err(|_| AppError::validation("Dados da requisicao nao puderam ser lidos"))?;
  serde_json::from_slice(&body).map_err(|err| AppError::validation(format!("Dados invalidos: {err}")))
}

fn read_header(request: &Request, name: &str) -> Option<String> {
  request
    .headers()
    .iter()
    .find(|header| header.field.as_str().as_str().eq_ignore_ascii_case(name))
    .map(|header| header.value.to_string().trim().to_string())
    .filter(|value| !value.is_empty())
}

fn error_status(code: &str) -> StatusCode {
  match code {
    error::VALIDATION | error::SELECTION_FULL | error::INVALID_COLUMN | error::INVALID_VALUE => StatusCode(400),
    error::NOT_FOUND => StatusCode(404),
    _ => StatusCode(500),
  }
}

fn error_response(err: &AppError) -> HttpResponse {
  let status = error_status(&err.code);
  if status.0 >= 500 {
    tracing::error!(code = %err.code, message = %err.message, "request failed");
  }
  json_error(status, &err.code, &err.message)
}

fn ok<T: Serialize>(payload: &T) -> Result<HttpResponse, AppError> {
  Ok(json_response(StatusCode(200), payload))
}

fn created<T: Serialize>(payload: &T) -> Result<HttpResponse, AppError> {
  Ok(json_response(StatusCode(201), payload))
}

fn no_content() -> HttpResponse {
  Response::from_data(Vec::new()).with_status_code(StatusCode(204))
}

fn json_response<T: Serialize>(status: StatusCode, payload: &T) -> HttpResponse {
  let body = serde_json::to_vec(payload).unwrap_or_else(|_| b"{}".to_vec());
  let mut response = Response::from_data(body).with_status_code(status);
  add_header(&mut response, "Content-Type", "application/json");
  response
}

fn json_error(status: StatusCode, code: &str, message: &str) -> HttpResponse {
  json_response(
    status,
    &serde_json::json!({
      "code": code,
      "message": message,
    }),
  )
}

fn add_header(response: &mut HttpResponse, name: &str, value: &str) {
  match Header::from_bytes(name, value) {
    Ok(header) => response.add_header(header),
    Err(()) => tracing::warn!(name, "invalid response header"),
  }
}

fn random_suffix(length: usize) -> String {
  rand::thread_rng()
    .sample_iter(&Alphanumeric)
    .take(length)
    .map(char::from)
    .collect()
}
