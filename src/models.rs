use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Page {
  Home,
  Vendas,
  Analise,
  Graficos,
  Tabelas,
}

impl Page {
  pub const ALL: [Page; 5] = [Page::Home, Page::Vendas, Page::Analise, Page::Graficos, Page::Tabelas];

  pub fn as_str(self) -> &'static str {
    match self {
      Page::Home => "home",
      Page::Vendas => "vendas",
      Page::Analise => "analise",
      Page::Graficos => "graficos",
      Page::Tabelas => "tabelas",
    }
  }

  pub fn parse(value: &str) -> Option<Page> {
    Page::ALL.into_iter().find(|page| page.as_str() == value)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum VisualizationType {
  Card,
  Lista,
  Grafico,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChartType {
  Bar,
  Line,
  Pie,
  Tree,
  Scatter,
  Radar,
  Heatmap,
  Funnel,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
  RegistroDeVendas,
  Indicadores,
  Categorias,
  Clientes,
}

impl DataSource {
  pub fn as_str(self) -> &'static str {
    match self {
      DataSource::RegistroDeVendas => "registro_de_vendas",
      DataSource::Indicadores => "indicadores",
      DataSource::Categorias => "categorias",
      DataSource::Clientes => "clientes",
    }
  }

  pub fn parse(value: &str) -> Option<DataSource> {
    [
      DataSource::RegistroDeVendas,
      DataSource::Indicadores,
      DataSource::Categorias,
      DataSource::Clientes,
    ]
    .into_iter()
    .find(|source| source.as_str() == value)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SalesField {
  Valor,
  DataVenda,
  Origem,
  Vendedor,
  Cliente,
  Servico,
}

impl SalesField {
  pub fn as_str(self) -> &'static str {
    match self {
      SalesField::Valor => "valor",
      SalesField::DataVenda => "data_venda",
      SalesField::Origem => "origem",
      SalesField::Vendedor => "vendedor",
      SalesField::Cliente => "cliente",
      SalesField::Servico => "servico",
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct WidgetConfig {
  pub id: String,
  pub pagina: Page,
  pub nome_exibicao: String,
  pub tipo_visualizacao: VisualizationType,
  pub tipo_grafico: Option<ChartType>,
  pub fonte_dados: DataSource,
  pub campo_exibicao: String,
  pub origem_id: Option<String>,
  pub ordem: i64,
  pub ativo: bool,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct NewWidgetConfig {
  pub pagina: Page,
  pub nome_exibicao: String,
  pub tipo_visualizacao: VisualizationType,
  pub tipo_grafico: Option<ChartType>,
  pub fonte_dados: DataSource,
  pub campo_exibicao: String,
  pub origem_id: Option<String>,
  pub ativo: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum CategoryType {
  Receita,
  Despesa,
}

impl CategoryType {
  pub fn as_str(self) -> &'static str {
    match self {
      CategoryType::Receita => "Receita",
      CategoryType::Despesa => "Despesa",
    }
  }

  pub fn parse(value: &str) -> Option<CategoryType> {
    match value {
      "Receita" => Some(CategoryType::Receita),
      "Despesa" => Some(CategoryType::Despesa),
      _ => None,
    }
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryGroup {
  pub id: String,
  pub nome: String,
  pub tipo: CategoryType,
  pub descricao: Option<String>,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryGroupInput {
  pub nome: String,
  pub tipo: CategoryType,
  pub descricao: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Category {
  pub id: String,
  pub codigo: String,
  pub nome: String,
  pub descricao: Option<String>,
  pub tipo: CategoryType,
  pub grupo_id: String,
  pub ativo: bool,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CategoryInput {
  pub nome: String,
  pub descricao: Option<String>,
  pub tipo: CategoryType,
  pub grupo_id: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Company {
  pub id: String,
  pub razao_social: String,
  pub nome_fantasia: Option<String>,
  pub cnpj: String,
  pub email: Option<String>,
  pub telefone: Option<String>,
  pub data_inicio_contrato: Option<String>,
  pub criado_em: String,
  pub modificado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompanyInput {
  pub razao_social: String,
  pub nome_fantasia: Option<String>,
  pub cnpj: String,
  pub email: Option<String>,
  pub telefone: Option<String>,
  pub data_inicio_contrato: Option<String>,
  #[serde(default, skip_serializing)]
  pub socios: Vec<PartnerInput>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CompanyWithPartners {
  #[serde(flatten)]
  pub empresa: Company,
  pub socios: Vec<Partner>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Partner {
  pub id: String,
  pub empresa_id: String,
  pub nome: String,
  pub cpf: Option<String>,
  pub percentual: f64,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PartnerInput {
  pub nome: String,
  pub cpf: Option<String>,
  pub percentual: f64,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum StructureType {
  #[serde(rename = "Único")]
  Unico,
  Composto,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
  #[serde(rename = "Número")]
  Numero,
  Moeda,
  Percentual,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Indicator {
  pub id: String,
  pub codigo: String,
  pub nome: String,
  pub descricao: Option<String>,
  pub tipo_estrutura: StructureType,
  pub tipo_dado: DataKind,
  pub ativo: bool,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IndicatorInput {
  pub codigo: String,
  pub nome: String,
  pub descricao: Option<String>,
  pub tipo_estrutura: StructureType,
  pub tipo_dado: DataKind,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IndicatorCompanyLink {
  pub id: String,
  pub indicador_id: String,
  pub empresa_id: String,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LinkedCompany {
  pub link_id: String,
  pub empresa_id: String,
  pub razao_social: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SaleOrigin {
  Brasil,
  Exterior,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Sale {
  pub id: String,
  pub empresa_id: String,
  pub cliente_id: Option<String>,
  pub vendedor_id: Option<String>,
  pub sdr_id: Option<String>,
  pub servico_id: String,
  pub valor: f64,
  pub origem: SaleOrigin,
  pub nome_cliente: Option<String>,
  pub registro_venda: String,
  pub data_venda: String,
  pub criado_em: String,
  pub modificado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SaleInput {
  pub empresa_id: String,
  pub cliente_id: Option<String>,
  pub vendedor_id: Option<String>,
  pub sdr_id: Option<String>,
  pub servico_id: String,
  pub valor: f64,
  pub origem: SaleOrigin,
  pub nome_cliente: Option<String>,
  pub registro_venda: String,
  pub data_venda: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SaleListItem {
  #[serde(flatten)]
  pub venda: Sale,
  pub cliente_razao_social: Option<String>,
  pub vendedor_nome: Option<String>,
  pub sdr_nome: Option<String>,
  pub servico_nome: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Client {
  pub id: String,
  pub empresa_id: String,
  pub razao_social: String,
  pub nome_fantasia: Option<String>,
  pub cnpj: Option<String>,
  pub email: Option<String>,
  pub telefone: Option<String>,
  pub ativo: bool,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClientInput {
  pub empresa_id: String,
  pub razao_social: String,
  pub nome_fantasia: Option<String>,
  pub cnpj: Option<String>,
  pub email: Option<String>,
  pub telefone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum PersonRole {
  Vendedor,
  #[serde(rename = "SDR")]
  Sdr,
  Ambos,
}

impl PersonRole {
  pub fn sells(self) -> bool {
    matches!(self, PersonRole::Vendedor | PersonRole::Ambos)
  }

  pub fn prospects(self) -> bool {
    matches!(self, PersonRole::Sdr | PersonRole::Ambos)
  }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Person {
  pub id: String,
  pub empresa_id: String,
  pub nome: String,
  pub cargo: PersonRole,
  pub email: Option<String>,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PersonInput {
  pub empresa_id: String,
  pub nome: String,
  pub cargo: PersonRole,
  pub email: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SalesTeam {
  pub vendedores: Vec<Person>,
  pub sdrs: Vec<Person>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Service {
  pub id: String,
  pub empresa_id: String,
  pub nome: String,
  pub descricao: Option<String>,
  pub ativo: bool,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceInput {
  pub empresa_id: String,
  pub nome: String,
  pub descricao: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LedgerKind {
  Receita,
  Despesa,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEntry {
  pub id: String,
  pub empresa_id: Option<String>,
  pub categoria_id: Option<String>,
  pub indicador_id: Option<String>,
  pub cliente_id: Option<String>,
  pub tipo: LedgerKind,
  pub descricao: Option<String>,
  pub valor: f64,
  pub data: String,
  pub ano: i32,
  pub mes: i32,
  pub criado_em: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct LedgerEntryInput {
  pub empresa_id: Option<String>,
  pub categoria_id: Option<String>,
  pub indicador_id: Option<String>,
  pub cliente_id: Option<String>,
  pub tipo: LedgerKind,
  pub descricao: Option<String>,
  pub valor: f64,
  pub data: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct LedgerFilter {
  pub ano: Option<i32>,
  pub mes: Option<i32>,
  pub tipo: Option<LedgerKind>,
  pub categoria_id: Option<String>,
  pub indicador_id: Option<String>,
  pub empresa_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuditLogEntry {
  pub id: String,
  pub ts: String,
  pub actor: Option<String>,
  pub action: String,
  pub entity_type: String,
  pub entity_id: Option<String>,
  pub payload_json: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Paginated<T> {
  pub total: i64,
  pub items: Vec<T>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn enums_serialise_with_the_stored_spelling() {
    assert_eq!(serde_json::to_value(DataSource::RegistroDeVendas).unwrap(), "registro_de_vendas");
    assert_eq!(serde_json::to_value(VisualizationType::Grafico).unwrap(), "grafico");
    assert_eq!(serde_json::to_value(SalesField::DataVenda).unwrap(), "data_venda");
    assert_eq!(serde_json::to_value(StructureType::Unico).unwrap(), "Único");
    assert_eq!(serde_json::to_value(DataKind::Numero).unwrap(), "Número");
    assert_eq!(serde_json::to_value(PersonRole::Sdr).unwrap(), "SDR");
    assert_eq!(serde_json::to_value(LedgerKind::Despesa).unwrap(), "despesa");
  }

  #[test]
  fn string_helpers_agree_with_serde() {
    for page in Page::ALL {
      assert_eq!(serde_json::to_value(page).unwrap(), page.as_str());
      assert_eq!(Page::parse(page.as_str()), Some(page));
    }
    assert_eq!(DataSource::parse("clientes"), Some(DataSource::Clientes));
    assert_eq!(DataSource::parse("vendedor"), None);
    assert_eq!(CategoryType::parse("Despesa"), Some(CategoryType::Despesa));
  }

  #[test]
  fn roles_split_into_sellers_and_sdrs() {
    assert!(PersonRole::Ambos.sells() && PersonRole::Ambos.prospects());
    assert!(PersonRole::Vendedor.sells() && !PersonRole::Vendedor.prospects());
    assert!(!PersonRole::Sdr.sells() && PersonRole::Sdr.prospects());
  }
}
