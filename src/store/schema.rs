use crate::error::{AppError, INVALID_COLUMN};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
  Text,
  Integer,
  Real,
  Bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Column {
  pub name: &'static str,
  pub kind: ColumnKind,
}

#[derive(Debug)]
pub struct TableDef {
  pub name: &'static str,
  pub columns: &'static [Column],
}

impl TableDef {
  pub fn column(&self, name: &str) -> Result<&Column, AppError> {
    self
      .columns
      .iter()
      .find(|column| column.name == name)
      .ok_or_else(|| AppError::new(INVALID_COLUMN, format!("Coluna desconhecida {}.{}", self.name, name)))
  }

  pub fn has_column(&self, name: &str) -> bool {
    self.columns.iter().any(|column| column.name == name)
  }
}

const fn text(name: &'static str) -> Column {
  Column { name, kind: ColumnKind::Text }
}

const fn integer(name: &'static str) -> Column {
  Column { name, kind: ColumnKind::Integer }
}

const fn real(name: &'static str) -> Column {
  Column { name, kind: ColumnKind::Real }
}

const fn boolean(name: &'static str) -> Column {
  Column { name, kind: ColumnKind::Bool }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
  Empresas,
  Socios,
  CategoriasGrupo,
  Categorias,
  Indicadores,
  IndicadoresEmpresas,
  RegistroDeVendas,
  Clientes,
  Pessoas,
  Servicos,
  ConfigVisualizacoes,
  Lancamentos,
  AuditLog,
}

static EMPRESAS: TableDef = TableDef {
  name: "empresas",
  columns: &[
    text("id"),
    text("razao_social"),
    text("nome_fantasia"),
    text("cnpj"),
    text("email"),
    text("telefone"),
    text("data_inicio_contrato"),
    text("criado_em"),
    text("modificado_em"),
  ],
};

static SOCIOS: TableDef = TableDef {
  name: "socios",
  columns: &[
    text("id"),
    text("empresa_id"),
    text("nome"),
    text("cpf"),
    real("percentual"),
    text("criado_em"),
  ],
};

static CATEGORIAS_GRUPO: TableDef = TableDef {
  name: "categorias_grupo",
  columns: &[text("id"), text("nome"), text("tipo"), text("descricao"), text("criado_em")],
};

static CATEGORIAS: TableDef = TableDef {
  name: "categorias",
  columns: &[
    text("id"),
    text("codigo"),
    text("nome"),
    text("descricao"),
    text("tipo"),
    text("grupo_id"),
    boolean("ativo"),
    text("criado_em"),
  ],
};

static INDICADORES: TableDef = TableDef {
  name: "indicadores",
  columns: &[
    text("id"),
    text("codigo"),
    text("nome"),
    text("descricao"),
    text("tipo_estrutura"),
    text("tipo_dado"),
    boolean("ativo"),
    text("criado_em"),
  ],
};

static INDICADORES_EMPRESAS: TableDef = TableDef {
  name: "indicadores_empresas",
  columns: &[text("id"), text("indicador_id"), text("empresa_id"), text("criado_em")],
};

static REGISTRO_DE_VENDAS: TableDef = TableDef {
  name: "registro_de_vendas",
  columns: &[
    text("id"),
    text("empresa_id"),
    text("cliente_id"),
    text("vendedor_id"),
    text("sdr_id"),
    text("servico_id"),
    real("valor"),
    text("origem"),
    text("nome_cliente"),
    text("registro_venda"),
    text("data_venda"),
    text("criado_em"),
    text("modificado_em"),
  ],
};

static CLIENTES: TableDef = TableDef {
  name: "clientes",
  columns: &[
    text("id"),
    text("empresa_id"),
    text("razao_social"),
    text("nome_fantasia"),
    text("cnpj"),
    text("email"),
    text("telefone"),
    boolean("ativo"),
    text("criado_em"),
  ],
};

static PESSOAS: TableDef = TableDef {
  name: "pessoas",
  columns: &[text("id"), text("empresa_id"), text("nome"), text("cargo"), text("email"), text("criado_em")],
};

static SERVICOS: TableDef = TableDef {
  name: "servicos",
  columns: &[
    text("id"),
    text("empresa_id"),
    text("nome"),
    text("descricao"),
    boolean("ativo"),
    text("criado_em"),
  ],
};

static CONFIG_VISUALIZACOES: TableDef = TableDef {
  name: "config_visualizacoes",
  columns: &[
    text("id"),
    text("pagina"),
    text("nome_exibicao"),
    text("tipo_visualizacao"),
    text("tipo_grafico"),
    text("fonte_dados"),
    text("campo_exibicao"),
    text("origem_id"),
    integer("ordem"),
    boolean("ativo"),
    text("criado_em"),
  ],
};

static LANCAMENTOS: TableDef = TableDef {
  name: "lancamentos",
  columns: &[
    text("id"),
    text("empresa_id"),
    text("categoria_id"),
    text("indicador_id"),
    text("cliente_id"),
    text("tipo"),
    text("descricao"),
    real("valor"),
    text("data"),
    integer("ano"),
    integer("mes"),
    text("criado_em"),
  ],
};

static AUDIT_LOG: TableDef = TableDef {
  name: "audit_log",
  columns: &[
    text("id"),
    text("ts"),
    text("actor"),
    text("action"),
    text("entity_type"),
    text("entity_id"),
    text("payload_json"),
  ],
};

impl Table {
  pub const ALL: [Table; 13] = [
    Table::Empresas,
    Table::Socios,
    Table::CategoriasGrupo,
    Table::Categorias,
    Table::Indicadores,
    Table::IndicadoresEmpresas,
    Table::RegistroDeVendas,
    Table::Clientes,
    Table::Pessoas,
    Table::Servicos,
    Table::ConfigVisualizacoes,
    Table::Lancamentos,
    Table::AuditLog,
  ];

  pub fn def(self) -> &'static TableDef {
    match self {
      Table::Empresas => &EMPRESAS,
      Table::Socios => &SOCIOS,
      Table::CategoriasGrupo => &CATEGORIAS_GRUPO,
      Table::Categorias => &CATEGORIAS,
      Table::Indicadores => &INDICADORES,
      Table::IndicadoresEmpresas => &INDICADORES_EMPRESAS,
      Table::RegistroDeVendas => &REGISTRO_DE_VENDAS,
      Table::Clientes => &CLIENTES,
      Table::Pessoas => &PESSOAS,
      Table::Servicos => &SERVICOS,
      Table::ConfigVisualizacoes => &CONFIG_VISUALIZACOES,
      Table::Lancamentos => &LANCAMENTOS,
      Table::AuditLog => &AUDIT_LOG,
    }
  }

  pub fn name(self) -> &'static str {
    self.def().name
  }

  pub fn from_name(name: &str) -> Option<Table> {
    Table::ALL.into_iter().find(|table| table.name() == name)
  }
}
