use std::path::PathBuf;

use chrono::{Duration, Utc};
use rand::seq::SliceRandom;
use rand::Rng;

use painel_gestao::commands;
use painel_gestao::db;
use painel_gestao::domain::widget::WidgetDraft;
use painel_gestao::error::AppError;
use painel_gestao::models::*;
use painel_gestao::store::{SqliteStore, Store};

const ACTOR: &str = "seed_mock";

fn main() -> Result<(), Box<dyn std::error::Error>> {
  let count = std::env::args()
    .nth(1)
    .and_then(|value| value.parse::<usize>().ok())
    .unwrap_or(200);

  let app_dir = if let Ok(path) = std::env::var("PAINEL_SEED_DIR") {
    PathBuf::from(path)
  } else {
    db::resolve_app_dir()?
  };

  let store = SqliteStore::new(db::init_db(&app_dir)?);
  let created = seed_mock_data(&store, count)?;

  println!("Seeded {} vendas in {}", created, app_dir.display());
  Ok(())
}

fn actor() -> Option<String> {
  Some(ACTOR.to_string())
}

fn seed_mock_data(store: &dyn Store, count: usize) -> Result<usize, AppError> {
  let mut rng = rand::thread_rng();

  let companies = [
    ("Aurora Consultoria Ltda", "Aurora", "11.222.333/0001-44"),
    ("Boreal Tecnologia SA", "Boreal", "22.333.444/0001-55"),
  ];
  let partner_names = ["Ana Souza", "Bruno Lima", "Carla Dias", "Diego Rocha"];
  let client_names = [
    "Mercado Central",
    "Padaria Estrela",
    "Clinica Vida",
    "Transportes Rapido",
    "Escola Saber",
    "Hotel Mar Azul",
  ];
  let service_names = ["Consultoria", "Implantacao", "Suporte Mensal", "Treinamento"];
  let people = [
    ("Marta Alves", PersonRole::Vendedor),
    ("Paulo Nunes", PersonRole::Ambos),
    ("Rita Campos", PersonRole::Sdr),
  ];

  let mut created = 0;
  let mut first_client = None;
  for (razao_social, fantasia, cnpj) in companies {
    let socios = partner_names
      .choose_multiple(&mut rng, 2)
      .map(|nome| PartnerInput {
        nome: nome.to_string(),
        cpf: None,
        percentual: 50.0,
      })
      .collect();
    let empresa = commands::create_company(
      store,
      CompanyInput {
        razao_social: razao_social.into(),
        nome_fantasia: Some(fantasia.into()),
        cnpj: cnpj.into(),
        email: Some(format!("contato@{}.com.br", fantasia.to_lowercase())),
        telefone: None,
        data_inicio_contrato: Some((Utc::now() - Duration::days(rng.gen_range(90..900))).format("%Y-%m-%d").to_string()),
        socios,
      },
      actor(),
    )?
    .empresa;

    let mut clients = Vec::new();
    for nome in client_names {
      clients.push(commands::create_client(
        store,
        ClientInput {
          empresa_id: empresa.id.clone(),
          razao_social: nome.into(),
          nome_fantasia: None,
          cnpj: None,
          email: None,
          telefone: None,
        },
        actor(),
      )?);
    }
    if first_client.is_none() {
      first_client = clients.first().map(|client| client.id.clone());
    }

    let mut services = Vec::new();
    for nome in service_names {
      services.push(commands::create_service(
        store,
        ServiceInput {
          empresa_id: empresa.id.clone(),
          nome: nome.into(),
          descricao: None,
        },
        actor(),
      )?);
    }

    let mut team = Vec::new();
    for (nome, cargo) in people {
      team.push(commands::create_person(
        store,
        PersonInput {
          empresa_id: empresa.id.clone(),
          nome: nome.into(),
          cargo,
          email: None,
        },
        actor(),
      )?);
    }
    let sellers: Vec<&Person> = team.iter().filter(|person| person.cargo.sells()).collect();
    let sdrs: Vec<&Person> = team.iter().filter(|person| person.cargo.prospects()).collect();

    for index in 0..count {
      let data = Utc::now() - Duration::days(rng.gen_range(0..365));
      let walk_in = rng.gen_bool(0.15);
      let client = clients.choose(&mut rng).map(|client| client.id.clone());
      let sale = SaleInput {
        empresa_id: empresa.id.clone(),
        cliente_id: if walk_in { None } else { client },
        vendedor_id: sellers.choose(&mut rng).map(|person| person.id.clone()),
        sdr_id: if rng.gen_bool(0.5) {
          sdrs.choose(&mut rng).map(|person| person.id.clone())
        } else {
          None
        },
        servico_id: services
          .choose(&mut rng)
          .map(|service| service.id.clone())
          .unwrap_or_default(),
        valor: (rng.gen_range(500.0..25_000.0_f64) * 100.0).round() / 100.0,
        origem: if rng.gen_bool(0.8) { SaleOrigin::Brasil } else { SaleOrigin::Exterior },
        nome_cliente: walk_in.then(|| "Cliente avulso".to_string()),
        registro_venda: format!("{fantasia}-{:05}", index + 1),
        data_venda: data.format("%Y-%m-%d").to_string(),
      };
      commands::create_sale(store, sale, actor())?;
      created += 1;
    }
  }

  let groups = commands::list_category_groups(store)?;
  let mut categories = Vec::new();
  for (nome, tipo) in [
    ("Servicos prestados", CategoryType::Receita),
    ("Licencas", CategoryType::Receita),
    ("Aluguel", CategoryType::Despesa),
    ("Folha de pagamento", CategoryType::Despesa),
    ("Marketing", CategoryType::Despesa),
  ] {
    let Some(group) = groups.iter().find(|group| group.tipo == tipo) else {
      continue;
    };
    categories.push(commands::create_category(
      store,
      CategoryInput {
        nome: nome.into(),
        descricao: None,
        tipo,
        grupo_id: group.id.clone(),
      },
      actor(),
    )?);
  }

  let indicator = commands::create_indicator(
    store,
    IndicatorInput {
      codigo: "FAT".into(),
      nome: "Faturamento mensal".into(),
      descricao: Some("Soma das vendas do mes".into()),
      tipo_estrutura: StructureType::Composto,
      tipo_dado: DataKind::Moeda,
    },
    actor(),
  )?;

  for category in &categories {
    for _ in 0..12 {
      let data = Utc::now() - Duration::days(rng.gen_range(0..730));
      commands::create_ledger_entry(
        store,
        LedgerEntryInput {
          empresa_id: None,
          categoria_id: Some(category.id.clone()),
          indicador_id: None,
          cliente_id: None,
          tipo: match category.tipo {
            CategoryType::Receita => LedgerKind::Receita,
            CategoryType::Despesa => LedgerKind::Despesa,
          },
          descricao: Some(category.nome.clone()),
          valor: (rng.gen_range(100.0..9_000.0_f64) * 100.0).round() / 100.0,
          data: data.format("%Y-%m-%d").to_string(),
        },
        actor(),
      )?;
    }
  }

  let mut card = WidgetDraft::new(Page::Home);
  card.nome_exibicao = "Faturamento".into();
  card.tipo_visualizacao = Some(VisualizationType::Card);
  card.set_source(DataSource::Indicadores);
  card.toggle_item(&indicator.id)?;
  commands::create_widget(store, card, actor())?;

  let mut sales_chart = WidgetDraft::new(Page::Vendas);
  sales_chart.nome_exibicao = "Vendas por data".into();
  sales_chart.tipo_visualizacao = Some(VisualizationType::Grafico);
  sales_chart.tipo_grafico = Some(ChartType::Line);
  sales_chart.set_source(DataSource::RegistroDeVendas);
  sales_chart.campo_exibicao = Some(SalesField::DataVenda);
  commands::create_widget(store, sales_chart, actor())?;

  let mut clients_list = WidgetDraft::new(Page::Tabelas);
  clients_list.nome_exibicao = "Clientes".into();
  clients_list.tipo_visualizacao = Some(VisualizationType::Lista);
  clients_list.set_source(DataSource::Clientes);
  clients_list.todos_clientes = true;
  commands::create_widget(store, clients_list, actor())?;

  if let Some(client_id) = first_client {
    let mut top_client = WidgetDraft::new(Page::Analise);
    top_client.nome_exibicao = "Cliente destaque".into();
    top_client.tipo_visualizacao = Some(VisualizationType::Card);
    top_client.set_source(DataSource::Clientes);
    top_client.toggle_item(&client_id)?;
    commands::create_widget(store, top_client, actor())?;
  }

  Ok(created)
}
