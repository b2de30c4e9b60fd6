use crate::models::{Client, Company, SaleListItem, WidgetConfig};

pub trait Searchable {
  fn search_fields(&self) -> Vec<Option<&str>>;
}

pub fn filter_records<'a, T: Searchable>(records: &'a [T], query: &str) -> Vec<&'a T> {
  if query.is_empty() {
    return records.iter().collect();
  }
  let term = query.to_lowercase();
  records.iter().filter(|record| matches(*record, &term)).collect()
}

pub fn matches<T: Searchable + ?Sized>(record: &T, term: &str) -> bool {
  record
    .search_fields()
    .into_iter()
    .flatten()
    .any(|field| field.to_lowercase().contains(term))
}

impl Searchable for SaleListItem {
  fn search_fields(&self) -> Vec<Option<&str>> {
    vec![
      Some(self.venda.registro_venda.as_str()),
      self.cliente_razao_social.as_deref(),
      self.venda.nome_cliente.as_deref(),
      self.vendedor_nome.as_deref(),
      self.sdr_nome.as_deref(),
      self.servico_nome.as_deref(),
    ]
  }
}

impl Searchable for Company {
  fn search_fields(&self) -> Vec<Option<&str>> {
    vec![
      Some(self.razao_social.as_str()),
      self.nome_fantasia.as_deref(),
      Some(self.cnpj.as_str()),
    ]
  }
}

impl Searchable for Client {
  fn search_fields(&self) -> Vec<Option<&str>> {
    vec![
      Some(self.razao_social.as_str()),
      self.nome_fantasia.as_deref(),
      self.cnpj.as_deref(),
      self.email.as_deref(),
    ]
  }
}

impl Searchable for WidgetConfig {
  fn search_fields(&self) -> Vec<Option<&str>> {
    vec![Some(self.nome_exibicao.as_str())]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  struct Linha(&'static str, Option<&'static str>);

  impl Searchable for Linha {
    fn search_fields(&self) -> Vec<Option<&str>> {
      vec![Some(self.0), self.1]
    }
  }

  fn linhas() -> Vec<Linha> {
    vec![
      Linha("Registro A", Some("ClienteX")),
      Linha("Registro B", Some("ClienteY")),
      Linha("Registro C", None),
    ]
  }

  fn labels(found: &[&Linha]) -> Vec<&'static str> {
    found.iter().map(|linha| linha.0).collect()
  }

  #[test]
  fn matches_any_field_ignoring_case() {
    let records = linhas();
    assert_eq!(labels(&filter_records(&records, "clientex")), vec!["Registro A"]);
    assert_eq!(labels(&filter_records(&records, "REGISTRO c")), vec!["Registro C"]);
  }

  #[test]
  fn empty_query_returns_everything_in_order() {
    let records = linhas();
    let found = filter_records(&records, "");
    assert_eq!(labels(&found), vec!["Registro A", "Registro B", "Registro C"]);
  }

  #[test]
  fn longer_queries_never_widen_the_result() {
    let records = linhas();
    let query = "clientey";
    for end in 1..=query.len() {
      let shorter = labels(&filter_records(&records, &query[..end - 1]));
      let longer = labels(&filter_records(&records, &query[..end]));
      assert!(longer.iter().all(|label| shorter.contains(label)), "{query:?} at {end}");
    }
  }

  #[test]
  fn whitespace_is_matched_literally() {
    let records = linhas();
    assert_eq!(filter_records(&records, " ").len(), 3);
    assert!(filter_records(&records, "  ").is_empty());
  }
}
