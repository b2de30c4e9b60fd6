use std::io::Write;

use crate::error::AppError;
use crate::models::{SaleListItem, SaleOrigin};

const HEADER: &str =
  "registro_venda,data_venda,valor,origem,cliente,vendedor,sdr,servico,criado_em";

pub fn write_sales_csv<W: Write>(items: &[SaleListItem], mut out: W) -> Result<(), AppError> {
  writeln!(out, "{HEADER}")?;
  for item in items {
    let venda = &item.venda;
    let cliente = item
      .cliente_razao_social
      .as_deref()
      .or(venda.nome_cliente.as_deref())
      .unwrap_or("");
    writeln!(
      out,
      "{},{},{:.2},{},{},{},{},{},{}",
      escape_csv(&venda.registro_venda),
      escape_csv(&venda.data_venda),
      venda.valor,
      origin_label(venda.origem),
      escape_csv(cliente),
      escape_csv(item.vendedor_nome.as_deref().unwrap_or("")),
      escape_csv(item.sdr_nome.as_deref().unwrap_or("")),
      escape_csv(item.servico_nome.as_deref().unwrap_or("")),
      escape_csv(&venda.criado_em)
    )?;
  }
  out.flush()?;
  Ok(())
}

pub fn sales_csv(items: &[SaleListItem]) -> Result<Vec<u8>, AppError> {
  let mut buffer = Vec::new();
  write_sales_csv(items, &mut buffer)?;
  Ok(buffer)
}

fn origin_label(origem: SaleOrigin) -> &'static str {
  match origem {
    SaleOrigin::Brasil => "Brasil",
    SaleOrigin::Exterior => "Exterior",
  }
}

fn escape_csv(value: &str) -> String {
  if value.contains(',') || value.contains('"') || value.contains('\n') || value.contains(';') {
    format!("\"{}\"", value.replace('"', "\"\""))
  } else {
    value.to_string()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::Sale;

  fn item(registro: &str, cliente: Option<&str>, nome_cliente: Option<&str>) -> SaleListItem {
    SaleListItem {
      venda: Sale {
        id: "v1".into(),
        empresa_id: "e1".into(),
        cliente_id: cliente.map(|_| "c1".to_string()),
        vendedor_id: None,
        sdr_id: None,
        servico_id: "s1".into(),
        valor: 1234.5,
        origem: SaleOrigin::Exterior,
        nome_cliente: nome_cliente.map(str::to_string),
        registro_venda: registro.into(),
        data_venda: "2024-06-01".into(),
        criado_em: "2024-06-01T10:00:00+00:00".into(),
        modificado_em: "2024-06-01T10:00:00+00:00".into(),
      },
      cliente_razao_social: cliente.map(str::to_string),
      vendedor_nome: Some("Marta".into()),
      sdr_nome: None,
      servico_nome: Some("Consultoria".into()),
    }
  }

  #[test]
  fn quotes_fields_with_separators() {
    assert_eq!(escape_csv("Acme, Ltda"), "\"Acme, Ltda\"");
    assert_eq!(escape_csv("diz \"oi\""), "\"diz \"\"oi\"\"\"");
    assert_eq!(escape_csv("simples"), "simples");
  }

  #[test]
  fn manual_client_name_fills_the_client_column() {
    let bytes = sales_csv(&[item("Contrato 7", None, Some("Cliente Avulso"))]).expect("csv");
    let text = String::from_utf8(bytes).expect("utf8");
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some(HEADER));
    assert_eq!(
      lines.next(),
      Some("Contrato 7,2024-06-01,1234.50,Exterior,Cliente Avulso,Marta,,Consultoria,2024-06-01T10:00:00+00:00")
    );
  }
}
