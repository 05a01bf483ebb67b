use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use consumidor_reports::config::{ColumnNames, ReportSettings};
use consumidor_reports::matcher::TermMatcher;
use consumidor_reports::report::{self, ReportOutcome, ReportWriter};
use consumidor_reports::table::{self, Table};

fn output_dir() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

fn complaints(rows: &[[&str; 3]]) -> Table {
    let mut table = Table::new(vec![
        "Nome Fantasia".to_string(),
        "Segmento de Mercado".to_string(),
        "Assunto".to_string(),
    ]);
    for row in rows {
        table.push_row(
            row.iter()
                .map(|value| (!value.is_empty()).then(|| value.to_string()))
                .collect(),
        );
    }
    table
}

fn terms(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}

#[test]
fn company_filter_selects_matching_display_name() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);
    let records = complaints(&[
        ["Equatorial Energia", "Energia Elétrica", "Cobrança"],
        ["Banco Inter", "Bancos", "Tarifas"],
    ]);

    let outcomes = writer.generate(&records, &terms(&["Equatorial"]), &[]).unwrap();
    assert_eq!(
        outcomes,
        vec![ReportOutcome::Written {
            file_name: "dados_empresas_Equatorial.xlsx".to_string(),
            rows: 1,
        }]
    );
    let saved = report::read_report(&dir.join("dados_empresas_Equatorial.xlsx")).unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved.cell(0, "Nome Fantasia"), Some("Equatorial Energia"));
    assert_eq!(saved.cell(0, "Assunto"), Some("Cobrança"));

    let outcomes = writer.generate(&records, &terms(&["Nubank"]), &[]).unwrap();
    assert_matches!(&outcomes[..], [ReportOutcome::Skipped { file_name }] if file_name == "dados_empresas_Nubank.xlsx");
    assert!(!dir.join("dados_empresas_Nubank.xlsx").as_std_path().exists());
}

#[test]
fn segment_filter_also_matches_subject() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);
    let records = complaints(&[
        ["Equatorial Energia", "Energia Elétrica", "Cobrança"],
        ["Loja X", "Varejo", "Conta de energia"],
        ["Banco Inter", "Bancos", "Tarifas"],
        ["Sem segmento", "", ""],
    ]);

    let outcomes = writer
        .generate(&records, &[], &terms(&["energia", "Telefonia Fixa"]))
        .unwrap();
    assert_eq!(
        outcomes,
        vec![ReportOutcome::Written {
            file_name: "dados_segmento_energia_TelefoniaFixa.xlsx".to_string(),
            rows: 2,
        }]
    );
}

#[test]
fn empty_term_lists_produce_no_reports() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);
    let records = complaints(&[["Equatorial Energia", "Energia Elétrica", "Cobrança"]]);

    let outcomes = writer.generate(&records, &terms(&[" "]), &[]).unwrap();
    assert!(outcomes.is_empty());
    assert_eq!(std::fs::read_dir(dir.as_std_path()).unwrap().count(), 0);
}

#[test]
fn writing_the_same_subset_twice_keeps_distinct_rows() {
    let (_temp, dir) = output_dir();
    let path = dir.join("dados_empresas_Equatorial.xlsx");
    let subset = complaints(&[
        ["Equatorial Energia", "Energia Elétrica", "Cobrança"],
        ["Equatorial Pará", "Energia Elétrica", "Corte"],
        ["Equatorial Energia", "Energia Elétrica", "Cobrança"],
    ]);

    report::merge_into(&path, subset.clone()).unwrap();
    let rows = report::merge_into(&path, subset.clone()).unwrap();

    assert_eq!(rows, subset.distinct_rows());
    assert_eq!(report::read_report(&path).unwrap().len(), 2);
}

#[test]
fn report_accumulates_across_runs() {
    let (_temp, dir) = output_dir();
    let path = dir.join("dados_segmento_Bancos.xlsx");

    let first = complaints(&[["Banco Inter", "Bancos", "Tarifas"]]);
    assert_eq!(report::merge_into(&path, first).unwrap(), 1);

    let second = complaints(&[
        ["Nubank", "Bancos", "Cartão"],
        ["Banco Inter", "Bancos", "Tarifas"],
    ]);
    assert_eq!(report::merge_into(&path, second).unwrap(), 2);

    let saved = report::read_report(&path).unwrap();
    assert_eq!(saved.distinct_rows(), 2);
    assert_eq!(saved.cell(0, "Nome Fantasia"), Some("Banco Inter"));
    assert_eq!(saved.cell(1, "Nome Fantasia"), Some("Nubank"));
}

#[test]
fn merge_unions_columns_of_old_and_new_rows() {
    let (_temp, dir) = output_dir();
    let path = dir.join("dados_empresas_Nubank.xlsx");
    report::merge_into(&path, complaints(&[["Nubank", "Bancos", "Cartão"]])).unwrap();

    let mut wider = Table::new(vec![
        "Nome Fantasia".to_string(),
        "Segmento de Mercado".to_string(),
        "UF".to_string(),
    ]);
    wider.push_row(vec![
        Some("Nubank".to_string()),
        Some("Bancos".to_string()),
        Some("SP".to_string()),
    ]);
    report::merge_into(&path, wider).unwrap();

    let saved = report::read_report(&path).unwrap();
    assert_eq!(saved.columns(), ["Nome Fantasia", "Segmento de Mercado", "Assunto", "UF"]);
    assert_eq!(saved.len(), 2);
    assert_eq!(saved.cell(0, "UF"), None);
    assert_eq!(saved.cell(1, "Assunto"), None);
}

#[test]
fn empty_subset_leaves_existing_report_untouched() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);

    let first = complaints(&[["Equatorial Energia", "Energia Elétrica", "Cobrança"]]);
    writer.generate(&first, &terms(&["Equatorial"]), &[]).unwrap();
    let path = dir.join("dados_empresas_Equatorial.xlsx");
    let before = std::fs::read(path.as_std_path()).unwrap();

    let second = complaints(&[["Banco Inter", "Bancos", "Tarifas"]]);
    let outcomes = writer.generate(&second, &terms(&["Equatorial"]), &[]).unwrap();
    assert_matches!(&outcomes[..], [ReportOutcome::Skipped { .. }]);
    assert_eq!(std::fs::read(path.as_std_path()).unwrap(), before);
}

struct ExactName(&'static str);

impl TermMatcher for ExactName {
    fn matches(&self, value: &str) -> bool {
        value == self.0
    }
}

#[test]
fn matching_strategy_can_be_replaced() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);
    let records = complaints(&[
        ["Equatorial", "Energia Elétrica", "Cobrança"],
        ["Equatorial Energia", "Energia Elétrica", "Cobrança"],
    ]);

    let outcome = writer
        .company_report(&records, &terms(&["Equatorial"]), &ExactName("Equatorial"))
        .unwrap();
    assert_eq!(
        outcome,
        ReportOutcome::Written {
            file_name: "dados_empresas_Equatorial.xlsx".to_string(),
            rows: 1,
        }
    );
}

#[test]
fn consolidated_records_feed_reports() {
    let (_temp, dir) = output_dir();
    let settings = ReportSettings::default();
    let columns = ColumnNames::default();
    let writer = ReportWriter::new(&dir, &settings, &columns);

    let first = complaints(&[["Equatorial Energia", "Energia Elétrica", "Cobrança"]]);
    let mut second = Table::new(vec!["Nome Fantasia".to_string(), "Segmento de Mercado".to_string()]);
    second.push_row(vec![Some("Nubank".to_string()), Some("Bancos".to_string())]);
    let records = table::concat([first, second]).unwrap();

    let outcomes = writer
        .generate(&records, &terms(&["Equatorial", "Nubank"]), &[])
        .unwrap();
    assert_eq!(
        outcomes,
        vec![ReportOutcome::Written {
            file_name: "dados_empresas_Equatorial_Nubank.xlsx".to_string(),
            rows: 2,
        }]
    );
}

#[test]
fn control_characters_survive_repeated_merges() {
    let (_temp, dir) = output_dir();
    let path = dir.join("dados_empresas_Equatorial.xlsx");
    let subset = complaints(&[
        ["Equatorial Energia", "Energia Elétrica", "a\r\nb"],
        ["Equatorial Pará", "Energia Elétrica", "ctl\u{1}x"],
        ["Equatorial Maranhão", "Energia Elétrica", "literal _x000D_ text"],
    ]);

    assert_eq!(report::merge_into(&path, subset.clone()).unwrap(), 3);
    assert_eq!(report::merge_into(&path, subset.clone()).unwrap(), 3);
    assert_eq!(report::merge_into(&path, subset).unwrap(), 3);

    let saved = report::read_report(&path).unwrap();
    assert_eq!(saved.len(), 3);
    assert_eq!(saved.cell(0, "Assunto"), Some("a\r\nb"));
    assert_eq!(saved.cell(1, "Assunto"), Some("ctl\u{1}x"));
    assert_eq!(saved.cell(2, "Assunto"), Some("literal _x000D_ text"));
}
