use camino::Utf8PathBuf;

use consumidor_reports::config::RecordSettings;
use consumidor_reports::loader::RecordLoader;

fn staging() -> (tempfile::TempDir, Utf8PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    (temp, root)
}

#[test]
fn loads_utf8_file_and_removes_it() {
    let (_temp, dir) = staging();
    let path = dir.join("2024-01.csv");
    std::fs::write(
        path.as_std_path(),
        "Nome Fantasia;Segmento de Mercado;Assunto\nEquatorial Energia;Energia Elétrica;Cobrança\nNubank;Bancos;\n",
    )
    .unwrap();

    let settings = RecordSettings::default();
    let table = RecordLoader::new(&settings).load_and_consume(&path).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(0, "Nome Fantasia"), Some("Equatorial Energia"));
    assert_eq!(table.cell(1, "Assunto"), None);
    assert!(!path.as_std_path().exists());
}

#[test]
fn latin1_file_is_decoded() {
    let (_temp, dir) = staging();
    let path = dir.join("latin1.csv");
    let mut bytes = b"Nome Fantasia;Segmento de Mercado;Assunto\n".to_vec();
    bytes.extend_from_slice(b"Cemig;Energia El\xe9trica;Cobran\xe7a indevida\n");
    std::fs::write(path.as_std_path(), bytes).unwrap();

    let settings = RecordSettings::default();
    let table = RecordLoader::new(&settings).load_and_consume(&path).unwrap();

    assert_eq!(table.cell(0, "Assunto"), Some("Cobrança indevida"));
    assert!(!path.as_std_path().exists());
}

#[test]
fn file_without_required_columns_is_rejected_and_removed() {
    let (_temp, dir) = staging();
    let path = dir.join("other.csv");
    std::fs::write(path.as_std_path(), "Empresa;Setor\nA;B\n").unwrap();

    let settings = RecordSettings::default();
    assert!(RecordLoader::new(&settings).load_and_consume(&path).is_none());
    assert!(!path.as_std_path().exists());
}

#[test]
fn ragged_file_is_rejected_and_removed() {
    let (_temp, dir) = staging();
    let path = dir.join("ragged.csv");
    std::fs::write(
        path.as_std_path(),
        "Nome Fantasia;Segmento de Mercado\nA;B;C;D\n",
    )
    .unwrap();

    let settings = RecordSettings::default();
    assert!(RecordLoader::new(&settings).load_and_consume(&path).is_none());
    assert!(!path.as_std_path().exists());
}

#[test]
fn missing_file_yields_no_data() {
    let (_temp, dir) = staging();
    let settings = RecordSettings::default();
    assert!(
        RecordLoader::new(&settings)
            .load_and_consume(&dir.join("absent.csv"))
            .is_none()
    );
}

#[test]
fn subject_column_is_optional() {
    let (_temp, dir) = staging();
    let path = dir.join("no-subject.csv");
    std::fs::write(path.as_std_path(), "Nome Fantasia;Segmento de Mercado\nA;B\n").unwrap();

    let settings = RecordSettings::default();
    let table = RecordLoader::new(&settings).load(&path).unwrap();
    assert!(!table.has_column("Assunto"));
    assert!(path.as_std_path().exists());
}

#[test]
fn short_rows_are_padded_with_nulls() {
    let (_temp, dir) = staging();
    let path = dir.join("short.csv");
    std::fs::write(
        path.as_std_path(),
        "Nome Fantasia;Segmento de Mercado;Assunto\nEquatorial;Energia;Cobranca\nNubank;Bancos\n",
    )
    .unwrap();

    let settings = RecordSettings::default();
    let table = RecordLoader::new(&settings).load_and_consume(&path).unwrap();

    assert_eq!(table.len(), 2);
    assert_eq!(table.cell(0, "Assunto"), Some("Cobranca"));
    assert_eq!(table.cell(1, "Nome Fantasia"), Some("Nubank"));
    assert_eq!(table.cell(1, "Assunto"), None);
    assert!(!path.as_std_path().exists());
}
