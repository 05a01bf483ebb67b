use std::fs;

use camino::Utf8Path;
use encoding_rs::Encoding;
use tracing::{debug, warn};

use crate::config::RecordSettings;
use crate::error::ReportError;
use crate::fs_util;
use crate::table::Table;

/// Reads delimited record files, trying each configured encoding in order.
pub struct RecordLoader<'a> {
    settings: &'a RecordSettings,
}

impl<'a> RecordLoader<'a> {
    pub fn new(settings: &'a RecordSettings) -> Self {
        Self { settings }
    }

    /// Parses `path` and deletes it afterwards whatever the outcome. `None`
    /// means no encoding produced a table with the required columns.
    pub fn load_and_consume(&self, path: &Utf8Path) -> Option<Table> {
        let table = self.load(path);
        fs_util::remove_quietly(path);
        table
    }

    /// Parses `path` without touching it.
    pub fn load(&self, path: &Utf8Path) -> Option<Table> {
        let bytes = match fs::read(path.as_std_path()) {
            Ok(bytes) => bytes,
            Err(err) => {
                warn!(file = %path, error = %err, "unable to read record file");
                return None;
            }
        };

        for &encoding in &self.settings.encodings {
            match self.parse(&bytes, encoding) {
                Ok(table) => {
                    debug!(file = %path, encoding = encoding.name(), rows = table.len(), "loaded records");
                    return Some(table);
                }
                Err(err) => {
                    debug!(file = %path, encoding = encoding.name(), error = %err, "encoding rejected");
                }
            }
        }

        warn!(file = %path, "no encoding produced a valid record table");
        None
    }

    fn parse(&self, bytes: &[u8], encoding: &'static Encoding) -> Result<Table, ReportError> {
        let decoded = encoding
            .decode_without_bom_handling_and_without_replacement(bytes)
            .ok_or_else(|| ReportError::Csv(format!("not valid {}", encoding.name())))?;
        let text = decoded
            .strip_prefix('\u{feff}')
            .unwrap_or(decoded.as_ref());

        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.settings.delimiter)
            .has_headers(true)
            .flexible(true)
            .from_reader(text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|err| ReportError::Csv(err.to_string()))?
            .iter()
            .map(str::to_string)
            .collect::<Vec<_>>();
        let mut table = Table::new(headers);

        for column in &self.settings.required_columns {
            if !table.has_column(column) {
                return Err(ReportError::MissingColumn(column.clone()));
            }
        }

        // Short rows are padded with nulls; rows wider than the header are malformed.
        let width = table.columns().len();
        for record in reader.records() {
            let record = record.map_err(|err| ReportError::Csv(err.to_string()))?;
            if record.len() > width {
                let line = record.position().map(|pos| pos.line()).unwrap_or(0);
                return Err(ReportError::Csv(format!(
                    "line {line}: expected at most {width} fields, found {}",
                    record.len()
                )));
            }
            let row = record
                .iter()
                .map(|field| (!field.is_empty()).then(|| field.to_string()))
                .collect();
            table.push_row(row);
        }

        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_file_falls_back_to_second_encoding() {
        let settings = RecordSettings::default();
        let loader = RecordLoader::new(&settings);
        let mut bytes = b"Nome Fantasia;Segmento de Mercado;Assunto\n".to_vec();
        bytes.extend_from_slice(b"Cemig;Energia El\xe9trica;Cobran\xe7a\n");

        let table = loader.parse(&bytes, encoding_rs::UTF_8);
        assert!(table.is_err());

        let table = loader.parse(&bytes, encoding_rs::WINDOWS_1252).unwrap();
        assert_eq!(table.cell(0, "Segmento de Mercado"), Some("Energia Elétrica"));
    }

    #[test]
    fn bom_is_stripped_from_first_header() {
        let settings = RecordSettings::default();
        let loader = RecordLoader::new(&settings);
        let bytes = "\u{feff}Nome Fantasia;Segmento de Mercado\nNubank;Bancos\n".as_bytes();
        let table = loader.parse(bytes, encoding_rs::UTF_8).unwrap();
        assert_eq!(table.columns()[0], "Nome Fantasia");
    }
}
