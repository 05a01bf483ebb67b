use std::sync::LazyLock;

use calamine::{Data, Reader, open_workbook_auto};
use camino::Utf8Path;
use regex::{Captures, Regex};
use rust_xlsxwriter::Workbook;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::{ColumnNames, ReportSettings};
use crate::error::ReportError;
use crate::matcher::{SubstringMatcher, TermMatcher};
use crate::store::write_atomic;
use crate::table::{self, Cell, Table};

pub const REPORT_EXTENSION: &str = "xlsx";

/// OOXML escape for characters XML cannot hold, e.g. `_x000D_` for `\r`.
static OOXML_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"_x([0-9A-Fa-f]{4})_").expect("valid escape pattern"));

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportOutcome {
    Written { file_name: String, rows: usize },
    Skipped { file_name: String },
}

/// Filters the consolidated table by company and segment terms and merges
/// each subset into its spreadsheet under the output directory.
pub struct ReportWriter<'a> {
    output_dir: &'a Utf8Path,
    settings: &'a ReportSettings,
    columns: &'a ColumnNames,
}

impl<'a> ReportWriter<'a> {
    pub fn new(
        output_dir: &'a Utf8Path,
        settings: &'a ReportSettings,
        columns: &'a ColumnNames,
    ) -> Self {
        Self {
            output_dir,
            settings,
            columns,
        }
    }

    /// One report per non-empty term list, matched by substring.
    pub fn generate(
        &self,
        records: &Table,
        companies: &[String],
        segments: &[String],
    ) -> Result<Vec<ReportOutcome>, ReportError> {
        let mut outcomes = Vec::new();
        if let Some(matcher) = SubstringMatcher::new(companies)? {
            outcomes.push(self.company_report(records, companies, &matcher)?);
        }
        if let Some(matcher) = SubstringMatcher::new(segments)? {
            outcomes.push(self.segment_report(records, segments, &matcher)?);
        }
        Ok(outcomes)
    }

    pub fn company_report(
        &self,
        records: &Table,
        terms: &[String],
        matcher: &dyn TermMatcher,
    ) -> Result<ReportOutcome, ReportError> {
        let subset = select_by_company(records, self.columns, matcher);
        let file_name = report_file_name(&self.settings.company_prefix, terms);
        self.publish(subset, file_name)
    }

    pub fn segment_report(
        &self,
        records: &Table,
        terms: &[String],
        matcher: &dyn TermMatcher,
    ) -> Result<ReportOutcome, ReportError> {
        let subset = select_by_segment(records, self.columns, matcher);
        let file_name = report_file_name(&self.settings.segment_prefix, terms);
        self.publish(subset, file_name)
    }

    fn publish(&self, subset: Table, file_name: String) -> Result<ReportOutcome, ReportError> {
        if subset.is_empty() {
            warn!(report = %file_name, "filter selected no rows; report left untouched");
            return Ok(ReportOutcome::Skipped { file_name });
        }
        let path = self.output_dir.join(&file_name);
        let rows = merge_into(&path, subset)?;
        info!(report = %file_name, rows, "saved report");
        Ok(ReportOutcome::Written { file_name, rows })
    }
}

/// `<prefix>_<first two terms joined by '_'>.xlsx`, spaces removed and path
/// separators replaced by `-`.
pub fn report_file_name<S: AsRef<str>>(prefix: &str, terms: &[S]) -> String {
    let suffix = terms
        .iter()
        .map(|term| term.as_ref().trim())
        .filter(|term| !term.is_empty())
        .take(2)
        .collect::<Vec<_>>()
        .join("_")
        .replace(' ', "")
        .replace(['/', '\\'], "-");
    format!("{prefix}_{suffix}.{REPORT_EXTENSION}")
}

pub fn select_by_company(
    records: &Table,
    columns: &ColumnNames,
    matcher: &dyn TermMatcher,
) -> Table {
    let display = records.column_index(&columns.display_name);
    records.filter(|row| cell_matches(row, display, matcher))
}

/// Segment reports also look at the subject column.
pub fn select_by_segment(
    records: &Table,
    columns: &ColumnNames,
    matcher: &dyn TermMatcher,
) -> Table {
    let segment = records.column_index(&columns.segment);
    let subject = records.column_index(&columns.subject);
    records.filter(|row| {
        cell_matches(row, segment, matcher) || cell_matches(row, subject, matcher)
    })
}

fn cell_matches(row: &[Cell], index: Option<usize>, matcher: &dyn TermMatcher) -> bool {
    index
        .and_then(|index| row.get(index))
        .and_then(|cell| cell.as_deref())
        .map(|value| matcher.matches(value))
        .unwrap_or(false)
}

/// Appends `subset` to the report at `path`, dropping duplicate rows when a
/// previous report exists. Returns the row count written.
pub fn merge_into(path: &Utf8Path, subset: Table) -> Result<usize, ReportError> {
    let combined = if path.as_std_path().exists() {
        let existing = read_report(path)?;
        let mut combined = table::concat([existing, subset]).unwrap_or_default();
        combined.dedup();
        combined
    } else {
        subset
    };
    write_report(path, &combined)?;
    Ok(combined.len())
}

/// Loads the first sheet of a workbook; the first row is the header.
pub fn read_report(path: &Utf8Path) -> Result<Table, ReportError> {
    let mut workbook = open_workbook_auto(path.as_std_path())
        .map_err(|err| ReportError::Spreadsheet(format!("open {path}: {err}")))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| ReportError::Spreadsheet(format!("{path} has no worksheet")))?
        .map_err(|err| ReportError::Spreadsheet(format!("read {path}: {err}")))?;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Table::default());
    };
    let mut table = Table::new(
        header
            .iter()
            .map(|cell| unescape_ooxml(&cell.to_string()))
            .collect(),
    );
    for row in rows {
        table.push_row(row.iter().map(data_to_cell).collect());
    }
    Ok(table)
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => None,
        Data::String(value) if value.is_empty() => None,
        Data::String(value) => Some(unescape_ooxml(value)),
        other => Some(other.to_string()),
    }
}

/// Reverses the `_xHHHH_` escaping applied when strings are written, in one
/// left-to-right pass so an escaped underscore (`_x005F_`) is not decoded twice.
fn unescape_ooxml(value: &str) -> String {
    if !value.contains("_x") {
        return value.to_string();
    }
    OOXML_ESCAPE
        .replace_all(value, |caps: &Captures| {
            u32::from_str_radix(&caps[1], 16)
                .ok()
                .and_then(char::from_u32)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Writes the table as a single-sheet workbook with every value as text.
pub fn write_report(path: &Utf8Path, records: &Table) -> Result<(), ReportError> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (col, name) in records.columns().iter().enumerate() {
        worksheet
            .write_string(0, column_number(col)?, name.as_str())
            .map_err(|err| ReportError::Spreadsheet(err.to_string()))?;
    }
    for (index, row) in records.rows().iter().enumerate() {
        let row_number = u32::try_from(index + 1)
            .map_err(|_| ReportError::Spreadsheet("too many rows for a worksheet".to_string()))?;
        for (col, cell) in row.iter().enumerate() {
            if let Some(value) = cell {
                worksheet
                    .write_string(row_number, column_number(col)?, value.as_str())
                    .map_err(|err| ReportError::Spreadsheet(err.to_string()))?;
            }
        }
    }

    let buffer = workbook
        .save_to_buffer()
        .map_err(|err| ReportError::Spreadsheet(err.to_string()))?;
    write_atomic(path, &buffer)
}

fn column_number(index: usize) -> Result<u16, ReportError> {
    u16::try_from(index)
        .map_err(|_| ReportError::Spreadsheet("too many columns for a worksheet".to_string()))
}
