use std::collections::{HashMap, HashSet};

pub type Cell = Option<String>;

/// Column-named rows of optional text cells.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Repeated header names get `.1`, `.2`, ... suffixes so every column
    /// stays addressable by name.
    pub fn new(headers: Vec<String>) -> Self {
        let mut seen = HashMap::<String, usize>::new();
        let mut columns = Vec::with_capacity(headers.len());
        for header in headers {
            let count = seen.entry(header.clone()).or_insert(0);
            if *count == 0 {
                columns.push(header);
            } else {
                columns.push(format!("{header}.{count}"));
            }
            *count += 1;
        }
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Rows shorter than the header are padded with nulls, longer rows are
    /// truncated.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), None);
        self.rows.push(row);
    }

    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        let index = self.column_index(column)?;
        self.rows.get(row)?.get(index)?.as_deref()
    }

    /// Rows for which `keep` returns true, with the same columns.
    pub fn filter<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&[Cell]) -> bool,
    {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    /// Drops rows equal across every column to an earlier row.
    pub fn dedup(&mut self) {
        let mut seen = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    pub fn distinct_rows(&self) -> usize {
        self.rows.iter().collect::<HashSet<_>>().len()
    }
}

/// Stacks tables into one. Columns are the union in first-seen order and
/// cells of columns a source lacks are null. `None` for no input.
pub fn concat<I>(tables: I) -> Option<Table>
where
    I: IntoIterator<Item = Table>,
{
    let tables = tables.into_iter().collect::<Vec<_>>();
    if tables.is_empty() {
        return None;
    }

    let mut columns = Vec::<String>::new();
    let mut positions = HashMap::<String, usize>::new();
    for table in &tables {
        for column in &table.columns {
            if !positions.contains_key(column) {
                positions.insert(column.clone(), columns.len());
                columns.push(column.clone());
            }
        }
    }

    let total = tables.iter().map(Table::len).sum();
    let mut rows = Vec::with_capacity(total);
    for table in tables {
        let mapping = table
            .columns
            .iter()
            .map(|column| positions[column])
            .collect::<Vec<_>>();
        for row in table.rows {
            let mut unified = vec![None; columns.len()];
            for (cell, target) in row.into_iter().zip(&mapping) {
                unified[*target] = cell;
            }
            rows.push(unified);
        }
    }

    Some(Table { columns, rows })
}
