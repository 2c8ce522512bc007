//! Табличные данные и загрузка CSV

use std::collections::HashSet;
use std::path::Path;

use crate::error::{EnergyError, Result};
use crate::types::{RawRecord, Value};

const MISSING_TOKENS: [&str; 7] = ["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnData {
    Numeric(Vec<Option<f64>>),
    Text(Vec<Option<String>>),
}

impl ColumnData {
    pub fn len(&self) -> usize {
        match self {
            ColumnData::Numeric(v) => v.len(),
            ColumnData::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, ColumnData::Numeric(_))
    }

    fn retain(&mut self, keep: &[bool]) {
        match self {
            ColumnData::Numeric(v) => retain_by_mask(v, keep),
            ColumnData::Text(v) => retain_by_mask(v, keep),
        }
    }
}

fn retain_by_mask<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut i = 0;
    values.retain(|_| {
        let k = keep[i];
        i += 1;
        k
    });
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub data: ColumnData,
}

impl Column {
    pub fn numeric(name: impl Into<String>, values: Vec<Option<f64>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Numeric(values),
        }
    }

    pub fn text(name: impl Into<String>, values: Vec<Option<String>>) -> Self {
        Self {
            name: name.into(),
            data: ColumnData::Text(values),
        }
    }

    pub fn as_numeric(&self) -> Option<&[Option<f64>]> {
        match &self.data {
            ColumnData::Numeric(v) => Some(v),
            ColumnData::Text(_) => None,
        }
    }
}

/// Упорядоченная таблица колонок одинаковой длины
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map(|c| c.data.len()).unwrap_or(0);
        if let Some(bad) = columns.iter().find(|c| c.data.len() != n_rows) {
            return Err(EnergyError::InvalidParameter(format!(
                "column {} has {} rows, expected {}",
                bad.name,
                bad.data.len(),
                n_rows
            )));
        }
        let mut seen = HashSet::new();
        if let Some(dup) = columns.iter().find(|c| !seen.insert(c.name.as_str())) {
            return Err(EnergyError::InvalidParameter(format!(
                "duplicate column name {}",
                dup.name
            )));
        }
        Ok(Self { columns, n_rows })
    }

    /// Таблица из сырых записей; колонка числовая, если все значения числовые
    pub fn from_records(records: &[RawRecord]) -> Result<Self> {
        let mut names: Vec<&String> = Vec::new();
        let mut seen = HashSet::new();
        for record in records {
            for name in record.keys() {
                if seen.insert(name) {
                    names.push(name);
                }
            }
        }

        let columns = names
            .into_iter()
            .map(|name| {
                let cells: Vec<&Value> = records
                    .iter()
                    .map(|r| r.get(name).unwrap_or(&Value::Missing))
                    .collect();
                let numeric = cells
                    .iter()
                    .all(|v| v.is_missing() || v.as_number().is_some());
                if numeric {
                    Column::numeric(name.clone(), cells.iter().map(|v| v.as_number()).collect())
                } else {
                    Column::text(name.clone(), cells.iter().map(|v| v.as_text()).collect())
                }
            })
            .collect();

        Self::new(columns)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns.iter_mut().find(|c| c.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    /// Добавляет колонку в конец или заменяет существующую на том же месте
    pub fn set_column(&mut self, column: Column) -> Result<()> {
        if column.data.len() != self.n_rows && !self.columns.is_empty() {
            return Err(EnergyError::InvalidParameter(format!(
                "column {} has {} rows, expected {}",
                column.name,
                column.data.len(),
                self.n_rows
            )));
        }
        if self.columns.is_empty() {
            self.n_rows = column.data.len();
        }
        match self.columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    pub fn remove_column(&mut self, name: &str) -> Option<Column> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        Some(self.columns.remove(idx))
    }

    /// Оставляет строки, для которых keep[i] == true
    pub fn retain_rows(&mut self, keep: &[bool]) {
        debug_assert_eq!(keep.len(), self.n_rows);
        for column in &mut self.columns {
            column.data.retain(keep);
        }
        self.n_rows = keep.iter().filter(|&&k| k).count();
    }
}

fn is_missing_token(cell: &str) -> bool {
    MISSING_TOKENS.contains(&cell.trim())
}

/// Числовая ячейка; inf и NaN в любом регистре - пропуск
fn parse_cell(cell: &str) -> Option<Option<f64>> {
    if is_missing_token(cell) {
        return Some(None);
    }
    cell.parse::<f64>()
        .ok()
        .map(|v| v.is_finite().then_some(v))
}

/// Загрузка CSV: первая строка - заголовок
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Table> {
    let path = path.as_ref();
    let load_error = |reason: String| EnergyError::DataLoad {
        path: path.to_path_buf(),
        reason,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| load_error(e.to_string()))?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| load_error(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|e| load_error(e.to_string()))?;
        for (i, column) in cells.iter_mut().enumerate() {
            column.push(record.get(i).unwrap_or("").to_string());
        }
    }

    if cells.first().map_or(true, |c| c.is_empty()) {
        return Err(EnergyError::EmptyDataset(format!("{} has no rows", path.display())));
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, raw)| {
            let parsed: Option<Vec<Option<f64>>> = raw.iter().map(|c| parse_cell(c)).collect();
            if let Some(values) = parsed {
                Column::numeric(name, values)
            } else {
                let values = raw
                    .into_iter()
                    .map(|c| if is_missing_token(&c) { None } else { Some(c) })
                    .collect();
                Column::text(name, values)
            }
        })
        .collect();

    let table = Table::new(columns)?;
    tracing::info!("Data loaded: {} rows, {} columns", table.n_rows(), table.n_cols());
    Ok(table)
}
