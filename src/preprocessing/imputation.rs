//! Заполнение пропусков по k ближайшим соседям

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnData, Table};
use crate::error::{EnergyError, Result};

pub const DEFAULT_NEIGHBORS: usize = 5;

pub struct KnnImputer {
    n_neighbors: usize,
}

/// Обученный импьютер: сохраненные строки-доноры и средние по колонкам
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputerState {
    n_neighbors: usize,
    columns: Vec<String>,
    donors: Vec<Vec<Option<f64>>>,
    means: Vec<f64>,
}

impl KnnImputer {
    pub fn new(n_neighbors: usize) -> Result<Self> {
        if n_neighbors == 0 {
            return Err(EnergyError::InvalidParameter(
                "n_neighbors must be positive".to_string(),
            ));
        }
        Ok(Self { n_neighbors })
    }

    /// Обучение на всех числовых колонках таблицы (после кодирования)
    pub fn fit(&self, table: &Table) -> Result<ImputerState> {
        if table.n_rows() == 0 {
            return Err(EnergyError::EmptyDataset("cannot fit imputer".to_string()));
        }

        let numeric: Vec<(&str, &[Option<f64>])> = table
            .columns()
            .iter()
            .filter_map(|c| c.as_numeric().map(|v| (c.name.as_str(), v)))
            .collect();

        let columns = numeric.iter().map(|(name, _)| name.to_string()).collect();
        let means = numeric
            .iter()
            .map(|(_, values)| {
                let present: Vec<f64> = values.iter().flatten().copied().collect();
                if present.is_empty() {
                    0.0
                } else {
                    present.iter().sum::<f64>() / present.len() as f64
                }
            })
            .collect();
        let donors = (0..table.n_rows())
            .map(|row| numeric.iter().map(|(_, values)| values[row]).collect())
            .collect();

        Ok(ImputerState {
            n_neighbors: self.n_neighbors,
            columns,
            donors,
            means,
        })
    }
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self {
            n_neighbors: DEFAULT_NEIGHBORS,
        }
    }
}

impl ImputerState {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Заполняет пропуски во всех обученных колонках таблицы
    pub fn transform(&self, table: &mut Table) -> Result<usize> {
        let present: Vec<Option<&[Option<f64>]>> = self
            .columns
            .iter()
            .map(|name| table.column(name).and_then(|c| c.as_numeric()))
            .collect();

        let mut filled: Vec<Vec<Option<f64>>> = present
            .iter()
            .map(|c| c.map(|v| v.to_vec()).unwrap_or_else(|| vec![None; table.n_rows()]))
            .collect();

        let mut n_filled = 0;
        for row in 0..table.n_rows() {
            if filled.iter().all(|col| col[row].is_some()) {
                continue;
            }
            let mut values: Vec<Option<f64>> = filled.iter().map(|col| col[row]).collect();
            n_filled += self.impute_row(&mut values);
            for (col, v) in filled.iter_mut().zip(values) {
                col[row] = v;
            }
        }

        for (name, values) in self.columns.iter().zip(filled) {
            if let Some(column) = table.column(name) {
                if matches!(column.data, ColumnData::Numeric(_)) {
                    table.set_column(Column::numeric(name.clone(), values))?;
                }
            }
        }
        Ok(n_filled)
    }

    /// Заполняет строку, заданную по именам (колонки вне обучения игнорируются)
    pub fn impute_named(&self, names: &[String], row: &mut [Option<f64>]) -> Result<()> {
        if names.len() != row.len() {
            return Err(EnergyError::InvalidParameter(format!(
                "{} names for a row of {} values",
                names.len(),
                row.len()
            )));
        }
        let mut full: Vec<Option<f64>> = self
            .columns
            .iter()
            .map(|c| names.iter().position(|n| n == c).and_then(|i| row[i]))
            .collect();
        let missing_in_row = names
            .iter()
            .zip(row.iter())
            .any(|(n, v)| v.is_none() && self.columns.contains(n));
        if !missing_in_row {
            return Ok(());
        }

        self.impute_row(&mut full);
        for (i, name) in names.iter().enumerate() {
            if row[i].is_none() {
                if let Some(j) = self.columns.iter().position(|c| c == name) {
                    row[i] = full[j];
                }
            }
        }
        Ok(())
    }

    /// Заполняет строку в порядке `columns`; возвращает число заполненных ячеек
    fn impute_row(&self, row: &mut [Option<f64>]) -> usize {
        let distances: Vec<Option<f64>> = self
            .donors
            .iter()
            .map(|donor| nan_euclidean(row, donor))
            .collect();

        let mut n_filled = 0;
        for (col, value) in row.iter_mut().enumerate() {
            if value.is_some() {
                continue;
            }
            let mut neighbors: Vec<(f64, f64)> = self
                .donors
                .iter()
                .zip(&distances)
                .filter_map(|(donor, d)| Some(((*d)?, donor[col]?)))
                .collect();
            neighbors.sort_by(|a, b| a.0.total_cmp(&b.0));
            neighbors.truncate(self.n_neighbors);

            *value = Some(if neighbors.is_empty() {
                self.means[col]
            } else {
                neighbors.iter().map(|(_, v)| v).sum::<f64>() / neighbors.len() as f64
            });
            n_filled += 1;
        }
        n_filled
    }
}

/// Евклидово расстояние по общим координатам, масштабированное на их долю
pub fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let mut sum = 0.0;
    let mut common = 0usize;
    for (x, y) in a.iter().zip(b) {
        if let (Some(x), Some(y)) = (x, y) {
            sum += (x - y).powi(2);
            common += 1;
        }
    }
    if common == 0 {
        return None;
    }
    Some((a.len() as f64 / common as f64 * sum).sqrt())
}
