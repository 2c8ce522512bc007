//! Очистка данных: имена колонок, дубликаты, выбросы

use std::collections::HashSet;

use crate::dataset::{ColumnData, Table};
use crate::error::{EnergyError, Result};

/// Множитель IQR для границ выбросов
pub const IQR_FACTOR: f64 = 1.5;

pub struct DataCleaner;

impl DataCleaner {
    /// Полная очистка таблицы на месте
    pub fn clean(table: &mut Table) -> Result<()> {
        tracing::info!("Cleaning data...");
        Self::normalize_column_names(table)?;
        let removed = Self::drop_duplicates(table);
        if removed > 0 {
            tracing::info!("Removed {} duplicate rows", removed);
        }
        Self::clip_outliers(table);
        Ok(())
    }

    pub fn normalize_name(name: &str) -> String {
        name.trim().replace([' ', '-'], "_")
    }

    /// Имена, совпавшие после нормализации, - ошибка, таблица не меняется
    pub fn normalize_column_names(table: &mut Table) -> Result<()> {
        let normalized: Vec<String> = table
            .columns()
            .iter()
            .map(|c| Self::normalize_name(&c.name))
            .collect();

        let duplicate = {
            let mut seen = HashSet::with_capacity(normalized.len());
            normalized.iter().find(|n| !seen.insert(n.as_str())).cloned()
        };
        if let Some(dup) = duplicate {
            let sources: Vec<&str> = table
                .columns()
                .iter()
                .zip(&normalized)
                .filter(|(_, n)| **n == dup)
                .map(|(c, _)| c.name.as_str())
                .collect();
            return Err(EnergyError::InvalidParameter(format!(
                "columns {:?} collide as {} after normalization",
                sources, dup
            )));
        }

        for (column, name) in table.columns_mut().iter_mut().zip(normalized) {
            column.name = name;
        }
        Ok(())
    }

    /// Удаляет точные дубликаты строк, оставляя первое вхождение
    pub fn drop_duplicates(table: &mut Table) -> usize {
        let n_rows = table.n_rows();
        let mut seen: HashSet<Vec<CellKey>> = HashSet::with_capacity(n_rows);
        let keep: Vec<bool> = (0..n_rows)
            .map(|row| {
                let key = table
                    .columns()
                    .iter()
                    .map(|c| CellKey::of(&c.data, row))
                    .collect();
                seen.insert(key)
            })
            .collect();

        let removed = keep.iter().filter(|&&k| !k).count();
        if removed > 0 {
            table.retain_rows(&keep);
        }
        removed
    }

    /// Ограничивает каждую числовую колонку [Q1 - 1.5 IQR, Q3 + 1.5 IQR]
    pub fn clip_outliers(table: &mut Table) {
        for column in table.columns_mut() {
            if let ColumnData::Numeric(values) = &mut column.data {
                let Some((lower, upper)) = iqr_bounds(values) else {
                    continue;
                };
                for v in values.iter_mut().flatten() {
                    *v = v.clamp(lower, upper);
                }
            }
        }
    }
}

/// Ключ ячейки для сравнения строк
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey {
    Missing,
    Number(u64),
    Text(String),
}

impl CellKey {
    fn of(data: &ColumnData, row: usize) -> Self {
        match data {
            ColumnData::Numeric(v) => match v[row] {
                // -0.0 и 0.0 считаются одинаковыми
                Some(x) => CellKey::Number((x + 0.0).to_bits()),
                None => CellKey::Missing,
            },
            ColumnData::Text(v) => match &v[row] {
                Some(s) => CellKey::Text(s.clone()),
                None => CellKey::Missing,
            },
        }
    }
}

/// Квантиль с линейной интерполяцией по отсортированным значениям
pub fn quantile(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64))
}

/// Границы выбросов по собственным квартилям колонки
pub fn iqr_bounds(values: &[Option<f64>]) -> Option<(f64, f64)> {
    let mut sorted: Vec<f64> = values.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let q1 = quantile(&sorted, 0.25)?;
    let q3 = quantile(&sorted, 0.75)?;
    let iqr = q3 - q1;
    Some((q1 - IQR_FACTOR * iqr, q3 + IQR_FACTOR * iqr))
}
