//! Label encoding текстовых колонок

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnData, Table};
use crate::error::Result;

/// Код для значений, не встречавшихся при обучении
pub const UNKNOWN_CODE: f64 = -1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncodedColumn {
    pub name: String,
    /// Значение -> код в порядке первого появления
    pub codes: HashMap<String, usize>,
}

impl EncodedColumn {
    pub fn code(&self, value: &str) -> Option<f64> {
        self.codes.get(value).map(|&c| c as f64)
    }
}

/// Обученное состояние энкодера; после fit не меняется
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncoderState {
    columns: Vec<EncodedColumn>,
}

pub struct CategoricalEncoder;

impl CategoricalEncoder {
    /// Обучение на всех текстовых колонках, кроме целевой
    pub fn fit(table: &Table, target: &str) -> EncoderState {
        let columns = table
            .columns()
            .iter()
            .filter(|c| c.name != target)
            .filter_map(|c| match &c.data {
                ColumnData::Text(values) => {
                    let mut codes = HashMap::new();
                    for value in values.iter().flatten() {
                        let next = codes.len();
                        codes.entry(value.clone()).or_insert(next);
                    }
                    tracing::info!(" - Encoding text column: {} ({} categories)", c.name, codes.len());
                    Some(EncodedColumn {
                        name: c.name.clone(),
                        codes,
                    })
                }
                ColumnData::Numeric(_) => None,
            })
            .collect();

        EncoderState { columns }
    }
}

impl EncoderState {
    pub fn columns(&self) -> &[EncodedColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&EncodedColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Заменяет текстовые колонки кодами; пропуски остаются пропусками
    pub fn transform(&self, table: &mut Table) -> Result<()> {
        for encoded in &self.columns {
            let Some(column) = table.column(&encoded.name) else {
                continue;
            };
            let values = match &column.data {
                ColumnData::Text(values) => values,
                // числовое значение в колонке, обученной как текст
                ColumnData::Numeric(values) => {
                    let values: Vec<Option<f64>> = values
                        .iter()
                        .map(|v| v.map(|x| self.encode_value(encoded, &x.to_string())))
                        .collect();
                    table.set_column(Column::numeric(encoded.name.clone(), values))?;
                    continue;
                }
            };

            let codes: Vec<Option<f64>> = values
                .iter()
                .map(|v| v.as_deref().map(|s| self.encode_value(encoded, s)))
                .collect();
            table.set_column(Column::numeric(encoded.name.clone(), codes))?;
        }
        Ok(())
    }

    fn encode_value(&self, encoded: &EncodedColumn, value: &str) -> f64 {
        encoded.code(value).unwrap_or_else(|| {
            tracing::warn!(
                "Unseen category {:?} in column {}, using unknown code",
                value,
                encoded.name
            );
            UNKNOWN_CODE
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Table {
        Table::new(vec![
            Column::text(
                "Day",
                vec![
                    Some("Friday".into()),
                    Some("Monday".into()),
                    None,
                    Some("Friday".into()),
                    Some("Sunday".into()),
                ],
            ),
            Column::numeric("Temperature", vec![Some(1.0); 5]),
            Column::text("Label", vec![Some("a".into()); 5]),
        ])
        .unwrap()
    }

    #[test]
    fn codes_follow_first_appearance() {
        let state = CategoricalEncoder::fit(&sample(), "Label");
        let day = state.column("Day").unwrap();
        assert_eq!(day.code("Friday"), Some(0.0));
        assert_eq!(day.code("Monday"), Some(1.0));
        assert_eq!(day.code("Sunday"), Some(2.0));
        assert!(state.column("Temperature").is_none());
        assert!(state.column("Label").is_none());
    }

    #[test]
    fn transform_replaces_text_with_codes() {
        let mut table = sample();
        let state = CategoricalEncoder::fit(&table, "Label");
        state.transform(&mut table).unwrap();
        assert_eq!(
            table.column("Day").unwrap().as_numeric(),
            Some(&[Some(0.0), Some(1.0), None, Some(0.0), Some(2.0)][..])
        );
        // целевая колонка не кодируется
        assert!(!table.column("Label").unwrap().data.is_numeric());
    }

    #[test]
    fn unseen_category_maps_to_unknown_code() {
        let state = CategoricalEncoder::fit(&sample(), "Label");
        let mut reading =
            Table::new(vec![Column::text("Day", vec![Some("Holiday".into())])]).unwrap();
        state.transform(&mut reading).unwrap();
        assert_eq!(
            reading.column("Day").unwrap().as_numeric(),
            Some(&[Some(UNKNOWN_CODE)][..])
        );
    }
}
