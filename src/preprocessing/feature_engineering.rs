//! Feature engineering: временные и полиномиальные признаки
//!
//! Правила зависят только от имен колонок, без обученного состояния,
//! поэтому одинаково применяются при обучении и при инференсе.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::dataset::{Column, ColumnData, Table};
use crate::error::Result;
use crate::preprocessing::roles::RoleRule;

pub const HOUR: &str = "hour";
pub const DAY_OF_WEEK: &str = "day_of_week";
pub const MONTH: &str = "month";
pub const IS_WEEKEND: &str = "is_weekend";

const DATETIME_FORMATS: [&str; 7] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %H:%M:%S",
];

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d-%m-%Y", "%m/%d/%Y"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRules {
    pub timestamp: RoleRule,
    /// Колонки, для которых добавляется `<name>_squared`
    pub squared_columns: Vec<String>,
}

impl Default for FeatureRules {
    fn default() -> Self {
        Self {
            timestamp: RoleRule::new(None, &["time", "date"]),
            squared_columns: vec!["Temperature".to_string(), "Occupancy".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    rules: FeatureRules,
}

impl FeatureEngineer {
    pub fn new(rules: FeatureRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &FeatureRules {
        &self.rules
    }

    pub fn squared_name(column: &str) -> String {
        format!("{}_squared", column)
    }

    /// Применяет все правила к таблице; возвращает использованную колонку времени
    pub fn engineer(&self, table: &mut Table) -> Result<Option<String>> {
        let timestamp = self.resolve_timestamp(table);
        self.apply(table, timestamp.as_deref())?;
        Ok(timestamp)
    }

    pub fn resolve_timestamp(&self, table: &Table) -> Option<String> {
        self.rules
            .timestamp
            .resolve(table.columns().iter().map(|c| c.name.as_str()), &[])
    }

    /// Повтор правил с заранее известной колонкой времени (инференс)
    pub fn apply(&self, table: &mut Table, timestamp: Option<&str>) -> Result<()> {
        if let Some(name) = timestamp {
            self.add_time_features(table, name)?;
        }
        self.add_polynomial_features(table)?;
        Ok(())
    }

    /// Время -> hour, day_of_week, month, is_weekend; исходная колонка удаляется всегда
    fn add_time_features(&self, table: &mut Table, name: &str) -> Result<()> {
        let Some(column) = table.remove_column(name) else {
            return Ok(());
        };

        let parsed: Vec<Option<NaiveDateTime>> = match &column.data {
            ColumnData::Text(values) => values
                .iter()
                .map(|v| v.as_deref().and_then(parse_timestamp))
                .collect(),
            ColumnData::Numeric(values) => values
                .iter()
                .map(|v| {
                    v.and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0))
                        .map(|dt| dt.naive_utc())
                })
                .collect(),
        };

        let failed = parsed.iter().filter(|p| p.is_none()).count();
        if failed > 0 {
            tracing::warn!(
                "Could not parse {} of {} values in timestamp column {}",
                failed,
                parsed.len(),
                name
            );
        }

        let derive = |f: &dyn Fn(&NaiveDateTime) -> f64| -> Vec<Option<f64>> {
            parsed.iter().map(|p| p.as_ref().map(f)).collect()
        };

        let day_of_week = derive(&|t: &NaiveDateTime| t.weekday().num_days_from_monday() as f64);
        let is_weekend = day_of_week
            .iter()
            .map(|d| d.map(|d| if d >= 5.0 { 1.0 } else { 0.0 }))
            .collect();

        table.set_column(Column::numeric(HOUR, derive(&|t: &NaiveDateTime| t.hour() as f64)))?;
        table.set_column(Column::numeric(DAY_OF_WEEK, day_of_week))?;
        table.set_column(Column::numeric(MONTH, derive(&|t: &NaiveDateTime| t.month() as f64)))?;
        table.set_column(Column::numeric(IS_WEEKEND, is_weekend))?;

        Ok(())
    }

    fn add_polynomial_features(&self, table: &mut Table) -> Result<()> {
        for name in &self.rules.squared_columns {
            let squared = match table.column(name).and_then(|c| c.as_numeric()) {
                Some(values) => values.iter().map(|v| v.map(|x| x * x)).collect(),
                None => continue,
            };
            table.set_column(Column::numeric(Self::squared_name(name), squared))?;
        }
        Ok(())
    }
}

/// Разбор строки времени в одном из поддерживаемых форматов
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|f| NaiveDate::parse_from_str(raw, f).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(table: &Table, name: &str) -> Vec<Option<f64>> {
        table.column(name).unwrap().as_numeric().unwrap().to_vec()
    }

    #[test]
    fn squared_terms_are_derived() {
        let mut table = Table::new(vec![
            Column::numeric("Temperature", vec![Some(30.0), None]),
            Column::numeric("Occupancy", vec![Some(50.0), Some(2.0)]),
        ])
        .unwrap();
        FeatureEngineer::default().engineer(&mut table).unwrap();

        assert_eq!(numeric(&table, "Temperature_squared"), vec![Some(900.0), None]);
        assert_eq!(numeric(&table, "Occupancy_squared"), vec![Some(2500.0), Some(4.0)]);
    }

    #[test]
    fn timestamp_expands_into_calendar_features() {
        let mut table = Table::new(vec![
            Column::text(
                "Timestamp",
                vec![
                    Some("2024-03-16 14:00:00".into()), // суббота
                    Some("2024-03-18T09:30:00".into()), // понедельник
                ],
            ),
            Column::numeric("Temperature", vec![Some(20.0), Some(21.0)]),
        ])
        .unwrap();
        FeatureEngineer::default().engineer(&mut table).unwrap();

        assert!(!table.contains("Timestamp"));
        assert_eq!(numeric(&table, HOUR), vec![Some(14.0), Some(9.0)]);
        assert_eq!(numeric(&table, DAY_OF_WEEK), vec![Some(5.0), Some(0.0)]);
        assert_eq!(numeric(&table, MONTH), vec![Some(3.0), Some(3.0)]);
        assert_eq!(numeric(&table, IS_WEEKEND), vec![Some(1.0), Some(0.0)]);
        assert_eq!(
            table.names(),
            vec!["Temperature", HOUR, DAY_OF_WEEK, MONTH, IS_WEEKEND, "Temperature_squared"]
        );
    }

    #[test]
    fn unparseable_timestamp_still_drops_column() {
        let mut table = Table::new(vec![
            Column::text("Date", vec![Some("not a date".into()), Some("2024-01-05".into())]),
            Column::numeric("Humidity", vec![Some(40.0), Some(41.0)]),
        ])
        .unwrap();
        FeatureEngineer::default().engineer(&mut table).unwrap();

        assert!(!table.contains("Date"));
        assert_eq!(numeric(&table, HOUR), vec![None, Some(0.0)]);
        assert_eq!(numeric(&table, MONTH), vec![None, Some(1.0)]);
    }

    #[test]
    fn engineering_is_deterministic() {
        let build = || {
            Table::new(vec![
                Column::text("time", vec![Some("2024-07-01 08:00".into())]),
                Column::numeric("Temperature", vec![Some(25.0)]),
            ])
            .unwrap()
        };
        let engineer = FeatureEngineer::default();
        let mut a = build();
        let mut b = build();
        engineer.engineer(&mut a).unwrap();
        engineer.engineer(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn parses_supported_formats() {
        assert!(parse_timestamp("2024-01-01T10:00:00+05:30").is_some());
        assert!(parse_timestamp("01/31/2024 23:15").is_some());
        assert!(parse_timestamp("31-01-2024 23:15").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
