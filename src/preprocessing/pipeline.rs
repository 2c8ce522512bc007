//! Полный конвейер предобработки: fit один раз -> неизменяемый FittedPreprocessor

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::dataset::{ColumnData, Table};
use crate::error::{EnergyError, Result};
use crate::preprocessing::cleaning::DataCleaner;
use crate::preprocessing::encoding::{CategoricalEncoder, EncoderState};
use crate::preprocessing::feature_engineering::{FeatureEngineer, FeatureRules};
use crate::preprocessing::imputation::{ImputerState, KnnImputer, DEFAULT_NEIGHBORS};
use crate::preprocessing::normalization::{FeatureScaler, FeatureSet, ScalerState};
use crate::preprocessing::roles::ColumnRoleResolver;

#[derive(Debug, Clone)]
pub struct PreprocessingOptions {
    pub roles: ColumnRoleResolver,
    pub squared_columns: Vec<String>,
    pub n_neighbors: usize,
}

impl Default for PreprocessingOptions {
    fn default() -> Self {
        Self {
            roles: ColumnRoleResolver::default(),
            squared_columns: FeatureRules::default().squared_columns,
            n_neighbors: DEFAULT_NEIGHBORS,
        }
    }
}

/// Все обученные преобразования; передается явно в каждый transform/predict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPreprocessor {
    rules: FeatureRules,
    timestamp_column: Option<String>,
    target: String,
    encoder: EncoderState,
    imputer: ImputerState,
    scaler: ScalerState,
}

/// Результат обучения предобработки: состояние + матрица признаков + целевая переменная
#[derive(Debug)]
pub struct PreparedData {
    pub preprocessor: FittedPreprocessor,
    pub X: Array2<f64>,
    pub y: Array1<f64>,
}

pub struct Preprocessor {
    options: PreprocessingOptions,
}

impl Preprocessor {
    pub fn new(options: PreprocessingOptions) -> Self {
        Self { options }
    }

    pub fn fit(&self, mut table: Table) -> Result<PreparedData> {
        if table.n_rows() == 0 {
            return Err(EnergyError::EmptyDataset("no rows to preprocess".to_string()));
        }

        DataCleaner::clean(&mut table)?;

        tracing::info!("Feature engineering...");
        let rules = FeatureRules {
            timestamp: self.options.roles.timestamp.clone(),
            squared_columns: self.options.squared_columns.clone(),
        };
        let engineer = FeatureEngineer::new(rules.clone());
        let timestamp_column = engineer.engineer(&mut table)?;

        let target = self
            .options
            .roles
            .target_column(table.columns().iter().map(|c| c.name.as_str()))
            .ok_or_else(|| {
                EnergyError::TargetColumnMissing(
                    self.options.roles.target.preferred.clone().unwrap_or_default(),
                )
            })?;
        match table.column(&target).map(|c| &c.data) {
            Some(ColumnData::Numeric(_)) => {}
            _ => return Err(EnergyError::NonNumericTarget(target)),
        }
        tracing::info!("Target column: {}", target);

        tracing::info!("Encoding categorical variables...");
        let encoder = CategoricalEncoder::fit(&table, &target);
        encoder.transform(&mut table)?;

        tracing::info!("Handling missing values...");
        let imputer = KnnImputer::new(self.options.n_neighbors)?.fit(&table)?;
        let filled = imputer.transform(&mut table)?;
        if filled > 0 {
            tracing::info!("Imputed {} missing values", filled);
        }

        tracing::info!("Scaling features...");
        let feature_names: Vec<String> = table
            .columns()
            .iter()
            .filter(|c| c.name != target)
            .map(|c| c.name.clone())
            .collect();
        if feature_names.is_empty() {
            return Err(EnergyError::EmptyDataset("no feature columns".to_string()));
        }

        let raw = feature_matrix(&table, &feature_names)?;
        let scaler = FeatureScaler::fit(FeatureSet::new(feature_names.clone()), &raw)?;
        let X = scaler.transform(&feature_names, &raw)?;

        let y: Array1<f64> = table
            .column(&target)
            .and_then(|c| c.as_numeric())
            .ok_or_else(|| EnergyError::NonNumericTarget(target.clone()))?
            .iter()
            .map(|v| v.unwrap_or(0.0))
            .collect();

        Ok(PreparedData {
            preprocessor: FittedPreprocessor {
                rules,
                timestamp_column,
                target,
                encoder,
                imputer,
                scaler,
            },
            X,
            y,
        })
    }
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self::new(PreprocessingOptions::default())
    }
}

impl FittedPreprocessor {
    pub fn engineer(&self) -> FeatureEngineer {
        FeatureEngineer::new(self.rules.clone())
    }

    pub fn timestamp_column(&self) -> Option<&str> {
        self.timestamp_column.as_deref()
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn encoder(&self) -> &EncoderState {
        &self.encoder
    }

    pub fn imputer(&self) -> &ImputerState {
        &self.imputer
    }

    pub fn scaler(&self) -> &ScalerState {
        &self.scaler
    }

    pub fn features(&self) -> &FeatureSet {
        self.scaler.features()
    }
}

/// Матрица из числовых колонок в заданном порядке
fn feature_matrix(table: &Table, names: &[String]) -> Result<Array2<f64>> {
    let mut X = Array2::zeros((table.n_rows(), names.len()));
    for (j, name) in names.iter().enumerate() {
        let values = table
            .column(name)
            .and_then(|c| c.as_numeric())
            .ok_or_else(|| {
                EnergyError::InvalidParameter(format!("feature {} is not numeric", name))
            })?;
        for (i, v) in values.iter().enumerate() {
            X[[i, j]] = v.unwrap_or(0.0);
        }
    }
    Ok(X)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;

    fn training_table() -> Table {
        let n = 12;
        Table::new(vec![
            Column::text(
                "Time Stamp",
                (0..n).map(|i| Some(format!("2024-01-{:02} {:02}:00:00", i + 1, i))).collect(),
            ),
            Column::numeric("Temperature", (0..n).map(|i| Some(20.0 + i as f64)).collect()),
            Column::numeric(
                "Occupancy",
                (0..n).map(|i| if i == 3 { None } else { Some(10.0 * i as f64) }).collect(),
            ),
            Column::text(
                "Day-Type",
                (0..n).map(|i| Some(if i % 2 == 0 { "Weekday" } else { "Holiday" }.to_string())).collect(),
            ),
            Column::numeric("EnergyConsumption", (0..n).map(|i| Some(50.0 + 2.0 * i as f64)).collect()),
        ])
        .unwrap()
    }

    #[test]
    fn fit_produces_canonical_feature_order() {
        let prepared = Preprocessor::default().fit(training_table()).unwrap();
        let pre = &prepared.preprocessor;

        assert_eq!(pre.target(), "EnergyConsumption");
        assert_eq!(pre.timestamp_column(), Some("Time_Stamp"));
        assert_eq!(
            pre.features().names(),
            &[
                "Temperature",
                "Occupancy",
                "Day_Type",
                "hour",
                "day_of_week",
                "month",
                "is_weekend",
                "Temperature_squared",
                "Occupancy_squared",
            ]
        );
        assert_eq!(prepared.X.ncols(), pre.features().len());
        assert_eq!(prepared.X.nrows(), 12);
        assert_eq!(prepared.y.len(), 12);
        assert!(prepared.X.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn target_is_auto_detected_and_never_a_feature() {
        let mut table = training_table();
        let mut target = table.remove_column("EnergyConsumption").unwrap();
        target.name = "Total_Energy_kWh".to_string();
        table.set_column(target).unwrap();

        let prepared = Preprocessor::default().fit(table).unwrap();
        assert_eq!(prepared.preprocessor.target(), "Total_Energy_kWh");
        assert!(prepared.preprocessor.features().index_of("Total_Energy_kWh").is_none());
    }

    #[test]
    fn missing_target_aborts() {
        let mut table = training_table();
        table.remove_column("EnergyConsumption");
        let err = Preprocessor::default().fit(table).unwrap_err();
        assert!(matches!(err, EnergyError::TargetColumnMissing(_)));
    }

    #[test]
    fn colliding_column_names_abort_fit() {
        let mut table = training_table();
        table
            .set_column(Column::numeric("Day Type", (0..12).map(|i| Some(i as f64)).collect()))
            .unwrap();
        let err = Preprocessor::default().fit(table).unwrap_err();
        assert!(matches!(err, EnergyError::InvalidParameter(_)));
    }

    #[test]
    fn text_target_is_rejected() {
        let table = Table::new(vec![
            Column::numeric("Temperature", vec![Some(1.0), Some(2.0)]),
            Column::text("EnergyConsumption", vec![Some("high".into()), Some("low".into())]),
        ])
        .unwrap();
        let err = Preprocessor::default().fit(table).unwrap_err();
        assert!(matches!(err, EnergyError::NonNumericTarget(_)));
    }

    #[test]
    fn squared_features_exist_before_scaling() {
        let table = Table::new(vec![
            Column::numeric("Temperature", vec![Some(30.0), Some(10.0)]),
            Column::numeric("Occupancy", vec![Some(50.0), Some(20.0)]),
            Column::numeric("EnergyConsumption", vec![Some(1.0), Some(2.0)]),
        ])
        .unwrap();
        let prepared = Preprocessor::default().fit(table).unwrap();
        let pre = &prepared.preprocessor;
        let t2 = pre.features().index_of("Temperature_squared").unwrap();
        let o2 = pre.features().index_of("Occupancy_squared").unwrap();

        // среднее скейлера считалось по 900/100 и 2500/400
        assert_eq!(pre.scaler().mean()[t2], 500.0);
        assert_eq!(pre.scaler().mean()[o2], 1450.0);
    }
}
