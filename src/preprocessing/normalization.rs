//! Нормализация данных и фиксированный порядок признаков

#![allow(non_snake_case)]

use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

/// Упорядоченный неизменяемый список признаков, фиксируется при обучении скейлера
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet(Vec<String>);

impl FeatureSet {
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.0.iter().position(|n| n == name)
    }

    /// Проверка имен и их порядка
    pub fn validate(&self, names: &[String]) -> Result<()> {
        if self.0.as_slice() != names {
            return Err(EnergyError::SchemaMismatch {
                expected: self.0.clone(),
                got: names.to_vec(),
            });
        }
        Ok(())
    }
}

/// Замороженные параметры масштабирования
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerState {
    features: FeatureSet,
    mean: Array1<f64>,
    std: Array1<f64>,
}

pub struct FeatureScaler;

impl FeatureScaler {
    pub fn fit(features: FeatureSet, X: &Array2<f64>) -> Result<ScalerState> {
        if X.nrows() == 0 {
            return Err(EnergyError::EmptyDataset("cannot fit scaler".to_string()));
        }
        if X.ncols() != features.len() {
            return Err(EnergyError::InvalidParameter(format!(
                "matrix has {} columns but feature set has {}",
                X.ncols(),
                features.len()
            )));
        }

        // Среднее и стандартное отклонение по каждому признаку
        let mean = X
            .mean_axis(Axis(0))
            .ok_or_else(|| EnergyError::EmptyDataset("cannot compute mean".to_string()))?;
        let mut std = X.std_axis(Axis(0), 0.0);

        // Избегаем деления на ноль
        for val in std.iter_mut() {
            if *val < 1e-10 {
                *val = 1.0;
            }
        }

        tracing::info!("Scaled {} numeric features", features.len());
        Ok(ScalerState {
            features,
            mean,
            std,
        })
    }

    pub fn fit_transform(features: FeatureSet, X: &Array2<f64>) -> Result<(ScalerState, Array2<f64>)> {
        let state = Self::fit(features, X)?;
        let scaled = state.transform_unchecked(X);
        Ok((state, scaled))
    }
}

impl ScalerState {
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn std(&self) -> &Array1<f64> {
        &self.std
    }

    /// (X - mean) / std; колонки обязаны совпадать с FeatureSet
    pub fn transform(&self, columns: &[String], X: &Array2<f64>) -> Result<Array2<f64>> {
        self.features.validate(columns)?;
        if X.ncols() != self.features.len() {
            return Err(EnergyError::SchemaMismatch {
                expected: self.features.names().to_vec(),
                got: columns.to_vec(),
            });
        }
        Ok(self.transform_unchecked(X))
    }

    fn transform_unchecked(&self, X: &Array2<f64>) -> Array2<f64> {
        let mut normalized = X.clone();
        for mut row in normalized.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = (*val - self.mean[i]) / self.std[i];
            }
        }
        normalized
    }

    /// Обратное преобразование: value * std + mean
    pub fn inverse_transform(&self, X: &Array2<f64>) -> Result<Array2<f64>> {
        if X.ncols() != self.features.len() {
            return Err(EnergyError::InvalidParameter(format!(
                "expected {} columns, got {}",
                self.features.len(),
                X.ncols()
            )));
        }
        let mut restored = X.clone();
        for mut row in restored.rows_mut() {
            for (i, val) in row.iter_mut().enumerate() {
                *val = *val * self.std[i] + self.mean[i];
            }
        }
        Ok(restored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn scaled_columns_have_zero_mean_unit_variance() {
        let X = array![[1.0, 10.0], [2.0, 20.0], [3.0, 30.0], [4.0, 40.0]];
        let (state, scaled) =
            FeatureScaler::fit_transform(FeatureSet::new(names(&["a", "b"])), &X).unwrap();

        let mean = scaled.mean_axis(Axis(0)).unwrap();
        let std = scaled.std_axis(Axis(0), 0.0);
        for j in 0..2 {
            assert!(mean[j].abs() < 1e-12);
            assert!((std[j] - 1.0).abs() < 1e-12);
        }
        assert_eq!(state.mean()[1], 25.0);
    }

    #[test]
    fn constant_column_keeps_unit_std() {
        let X = array![[5.0], [5.0], [5.0]];
        let (state, scaled) =
            FeatureScaler::fit_transform(FeatureSet::new(names(&["c"])), &X).unwrap();
        assert_eq!(state.std()[0], 1.0);
        assert!(scaled.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn inverse_restores_original_values() {
        let X = array![[21.5, 0.0, 3.0], [30.2, 1.0, -4.5], [25.0, 1.0, 100.0]];
        let cols = names(&["t", "h", "o"]);
        let state = FeatureScaler::fit(FeatureSet::new(cols.clone()), &X).unwrap();
        let probe = array![[27.3, 0.0, 12.0], [-5.0, 1.0, 0.5]];

        let scaled = state.transform(&cols, &probe).unwrap();
        let restored = state.inverse_transform(&scaled).unwrap();
        for (a, b) in restored.iter().zip(probe.iter()) {
            assert!((a - b).abs() < 1e-9);
        }
    }

    #[test]
    fn reordered_columns_are_rejected() {
        let X = array![[1.0, 2.0], [3.0, 4.0]];
        let state = FeatureScaler::fit(FeatureSet::new(names(&["a", "b"])), &X).unwrap();
        let err = state.transform(&names(&["b", "a"]), &X).unwrap_err();
        assert!(matches!(err, EnergyError::SchemaMismatch { .. }));
        let err = state.transform(&names(&["a"]), &X).unwrap_err();
        assert!(matches!(err, EnergyError::SchemaMismatch { .. }));
    }

    #[test]
    fn empty_matrix_cannot_be_fitted() {
        let X = Array2::<f64>::zeros((0, 1));
        assert!(FeatureScaler::fit(FeatureSet::new(names(&["a"])), &X).is_err());
    }
}
