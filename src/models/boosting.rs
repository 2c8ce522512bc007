//! Градиентный бустинг деревьев (квадратичная функция потерь)

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{Regressor, TrainingBudget};

const NAME: &str = "Gradient Boosting";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    max_depth: usize,
    seed: u64,
    init: Option<f64>,
    stages: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(n_estimators: usize, learning_rate: f64, max_depth: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            learning_rate,
            max_depth,
            seed,
            init: None,
            stages: Vec::new(),
        }
    }

    pub fn n_stages(&self) -> usize {
        self.stages.len()
    }
}

impl Regressor for GradientBoosting {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()> {
        if self.n_estimators == 0 || self.max_depth == 0 {
            return Err(EnergyError::InvalidParameter(
                "n_estimators and max_depth must be positive".to_string(),
            ));
        }
        if !(self.learning_rate > 0.0) {
            return Err(EnergyError::InvalidParameter(format!(
                "learning_rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let init = y
            .mean()
            .ok_or_else(|| EnergyError::EmptyDataset("cannot fit gradient boosting".to_string()))?;

        // Начальное приближение - среднее значение
        let mut current = Array1::from_elem(y.len(), init);
        let mut stages = Vec::with_capacity(self.n_estimators);

        for stage in 0..self.n_estimators {
            budget.check(NAME)?;

            // Антиградиент квадратичной ошибки - остатки
            let residuals = y - &current;
            let mut tree = RegressionTree::new(TreeParams {
                max_depth: Some(self.max_depth),
                seed: self.seed.wrapping_add(stage as u64),
                ..TreeParams::default()
            });
            tree.fit_rows(X, &residuals, (0..X.nrows()).collect())?;

            let update = tree.predict(X)?;
            current.scaled_add(self.learning_rate, &update);
            stages.push(tree);
        }

        self.init = Some(init);
        self.stages = stages;
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        let init = self.init.ok_or(EnergyError::NotFitted("gradient boosting"))?;
        let mut predictions = Array1::from_elem(X.nrows(), init);
        for tree in &self.stages {
            predictions.scaled_add(self.learning_rate, &tree.predict(X)?);
        }
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::metrics::r2_score;

    #[test]
    fn boosting_reduces_error_on_nonlinear_target() {
        let X = Array2::from_shape_fn((80, 1), |(i, _)| i as f64 / 10.0);
        let y = X.column(0).mapv(|v| (v * 1.3).sin() * 10.0 + v);

        let mut weak = GradientBoosting::new(1, 0.1, 3, 0);
        weak.fit(&X, &y, &TrainingBudget::unlimited()).unwrap();
        let mut strong = GradientBoosting::new(100, 0.1, 3, 0);
        strong.fit(&X, &y, &TrainingBudget::unlimited()).unwrap();

        let weak_r2 = r2_score(&y, &weak.predict(&X).unwrap());
        let strong_r2 = r2_score(&y, &strong.predict(&X).unwrap());
        assert_eq!(strong.n_stages(), 100);
        assert!(strong_r2 > weak_r2);
        assert!(strong_r2 > 0.95);
    }

    #[test]
    fn non_positive_learning_rate_is_invalid() {
        let X = Array2::zeros((4, 1));
        let y = Array1::zeros(4);
        let mut model = GradientBoosting::new(10, 0.0, 3, 0);
        assert!(model.fit(&X, &y, &TrainingBudget::unlimited()).is_err());
    }

    #[test]
    fn unfitted_model_cannot_predict() {
        let model = GradientBoosting::new(10, 0.1, 3, 0);
        assert!(matches!(
            model.predict(&Array2::zeros((1, 1))),
            Err(EnergyError::NotFitted(_))
        ));
    }
}
