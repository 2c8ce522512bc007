//! Случайный лес: bagging деревьев регрессии

#![allow(non_snake_case)]

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::models::tree::{RegressionTree, TreeParams};
use crate::models::{Regressor, TrainingBudget};

const NAME: &str = "Random Forest";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    seed: u64,
    tree_params: TreeParams,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(n_estimators: usize, seed: u64) -> Self {
        Self {
            n_estimators,
            seed,
            tree_params: TreeParams {
                seed,
                ..TreeParams::default()
            },
            trees: Vec::new(),
        }
    }

    pub fn with_tree_params(mut self, params: TreeParams) -> Self {
        self.tree_params = params;
        self
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }
}

impl Regressor for RandomForest {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()> {
        if self.n_estimators == 0 {
            return Err(EnergyError::InvalidParameter(
                "n_estimators must be positive".to_string(),
            ));
        }
        let n_samples = X.nrows();
        if n_samples == 0 {
            return Err(EnergyError::EmptyDataset("cannot fit random forest".to_string()));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut trees = Vec::with_capacity(self.n_estimators);

        for _ in 0..self.n_estimators {
            budget.check(NAME)?;

            // Bootstrap выборка с возвращением
            let indices: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();

            let mut tree = RegressionTree::new(TreeParams {
                seed: rng.gen(),
                ..self.tree_params.clone()
            });
            tree.fit_rows(X, y, indices)?;
            trees.push(tree);
        }

        self.trees = trees;
        Ok(())
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        if self.trees.is_empty() {
            return Err(EnergyError::NotFitted("random forest"));
        }

        let mut sum: Array1<f64> = Array1::zeros(X.nrows());
        for tree in &self.trees {
            sum += &tree.predict(X)?;
        }
        Ok(sum / self.trees.len() as f64)
    }
}
