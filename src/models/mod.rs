//! ML модели

#![allow(non_snake_case)]

pub mod boosting;
pub mod comparator;
pub mod forest;
pub mod kernel;
pub mod metrics;
pub mod tree;

use std::time::{Duration, Instant};

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};

pub use boosting::GradientBoosting;
pub use comparator::{ComparisonResult, ModelCandidate, ModelComparator, SelectionResult};
pub use forest::RandomForest;
pub use kernel::KernelRidge;
pub use metrics::ModelMetrics;
pub use tree::{RegressionTree, TreeParams};

/// Общий интерфейс регрессоров
pub trait Regressor {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()>;
    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>>;
}

/// Ограничение времени обучения одного кандидата
#[derive(Debug, Clone, Copy)]
pub struct TrainingBudget {
    started: Instant,
    limit: Option<Duration>,
}

impl TrainingBudget {
    pub fn start(limit: Option<Duration>) -> Self {
        Self {
            started: Instant::now(),
            limit,
        }
    }

    pub fn unlimited() -> Self {
        Self::start(None)
    }

    pub fn check(&self, model: &str) -> Result<()> {
        match self.limit {
            Some(limit) if self.started.elapsed() >= limit => Err(EnergyError::BudgetExceeded {
                model: model.to_string(),
                budget_secs: limit.as_secs(),
            }),
            _ => Ok(()),
        }
    }
}

/// Фиксированный набор кандидатов; порядок вариантов - порядок сравнения
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "model")]
pub enum EnergyModel {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
    KernelRidge(KernelRidge),
    DecisionTree(RegressionTree),
}

impl EnergyModel {
    /// Кандидаты в фиксированном порядке
    pub fn default_roster(seed: u64) -> Vec<EnergyModel> {
        vec![
            EnergyModel::RandomForest(RandomForest::new(100, seed)),
            EnergyModel::GradientBoosting(GradientBoosting::new(100, 0.1, 3, seed)),
            EnergyModel::KernelRidge(KernelRidge::default()),
            EnergyModel::DecisionTree(RegressionTree::new(TreeParams {
                seed,
                ..TreeParams::default()
            })),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            EnergyModel::RandomForest(_) => "Random Forest",
            EnergyModel::GradientBoosting(_) => "Gradient Boosting",
            EnergyModel::KernelRidge(_) => "Kernel Ridge",
            EnergyModel::DecisionTree(_) => "Decision Tree",
        }
    }

    /// Имя файла модели: пробелы заменяются на подчеркивания
    pub fn file_name(name: &str) -> String {
        format!("model_{}.json", name.replace(' ', "_"))
    }
}

impl Regressor for EnergyModel {
    fn fit(&mut self, X: &Array2<f64>, y: &Array1<f64>, budget: &TrainingBudget) -> Result<()> {
        match self {
            EnergyModel::RandomForest(m) => m.fit(X, y, budget),
            EnergyModel::GradientBoosting(m) => m.fit(X, y, budget),
            EnergyModel::KernelRidge(m) => m.fit(X, y, budget),
            EnergyModel::DecisionTree(m) => Regressor::fit(m, X, y, budget),
        }
    }

    fn predict(&self, X: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            EnergyModel::RandomForest(m) => m.predict(X),
            EnergyModel::GradientBoosting(m) => m.predict(X),
            EnergyModel::KernelRidge(m) => m.predict(X),
            EnergyModel::DecisionTree(m) => m.predict(X),
        }
    }
}
