//! Обучение и сравнение кандидатов, выбор лучшей модели по R2

#![allow(non_snake_case)]

use std::time::Duration;

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::error::{EnergyError, Result};
use crate::models::metrics::ModelMetrics;
use crate::models::{EnergyModel, Regressor, TrainingBudget};
use crate::types::CandidateSummary;

/// Результат обучения кандидата: модель с метриками или причина отказа
#[derive(Debug, Clone)]
pub enum ModelCandidate {
    Trained {
        name: String,
        model: EnergyModel,
        metrics: ModelMetrics,
    },
    Failed {
        name: String,
        reason: String,
    },
}

impl ModelCandidate {
    pub fn name(&self) -> &str {
        match self {
            ModelCandidate::Trained { name, .. } | ModelCandidate::Failed { name, .. } => name,
        }
    }

    pub fn metrics(&self) -> Option<ModelMetrics> {
        match self {
            ModelCandidate::Trained { metrics, .. } => Some(*metrics),
            ModelCandidate::Failed { .. } => None,
        }
    }

    pub fn model(&self) -> Option<&EnergyModel> {
        match self {
            ModelCandidate::Trained { model, .. } => Some(model),
            ModelCandidate::Failed { .. } => None,
        }
    }

    pub fn summary(&self) -> CandidateSummary {
        match self {
            ModelCandidate::Trained { name, metrics, .. } => CandidateSummary {
                name: name.clone(),
                r2: Some(metrics.r2),
                rmse: Some(metrics.rmse),
                error: None,
            },
            ModelCandidate::Failed { name, reason } => CandidateSummary {
                name: name.clone(),
                r2: None,
                rmse: None,
                error: Some(reason.clone()),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectionResult {
    pub name: String,
    pub score: f64,
}

#[derive(Debug, Clone)]
pub struct ComparisonResult {
    pub candidates: Vec<ModelCandidate>,
    pub best: Option<SelectionResult>,
}

impl ComparisonResult {
    pub fn best_candidate(&self) -> Option<&ModelCandidate> {
        let best = self.best.as_ref()?;
        self.candidates.iter().find(|c| c.name() == best.name)
    }

    pub fn best_model(&self) -> Option<&EnergyModel> {
        self.best_candidate().and_then(|c| c.model())
    }

    pub fn summaries(&self) -> Vec<CandidateSummary> {
        self.candidates.iter().map(|c| c.summary()).collect()
    }
}

/// Максимум R2; строгое сравнение - при равенстве побеждает более ранний кандидат
pub fn select_best(candidates: &[ModelCandidate]) -> Option<SelectionResult> {
    let mut best_score = f64::NEG_INFINITY;
    let mut best = None;

    for candidate in candidates {
        if let ModelCandidate::Trained { name, metrics, .. } = candidate {
            if metrics.r2 > best_score {
                best_score = metrics.r2;
                best = Some(SelectionResult {
                    name: name.clone(),
                    score: metrics.r2,
                });
            }
        }
    }

    best
}

pub struct ModelComparator {
    roster: Vec<EnergyModel>,
    budget: Option<Duration>,
}

impl ModelComparator {
    pub fn new(roster: Vec<EnergyModel>) -> Self {
        Self {
            roster,
            budget: None,
        }
    }

    pub fn with_budget(mut self, budget: Option<Duration>) -> Self {
        self.budget = budget;
        self
    }

    pub fn roster(&self) -> &[EnergyModel] {
        &self.roster
    }

    /// Каждый кандидат обучается в своем потоке; результаты собираются в порядке набора
    pub fn train_and_compare(
        &self,
        X_train: &Array2<f64>,
        y_train: &Array1<f64>,
        X_test: &Array2<f64>,
        y_test: &Array1<f64>,
    ) -> ComparisonResult {
        tracing::info!("Training and comparing {} models...", self.roster.len());
        let limit = self.budget;

        let candidates: Vec<ModelCandidate> = std::thread::scope(|scope| {
            let handles: Vec<_> = self
                .roster
                .iter()
                .cloned()
                .map(|model| {
                    let name = model.name();
                    let spawned = std::thread::Builder::new()
                        .name(format!("train-{}", name.replace(' ', "-").to_lowercase()))
                        .spawn_scoped(scope, move || {
                            evaluate_candidate(model, X_train, y_train, X_test, y_test, limit)
                        });
                    (name, spawned)
                })
                .collect();

            handles
                .into_iter()
                .map(|(name, spawned)| match spawned {
                    Ok(handle) => handle.join().unwrap_or_else(|_| ModelCandidate::Failed {
                        name: name.to_string(),
                        reason: "training thread panicked".to_string(),
                    }),
                    Err(e) => ModelCandidate::Failed {
                        name: name.to_string(),
                        reason: format!("failed to spawn training thread: {}", e),
                    },
                })
                .collect()
        });

        for candidate in &candidates {
            match candidate {
                ModelCandidate::Trained { name, metrics, .. } => {
                    tracing::info!("{} -> R2: {:.4} | RMSE: {:.4}", name, metrics.r2, metrics.rmse)
                }
                ModelCandidate::Failed { name, reason } => {
                    tracing::warn!("Error in {}: {}", name, reason)
                }
            }
        }

        let best = select_best(&candidates);
        match &best {
            Some(best) => tracing::info!("WINNER: {} (R2 {:.4})", best.name, best.score),
            None => tracing::warn!("No usable candidate model"),
        }

        ComparisonResult { candidates, best }
    }
}

impl Default for ModelComparator {
    fn default() -> Self {
        Self::new(EnergyModel::default_roster(42))
    }
}

fn evaluate_candidate(
    mut model: EnergyModel,
    X_train: &Array2<f64>,
    y_train: &Array1<f64>,
    X_test: &Array2<f64>,
    y_test: &Array1<f64>,
    limit: Option<Duration>,
) -> ModelCandidate {
    let name = model.name().to_string();
    tracing::info!("Training {}...", name);

    match fit_and_score(&mut model, X_train, y_train, X_test, y_test, limit) {
        Ok(metrics) => ModelCandidate::Trained {
            name,
            model,
            metrics,
        },
        Err(e) => ModelCandidate::Failed {
            name,
            reason: e.to_string(),
        },
    }
}

fn fit_and_score(
    model: &mut EnergyModel,
    X_train: &Array2<f64>,
    y_train: &Array1<f64>,
    X_test: &Array2<f64>,
    y_test: &Array1<f64>,
    limit: Option<Duration>,
) -> Result<ModelMetrics> {
    if X_test.nrows() == 0 {
        return Err(EnergyError::EmptyDataset("empty evaluation split".to_string()));
    }

    let budget = TrainingBudget::start(limit);
    model.fit(X_train, y_train, &budget)?;
    let predictions = model.predict(X_test)?;
    if predictions.iter().any(|p| !p.is_finite()) {
        return Err(EnergyError::InvalidParameter(
            "model produced non-finite predictions".to_string(),
        ));
    }
    Ok(ModelMetrics::evaluate(y_test, &predictions))
}
