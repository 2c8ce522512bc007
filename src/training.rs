//! Полный цикл обучения: CSV -> предобработка -> split -> сравнение моделей -> артефакт

#![allow(non_snake_case)]

use std::path::PathBuf;
use std::time::Duration;

use linfa::Dataset;
use ndarray::s;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::artifact::TrainingArtifact;
use crate::dataset::{load_csv, Table};
use crate::error::{EnergyError, Result};
use crate::models::{ComparisonResult, EnergyModel, ModelCandidate, ModelComparator};
use crate::preprocessing::{PreprocessingOptions, Preprocessor};

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub data_path: PathBuf,
    pub artifact_dir: PathBuf,
    pub preprocessing: PreprocessingOptions,
    /// Доля отложенной выборки
    pub test_ratio: f64,
    pub seed: u64,
    /// Лимит на одного кандидата; None - без ограничения
    pub candidate_budget: Option<Duration>,
    pub roster: Vec<EnergyModel>,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("energy_data.csv"),
            artifact_dir: PathBuf::from("artifacts"),
            preprocessing: PreprocessingOptions::default(),
            test_ratio: 0.2,
            seed: 42,
            candidate_budget: Some(Duration::from_secs(300)),
            roster: EnergyModel::default_roster(42),
        }
    }
}

pub struct TrainingOutcome {
    pub artifact: TrainingArtifact,
    pub comparison: ComparisonResult,
}

impl TrainingOutcome {
    pub fn best_model(&self) -> Option<EnergyModel> {
        self.comparison.best_model().cloned()
    }
}

pub fn train_energy_models(options: &TrainingOptions) -> Result<TrainingOutcome> {
    tracing::info!("Starting ML training pipeline...");
    let table = load_csv(&options.data_path)?;
    train_from_table(table, options)
}

pub fn train_from_table(table: Table, options: &TrainingOptions) -> Result<TrainingOutcome> {
    if !(options.test_ratio > 0.0 && options.test_ratio < 1.0) {
        return Err(EnergyError::InvalidParameter(format!(
            "test_ratio must be in (0, 1), got {}",
            options.test_ratio
        )));
    }

    let prepared = Preprocessor::new(options.preprocessing.clone()).fit(table)?;
    if prepared.X.nrows() < 2 {
        return Err(EnergyError::EmptyDataset(format!(
            "need at least 2 rows for a train/test split, got {}",
            prepared.X.nrows()
        )));
    }

    let n_rows = prepared.X.nrows();
    let (n_train, n_test) = split_sizes(n_rows, options.test_ratio);
    let mut rng = StdRng::seed_from_u64(options.seed);
    let shuffled = Dataset::new(prepared.X, prepared.y).shuffle(&mut rng);
    let (X, y) = (shuffled.records, shuffled.targets);
    let (X_train, y_train) = (X.slice(s![..n_train, ..]).to_owned(), y.slice(s![..n_train]).to_owned());
    let (X_test, y_test) = (X.slice(s![n_train.., ..]).to_owned(), y.slice(s![n_train..]).to_owned());
    tracing::info!("Split: {} training rows, {} test rows", n_train, n_test);

    let comparator =
        ModelComparator::new(options.roster.clone()).with_budget(options.candidate_budget);
    let comparison = comparator.train_and_compare(&X_train, &y_train, &X_test, &y_test);
    log_comparison(&comparison);

    let artifact = TrainingArtifact::save(&options.artifact_dir, prepared.preprocessor, &comparison)?;

    Ok(TrainingOutcome {
        artifact,
        comparison,
    })
}

/// Размеры обучающей и отложенной выборок: ceil(n * ratio), но обе стороны не пустые
fn split_sizes(n_rows: usize, test_ratio: f64) -> (usize, usize) {
    let n_test = ((n_rows as f64 * test_ratio).ceil() as usize).clamp(1, n_rows - 1);
    (n_rows - n_test, n_test)
}

/// Таблица результатов, отсортированная по R2 по убыванию
fn log_comparison(comparison: &ComparisonResult) {
    let mut rows: Vec<(&str, f64, f64)> = comparison
        .candidates
        .iter()
        .filter_map(|c| match c {
            ModelCandidate::Trained { name, metrics, .. } => {
                Some((name.as_str(), metrics.r2, metrics.rmse))
            }
            ModelCandidate::Failed { .. } => None,
        })
        .collect();
    rows.sort_by(|a, b| b.1.total_cmp(&a.1));

    tracing::info!("MODEL COMPARISON RESULTS");
    for (name, r2, rmse) in rows {
        tracing::info!("{:<20} R2 {:>8.4}  RMSE {:>10.4}", name, r2, rmse);
    }
    match &comparison.best {
        Some(best) => tracing::info!("WINNER: {} (Highest R2 Score)", best.name),
        None => tracing::warn!("WINNER: none, every candidate failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Column;
    use crate::models::{GradientBoosting, RandomForest, RegressionTree};

    fn table(n: usize) -> Table {
        Table::new(vec![
            Column::numeric("Temperature", (0..n).map(|i| Some(15.0 + (i % 20) as f64)).collect()),
            Column::numeric("Occupancy", (0..n).map(|i| Some((i % 9) as f64)).collect()),
            Column::numeric(
                "EnergyConsumption",
                (0..n).map(|i| Some(40.0 + (i % 20) as f64 * 1.5 + (i % 9) as f64)).collect(),
            ),
        ])
        .unwrap()
    }

    fn options(dir: &std::path::Path) -> TrainingOptions {
        TrainingOptions {
            artifact_dir: dir.to_path_buf(),
            roster: vec![
                EnergyModel::RandomForest(RandomForest::new(10, 1)),
                EnergyModel::GradientBoosting(GradientBoosting::new(20, 0.1, 3, 1)),
                EnergyModel::DecisionTree(RegressionTree::default()),
            ],
            candidate_budget: None,
            ..TrainingOptions::default()
        }
    }

    #[test]
    fn trains_and_persists_best_model() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = train_from_table(table(50), &options(dir.path())).unwrap();

        let best = outcome.artifact.best_model.as_ref().unwrap();
        assert_eq!(Some(&best.name), outcome.comparison.best.as_ref().map(|b| &b.name));
        assert!(dir.path().join(&best.file).is_file());
        assert!(TrainingArtifact::exists(dir.path()));
        assert_eq!(outcome.artifact.candidates.len(), 3);
        assert!(outcome.best_model().is_some());
    }

    #[test]
    fn split_keeps_both_sides_non_empty() {
        assert_eq!(split_sizes(2, 0.2), (1, 1));
        assert_eq!(split_sizes(3, 0.2), (2, 1));
        assert_eq!(split_sizes(5, 0.2), (4, 1));
        assert_eq!(split_sizes(10, 0.2), (8, 2));
        assert_eq!(split_sizes(4, 0.9), (1, 3));
        assert_eq!(split_sizes(101, 0.2), (80, 21));
    }

    #[test]
    fn tiny_datasets_still_pick_a_winner() {
        for n in [3, 4, 5] {
            let dir = tempfile::tempdir().unwrap();
            let outcome = train_from_table(table(n), &options(dir.path())).unwrap();
            assert!(outcome.comparison.best.is_some(), "no winner for {} rows", n);
            assert!(outcome.artifact.best_model.is_some());
            assert!(outcome
                .comparison
                .candidates
                .iter()
                .all(|c| matches!(c, ModelCandidate::Trained { .. })));
        }
    }

    #[test]
    fn invalid_test_ratio_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let opts = TrainingOptions {
            test_ratio: 1.0,
            ..options(dir.path())
        };
        assert!(matches!(
            train_from_table(table(10), &opts),
            Err(EnergyError::InvalidParameter(_))
        ));
    }

    #[test]
    fn missing_csv_aborts_without_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let opts = TrainingOptions {
            data_path: dir.path().join("missing.csv"),
            ..options(dir.path())
        };
        assert!(matches!(
            train_energy_models(&opts),
            Err(EnergyError::DataLoad { .. })
        ));
        assert!(!TrainingArtifact::exists(dir.path()));
    }
}
