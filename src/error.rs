//! Ошибки библиотеки

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EnergyError>;

#[derive(Debug, Error)]
pub enum EnergyError {
    #[error("failed to load data from {path:?}: {reason}")]
    DataLoad { path: PathBuf, reason: String },

    #[error("empty dataset: {0}")]
    EmptyDataset(String),

    #[error("no target column found (looked for {0:?} and name heuristics)")]
    TargetColumnMissing(String),

    #[error("target column {0:?} is not numeric")]
    NonNumericTarget(String),

    /// Порядок или количество признаков не совпадает с FeatureSet
    #[error("schema mismatch: expected {expected:?}, got {got:?}")]
    SchemaMismatch { expected: Vec<String>, got: Vec<String> },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("{0} not fitted")]
    NotFitted(&'static str),

    #[error("{model} exceeded its training budget of {budget_secs}s")]
    BudgetExceeded { model: String, budget_secs: u64 },

    #[error("singular matrix")]
    SingularMatrix,

    #[error("artifact mismatch: {0}")]
    ArtifactMismatch(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
