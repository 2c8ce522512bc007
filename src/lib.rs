//! Energy ML - прогноз энергопотребления зданий на Rust

pub mod api;
pub mod artifact;
pub mod config;
pub mod dataset;
pub mod error;
pub mod inference;
pub mod models;
pub mod preprocessing;
pub mod training;
pub mod types;

pub use types::*;
pub use models::*;
pub use preprocessing::*;

// Re-export для удобства
pub use artifact::TrainingArtifact;
pub use config::EnergyConfig;
pub use dataset::{load_csv, Column, ColumnData, Table};
pub use error::{EnergyError, Result};
pub use inference::{AlignmentPolicy, EnergyPredictor, InferenceAligner};
pub use training::{train_energy_models, train_from_table, TrainingOptions, TrainingOutcome};
