//! Конфигурация сервиса

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::inference::AlignmentPolicy;
use crate::models::EnergyModel;
use crate::preprocessing::{ColumnRoleResolver, PreprocessingOptions};
use crate::training::TrainingOptions;

/// Настройки из переменных окружения с префиксом ENERGY_
#[derive(Debug, Clone, Deserialize)]
pub struct EnergyConfig {
    /// CSV с историческими данными
    #[serde(default = "default_data_path")]
    pub data_path: PathBuf,

    /// Каталог моделей и бандла предобработки
    #[serde(default = "default_artifact_dir")]
    pub artifact_dir: PathBuf,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_target_column")]
    pub target_column: String,

    #[serde(default = "default_test_ratio")]
    pub test_ratio: f64,

    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Лимит обучения одного кандидата в секундах, 0 - без лимита
    #[serde(default = "default_candidate_budget")]
    pub candidate_budget_secs: u64,

    /// Отсутствующий признак в показании - ошибка вместо 0
    #[serde(default)]
    pub strict_schema: bool,

    /// Переобучить даже при наличии артефакта
    #[serde(default)]
    pub retrain: bool,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("energy_data.csv")
}

fn default_artifact_dir() -> PathBuf {
    PathBuf::from("artifacts")
}

fn default_port() -> u16 {
    8000
}

fn default_target_column() -> String {
    "EnergyConsumption".to_string()
}

fn default_test_ratio() -> f64 {
    0.2
}

fn default_seed() -> u64 {
    42
}

fn default_candidate_budget() -> u64 {
    300
}

impl Default for EnergyConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
            artifact_dir: default_artifact_dir(),
            port: default_port(),
            target_column: default_target_column(),
            test_ratio: default_test_ratio(),
            seed: default_seed(),
            candidate_budget_secs: default_candidate_budget(),
            strict_schema: false,
            retrain: false,
        }
    }
}

impl EnergyConfig {
    /// Load configuration from environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENERGY").try_parsing(true))
            .build()
            .context("Failed to read ENERGY_* environment")?;

        config
            .try_deserialize()
            .context("Invalid ENERGY_* configuration")
    }

    pub fn candidate_budget(&self) -> Option<Duration> {
        (self.candidate_budget_secs > 0).then(|| Duration::from_secs(self.candidate_budget_secs))
    }

    pub fn alignment_policy(&self) -> AlignmentPolicy {
        if self.strict_schema {
            AlignmentPolicy::Strict
        } else {
            AlignmentPolicy::ZeroFill
        }
    }

    pub fn training_options(&self) -> TrainingOptions {
        TrainingOptions {
            data_path: self.data_path.clone(),
            artifact_dir: self.artifact_dir.clone(),
            preprocessing: PreprocessingOptions {
                roles: ColumnRoleResolver::with_target(&self.target_column),
                ..PreprocessingOptions::default()
            },
            test_ratio: self.test_ratio,
            seed: self.seed,
            candidate_budget: self.candidate_budget(),
            roster: EnergyModel::default_roster(self.seed),
        }
    }
}
