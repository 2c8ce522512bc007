//! Инференс для одного показания датчиков
//!
//! Повторяет обученные преобразования: правила признаков, кодирование,
//! выравнивание по FeatureSet, замороженный скейлер, лучшая модель.

#![allow(non_snake_case)]

use std::path::Path;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::artifact::TrainingArtifact;
use crate::dataset::{ColumnData, Table};
use crate::error::{EnergyError, Result};
use crate::models::{EnergyModel, Regressor};
use crate::preprocessing::{DataCleaner, FittedPreprocessor};
use crate::training::TrainingOutcome;
use crate::types::{ModelInfo, PredictionOutput, RawRecord};

/// Поведение при отсутствии обученного признака в показании
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlignmentPolicy {
    /// Подставить 0 и записать предупреждение
    #[default]
    ZeroFill,
    /// Вернуть SchemaMismatch
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InferenceAligner {
    policy: AlignmentPolicy,
}

impl InferenceAligner {
    pub fn new(policy: AlignmentPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> AlignmentPolicy {
        self.policy
    }

    /// Показание -> масштабированная строка 1 x n в порядке FeatureSet
    pub fn prepare(&self, preprocessor: &FittedPreprocessor, reading: &RawRecord) -> Result<Array2<f64>> {
        let mut table = Table::from_records(std::slice::from_ref(reading))?;
        DataCleaner::normalize_column_names(&mut table)?;
        preprocessor
            .engineer()
            .apply(&mut table, preprocessor.timestamp_column())?;
        preprocessor.encoder().transform(&mut table)?;

        let (names, values) = self.align(preprocessor, &table)?;
        let X = Array2::from_shape_fn((1, values.len()), |(_, j)| values[j]);
        preprocessor.scaler().transform(&names, &X)
    }

    /// Переиндексация в порядок FeatureSet
    fn align(&self, preprocessor: &FittedPreprocessor, table: &Table) -> Result<(Vec<String>, Vec<f64>)> {
        let features = preprocessor.features();
        let mut names = Vec::with_capacity(features.len());
        let mut row: Vec<Option<f64>> = Vec::with_capacity(features.len());
        let mut absent = Vec::new();

        for name in features.names() {
            let value = match table.column(name).map(|c| &c.data) {
                None => {
                    absent.push(name.clone());
                    Some(0.0)
                }
                Some(ColumnData::Numeric(values)) => values.first().copied().flatten(),
                Some(ColumnData::Text(values)) => {
                    tracing::warn!(
                        "Feature {} has non-numeric value {:?}, treating as missing",
                        name,
                        values.first().cloned().flatten()
                    );
                    None
                }
            };
            names.push(name.clone());
            row.push(value);
        }

        if !absent.is_empty() {
            if self.policy == AlignmentPolicy::Strict {
                return Err(EnergyError::SchemaMismatch {
                    expected: features.names().to_vec(),
                    got: table.names(),
                });
            }
            tracing::warn!("Reading is missing trained features {:?}, using 0", absent);
        }

        let extra: Vec<String> = table
            .names()
            .into_iter()
            .filter(|n| features.index_of(n).is_none() && n != preprocessor.target())
            .collect();
        if !extra.is_empty() {
            tracing::debug!("Ignoring reading fields {:?}", extra);
        }

        // присутствующие, но пустые значения заполняются обученным импьютером
        preprocessor.imputer().impute_named(&names, &mut row)?;
        let values = row.into_iter().map(|v| v.unwrap_or(0.0)).collect();

        Ok((names, values))
    }
}

/// Обученная модель с предобработкой; неизменяема после создания
pub struct EnergyPredictor {
    artifact: TrainingArtifact,
    model: Option<EnergyModel>,
    aligner: InferenceAligner,
}

impl EnergyPredictor {
    pub fn new(artifact: TrainingArtifact, model: Option<EnergyModel>) -> Self {
        Self {
            artifact,
            model,
            aligner: InferenceAligner::default(),
        }
    }

    pub fn with_policy(mut self, policy: AlignmentPolicy) -> Self {
        self.aligner = InferenceAligner::new(policy);
        self
    }

    pub fn load(dir: &Path) -> Result<Self> {
        let (artifact, model) = TrainingArtifact::load(dir)?;
        Ok(Self::new(artifact, model))
    }

    pub fn from_training(outcome: &TrainingOutcome) -> Self {
        Self::new(outcome.artifact.clone(), outcome.best_model())
    }

    pub fn artifact(&self) -> &TrainingArtifact {
        &self.artifact
    }

    pub fn model(&self) -> Option<&EnergyModel> {
        self.model.as_ref()
    }

    pub fn model_info(&self) -> ModelInfo {
        self.artifact.model_info()
    }

    pub fn prepare_reading(&self, reading: &RawRecord) -> Result<Array2<f64>> {
        self.aligner.prepare(&self.artifact.preprocessor, reading)
    }

    /// Прогноз энергопотребления; без лучшей модели возвращает 0
    pub fn predict(&self, reading: &RawRecord) -> Result<f64> {
        let Some(model) = self.model.as_ref() else {
            return Ok(0.0);
        };

        let X = self.prepare_reading(reading)?;
        let prediction = model.predict(&X)?.get(0).copied().unwrap_or(0.0);

        // f64::max отбрасывает NaN
        Ok(prediction.max(0.0))
    }

    pub fn predict_output(&self, reading: &RawRecord) -> Result<PredictionOutput> {
        Ok(PredictionOutput {
            predicted_energy: self.predict(reading)?,
            model: self.model.as_ref().map(|m| m.name().to_string()),
        })
    }
}
