//! Сохранение и загрузка результатов обучения
//!
//! Каталог артефактов содержит по файлу на каждую обученную модель
//! (`model_<Name>.json`) и общий бандл `energy_preprocessor.json`
//! с FittedPreprocessor, именем лучшей модели и ее контрольной суммой.
//! Все файлы пишутся через временный файл и rename.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{EnergyError, Result};
use crate::models::{ComparisonResult, EnergyModel, ModelCandidate};
use crate::preprocessing::FittedPreprocessor;
use crate::types::{CandidateSummary, ModelInfo};

pub const ARTIFACT_VERSION: u32 = 1;
pub const BUNDLE_FILE: &str = "energy_preprocessor.json";

/// Ссылка на файл лучшей модели
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestModelRef {
    pub name: String,
    pub score: f64,
    pub file: String,
    pub sha256: String,
}

/// Контракт между обучением и инференсом
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingArtifact {
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub preprocessor: FittedPreprocessor,
    pub best_model: Option<BestModelRef>,
    pub candidates: Vec<CandidateSummary>,
}

impl TrainingArtifact {
    pub fn model_info(&self) -> ModelInfo {
        ModelInfo {
            best_model: self.best_model.as_ref().map(|b| b.name.clone()),
            best_score: self.best_model.as_ref().map(|b| b.score),
            target_column: self.preprocessor.target().to_string(),
            features: self.preprocessor.features().names().to_vec(),
            candidates: self.candidates.clone(),
            created_at: self.created_at,
        }
    }

    pub fn bundle_path(dir: &Path) -> PathBuf {
        dir.join(BUNDLE_FILE)
    }

    pub fn exists(dir: &Path) -> bool {
        Self::bundle_path(dir).is_file()
    }

    /// Сохраняет модели кандидатов и бандл; бандл пишется последним
    pub fn save(
        dir: &Path,
        preprocessor: FittedPreprocessor,
        comparison: &ComparisonResult,
    ) -> Result<TrainingArtifact> {
        fs::create_dir_all(dir)?;

        let mut best_model = None;
        for candidate in &comparison.candidates {
            let ModelCandidate::Trained { name, model, .. } = candidate else {
                continue;
            };
            let file = EnergyModel::file_name(name);
            let bytes = serde_json::to_vec(model)?;
            write_atomic(&dir.join(&file), &bytes)?;
            tracing::info!("Saved {} to {}", name, dir.join(&file).display());

            if let Some(best) = comparison.best.as_ref().filter(|b| &b.name == name) {
                best_model = Some(BestModelRef {
                    name: best.name.clone(),
                    score: best.score,
                    file,
                    sha256: compute_checksum(&bytes),
                });
            }
        }

        let artifact = TrainingArtifact {
            version: ARTIFACT_VERSION,
            created_at: Utc::now(),
            preprocessor,
            best_model,
            candidates: comparison.summaries(),
        };
        let bytes = serde_json::to_vec_pretty(&artifact)?;
        write_atomic(&Self::bundle_path(dir), &bytes)?;
        tracing::info!("Training artifact saved to {}", dir.display());

        Ok(artifact)
    }

    /// Загружает бандл и лучшую модель, проверяя контрольную сумму
    pub fn load(dir: &Path) -> Result<(TrainingArtifact, Option<EnergyModel>)> {
        let bundle = Self::bundle_path(dir);
        let bytes = fs::read(&bundle).map_err(|e| EnergyError::DataLoad {
            path: bundle.clone(),
            reason: e.to_string(),
        })?;
        let artifact: TrainingArtifact = serde_json::from_slice(&bytes)?;

        if artifact.version != ARTIFACT_VERSION {
            return Err(EnergyError::ArtifactMismatch(format!(
                "unsupported artifact version {} (expected {})",
                artifact.version, ARTIFACT_VERSION
            )));
        }

        let Some(best) = artifact.best_model.as_ref() else {
            tracing::warn!("Artifact has no best model, predictions will be 0");
            return Ok((artifact, None));
        };

        let path = dir.join(&best.file);
        let weights = fs::read(&path).map_err(|e| EnergyError::DataLoad {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let checksum = compute_checksum(&weights);
        if checksum != best.sha256 {
            return Err(EnergyError::ArtifactMismatch(format!(
                "checksum of {} is {}, bundle expects {}",
                best.file, checksum, best.sha256
            )));
        }

        let model: EnergyModel = serde_json::from_slice(&weights)?;
        if model.name() != best.name {
            return Err(EnergyError::ArtifactMismatch(format!(
                "{} contains {}, bundle expects {}",
                best.file,
                model.name(),
                best.name
            )));
        }

        tracing::info!("Loaded {} (R2 {:.4}) from {}", best.name, best.score, dir.display());
        Ok((artifact, Some(model)))
    }
}

/// Запись во временный файл, fsync, затем rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let temp_path = path.with_extension("tmp");
    let mut file = File::create(&temp_path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    fs::rename(&temp_path, path)?;
    Ok(())
}

pub fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checksum_is_hex_sha256() {
        let checksum = compute_checksum(b"model");
        assert_eq!(checksum.len(), 64);
        assert_eq!(checksum, compute_checksum(b"model"));
        assert_ne!(checksum, compute_checksum(b"other"));
    }

    #[test]
    fn atomic_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model_Decision_Tree.json");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(fs::read(&path).unwrap(), b"second");
        assert!(!path.with_extension("tmp").exists());
    }

    #[test]
    fn missing_bundle_is_a_load_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(!TrainingArtifact::exists(dir.path()));
        assert!(matches!(
            TrainingArtifact::load(dir.path()),
            Err(EnergyError::DataLoad { .. })
        ));
    }
}
