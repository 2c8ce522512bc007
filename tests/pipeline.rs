mod common;

use std::fs;

use energy_ml::artifact::BUNDLE_FILE;
use energy_ml::{
    train_energy_models, AlignmentPolicy, EnergyError, EnergyModel, EnergyPredictor,
    TrainingArtifact, Value,
};

#[test]
fn training_persists_bundle_and_candidate_models() {
    let dir = tempfile::tempdir().unwrap();
    let options = common::options(dir.path(), 150);
    let outcome = train_energy_models(&options).unwrap();

    assert!(options.artifact_dir.join(BUNDLE_FILE).is_file());
    for summary in &outcome.artifact.candidates {
        if summary.error.is_none() {
            assert!(options.artifact_dir.join(EnergyModel::file_name(&summary.name)).is_file());
        }
    }

    // победитель - максимум R2 среди успешных кандидатов
    let best = outcome.artifact.best_model.as_ref().unwrap();
    let max_r2 = outcome
        .artifact
        .candidates
        .iter()
        .filter_map(|c| c.r2)
        .fold(f64::NEG_INFINITY, f64::max);
    assert_eq!(best.score, max_r2);

    let features = outcome.artifact.preprocessor.features().names().to_vec();
    assert!(features.contains(&"Temperature_squared".to_string()));
    assert!(features.contains(&"HVAC_Usage".to_string()));
    assert!(!features.contains(&"Timestamp".to_string()));
    assert!(!features.contains(&"EnergyConsumption".to_string()));

    let leftovers: Vec<_> = fs::read_dir(&options.artifact_dir)
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().map_or(false, |x| x == "tmp"))
        .collect();
    assert!(leftovers.is_empty());
}

#[test]
fn reloaded_artifact_predicts_like_trained_one() {
    let dir = tempfile::tempdir().unwrap();
    let options = common::options(dir.path(), 120);
    let outcome = train_energy_models(&options).unwrap();

    let trained = EnergyPredictor::from_training(&outcome);
    let loaded = EnergyPredictor::load(&options.artifact_dir).unwrap();

    assert_eq!(
        trained.model().map(|m| m.name()),
        loaded.model().map(|m| m.name())
    );
    let a = trained.predict(&common::reading()).unwrap();
    let b = loaded.predict(&common::reading()).unwrap();
    assert!((a - b).abs() <= 1e-9 * a.abs().max(1.0));
    assert!(a > 0.0);
}

#[test]
fn tampered_model_file_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let options = common::options(dir.path(), 80);
    let outcome = train_energy_models(&options).unwrap();

    let best = outcome.artifact.best_model.as_ref().unwrap();
    let path = options.artifact_dir.join(&best.file);
    let mut bytes = fs::read(&path).unwrap();
    bytes.push(b' ');
    fs::write(&path, bytes).unwrap();

    assert!(matches!(
        TrainingArtifact::load(&options.artifact_dir),
        Err(EnergyError::ArtifactMismatch(_))
    ));
}

#[test]
fn sparse_readings_still_predict_non_negative_energy() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_energy_models(&common::options(dir.path(), 100)).unwrap();
    let predictor = EnergyPredictor::from_training(&outcome);

    let mut sparse = common::reading();
    sparse.remove("Occupancy");
    sparse.remove("Timestamp");
    assert!(predictor.predict(&sparse).unwrap() >= 0.0);

    let mut odd = common::reading();
    odd.insert("Holiday".into(), Value::from("Maybe"));
    odd.insert("Timestamp".into(), Value::from("not a date"));
    odd.insert("Temperature".into(), Value::Number(-1e6));
    odd.insert("Unexpected".into(), Value::Number(1.0));
    assert!(predictor.predict(&odd).unwrap() >= 0.0);

    assert!(predictor.predict(&Default::default()).unwrap() >= 0.0);
}

#[test]
fn strict_alignment_reports_schema_mismatch() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_energy_models(&common::options(dir.path(), 80)).unwrap();
    let predictor = EnergyPredictor::from_training(&outcome).with_policy(AlignmentPolicy::Strict);

    let mut partial = common::reading();
    partial.remove("Humidity");
    match predictor.predict(&partial) {
        Err(EnergyError::SchemaMismatch { expected, got }) => {
            assert!(expected.contains(&"Humidity".to_string()));
            assert!(!got.contains(&"Humidity".to_string()));
        }
        other => panic!("expected schema mismatch, got {:?}", other),
    }
}

#[test]
fn same_reading_prepares_identically() {
    let dir = tempfile::tempdir().unwrap();
    let outcome = train_energy_models(&common::options(dir.path(), 80)).unwrap();
    let predictor = EnergyPredictor::from_training(&outcome);

    let first = predictor.prepare_reading(&common::reading()).unwrap();
    let second = predictor.prepare_reading(&common::reading()).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.ncols(), predictor.artifact().preprocessor.features().len());
}

#[test]
fn missing_target_aborts_training() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("no_target.csv");
    fs::write(&path, "Timestamp,Temperature\n2024-01-01 00:00:00,20\n2024-01-01 01:00:00,21\n").unwrap();

    let options = energy_ml::TrainingOptions {
        data_path: path,
        artifact_dir: dir.path().join("artifacts"),
        ..energy_ml::TrainingOptions::default()
    };
    assert!(matches!(
        train_energy_models(&options),
        Err(EnergyError::TargetColumnMissing(_))
    ));
    assert!(!TrainingArtifact::exists(&options.artifact_dir));
}
