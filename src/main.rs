/// Сервис прогноза энергопотребления: обучение или загрузка артефакта, затем HTTP API

use anyhow::Context;
use tracing_subscriber;

use energy_ml::{
    api::{self, AppState},
    EnergyConfig, EnergyPredictor, TrainingArtifact,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Инициализация логирования
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = EnergyConfig::load()?;
    tracing::info!("Configuration: {:?}", config);

    let predictor = match prepare_predictor(&config).await {
        Ok(predictor) => Some(predictor.with_policy(config.alignment_policy())),
        Err(e) => {
            tracing::error!("Model is not initialized: {:#}", e);
            None
        }
    };

    let app = api::router(AppState::new(predictor));

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Server listening on http://{}", addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

/// Загружает сохраненный артефакт или обучает модели заново
async fn prepare_predictor(config: &EnergyConfig) -> anyhow::Result<EnergyPredictor> {
    if !config.retrain && TrainingArtifact::exists(&config.artifact_dir) {
        tracing::info!("Loading artifact from {}", config.artifact_dir.display());
        return EnergyPredictor::load(&config.artifact_dir)
            .with_context(|| format!("Failed to load artifact from {}", config.artifact_dir.display()));
    }

    let options = config.training_options();
    let outcome = tokio::task::spawn_blocking(move || energy_ml::train_energy_models(&options))
        .await
        .context("Training task failed")?
        .context("Training pipeline failed")?;

    Ok(EnergyPredictor::from_training(&outcome))
}
