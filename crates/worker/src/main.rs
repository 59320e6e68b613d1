mod config;

use std::sync::Arc;

use anyhow::Context;
use longcut_backends::poll::PollConfig;
use longcut_backends::seed::HttpSeedImageProvider;
use longcut_backends::BackendRegistry;
use longcut_core::model_registry::ModelRegistry;
use longcut_core::request::LongVideoRequest;
use longcut_events::EventBus;
use longcut_pipeline::{DryRunRenderEngine, FfmpegRenderEngine, Orchestrator, RenderEngine};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{EngineKind, WorkerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "longcut_worker=debug,longcut_pipeline=debug,longcut_backends=info".into()
    });
    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json"));
    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    let request_path = std::env::args()
        .nth(1)
        .context("usage: longcut-worker <request.json>")?;
    let raw = tokio::fs::read_to_string(&request_path)
        .await
        .with_context(|| format!("Failed to read {request_path}"))?;
    let request: LongVideoRequest = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {request_path}"))?;

    let config = WorkerConfig::from_env()?;
    tracing::info!(
        output_dir = %config.output_dir.display(),
        engine = ?config.engine,
        batch_size = config.tuning.batch_size,
        "Worker configured",
    );

    let client = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .context("Failed to build HTTP client")?;

    let models = Arc::new(ModelRegistry::builtin());
    let seeds = Arc::new(HttpSeedImageProvider::new(
        client.clone(),
        config.seed_image_endpoint.clone(),
        config.api_token.clone(),
    ));
    let backends = BackendRegistry::from_models(
        &models,
        client,
        config.api_token.clone(),
        PollConfig::default(),
        seeds,
    )?;

    let engine: Arc<dyn RenderEngine> = match config.engine {
        EngineKind::DryRun => Arc::new(DryRunRenderEngine::new()),
        EngineKind::Ffmpeg => Arc::new(FfmpegRenderEngine),
    };

    let orchestrator = Orchestrator::new(
        models,
        Arc::new(backends),
        engine,
        config.output_dir.clone(),
        config.tuning.clone(),
        Arc::new(EventBus::default()),
    )?;

    let mut events = orchestrator.bus().subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let terminal = event.event.is_terminal();
                    tracing::info!(
                        run_id = %event.run_id,
                        event_type = event.event_type(),
                        payload = %serde_json::to_string(&event.event).unwrap_or_default(),
                        "Pipeline event",
                    );
                    if terminal {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling generation");
            on_signal.cancel();
        }
    });

    let result = orchestrator.run(request, cancel).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.success {
        anyhow::bail!(
            "Run {} failed: {}",
            result.run_id,
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
