use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use polyocr::api::{create_router, AppState};
use polyocr::config::Config;
use polyocr::engine::{InferenceEngine, UnavailableEngine};
use polyocr::ocr::RecognitionService;
use polyocr::pipeline::{PipelineBuilder, PipelineCache};
use polyocr::presets::{AppOptions, FileDocumentStore, SettingsManager, DEFAULT_SENTINEL};

#[derive(Parser)]
#[command(name = "polyocr")]
#[command(about = "Multi-language OCR server with cached inference pipelines")]
struct Args {
    /// Settings preset document to load
    #[arg(default_value = DEFAULT_SENTINEL)]
    preset: String,

    /// Default language code; "default" keeps the preset's value
    #[arg(default_value = DEFAULT_SENTINEL)]
    language_code: String,

    /// Listen port; 0 keeps the preset's value
    #[arg(default_value_t = 0)]
    server_port: u16,

    /// Inference backend name, e.g. Paddle_CPU or ONNX_CPU
    #[arg(long, default_value = DEFAULT_SENTINEL)]
    backend: String,

    /// Build every language pipeline before accepting requests
    #[arg(long)]
    init_all: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "polyocr=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();

    let overrides = AppOptions::from_raw(
        &args.preset,
        &args.language_code,
        &args.backend,
        args.server_port,
    )
    .context("invalid command line options")?;

    tracing::info!(
        "Loading settings preset '{}' from {}...",
        overrides.preset_name,
        config.storage.presets_dir.display()
    );
    let store = Arc::new(FileDocumentStore::new(&config.storage.presets_dir));
    let settings = Arc::new(
        SettingsManager::load(store, overrides).context("failed to load settings preset")?,
    );

    let engine: Arc<dyn InferenceEngine> = Arc::new(UnavailableEngine::default());
    tracing::info!("Inference engine: {}", engine.name());

    let builder = Arc::new(PipelineBuilder::new(
        engine,
        &config.storage.models_dir,
        &config.storage.labels_dir,
    ));
    let cache = PipelineCache::new(Arc::clone(&settings), builder);
    let service = RecognitionService::new(Arc::clone(&settings), cache);

    let preset = settings.current();
    let init_all = args.init_all || preset.initialize_all_language_presets;
    let outcomes = service.warm_up(init_all).await;
    let failed = outcomes.iter().filter(|(_, r)| r.is_err()).count();
    if failed > 0 {
        tracing::warn!(
            "{} of {} pipelines failed to build at startup; they will be retried on first use",
            failed,
            outcomes.len()
        );
    }

    let rpc_enabled = config.rpc.enabled;
    let rpc_path = config.rpc.path.clone();
    let addr = format!("{}:{}", config.server.host, preset.server_port);
    let app = create_router(AppState::new(config, service));

    tracing::info!("polyocr starting on http://{}", addr);
    tracing::info!("  Languages:    {}", settings.available_languages().join(", "));
    tracing::info!("  Health check: http://{}/health", addr);
    tracing::info!("  OpenAPI spec: http://{}/openapi.json", addr);
    if rpc_enabled {
        tracing::info!("  RPC endpoint: http://{}{}", addr, rpc_path);
    }

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
