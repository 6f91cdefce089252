use anima::api::{self, app_state::AppState};
use anima::config::loader::ConfigLoader;
use anima::llm::create_generation_model;
use anima::models::message::MemoryStore;
use anima::observability::{ObservabilityState, create_observability_router};
use anima::services::memory::MemoryService;
use anima::services::normalizer::TranscriptNormalizer;
use anima::services::{create_chat_service, create_memory_service};
use anima::storage::memory_file::{MemoryStoreRepository, create_memory_repository};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::load()?;

    // 日志级别来自配置，RUST_LOG 环境变量优先
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    if config.logging.structured {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    info!("Starting Anima...");

    ConfigLoader::validate(&config)?;
    info!("Configuration loaded successfully");

    let repository: Arc<dyn MemoryStoreRepository> =
        Arc::from(create_memory_repository(&config.storage.memory_file));

    let initial_store = match repository.load().await {
        Ok(Some(store)) => {
            info!(messages = store.len(), "Persisted memory store loaded");
            store
        }
        Ok(None) => {
            info!("No persisted memory store found, starting empty");
            MemoryStore::new()
        }
        Err(e) => {
            warn!("Failed to load persisted memory store: {}, starting empty", e);
            MemoryStore::new()
        }
    };
    let initial_messages = initial_store.len();

    let normalizer = TranscriptNormalizer::new(&config.transcript, &config.persona)?;
    let memory_service: Arc<dyn MemoryService> = Arc::from(create_memory_service(
        normalizer,
        repository,
        initial_store,
    ));
    info!("Memory service initialized");

    let model = create_generation_model(&config.llm)?;
    info!(
        "Generation model initialized: {} (backend: {})",
        model.model_name(),
        config.llm.backend
    );

    let chat_service = Arc::from(create_chat_service(
        memory_service.clone(),
        Arc::from(model),
        &config.persona,
        &config.context,
    ));
    info!("Chat service initialized");

    let observability_state = Arc::new(ObservabilityState::new(
        env!("CARGO_PKG_VERSION").to_string(),
    ));
    observability_state
        .metrics
        .store_messages
        .store(initial_messages, Ordering::SeqCst);

    let app_state = AppState::new(
        memory_service,
        chat_service,
        observability_state.metrics.clone(),
    );
    info!("Application state created");

    let api_router = api::create_router(app_state);
    let router = create_observability_router(observability_state).merge(api_router);
    info!("API router created with observability endpoints");

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, router).await?;

    Ok(())
}
