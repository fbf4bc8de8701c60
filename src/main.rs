//! Harold - subject tutor service
//!
//! A Rust backend that answers subject questions and walks students through
//! math problems one verified step at a time.

mod api;
mod classifier;
mod config;
mod history;
mod llm;
mod planner;
mod runtime;
mod state_machine;
mod subject;
mod system_prompt;
mod verifier;

use api::{create_router, AppState};
use config::TutorConfig;
use llm::ModelRegistry;
use runtime::{LlmClient, MemoryStorage, RegistryLlmClient, Storage, TutorRuntime};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use verifier::StepVerifier;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "harold_tutor=info,tower_http=debug".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_current_span(false)
                .with_span_list(false),
        )
        .init();

    // Configuration
    let config = TutorConfig::from_env()?;
    tracing::info!(
        port = config.port,
        history_cap = config.history_cap,
        max_clients = config.eviction.max_entries,
        "Configuration loaded"
    );

    // Initialize LLM registry
    let llm_registry = Arc::new(ModelRegistry::new(&config.llm));

    if llm_registry.has_models() {
        tracing::info!(
            models = ?llm_registry.available_models(),
            default = %llm_registry.default_model_id(),
            "LLM registry initialized"
        );
    } else {
        tracing::warn!("No LLM API keys configured. Set OPENAI_API_KEY, ANTHROPIC_API_KEY or LLM_GATEWAY.");
    }

    // Create application state
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new(config.eviction, config.history_cap));
    let llm: Arc<dyn LlmClient> = Arc::new(RegistryLlmClient::new(
        Arc::clone(&llm_registry),
        llm_registry.default_model_id().to_string(),
    ));
    let verifier = StepVerifier::new(config.verdict_format.build(), config.pass_confidence);
    tracing::info!(
        verdict_format = ?config.verdict_format,
        pass_confidence = verifier.pass_confidence(),
        "Step verifier ready"
    );
    let state = AppState::new(TutorRuntime::new(storage, llm, verifier));

    // Create router
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let compression = CompressionLayer::new()
        .gzip(true)
        .br(true)
        .deflate(true)
        .zstd(true);

    let app = create_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(compression);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Harold tutor listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
