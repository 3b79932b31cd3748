//! Crypto Research Assistant Server
//!
//! Axum-based server exposing the research assistant over REST and
//! WebSocket: chat with the conclusion-first analyst report, server-side
//! session history for the sidebar, example prompts, and identity reset.

mod handlers;
mod state;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use agent_core::session::FileSessionStore;
use agent_runtime::provider_from_env;
use market_research::{HttpMarketClient, MarketDataClient, MockMarketClient};
use research_assistant::{AssistantConfig, ResearchAssistant};

use crate::handlers::{
    chat_handler, chat_stream_handler, delete_session, get_session, health_check, list_examples,
    list_sessions, reset_identity,
};
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Initialize LLM provider
    let provider = provider_from_env();

    match provider.health_check().await {
        Ok(true) => {
            tracing::info!("✓ Connected to LLM provider");
            if let Ok(models) = provider.list_models().await {
                for model in models {
                    tracing::info!("  Model: {}", model.id);
                }
            }
        }
        Ok(false) | Err(_) => {
            tracing::warn!("⚠ LLM provider not reachable - chat will fail");
            tracing::warn!("  Check LLM_BASE_URL / LLM_PROVIDER, or start your local model server");
        }
    }

    // Market data source: live APIs by default, deterministic mock on request
    let (market, market_source): (Arc<dyn MarketDataClient>, &'static str) =
        match std::env::var("MARKET_DATA").as_deref() {
            Ok("mock") => (Arc::new(MockMarketClient::new()), "mock"),
            _ => (Arc::new(HttpMarketClient::new()), "live"),
        };

    if market.health_check().await {
        tracing::info!("✓ Market data source '{}' reachable", market.name());
    } else {
        tracing::warn!("⚠ Market data source '{}' not reachable", market.name());
    }

    // Assemble the assistant
    let config = AssistantConfig::from_env();
    let data_dir = config.data_dir.clone();
    let model = config.model.clone();

    let assistant = Arc::new(ResearchAssistant::new(
        provider.clone(),
        market,
        config,
    )?);

    tracing::info!("Registered model: {}", model);
    tracing::info!("Anonymous identity: {}", assistant.user_id());

    // Server-side chat history
    let sessions = Arc::new(FileSessionStore::new(data_dir.join("sessions"))?);

    let state = AppState {
        assistant,
        sessions,
        provider,
        market_source,
        data_dir,
    };

    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = Router::new()
        // Health & info
        .route("/health", get(health_check))
        .route("/api/examples", get(list_examples))
        // Chat
        .route("/api/chat", post(chat_handler))
        .route("/api/chat/stream", get(chat_stream_handler))
        // History sidebar
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/{id}", get(get_session))
        .route("/api/sessions/{id}", delete(delete_session))
        // Identity
        .route("/api/identity/reset", post(reset_identity))
        // Static files (web frontend)
        .nest_service("/", tower_http::services::ServeDir::new("static"))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Loopback + fixed port by default, same as the original demo page
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:7861".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("🚀 crypto research assistant on http://{}", addr);
    tracing::info!("══════════════════════════════════════════════════");
    tracing::info!("");
    tracing::info!("Endpoints:");
    tracing::info!("  GET    /health              - Health check");
    tracing::info!("  GET    /api/examples        - Example prompts");
    tracing::info!("  POST   /api/chat            - Ask a question");
    tracing::info!("  GET    /api/chat/stream     - WebSocket streaming");
    tracing::info!("  GET    /api/sessions        - List chat history");
    tracing::info!("  GET    /api/sessions/:id    - Load a session");
    tracing::info!("  DELETE /api/sessions/:id    - Delete a session");
    tracing::info!("  POST   /api/identity/reset  - Switch anonymous user");
    tracing::info!("");

    axum::serve(listener, app).await?;

    Ok(())
}
