//! Invitation Sync Backend
//!
//! Keeps live invitation previews and host response dashboards in step with
//! their sources: debounced editor snapshots on one side, a realtime change feed
//! over SQLite-backed guest responses on the other.

mod api;
mod config;
mod db;
mod errors;
mod models;
mod preview;
mod realtime;

use std::sync::Arc;

use axum::{
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use db::Repository;
use preview::{ChannelSelector, PreviewRegistry};
use realtime::ChangeFeed;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    /// `None` when realtime notifications are disabled
    pub feed: Option<ChangeFeed>,
    pub previews: Arc<PreviewRegistry>,
}

impl AppState {
    pub fn new(repo: Repository, config: &Config) -> Self {
        let feed = config
            .realtime_enabled
            .then(|| ChangeFeed::new(config.realtime_capacity));
        let selector = ChannelSelector::new(
            config.preview_base_url.clone(),
            config.preview_inline_limit,
        );
        let previews = PreviewRegistry::new(
            selector,
            config.preview_debounce,
            config.preview_idle,
        );

        Self {
            repo: Arc::new(repo),
            feed,
            previews: Arc::new(previews),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Invitation Sync Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);
    tracing::info!(
        "Preview: base {}, debounce {:?}, inline limit {} chars",
        config.preview_base_url,
        config.preview_debounce,
        config.preview_inline_limit
    );

    if !config.realtime_enabled {
        tracing::warn!("Realtime notifications disabled (INVITE_REALTIME_ENABLED). Dashboards will only show the initial load!");
    }

    // Initialize database
    let pool = db::init_database(&config.db_path).await?;
    let state = AppState::new(Repository::new(pool), &config);

    // Build router
    let app = create_router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Responses
        .route(
            "/invitations/{id}/responses",
            get(api::list_responses).post(api::submit_response),
        )
        .route(
            "/responses/{id}",
            put(api::update_response).delete(api::delete_response),
        )
        // Dashboard
        .route("/invitations/{id}/dashboard", get(api::dashboard_stream))
        // Realtime ingestion
        .route("/realtime/events", post(api::ingest_event))
        // Preview
        .route("/invitations/{id}/draft", put(api::put_draft))
        .route(
            "/invitations/{id}/preview",
            get(api::get_preview).delete(api::close_preview),
        )
        .route("/invitations/{id}/preview/surface", get(api::surface_channel))
        .route(
            "/invitations/{id}/preview/surface/messages",
            post(api::surface_message),
        );

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}
