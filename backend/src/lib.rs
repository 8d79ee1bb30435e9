//! SikaGreen backend
//!
//! Waste collection, recycling marketplace and chat for Lomé, Togo.
//! The binary in `main.rs` wires configuration and the database pool
//! into [`create_app`].

use std::{sync::Arc, time::Duration};

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;

pub use config::Config;

use services::{StatsCache, StorageService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::PgPool,
    pub config: Arc<Config>,
    pub stats_cache: Arc<StatsCache>,
    pub storage: StorageService,
}

impl AppState {
    pub fn new(db: sqlx::PgPool, config: Config) -> Self {
        let stats_cache = StatsCache::new(Duration::from_secs(config.stats.cache_ttl_secs));
        let storage = StorageService::new(&config.storage);

        Self {
            db,
            config: Arc::new(config),
            stats_cache: Arc::new(stats_cache),
            storage,
        }
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let storage_dir = ServeDir::new(&state.config.storage.root);
    let body_limit = state.config.max_body_bytes();

    Router::new()
        .route("/", get(root))
        .nest_service(services::storage::PUBLIC_PREFIX, storage_dir)
        .nest("/api", routes::api_routes(state.clone()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "SikaGreen API v1.0"
}
