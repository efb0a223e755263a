//! Metrics persistence service
//!
//! An axum router over an in-memory [`MetricStore`], served under `/api`.
//! [`build_router`] is shared by the binary and the integration tests so both run
//! the same middleware stack.

pub mod config;
pub mod error;
pub mod routes;
pub mod store;

use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{info, warn, Level};

pub use config::ServerConfig;
pub use error::{ApiError, ApiResult};
pub use store::MetricStore;

use crate::error::TherapyError;

/// Shared state available to handlers via `State<AppState>`
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<MetricStore>,
}

impl AppState {
    pub fn new(store: MetricStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }

    /// State for `config`, loading the snapshot file when one is configured
    pub fn from_config(config: &ServerConfig) -> Result<Self, TherapyError> {
        let store = match &config.snapshot_path {
            Some(path) => MetricStore::with_snapshot(path)?,
            None => MetricStore::new(),
        };
        Ok(Self::new(store))
    }
}

/// Build the application [`Router`] with tracing and CORS layers.
pub fn build_router(state: AppState, config: &ServerConfig) -> Router {
    Router::new()
        .nest("/api", routes::router())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(build_cors_layer(config))
        .with_state(state)
}

/// CORS layer from the configured origins; unparsable origins are skipped.
pub fn build_cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(e) => {
                warn!(origin = %o, error = %e, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(3600))
}

/// Bind and serve until Ctrl-C.
pub async fn serve(config: ServerConfig) -> Result<(), TherapyError> {
    let state = AppState::from_config(&config)?;
    let app = build_router(state, &config);

    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(addr = %config.bind_addr(), "metrics service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("metrics service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
