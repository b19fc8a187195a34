//! HTTP boundary: read-only JSON endpoints over the entity graph.

mod error;
mod handlers;
mod types;

use std::time::Duration;

use axum::{http::HeaderValue, routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::{Config, GraphConfig, HttpServerConfig};
use crate::db::Db;
use crate::error::{FlavorError, Result};
use crate::graph::SearchLimits;

pub use error::ErrorBody;
pub use types::*;

/// Application state shared across handlers
#[derive(Debug, Clone)]
pub struct AppState {
    pub db: Db,
    pub graph: GraphConfig,
    /// Graph searches stop on their own once this has elapsed
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(db: Db, graph: GraphConfig) -> Self {
        Self {
            db,
            graph,
            request_timeout: Duration::from_secs(HttpServerConfig::default().request_timeout_secs),
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Limits for one search started now.
    pub(crate) fn search_limits(&self) -> SearchLimits {
        self.graph.limits().with_timeout(self.request_timeout)
    }
}

/// Build the router with tracing, CORS and a per-request timeout.
pub fn router(state: AppState, http: &HttpServerConfig) -> Router {
    let cors = if http.allowed_origins.is_empty() {
        CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = http
            .allowed_origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(origin) => Some(origin),
                Err(_) => {
                    log::warn!("Ignoring invalid allowed origin: {}", o);
                    None
                }
            })
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(origins))
            .allow_methods(Any)
            .allow_headers(Any)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .route("/entities/stats/overview", get(handlers::entity_statistics))
        .route("/entities/:id", get(handlers::get_entity))
        .route("/entities/:id/connections", get(handlers::entity_connections))
        .route("/entities/:id/path/:target_id", get(handlers::relationship_path))
        .route("/relationships/types", get(handlers::relationship_types))
        .route("/relationships/stats/overview", get(handlers::relationship_statistics))
        .route("/relationships/:id", get(handlers::get_relationship))
        .route(
            "/relationships/entity/:id/connections",
            get(handlers::direct_connections),
        )
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(Duration::from_secs(http.request_timeout_secs)))
                .layer(cors),
        )
        .with_state(state)
}

/// HTTP server bound to the configured host and port
pub struct HttpServer {
    state: AppState,
    http: HttpServerConfig,
}

impl HttpServer {
    pub fn new(db: Db, config: &Config) -> Self {
        Self {
            state: AppState::new(db, config.graph.clone())
                .with_request_timeout(Duration::from_secs(config.http_server.request_timeout_secs)),
            http: config.http_server.clone(),
        }
    }

    /// Serve until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = format!("{}:{}", self.http.host, self.http.port);
        let app = router(self.state, &self.http);

        let listener = TcpListener::bind(&addr).await.map_err(|e| {
            FlavorError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to bind to {}: {}", addr, e),
            ))
        })?;
        log::info!("Serving FlavorGraph on http://{}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        log::info!("Server shut down");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                log::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install signal handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests;
