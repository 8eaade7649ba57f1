//! API server implementation.
//!
//! Provides health, ready, metrics, and record endpoints.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;

use quarry_core::{ListingResolver, MemoryBackend, Result, SnapshotResolver, StorageBackend};

use crate::cache::SnapshotCache;
use crate::config::Config;
use crate::query::RecordQuery;

const READY_CHECK_KEY: &str = "__quarry/ready-check";

// ============================================================================
// Health and Ready Responses
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
}

/// Readiness check response.
#[derive(Debug, Serialize)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ReadyResponse {
    /// Service readiness status.
    pub ready: bool,
    /// Optional message about readiness state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

// ============================================================================
// Application State
// ============================================================================

/// Shared application state for all request handlers.
pub struct AppState {
    /// Server configuration.
    pub config: Config,
    storage: Arc<dyn StorageBackend>,
    pub(crate) query: RecordQuery,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("storage", &"<StorageBackend>")
            .field("query", &self.query)
            .finish()
    }
}

impl AppState {
    /// Creates application state with a listing resolver over `storage`.
    #[must_use]
    pub fn new(config: Config, storage: Arc<dyn StorageBackend>) -> Self {
        let resolver: Arc<dyn SnapshotResolver> =
            Arc::new(ListingResolver::new(Arc::clone(&storage)));
        Self::with_resolver(config, storage, resolver)
    }

    /// Creates application state with an explicit resolver.
    #[must_use]
    pub fn with_resolver(
        config: Config,
        storage: Arc<dyn StorageBackend>,
        resolver: Arc<dyn SnapshotResolver>,
    ) -> Self {
        let cache = Arc::new(SnapshotCache::new(Arc::clone(&storage)));
        let query = RecordQuery::new(
            resolver,
            cache,
            config.key_prefix(),
            config.miss_policy,
        );
        Self {
            config,
            storage,
            query,
        }
    }
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint handler.
///
/// Returns 200 OK if the service is alive. This is a shallow check
/// that doesn't verify dependencies.
async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Readiness check endpoint handler.
///
/// A `HEAD` on a missing key validates credentials and network path without
/// listing the bucket.
async fn ready(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.storage.head(READY_CHECK_KEY).await {
        Ok(_) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                message: None,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    ready: false,
                    message: Some(format!("storage check failed: {e}")),
                }),
            )
        }
    }
}

// ============================================================================
// Server
// ============================================================================

/// The query server.
pub struct Server {
    config: Config,
    storage: Arc<dyn StorageBackend>,
    resolver: Option<Arc<dyn SnapshotResolver>>,
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("storage", &"<StorageBackend>")
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Server {
    /// Creates a server over the given storage backend.
    #[must_use]
    pub fn with_storage_backend(config: Config, storage: Arc<dyn StorageBackend>) -> Self {
        Self {
            config,
            storage,
            resolver: None,
        }
    }

    /// Returns a builder.
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    fn create_router(&self) -> Router {
        let state = Arc::new(match &self.resolver {
            Some(resolver) => AppState::with_resolver(
                self.config.clone(),
                Arc::clone(&self.storage),
                Arc::clone(resolver),
            ),
            None => AppState::new(self.config.clone(), Arc::clone(&self.storage)),
        });

        let metrics_layer = middleware::from_fn(crate::metrics::metrics_middleware);

        Router::new()
            .route("/health", get(health))
            .route("/ready", get(ready))
            .route("/metrics", get(crate::metrics::serve_metrics))
            .merge(crate::routes::api_routes())
            .layer(TraceLayer::new_for_http())
            .layer(metrics_layer)
            .with_state(state)
    }

    /// Binds the configured port and serves until shutdown.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound or the server fails.
    pub async fn serve(&self) -> Result<()> {
        crate::metrics::init_metrics();

        let addr = SocketAddr::from(([0, 0, 0, 0], self.config.http_port));
        let router = self.create_router();

        tracing::info!(
            http_port = self.config.http_port,
            prefix = %self.config.key_prefix(),
            miss_policy = ?self.config.miss_policy,
            "Starting Quarry query server"
        );

        let listener =
            tokio::net::TcpListener::bind(addr)
                .await
                .map_err(|e| quarry_core::Error::Internal {
                    message: format!("failed to bind to {addr}: {e}"),
                })?;

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| quarry_core::Error::Internal {
                message: format!("server error: {e}"),
            })?;

        Ok(())
    }

    #[doc(hidden)]
    pub fn test_router(&self) -> Router {
        self.create_router()
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Builder for [`Server`].
pub struct ServerBuilder {
    config: Config,
    storage: Arc<dyn StorageBackend>,
    resolver: Option<Arc<dyn SnapshotResolver>>,
}

impl std::fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .field("storage", &"<StorageBackend>")
            .field("custom_resolver", &self.resolver.is_some())
            .finish()
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self {
            config: Config::default(),
            storage: Arc::new(MemoryBackend::new()),
            resolver: None,
        }
    }
}

impl ServerBuilder {
    /// Creates a builder with default configuration and in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    #[must_use]
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// Sets the HTTP port.
    #[must_use]
    pub fn http_port(mut self, port: u16) -> Self {
        self.config.http_port = port;
        self
    }

    /// Sets the snapshot key prefix.
    #[must_use]
    pub fn key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.settings.key_prefix = prefix.into();
        self
    }

    /// Sets the miss policy.
    #[must_use]
    pub fn miss_policy(mut self, policy: quarry_core::MissPolicy) -> Self {
        self.config.miss_policy = policy;
        self
    }

    /// Sets the storage backend.
    #[must_use]
    pub fn storage_backend(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = storage;
        self
    }

    /// Sets a custom snapshot resolver.
    #[must_use]
    pub fn resolver(mut self, resolver: Arc<dyn SnapshotResolver>) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Builds the server.
    #[must_use]
    pub fn build(self) -> Server {
        Server {
            config: self.config,
            storage: self.storage,
            resolver: self.resolver,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
