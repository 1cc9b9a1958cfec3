//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router
//! - Wire up middleware (tracing, request ID)
//! - Serve with graceful shutdown
//! - Apply hot configuration updates
//! - Spawn the upstream health monitor

use std::sync::Arc;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::RelayConfig;
use crate::health::monitor::HealthMonitor;
use crate::health::state::UpstreamStatus;
use crate::http::relay::relay_handler;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub client: Client<HttpConnector, Body>,
    pub upstream: Arc<UpstreamStatus>,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ArcSwap<RelayConfig>>,
    upstream: Arc<UpstreamStatus>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: RelayConfig) -> Self {
        let config = Arc::new(ArcSwap::from_pointee(config));
        let upstream = Arc::new(UpstreamStatus::new());

        // Initialize HTTP client shared by all requests
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            config: config.clone(),
            client,
            upstream: upstream.clone(),
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            upstream,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/api/ai/apply", post(relay_handler))
            .fallback(not_found)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Configuration updates received on `config_updates` are applied by
    /// atomically swapping the shared snapshot. The server stops when the
    /// shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            "HTTP server starting"
        );

        // Spawn upstream health monitor
        if self.config.load().health_check.enabled {
            let monitor = HealthMonitor::new(self.config.clone(), self.upstream.clone());
            let monitor_shutdown = shutdown.resubscribe();
            tokio::spawn(async move {
                monitor.run(monitor_shutdown).await;
            });
        }

        // Apply config updates as they arrive
        let config = self.config.clone();
        tokio::spawn(async move {
            while let Some(new_config) = config_updates.recv().await {
                tracing::info!(
                    upstream = %new_config.upstream.chat_url,
                    "Applying updated configuration"
                );
                config.store(Arc::new(new_config));
            }
        });

        let app = self.router.into_make_service();

        // Serve with graceful shutdown
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback for unmatched routes.
async fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "route not found" })),
    )
        .into_response()
}
