//! Active upstream health checking.
//!
//! # Responsibilities
//! - Periodically probe the upstream health endpoint
//! - Update the shared health state and the upstream-health gauge

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::body::Body;
use axum::http::Request;
use hyper_util::client::legacy::{connect::HttpConnector, Client};
use hyper_util::rt::TokioExecutor;
use tokio::sync::broadcast;
use tokio::time;
use url::Url;

use crate::config::RelayConfig;
use crate::health::state::UpstreamStatus;
use crate::observability::metrics;

pub struct HealthMonitor {
    config: Arc<ArcSwap<RelayConfig>>,
    upstream: Arc<UpstreamStatus>,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(config: Arc<ArcSwap<RelayConfig>>, upstream: Arc<UpstreamStatus>) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            config,
            upstream,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let interval_secs = {
            let config = self.config.load();
            if !config.health_check.enabled {
                tracing::info!("Active health checks disabled");
                return;
            }

            tracing::info!(
                interval = config.health_check.interval_secs,
                path = %config.health_check.path,
                "Health monitor starting"
            );
            config.health_check.interval_secs
        };

        let mut ticker = time::interval(Duration::from_secs(interval_secs));

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.probe().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe the upstream once and fold the result into the shared state.
    async fn probe(&self) {
        let config = self.config.load_full();

        let uri = match probe_uri(&config.upstream.chat_url, &config.health_check.path) {
            Some(uri) => uri,
            None => {
                tracing::error!(
                    url = %config.upstream.chat_url,
                    "Cannot derive health probe URI from upstream URL"
                );
                return;
            }
        };

        let request = match Request::builder()
            .method("GET")
            .uri(uri)
            .header("user-agent", "ai-relay-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!("Failed to build health check request: {}", e);
                return;
            }
        };

        let timeout = Duration::from_secs(config.health_check.timeout_secs);
        let response_future = self.client.request(request);

        let healthy = match time::timeout(timeout, response_future).await {
            Ok(Ok(response)) => {
                let success = response.status().is_success();
                if !success {
                    tracing::warn!(
                        status = %response.status(),
                        "Health check failed: non-success status"
                    );
                }
                success
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!("Health check failed: timeout");
                false
            }
        };

        let transitioned = if healthy {
            self.upstream
                .mark_success(config.health_check.healthy_threshold as usize)
        } else {
            self.upstream
                .mark_failure(config.health_check.unhealthy_threshold as usize)
        };

        if transitioned {
            tracing::info!(healthy, "Upstream health state changed");
        }
        metrics::record_upstream_health(self.upstream.is_healthy());
    }
}

/// Replace the chat URL's path with the health probe path.
fn probe_uri(chat_url: &str, health_path: &str) -> Option<String> {
    let mut url = Url::parse(chat_url).ok()?;
    url.host_str()?;
    url.set_path(health_path);
    Some(url.to_string())
}
