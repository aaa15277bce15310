//! Active health checking.
//!
//! # Responsibilities
//! - Run one independent probe loop per backend
//! - Classify probe outcomes and update the backend's health flag

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::lifecycle::Shutdown;
use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::BackendPool;
use crate::observability::metrics;

/// Spawns and owns nothing after startup: each backend gets its own probe
/// task holding a reference to just that backend.
pub struct HealthMonitor {
    pool: Arc<BackendPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<BackendPool>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            config,
            client,
        }
    }

    /// Spawn one probe loop per backend.
    ///
    /// Each loop runs on its own timer, so a slow or hung probe against one
    /// backend never delays probes for the others.
    pub fn spawn(self, shutdown: &Shutdown) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = ?self.config.interval,
            timeout = ?self.config.timeout,
            path = %self.config.path,
            backends = self.pool.all().len(),
            "Health monitor starting"
        );

        for backend in self.pool.all() {
            tokio::spawn(probe_loop(
                backend.clone(),
                self.client.clone(),
                self.config.clone(),
                shutdown.subscribe(),
            ));
        }
    }
}

/// Probe one backend forever, until shutdown.
async fn probe_loop(
    backend: Arc<Backend>,
    client: Client<HttpConnector, Body>,
    config: HealthCheckConfig,
    mut shutdown: broadcast::Receiver<()>,
) {
    let mut ticker = time::interval(config.interval);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let healthy = probe(&backend, &client, &config).await;
                let was_healthy = backend.set_healthy(healthy);

                if healthy != was_healthy {
                    if healthy {
                        tracing::info!(backend = %backend.authority, "Backend is healthy again");
                    } else {
                        tracing::warn!(backend = %backend.authority, "Backend marked unhealthy");
                    }
                }

                metrics::record_backend_health(backend.authority.as_str(), healthy);
                metrics::record_backend_load(backend.authority.as_str(), backend.active());
            }
            _ = shutdown.recv() => {
                tracing::debug!(backend = %backend.authority, "Probe loop exiting");
                break;
            }
        }
    }
}

/// Issue a single liveness probe.
async fn probe(
    backend: &Backend,
    client: &Client<HttpConnector, Body>,
    config: &HealthCheckConfig,
) -> bool {
    let uri = format!("{}://{}{}", backend.scheme, backend.authority, config.path);

    let request = match Request::builder()
        .method("GET")
        .uri(uri)
        .header("user-agent", "balancerd-health-check")
        .body(Body::empty())
    {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(backend = %backend.authority, error = %e, "Failed to build health check request");
            return false;
        }
    };

    match time::timeout(config.timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let healthy = healthy_status(response.status());
            if !healthy {
                tracing::warn!(
                    backend = %backend.authority,
                    status = %response.status(),
                    "Health check failed: server error status"
                );
            }
            healthy
        }
        Ok(Err(e)) => {
            tracing::warn!(backend = %backend.authority, error = %e, "Health check failed: connection error");
            false
        }
        Err(_) => {
            tracing::warn!(backend = %backend.authority, "Health check failed: timeout");
            false
        }
    }
}

/// Reachability, not correctness: the backend produced this status itself,
/// so anything below the 5xx class counts as alive.
fn healthy_status(status: StatusCode) -> bool {
    !status.is_server_error()
}
