//! Backend pool management.
//!
//! # Responsibilities
//! - Own the fixed, ordered set of backends
//! - Apply the selection strategy and hand out connection guards
//! - Expose the set to the health monitor

use std::sync::Arc;

use thiserror::Error;

use crate::load_balancer::{
    backend::{Backend, ConnectionGuard},
    least_conn::LeastConnections,
    LoadBalancer,
};

/// No backend is currently healthy. Surfaced to the client as 503; the
/// process keeps running and probes keep re-admitting backends.
#[derive(Debug, Error)]
#[error("no healthy backend available")]
pub struct NoHealthyBackend;

/// The fixed set of backends, shared by the request path and every probe
/// task. Constructed once from configuration; no add/remove at runtime.
#[derive(Debug)]
pub struct BackendPool {
    backends: Vec<Arc<Backend>>,
    strategy: Box<dyn LoadBalancer>,
}

impl BackendPool {
    /// Build the pool from the configured base URLs, preserving their order.
    pub fn new(servers: &[String]) -> Self {
        let mut backends: Vec<Arc<Backend>> = Vec::with_capacity(servers.len());
        for raw in servers {
            match Backend::from_base_url(backends.len(), raw) {
                Some(backend) => backends.push(Arc::new(backend)),
                // Unreachable after config validation.
                None => tracing::warn!(url = %raw, "Skipping invalid backend URL"),
            }
        }

        Self {
            backends,
            strategy: Box::new(LeastConnections::new()),
        }
    }

    /// Select a backend for the next request.
    /// Returns a guard that decrements the connection count on drop.
    pub fn select(&self) -> Result<ConnectionGuard, NoHealthyBackend> {
        match self.strategy.next_server(&self.backends) {
            Some(backend) => Ok(backend.acquire()),
            None => {
                tracing::debug!(backend_count = self.backends.len(), "No healthy backends in pool");
                for b in &self.backends {
                    tracing::debug!(
                        backend = %b.authority,
                        healthy = b.is_healthy(),
                        active = b.active(),
                        "Backend status"
                    );
                }
                Err(NoHealthyBackend)
            }
        }
    }

    /// All backends in pool order (for health checking).
    pub fn all(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    /// Per-backend `(index, active_connections)` for the healthy subset.
    ///
    /// Each field is read under its own atomic; there is no consistency
    /// guarantee across backends.
    pub fn snapshot_loads(&self) -> Vec<(usize, usize)> {
        self.backends
            .iter()
            .filter(|b| b.is_healthy())
            .map(|b| (b.index, b.active()))
            .collect()
    }
}
