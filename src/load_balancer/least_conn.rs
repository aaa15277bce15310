//! Least connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Least connections selector.
/// Selects the healthy backend with the minimum number of active connections.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // In case of tie, the first one is selected (stability): min_by_key
        // keeps the earliest minimum, so equal loads resolve to the lowest
        // index. Each counter is one relaxed load; the result is a
        // best-effort minimum under concurrent traffic.
        backends
            .iter()
            .filter(|b| b.is_healthy())
            .min_by_key(|b| b.active())
            .cloned()
    }
}
