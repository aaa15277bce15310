//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Request arrives
//!     → pool.rs (the fixed set of backends)
//!     → least_conn.rs (pick the healthy backend with fewest connections)
//!     → backend.rs (acquire connection guard)
//!     → Return guard or NoHealthyBackend
//! ```
//!
//! # Design Decisions
//! - The strategy is stateless; backends track their own connections
//! - Unhealthy backends are excluded from selection
//! - Counters are read without a pool-wide lock: selection is a best-effort
//!   minimum under concurrent mutation, not a linearizable snapshot

use std::sync::Arc;

use crate::load_balancer::backend::Backend;

pub mod backend;
pub mod least_conn;
pub mod pool;

/// Strategy for picking the backend serving the next request.
pub trait LoadBalancer: Send + Sync + std::fmt::Debug {
    /// Pick a backend, or `None` when no backend is eligible.
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
