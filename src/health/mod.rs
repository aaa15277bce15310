//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Active health checks (active.rs):
//!     One timer task per backend
//!     → GET probe with bounded timeout
//!     → error / timeout / 5xx  ⇒ unhealthy
//!     → anything else          ⇒ healthy
//!     → Backend::set_healthy
//! ```
//!
//! # Design Decisions
//! - Probe loops are independent: backends never share a clock tick
//! - The health flag is written only by its backend's probe task; the
//!   request path never touches it
//! - A single failed probe evicts the backend until the next passing probe

pub mod active;

pub use active::HealthMonitor;
