//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//!
//! Shutdown (shutdown.rs):
//!     broadcast fires → server stops accepting, probe loops exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
