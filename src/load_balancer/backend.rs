//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend server
//! - Track active connections (for least-loaded selection)
//! - Track health state (healthy/unhealthy)

use std::ops::Deref;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::http::uri::{Authority, Scheme};
use url::Url;

/// A single backend server.
///
/// Both mutable fields are per-backend atomics: updates to one backend never
/// serialize against updates to another. The health flag is written only by
/// the backend's own probe task; the connection counter only through
/// [`ConnectionGuard`].
#[derive(Debug)]
pub struct Backend {
    /// Position in the pool, stable for the process lifetime. The tie-break
    /// on equal load resolves to the lowest index.
    pub index: usize,
    /// Base URL from configuration.
    pub url: Url,
    /// Pre-calculated URI scheme for request rewriting.
    pub scheme: Scheme,
    /// Pre-calculated URI authority for request rewriting.
    pub authority: Authority,

    /// Number of requests currently being forwarded to this backend.
    active_connections: AtomicUsize,
    /// Last known liveness state.
    healthy: AtomicBool,
}

impl Backend {
    /// Create a backend from a base URL string.
    ///
    /// Returns `None` if the URL does not describe an http authority.
    /// Config validation rejects such URLs before a pool is built.
    pub fn from_base_url(index: usize, raw: &str) -> Option<Self> {
        let url = Url::parse(raw).ok()?;
        let scheme = Scheme::from_str(url.scheme()).ok()?;
        let host = url.host_str()?;
        let authority = match url.port() {
            Some(port) => Authority::from_str(&format!("{host}:{port}")).ok()?,
            None => Authority::from_str(host).ok()?,
        };

        Some(Self {
            index,
            url,
            scheme,
            authority,
            active_connections: AtomicUsize::new(0),
            // Admitted until the first probe says otherwise.
            healthy: AtomicBool::new(true),
        })
    }

    /// Get the current number of active connections.
    pub fn active(&self) -> usize {
        self.active_connections.load(Ordering::Relaxed)
    }

    /// Increment the active connection count, returning a guard that
    /// decrements it exactly once when dropped.
    pub fn acquire(self: &Arc<Self>) -> ConnectionGuard {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
        ConnectionGuard {
            backend: self.clone(),
        }
    }

    /// Return the last known liveness state.
    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::Relaxed)
    }

    /// Set the health flag, returning the previous value.
    ///
    /// Called only by this backend's probe task.
    pub fn set_healthy(&self, healthy: bool) -> bool {
        self.healthy.swap(healthy, Ordering::Relaxed)
    }
}

/// A RAII guard that manages the active connection count.
///
/// Every guard is created by an increment, and the decrement runs in `Drop`,
/// so the counter is released on every exit path (success, upstream error,
/// timeout, client disconnect) and can never underflow.
#[derive(Debug)]
pub struct ConnectionGuard {
    backend: Arc<Backend>,
}

impl Deref for ConnectionGuard {
    type Target = Backend;

    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.backend
            .active_connections
            .fetch_sub(1, Ordering::Relaxed);
    }
}
