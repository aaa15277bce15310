//! HTTP server setup and request forwarding.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (timeout, request ID, tracing)
//! - Select the least-loaded healthy backend per request
//! - Forward the request and stream the response back
//! - Spawn the health monitor

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderMap, HeaderValue, Request, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::BalancerConfig;
use crate::health::HealthMonitor;
use crate::http::request::{MakeRequestUuid, X_REQUEST_ID};
use crate::http::response::TrackedBody;
use crate::lifecycle::Shutdown;
use crate::load_balancer::pool::{BackendPool, NoHealthyBackend};
use crate::observability::metrics;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<BackendPool>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP server for the load balancer.
pub struct HttpServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<BackendPool>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: BalancerConfig) -> Self {
        let pool = Arc::new(BackendPool::new(&config.servers));

        let mut connector = HttpConnector::new();
        connector.set_connect_timeout(Some(Duration::from_secs(config.timeouts.connect_secs)));
        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.timeouts.idle_secs))
            .build(connector);

        let state = AppState {
            pool: pool.clone(),
            client,
        };

        let router = Self::build_router(&config, state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &BalancerConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(Duration::from_secs(
                        config.timeouts.request_secs,
                    ))),
            )
    }

    /// The shared backend pool (used by tests to observe accounting).
    pub fn pool(&self) -> Arc<BackendPool> {
        self.pool.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// Spawns the per-backend probe loops, then serves until the shutdown
    /// channel fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.all().len(),
            "HTTP server starting"
        );

        let monitor = HealthMonitor::new(self.pool.clone(), self.config.health_check.clone());
        monitor.spawn(&shutdown);

        let mut stop = shutdown.subscribe();
        let app = self
            .router
            .into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Main proxy handler.
/// Selects the least-loaded healthy backend and forwards the request to it.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(client_addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let start_time = Instant::now();
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    tracing::debug!(
        request_id = %request_id,
        method = %method,
        path = %path,
        "Proxying request"
    );

    // 1. Select a backend. The guard increments its active-connection count
    // and decrements it when dropped, on every exit path out of this
    // function and out of the response body it ends up riding.
    let guard = match state.pool.select() {
        Ok(guard) => guard,
        Err(NoHealthyBackend) => {
            tracing::warn!(request_id = %request_id, "No healthy backends");
            metrics::record_request(&method, 503, "none", start_time);
            return (StatusCode::SERVICE_UNAVAILABLE, "No healthy backends").into_response();
        }
    };
    let backend_label = guard.authority.to_string();

    // 2. Rewrite the URI to point at the chosen backend.
    let (mut parts, body) = request.into_parts();
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let uri = match Uri::builder()
        .scheme(guard.scheme.clone())
        .authority(guard.authority.clone())
        .path_and_query(path_and_query)
        .build()
    {
        Ok(uri) => uri,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream URI");
            metrics::record_request(&method, 502, &backend_label, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    // 3. Standard proxy-hop adjustment: record the caller in x-forwarded-for.
    append_forwarded_for(&mut parts.headers, client_addr);

    let mut builder = Request::builder().method(parts.method.clone()).uri(uri);
    if let Some(headers) = builder.headers_mut() {
        for (name, value) in parts.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
    }
    // The inbound body is streamed through untouched.
    let upstream = match builder.body(body) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, error = %e, "Failed to build upstream request");
            metrics::record_request(&method, 502, &backend_label, start_time);
            return (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response();
        }
    };

    // 4. Forward. On success the guard moves into the response body so the
    // count covers the streaming window too.
    match state.client.request(upstream).await {
        Ok(response) => {
            let status = response.status();
            tracing::debug!(
                request_id = %request_id,
                backend = %backend_label,
                status = %status,
                "Upstream responded"
            );
            metrics::record_request(&method, status.as_u16(), &backend_label, start_time);

            let (parts, body) = response.into_parts();
            let body = Body::new(TrackedBody::new(Body::new(body), guard));
            Response::from_parts(parts, body).into_response()
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                backend = %backend_label,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(&method, 502, &backend_label, start_time);
            (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
        }
    }
}

/// Append the client address to the `x-forwarded-for` chain.
fn append_forwarded_for(headers: &mut HeaderMap, client_addr: SocketAddr) {
    let client_ip = client_addr.ip().to_string();
    let value = match headers.get(X_FORWARDED_FOR).and_then(|v| v.to_str().ok()) {
        Some(prior) => format!("{prior}, {client_ip}"),
        None => client_ip,
    };
    if let Ok(value) = HeaderValue::from_str(&value) {
        headers.insert(X_FORWARDED_FOR, value);
    }
}
