//! HTTP server setup for the load balancer.
//!
//! # Responsibilities
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request id, tracing, timeout)
//! - Consult admission control before selecting a backend
//! - Forward requests to the backend chosen by the pool
//! - Run the health monitor alongside the listener

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    response::Response,
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
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::HealthCheckConfig;
use crate::health::HealthMonitor;
use crate::http::{request, response};
use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;
use crate::observability::metrics;
use crate::rate_limiter::Admission;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub pool: Arc<ServerPool>,
    pub admission: Arc<Admission>,
    pub client: Client<HttpConnector, Body>,
}

/// HTTP front of the load balancer.
pub struct HttpServer {
    router: Router,
    pool: Arc<ServerPool>,
    health_check: HealthCheckConfig,
}

impl HttpServer {
    pub fn new(
        pool: Arc<ServerPool>,
        admission: Admission,
        health_check: HealthCheckConfig,
        request_timeout: Duration,
    ) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        let state = AppState {
            pool: pool.clone(),
            admission: Arc::new(admission),
            client,
        };

        Self {
            router: Self::build_router(state, request_timeout),
            pool,
            health_check,
        }
    }

    #[allow(deprecated)]
    fn build_router(state: AppState, request_timeout: Duration) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id())
                    .layer(TimeoutLayer::new(request_timeout)),
            )
    }

    /// The router without a listener, for in-process use.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires. The health monitor runs
    /// for the lifetime of the server.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "Load balancer starting"
        );

        let monitor = HealthMonitor::new(self.pool.clone(), self.health_check.clone());
        let monitor_shutdown = shutdown.subscribe();
        tokio::spawn(monitor.run(monitor_shutdown));

        let mut rx = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await?;

        tracing::info!("Load balancer stopped");
        Ok(())
    }
}

/// Admit, select a live backend, forward.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let request_id = request::request_id(request.headers()).to_string();
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    if state.admission.is_enabled() {
        let identity = request::client_identity(request.headers(), peer);
        match state.admission.admit(&identity).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(request_id = %request_id, client = %identity, "Rate limited");
                metrics::record_request(method.as_str(), 429, "none", start);
                return response::plain(StatusCode::TOO_MANY_REQUESTS, response::TOO_MANY_REQUESTS);
            }
            Err(e) => {
                tracing::warn!(request_id = %request_id, error = %e, "Admission check failed");
                metrics::record_request(method.as_str(), 503, "none", start);
                return response::plain(
                    StatusCode::SERVICE_UNAVAILABLE,
                    response::LIMITER_UNAVAILABLE,
                );
            }
        }
    }

    let Some(backend) = state.pool.next() else {
        tracing::warn!(request_id = %request_id, path = %path, "No live backend");
        metrics::record_request(method.as_str(), 503, "none", start);
        return response::plain(StatusCode::SERVICE_UNAVAILABLE, response::SERVICE_UNAVAILABLE);
    };
    backend.record_request();

    let upstream = match request::to_upstream(request, &backend, peer) {
        Ok(req) => req,
        Err(e) => {
            tracing::error!(request_id = %request_id, backend = %backend.addr, error = %e, "Failed to build upstream request");
            metrics::record_request(method.as_str(), 502, &backend.addr, start);
            return response::plain(StatusCode::BAD_GATEWAY, response::BAD_GATEWAY);
        }
    };

    match state.client.request(upstream).await {
        Ok(upstream_response) => {
            let status = upstream_response.status();
            tracing::info!(
                request_id = %request_id,
                method = %method,
                path = %path,
                backend = %backend.addr,
                status = status.as_u16(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Request proxied"
            );
            metrics::record_request(method.as_str(), status.as_u16(), &backend.addr, start);
            response::from_upstream(upstream_response)
        }
        Err(e) => {
            tracing::error!(
                request_id = %request_id,
                method = %method,
                path = %path,
                backend = %backend.addr,
                error = %e,
                "Upstream error"
            );
            metrics::record_request(method.as_str(), 502, &backend.addr, start);
            response::plain(StatusCode::BAD_GATEWAY, response::BAD_GATEWAY)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    use crate::rate_limiter::RateLimiter;

    fn server(backends: &[String], admission: Admission) -> HttpServer {
        let pool = Arc::new(ServerPool::new(backends).unwrap());
        HttpServer::new(pool, admission, HealthCheckConfig::default(), Duration::from_secs(5))
    }

    fn get(path: &str) -> Request<Body> {
        Request::builder().uri(path).body(Body::empty()).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), 1024).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn all_dead_pool_is_503() {
        let server = server(&["127.0.0.1:1".to_string()], Admission::Disabled);
        server.pool.all_backends()[0].set_alive(false);

        let response = server.router().oneshot(get("/users")).await.unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert!(response.headers().contains_key("x-request-id"));
        assert_eq!(body_text(response).await, "Service Unavailable");
    }

    #[tokio::test]
    async fn unreachable_backend_is_502() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let server = server(&[addr], Admission::Disabled);
        let response = server.router().oneshot(get("/")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_text(response).await, "Bad Gateway");
    }

    #[tokio::test]
    async fn denied_identity_is_429_before_backend_selection() {
        let limiter = Arc::new(RateLimiter::new(0.001, 1.0));
        let server = server(&["127.0.0.1:1".to_string()], Admission::Local(limiter));
        server.pool.all_backends()[0].set_alive(false);

        let with_token = || {
            Request::builder()
                .uri("/")
                .header("token", "t-1")
                .body(Body::empty())
                .unwrap()
        };

        // first request passes admission and reaches the (dead) pool
        let first = server.router().oneshot(with_token()).await.unwrap();
        assert_eq!(first.status(), StatusCode::SERVICE_UNAVAILABLE);

        let second = server.router().oneshot(with_token()).await.unwrap();
        assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body_text(second).await, "Too Many Requests");
    }
}
