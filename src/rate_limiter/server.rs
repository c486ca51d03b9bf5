//! Network bindings of the standalone rate limiter.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::net::LineHandler;
use crate::observability::metrics;
use crate::rate_limiter::{BucketStore, RateLimiter};

pub const ALLOW: &str = "1";
pub const DENY: &str = "0";

/// TCP binding: each line is a client identity, each reply `1` or `0`.
pub struct LimiterHandler<S: BucketStore> {
    limiter: Arc<RateLimiter<S>>,
}

impl<S: BucketStore> LimiterHandler<S> {
    pub fn new(limiter: Arc<RateLimiter<S>>) -> Self {
        Self { limiter }
    }
}

impl<S: BucketStore> LineHandler for LimiterHandler<S> {
    fn name(&self) -> &'static str {
        "rate-limiter"
    }

    fn handle_line(&self, line: &str) -> String {
        let reply = match decide(&self.limiter, line, "tcp") {
            Some(true) => ALLOW,
            Some(false) | None => DENY,
        };
        reply.to_string()
    }
}

/// Shared by both bindings so one identity sequence gets one answer
/// whatever the transport. The identity is used byte for byte; an empty
/// identity is refused without touching any bucket.
fn decide<S: BucketStore>(limiter: &RateLimiter<S>, identity: &str, transport: &'static str) -> Option<bool> {
    if identity.is_empty() {
        tracing::debug!(transport, "Empty identity refused");
        return None;
    }

    let allowed = limiter.check(identity);
    metrics::record_limiter_decision(transport, allowed);
    if !allowed {
        tracing::debug!(transport, client = %identity, "Rate limit exceeded");
    }
    Some(allowed)
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    ip: Option<String>,
}

/// HTTP binding: `GET /check?ip=<identity>` answers 200 or 429.
pub fn http_router<S: BucketStore>(limiter: Arc<RateLimiter<S>>) -> Router {
    Router::new()
        .route("/check", get(check_handler::<S>))
        .with_state(limiter)
        .layer(TraceLayer::new_for_http())
}

async fn check_handler<S: BucketStore>(
    State(limiter): State<Arc<RateLimiter<S>>>,
    Query(params): Query<CheckParams>,
) -> StatusCode {
    let identity = params.ip.unwrap_or_default();
    match decide(&limiter, &identity, "http") {
        Some(true) => StatusCode::OK,
        Some(false) => StatusCode::TOO_MANY_REQUESTS,
        None => StatusCode::BAD_REQUEST,
    }
}

/// Serve the HTTP binding until shutdown.
pub async fn serve_http<S: BucketStore>(
    listener: TcpListener,
    limiter: Arc<RateLimiter<S>>,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<(), std::io::Error> {
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!(address = %addr, "Rate limiter HTTP endpoint listening");

    axum::serve(listener, http_router(limiter))
        .with_graceful_shutdown(async move {
            let _ = shutdown.recv().await;
        })
        .await?;

    tracing::info!("Rate limiter HTTP endpoint stopped");
    Ok(())
}
