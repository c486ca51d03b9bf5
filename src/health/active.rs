//! Active health checking.
//!
//! # Responsibilities
//! - Periodically probe backends
//! - Update backend liveness based on results

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use tokio::sync::broadcast;
use tokio::time;

use crate::config::HealthCheckConfig;
use crate::load_balancer::{Backend, ServerPool};
use crate::observability::metrics;

pub struct HealthMonitor {
    pool: Arc<ServerPool>,
    config: HealthCheckConfig,
    client: Client<HttpConnector, Body>,
}

impl HealthMonitor {
    pub fn new(pool: Arc<ServerPool>, config: HealthCheckConfig) -> Self {
        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());

        Self {
            pool,
            config,
            client,
        }
    }

    pub async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        if !self.config.enabled {
            tracing::info!("Active health checks disabled");
            return;
        }

        tracing::info!(
            interval = self.config.interval_secs,
            path = %self.config.path,
            backends = self.pool.len(),
            "Health monitor starting"
        );

        let mut ticker = time::interval(Duration::from_secs(self.config.interval_secs));
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.check_all().await;
                }
                _ = shutdown.recv() => {
                    tracing::info!("Health monitor received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    /// Probe every backend once and record the outcome.
    pub async fn check_all(&self) {
        for backend in self.pool.all_backends() {
            let alive = self.probe(backend).await;
            let was_alive = backend.set_alive(alive);

            if was_alive != alive {
                tracing::info!(addr = %backend.addr, alive, "Backend liveness changed");
            }
            if !alive {
                tracing::warn!(addr = %backend.addr, "Server is DOWN");
            }

            metrics::record_backend_health(&backend.addr, alive);
        }
    }

    async fn probe(&self, backend: &Backend) -> bool {
        let addr = &backend.addr;
        let request = match Request::builder()
            .method("GET")
            .uri(backend.url_for(&self.config.path))
            .header("user-agent", "traffic-control-health-check")
            .body(Body::empty())
        {
            Ok(req) => req,
            Err(e) => {
                tracing::error!(addr = %addr, error = %e, "Failed to build health check request");
                return false;
            }
        };

        let timeout = Duration::from_secs(self.config.timeout_secs);
        match time::timeout(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => classify(response.status(), addr),
            Ok(Err(e)) => {
                tracing::warn!(addr = %addr, error = %e, "Health check failed: connection error");
                false
            }
            Err(_) => {
                tracing::warn!(addr = %addr, "Health check failed: timeout");
                false
            }
        }
    }
}

/// A probe passes only on a 2xx status.
fn classify(status: StatusCode, addr: &str) -> bool {
    let success = status.is_success();
    if !success {
        tracing::warn!(addr = %addr, status = %status, "Health check failed: non-success status");
    }
    success
}
