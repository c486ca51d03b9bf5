//! Startup orchestration.
//!
//! # Responsibilities
//! - Build each service from a validated configuration
//! - Bind listeners and run until the shutdown signal
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners bind last, once the service state exists

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::broker::{BrokerClient, BrokerHandler, InMemoryQueue};
use crate::config::{AppConfig, Service};
use crate::http::HttpServer;
use crate::lifecycle::Shutdown;
use crate::load_balancer::ServerPool;
use crate::net::serve_lines;
use crate::rate_limiter::server::{serve_http, LimiterHandler};
use crate::rate_limiter::{Admission, RateLimiter};
use crate::worker::{NotifyError, SmtpNotifier, Worker};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid backend pool: {0}")]
    Pool(String),

    #[error("mail transport: {0}")]
    Mail(#[from] NotifyError),

    #[error("server error: {0}")]
    Io(#[from] std::io::Error),

    #[error("task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

async fn bind(addr: String) -> Result<TcpListener, StartupError> {
    TcpListener::bind(&addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })
}

/// Run `service` until `shutdown` fires.
pub async fn run(service: Service, config: &AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    match service {
        Service::LoadBalancer => run_load_balancer(config, shutdown).await,
        Service::RateLimiter => run_rate_limiter(config, shutdown).await,
        Service::Broker => run_broker(config, shutdown).await,
        Service::Worker => run_worker(config, shutdown).await,
    }
}

pub async fn run_load_balancer(config: &AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let lb = &config.load_balancer;
    let pool = Arc::new(ServerPool::new(&lb.backends).map_err(StartupError::Pool)?);
    let admission = Admission::from_config(lb.limiter, &config.rate_limiter);

    tracing::info!(
        backends = ?lb.backends,
        limiter = ?lb.limiter,
        health_path = %config.health_check.path,
        health_interval_secs = config.health_check.interval_secs,
        "Load balancer configured"
    );

    let server = HttpServer::new(
        pool,
        admission,
        config.health_check.clone(),
        Duration::from_secs(lb.request_timeout_secs),
    );
    let listener = bind(lb.bind_address()).await?;
    server.run(listener, shutdown).await?;
    Ok(())
}

/// TCP binding always; HTTP binding when a port is configured. Both share
/// one set of buckets.
pub async fn run_rate_limiter(config: &AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let rl = &config.rate_limiter;
    let limiter = Arc::new(RateLimiter::new(rl.rate, rl.burst));
    tracing::info!(rate = rl.rate, burst = rl.burst, "Rate limiter configured");

    let tcp = bind(rl.address()).await?;
    let http = match rl.http_address() {
        Some(addr) => Some(bind(addr).await?),
        None => None,
    };

    let http_task = http.map(|listener| {
        tokio::spawn(serve_http(listener, limiter.clone(), shutdown.subscribe()))
    });

    serve_lines(tcp, Arc::new(LimiterHandler::new(limiter)), shutdown.subscribe()).await?;

    if let Some(task) = http_task {
        task.await??;
    }
    Ok(())
}

pub async fn run_broker(config: &AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let queue = Arc::new(InMemoryQueue::new());
    let listener = bind(config.broker.address()).await?;
    serve_lines(listener, Arc::new(BrokerHandler::new(queue)), shutdown.subscribe()).await?;
    Ok(())
}

pub async fn run_worker(config: &AppConfig, shutdown: Shutdown) -> Result<(), StartupError> {
    let notifier = SmtpNotifier::from_config(&config.mail)?;
    let broker = BrokerClient::new(
        config.broker.address(),
        Duration::from_millis(config.broker.timeout_ms),
    );
    let worker = Worker::new(
        broker,
        notifier,
        Duration::from_millis(config.worker.poll_interval_ms),
    );

    worker.run(shutdown.subscribe()).await;
    Ok(())
}
