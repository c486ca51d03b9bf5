//! traffic-control service launcher.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!   Client Request     │                load-balancer                 │
//!   ───────────────────┼─▶ admission ─▶ round robin ─▶ proxy ─────────┼──▶ Backend
//!                      │      │              ▲                        │       │
//!                      │      │         health monitor                │       │ signup
//!                      └──────┼───────────────────────────────────────┘       │ event
//!                             ▼ (remote mode)                                 ▼
//!                      ┌──────────────┐                             ┌──────────────┐
//!                      │ rate-limiter │                             │    broker    │
//!                      │  TCP / HTTP  │                             │  FIFO queue  │
//!                      └──────────────┘                             └──────┬───────┘
//!                                                                          │ POP
//!                                                                   ┌──────▼───────┐
//!                                                                   │    worker    │──▶ SMTP
//!                                                                   └──────────────┘
//! ```
//!
//! Each box is its own process, selected by subcommand.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use traffic_control::config::{load_config, ObservabilityConfig, Service};
use traffic_control::lifecycle::{spawn_signal_handler, startup, Shutdown};
use traffic_control::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "traffic-control", version)]
#[command(about = "Load balancer, rate limiter, message broker and notification worker")]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    service: Command,
}

#[derive(Subcommand, Clone, Copy)]
enum Command {
    /// Round-robin HTTP load balancer with health checks
    LoadBalancer,
    /// Token-bucket rate limiter (TCP, optional HTTP)
    RateLimiter,
    /// Line-based FIFO message broker
    Broker,
    /// Broker consumer that sends welcome mail
    Worker,
}

impl From<Command> for Service {
    fn from(command: Command) -> Self {
        match command {
            Command::LoadBalancer => Service::LoadBalancer,
            Command::RateLimiter => Service::RateLimiter,
            Command::Broker => Service::Broker,
            Command::Worker => Service::Worker,
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let service = Service::from(cli.service);

    let config = match load_config(service, cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging(&ObservabilityConfig::default());
            tracing::error!(service = %service, error = %e, "Invalid configuration");
            eprintln!("{}: {}", service, e);
            return ExitCode::FAILURE;
        }
    };

    logging::init_logging(&config.observability);
    tracing::info!(service = %service, version = env!("CARGO_PKG_VERSION"), "Starting");

    if let Some(addr) = &config.observability.metrics_address {
        match addr.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(metrics_address = %addr, error = %e, "Failed to parse metrics address"),
        }
    }

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    match startup::run(service, &config, shutdown).await {
        Ok(()) => {
            tracing::info!(service = %service, "Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(service = %service, error = %e, "Service failed");
            ExitCode::FAILURE
        }
    }
}
