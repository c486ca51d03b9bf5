use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use reqwest::StatusCode;

use traffic_control::broker::BrokerClient;
use traffic_control::rate_limiter::RemoteLimiter;
use traffic_control::worker::SignupEvent;

#[derive(Parser)]
#[command(name = "traffic-cli")]
#[command(about = "Talk to a running broker or rate limiter", long_about = None)]
struct Cli {
    /// Broker address
    #[arg(long, env = "BROKER_ADDR", default_value = "127.0.0.1:9005")]
    broker: String,

    /// Rate limiter TCP address
    #[arg(long, env = "RATE_LIMITER_ADDR", default_value = "127.0.0.1:9000")]
    limiter: String,

    /// Per-operation timeout in milliseconds
    #[arg(long, default_value_t = 2000)]
    timeout_ms: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enqueue a raw payload
    Push { payload: String },
    /// Enqueue a signup event as the backend would
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        name: String,
    },
    /// Dequeue the oldest payload
    Pop,
    /// Ask the rate limiter about an identity
    Check {
        identity: String,
        /// Use the HTTP binding at this base URL instead of TCP
        #[arg(long)]
        http: Option<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match execute(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

async fn execute(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let timeout = Duration::from_millis(cli.timeout_ms);
    let broker = BrokerClient::new(cli.broker, timeout);

    match cli.command {
        Commands::Push { payload } => {
            broker.push(&payload).await?;
            println!("ACK");
        }
        Commands::Signup { email, name } => {
            broker.publish(&SignupEvent::new(email, name)).await?;
            println!("ACK");
        }
        Commands::Pop => match broker.pop().await? {
            Some(payload) => println!("{}", payload),
            None => println!("EMPTY"),
        },
        Commands::Check { identity, http } => {
            let allowed = match http {
                Some(base) => check_http(&base, &identity, timeout).await?,
                None => RemoteLimiter::new(cli.limiter, timeout).check(&identity).await?,
            };
            println!("{}", if allowed { "allowed" } else { "denied" });
            // non-zero exit on deny so scripts can branch on it
            if !allowed {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}

async fn check_http(
    base: &str,
    identity: &str,
    timeout: Duration,
) -> Result<bool, Box<dyn std::error::Error>> {
    let client = reqwest::Client::builder().timeout(timeout).build()?;
    let res = client
        .get(format!("{}/check", base.trim_end_matches('/')))
        .query(&[("ip", identity)])
        .send()
        .await?;

    match res.status() {
        StatusCode::OK => Ok(true),
        StatusCode::TOO_MANY_REQUESTS => Ok(false),
        other => Err(format!("rate limiter returned status {}", other).into()),
    }
}
