//! PARLEY — Automated Bilateral Negotiation Agent
//!
//! Entry point. Loads configuration, initialises structured logging and
//! drives the agent over newline-delimited JSON events on stdin, writing
//! one JSON action per turn to stdout, until end of input or Ctrl+C.

use anyhow::Result;
use tracing::info;

use parley::config;
use parley::engine::agent::NegotiationAgent;
use parley::engine::driver;

/// Default configuration path; overridden by the first CLI argument.
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load_or_default(&config_path)?;

    init_logging();

    info!(
        agent_name = %cfg.agent.name,
        config = %config_path,
        sample_count = cfg.strategy.sample_count,
        seeded = cfg.agent.rng_seed.is_some(),
        "PARLEY starting up"
    );

    let mut agent = NegotiationAgent::from_config(&cfg);
    let caps = agent.capabilities();
    info!(
        protocols = ?caps.protocols,
        profiles = ?caps.profiles,
        description = agent.description(),
        "Agent ready"
    );

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = tokio::io::stdout();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    tokio::select! {
        result = driver::run(stdin, &mut stdout, &mut agent) => {
            let report = result?;
            info!(
                events = report.events,
                actions = report.actions,
                skipped = report.skipped,
                "Event stream closed"
            );
        }
        _ = &mut shutdown => {
            info!("Shutdown signal received.");
        }
    }

    info!(
        sessions = agent.sessions_completed(),
        past_sessions = agent.history().len(),
        "PARLEY shut down cleanly."
    );
    Ok(())
}

/// Initialise the `tracing` subscriber. Logs go to stderr; stdout carries
/// the action stream.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("parley=info"));

    let json_logging = std::env::var("PARLEY_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
