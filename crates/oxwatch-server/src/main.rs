use anyhow::Result;
use chrono::Utc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use oxwatch_server::config::ServerConfig;
use oxwatch_server::object_builder;
use oxwatch_server::passive::PassiveResult;
use oxwatch_server::state::Engine;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  oxwatch-server [config.toml]    Start the engine, reading passive results from stdin");
}

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if matches!(args.get(1).map(|s| s.as_str()), Some("--help" | "-h")) {
        print_usage();
        return Ok(());
    }
    let config_path = args
        .get(1)
        .map(|s| s.as_str())
        .unwrap_or("config/oxwatch.toml");

    let config = ServerConfig::load(config_path)
        .map_err(|e| anyhow::anyhow!("Failed to load config '{}': {}", config_path, e))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(config.log_filter.parse()?))
        .init();

    let mut engine = object_builder::build_engine(&config)?;
    run(&mut engine, config.tick_millis).await;
    Ok(())
}

async fn run(engine: &mut Engine, tick_millis: u64) {
    let mut tick = interval(Duration::from_millis(tick_millis.max(1)));
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdin_open = true;

    tracing::info!(
        objects = engine.objects.len(),
        tick_millis,
        "Engine started"
    );

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let fired = engine.fire_due_timers(Utc::now());
                if fired > 0 {
                    tracing::debug!(fired, "Timers processed");
                }
            }
            line = lines.next_line(), if stdin_open => match line {
                Ok(Some(line)) => handle_line(engine, &line),
                Ok(None) => {
                    tracing::info!("Passive result input closed");
                    stdin_open = false;
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to read passive result");
                    stdin_open = false;
                }
            },
            _ = signal::ctrl_c() => {
                tracing::info!("Shutting down gracefully");
                break;
            }
        }
    }
}

fn handle_line(engine: &mut Engine, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    let result = match PassiveResult::parse_line(line) {
        Ok(result) => result,
        Err(e) => {
            tracing::warn!(error = %e, "Malformed passive result");
            return;
        }
    };
    match result.apply(engine, Utc::now()) {
        Ok(transition) => tracing::debug!(
            object = %result.key(),
            state = result.state,
            state_type = %transition.state_type,
            "Passive result processed"
        ),
        Err(e) => tracing::warn!(object = %result.key(), error = %e, "Passive result rejected"),
    }
}
