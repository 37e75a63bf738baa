//! FlowMon replay tool
//!
//! Reads newline-delimited JSON monitoring events, applies them to a fresh
//! system state, runs one aggregation pass and prints the frozen snapshot.
//!
//! ```text
//! flowmon <events.ndjson> [--config config.toml|config.json]
//! ```

use anyhow::Context;
use clap::Parser;
use flowmon_rs::{MonitoringConfig, MonitoringEvent, SystemClock, SystemState};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Replay monitoring events into a system state and print its snapshot
#[derive(Parser)]
#[command(name = "flowmon")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Newline-delimited JSON events
    events: PathBuf,

    /// Monitoring configuration (TOML or JSON)
    #[arg(short, long, env = "FLOWMON_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,flowmon_rs=debug")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &cli.config {
        Some(path) => MonitoringConfig::load(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => MonitoringConfig::default(),
    };
    let events_path = cli.events.display();

    let state = SystemState::with_config(&config, SystemClock::shared());
    let file = File::open(&cli.events).with_context(|| format!("opening {}", events_path))?;

    let mut applied = 0usize;
    let mut ignored = 0usize;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", events_path))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: MonitoringEvent = serde_json::from_str(line)
            .with_context(|| format!("{}:{}: malformed event", events_path, index + 1))?;
        if state.apply(&event) {
            applied += 1;
        } else {
            ignored += 1;
        }
    }

    tracing::info!("Replayed {} events ({} ignored)", applied, ignored);
    state.aggregate_all();

    println!("{}", state.freeze().to_json()?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_events_and_config() {
        let cli = Cli::parse_from(["flowmon", "events.ndjson", "--config", "monitor.toml"]);
        assert_eq!(cli.events, PathBuf::from("events.ndjson"));
        assert_eq!(cli.config, Some(PathBuf::from("monitor.toml")));

        assert!(Cli::try_parse_from(["flowmon"]).is_err());
    }
}
