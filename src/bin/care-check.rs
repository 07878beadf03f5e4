//! # Care Check
//!
//! Runs one health pass against a JSON signal snapshot and prints the
//! resulting conditions as JSON. Useful for replaying a cluster's state
//! offline or validating a configuration before rollout.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::info;

use cluster_care::logging::init_structured_logging;
use cluster_care::{CareConfig, Condition, HealthCheckBuilder, InMemorySignalStore, SignalSnapshot};

#[derive(Parser)]
#[command(name = "care-check")]
#[command(about = "Evaluate cluster health conditions from a signal snapshot")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML); CARE_* environment variables override it
    #[arg(short, long, env = "CARE_CONFIG")]
    config: Option<PathBuf>,

    /// Signal snapshot (JSON)
    #[arg(short, long)]
    snapshot: PathBuf,

    /// Conditions of the previous pass (JSON array), to keep transition times stable
    #[arg(short, long)]
    previous: Option<PathBuf>,

    /// Exit with status 2 when any aspect is not healthy
    #[arg(long)]
    fail_on_unhealthy: bool,
}

fn read_json<T: serde::de::DeserializeOwned>(path: &PathBuf, what: &str) -> Result<T> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {what} {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("failed to parse {what} {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_structured_logging();

    let config = CareConfig::load(cli.config.as_deref()).context("invalid configuration")?;
    let snapshot: SignalSnapshot = read_json(&cli.snapshot, "snapshot")?;
    let previous: Vec<Condition> = match &cli.previous {
        Some(path) => read_json(path, "previous conditions")?,
        None => Vec::new(),
    };

    info!(
        sub_resources = snapshot.sub_resources.len(),
        extension_reports = snapshot.extension_reports.len(),
        workloads = snapshot.workloads.len(),
        "Loaded signal snapshot"
    );

    let store = Arc::new(InMemorySignalStore::new(snapshot));
    let health = HealthCheckBuilder::new(config, store).build()?;
    let conditions = health.check(&previous).await.into_vec();

    println!("{}", serde_json::to_string_pretty(&conditions)?);

    if cli.fail_on_unhealthy && conditions.iter().any(|c| !c.is_true()) {
        process::exit(2);
    }
    Ok(())
}
