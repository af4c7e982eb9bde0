//! # Netwatch Node
//!
//! Runs the Netwatch loop against the built-in simulated network until the
//! process is interrupted.

use std::sync::Arc;

use netwatch_engine::{FileSink, Journal, Netwatch, NetwatchConfig};
use netwatch_provider::SimulatedNetwork;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

/// Attach to the network and loop until Ctrl-C.
pub async fn run_node(config: NetwatchConfig) -> anyhow::Result<()> {
    // Initialize tracing
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Netwatch node starting...");

    let journal = Journal::new().with_sink(Arc::new(FileSink::open(&config.log_path)?));
    let provider = Arc::new(SimulatedNetwork::demo());

    let mut netwatch = Netwatch::connect(provider, journal, config).await?;
    let stats = netwatch.stats();
    info!(
        "Caller capability level {}, {}/{} capacity used, balance {}",
        stats.capability_level, stats.used_capacity, stats.max_capacity, stats.resource_balance
    );

    tokio::select! {
        _ = netwatch.run_forever() => {}
        result = tokio::signal::ctrl_c() => result?,
    }
    info!("Interrupted after {} cycles", netwatch.cycles());

    println!("{}", netwatch.snapshot().to_json()?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_node(NetwatchConfig::default()).await
}
