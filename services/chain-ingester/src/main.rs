use std::env;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use alloy_primitives::Address;

use chain_ingester::{ChainIngester, HttpProvider, IngesterConfig};
use matching_engine::Engine;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::fmt::init();

    tracing::info!("Starting chain ingester service");

    let rpc_url = env::var("RPC_URL").unwrap_or_else(|_| "http://localhost:8545".to_string());
    let contract: Address = env::var("DEPOSIT_CONTRACT")?.parse()?;
    let poll_interval = env::var("POLL_INTERVAL_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .map(Duration::from_secs);

    let mut config = IngesterConfig {
        contract,
        ..IngesterConfig::default()
    };
    if let Some(interval) = poll_interval {
        config.poll_interval = interval;
    }

    let engine = Arc::new(RwLock::new(Engine::new()));
    let provider = HttpProvider::new(rpc_url);
    let mut ingester = ChainIngester::new(provider, engine, config);
    ingester.start().await?;

    tokio::select! {
        _ = ingester.run() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Stopping chain ingester service");
        }
    }

    Ok(())
}
