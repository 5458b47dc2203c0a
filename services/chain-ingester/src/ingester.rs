//! Deposit poll loop
//!
//! On start the ingester anchors itself a fixed lag behind the chain head
//! (nothing is persisted across restarts) and then ticks on a configurable
//! interval, crediting every decoded transfer to the recipient's ledger
//! entry. A failed tick is logged and retried from the same anchor on the
//! next one; a deposit that fails to credit is logged and skipped.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use alloy_primitives::Address;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use matching_engine::Engine;

use crate::provider::{BlockProvider, ProviderError};

/// Configuration for the deposit ingester
#[derive(Debug, Clone)]
pub struct IngesterConfig {
    /// Deposit contract whose Transfer logs are watched
    pub contract: Address,
    /// Cadence of the poll loop
    pub poll_interval: Duration,
    /// How many blocks behind the head to start after a restart
    pub start_lag: u64,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            contract: Address::ZERO,
            poll_interval: Duration::from_secs(5),
            start_lag: 10,
        }
    }
}

/// Polls the chain and credits deposits into the engine's ledger
pub struct ChainIngester<P> {
    provider: P,
    engine: Arc<RwLock<Engine>>,
    config: IngesterConfig,
    last_processed_block: u64,
}

impl<P: BlockProvider> ChainIngester<P> {
    pub fn new(provider: P, engine: Arc<RwLock<Engine>>, config: IngesterConfig) -> Self {
        Self {
            provider,
            engine,
            config,
            last_processed_block: 0,
        }
    }

    /// Anchor the ingester behind the current chain head
    pub async fn start(&mut self) -> Result<(), ProviderError> {
        let latest = self.provider.block_number().await?;
        self.last_processed_block = latest.saturating_sub(self.config.start_lag);
        info!(
            latest,
            start_block = self.last_processed_block,
            contract = %self.config.contract,
            "chain ingester started"
        );
        Ok(())
    }

    /// Run the poll loop until the task is dropped
    pub async fn run(&mut self) {
        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = self.process_new_blocks().await {
                error!(error = %err, "failed to process new blocks");
            }
        }
    }

    /// Process every block since the last successful tick
    async fn process_new_blocks(&mut self) -> Result<(), ProviderError> {
        let latest = self.provider.block_number().await?;
        if latest <= self.last_processed_block {
            return Ok(());
        }

        let from = self.last_processed_block + 1;
        debug!(from, to = latest, "processing blocks");
        let events = self
            .provider
            .transfer_logs(from, latest, self.config.contract)
            .await?;

        for event in &events {
            info!(
                from = %event.from,
                to = %event.to,
                token = %event.token,
                amount = %event.amount,
                block = event.block,
                "deposit observed"
            );
            let mut engine = self
                .engine
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Err(err) =
                engine.credit_deposit(event.to, &event.token.to_string(), event.amount)
            {
                warn!(error = %err, tx = %event.tx_hash, "failed to credit deposit");
            }
        }

        self.last_processed_block = latest;
        Ok(())
    }

    /// The last block whose logs were credited
    pub fn last_processed_block(&self) -> u64 {
        self.last_processed_block
    }
}
