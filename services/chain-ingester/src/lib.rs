//! Chain Ingester Service
//!
//! Polls an Ethereum-style JSON-RPC node for ERC-20
//! `Transfer(address,address,uint256)` logs addressed to a watched deposit
//! contract and credits each recipient's internal ledger balance through
//! the engine. Nothing is persisted: on restart the ingester resumes a
//! fixed number of blocks behind the chain head.

pub mod ingester;
pub mod provider;

pub use ingester::{ChainIngester, IngesterConfig};
pub use provider::{BlockProvider, HttpProvider, ProviderError, TransferEvent};
