//! Chain access for the ingester
//!
//! `BlockProvider` is the seam the poll loop depends on; `HttpProvider`
//! implements it over plain JSON-RPC (`eth_blockNumber`, `eth_getLogs`).
//! Only `Transfer(address,address,uint256)` logs emitted by the watched
//! contract are requested; anything that does not decode as one is
//! skipped.

use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::warn;

/// topic0 of `Transfer(address,address,uint256)`
pub fn transfer_topic() -> B256 {
    keccak256(b"Transfer(address,address,uint256)")
}

/// Errors from the chain provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// A decoded ERC-20 transfer log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    /// Emitting token contract; deposits are credited under its hex address
    pub token: Address,
    pub amount: U256,
    pub block: u64,
    pub tx_hash: B256,
}

/// Read access to the chain, as the ingester needs it
#[async_trait]
pub trait BlockProvider: Send + Sync {
    /// Current chain head
    async fn block_number(&self) -> Result<u64, ProviderError>;

    /// Decoded Transfer logs emitted by `contract` in the block range (inclusive)
    async fn transfer_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract: Address,
    ) -> Result<Vec<TransferEvent>, ProviderError>;
}

/// JSON-RPC provider over HTTP
pub struct HttpProvider {
    client: reqwest::Client,
    url: String,
}

impl HttpProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<T, ProviderError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        let response: RpcResponse<T> = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = response.error {
            return Err(ProviderError::Rpc {
                code: err.code,
                message: err.message,
            });
        }
        response
            .result
            .ok_or_else(|| ProviderError::Malformed("missing result".into()))
    }
}

#[async_trait]
impl BlockProvider for HttpProvider {
    async fn block_number(&self) -> Result<u64, ProviderError> {
        let hex: String = self.call("eth_blockNumber", json!([])).await?;
        parse_hex_u64(&hex)
    }

    async fn transfer_logs(
        &self,
        from_block: u64,
        to_block: u64,
        contract: Address,
    ) -> Result<Vec<TransferEvent>, ProviderError> {
        let filter = json!([{
            "fromBlock": format!("{:#x}", from_block),
            "toBlock": format!("{:#x}", to_block),
            "address": contract,
            "topics": [transfer_topic()],
        }]);
        let logs: Vec<RawLog> = self.call("eth_getLogs", filter).await?;

        let mut events = Vec::with_capacity(logs.len());
        for log in logs {
            match decode_transfer(&log) {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(err) => warn!(error = %err, tx = ?log.transaction_hash, "skipping undecodable log"),
            }
        }
        Ok(events)
    }
}

#[derive(Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcErrorObject>,
}

#[derive(Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    address: Address,
    topics: Vec<B256>,
    data: Bytes,
    #[serde(rename = "blockNumber")]
    block_number: String,
    #[serde(rename = "transactionHash")]
    transaction_hash: B256,
}

/// Decode one raw log into a transfer event
///
/// `Ok(None)` for logs that are not indexed-from/indexed-to transfers
/// (ERC-721 emits the same topic0 with a different shape).
fn decode_transfer(log: &RawLog) -> Result<Option<TransferEvent>, ProviderError> {
    if log.topics.first() != Some(&transfer_topic()) {
        return Ok(None);
    }
    if log.topics.len() != 3 {
        return Ok(None);
    }
    if log.data.len() != 32 {
        return Err(ProviderError::Malformed(format!(
            "transfer data is {} bytes, expected 32",
            log.data.len()
        )));
    }

    Ok(Some(TransferEvent {
        from: Address::from_word(log.topics[1]),
        to: Address::from_word(log.topics[2]),
        token: log.address,
        amount: U256::from_be_slice(&log.data),
        block: parse_hex_u64(&log.block_number)?,
        tx_hash: log.transaction_hash,
    }))
}

fn parse_hex_u64(value: &str) -> Result<u64, ProviderError> {
    u64::from_str_radix(value.trim_start_matches("0x"), 16)
        .map_err(|_| ProviderError::Malformed(format!("bad hex quantity: {value}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transfer_topic_is_the_canonical_hash() {
        assert_eq!(
            format!("{:#x}", transfer_topic()),
            "0xddf252ad1be2c89b69c2b068fc378daa952ba7f163c4a11628f55a4df523b3ef"
        );
    }

    #[test]
    fn test_parse_hex_u64() {
        assert_eq!(parse_hex_u64("0x0").unwrap(), 0);
        assert_eq!(parse_hex_u64("0x10").unwrap(), 16);
        assert!(parse_hex_u64("0xzz").is_err());
    }

    #[test]
    fn test_decode_transfer() {
        let to = Address::with_last_byte(7);
        let token = Address::with_last_byte(9);
        let amount = U256::from(1_000_000u64);

        let log = RawLog {
            address: token,
            topics: vec![
                transfer_topic(),
                Address::with_last_byte(1).into_word(),
                to.into_word(),
            ],
            data: Bytes::from(amount.to_be_bytes::<32>().to_vec()),
            block_number: "0x64".to_string(),
            transaction_hash: B256::with_last_byte(1),
        };

        let event = decode_transfer(&log).unwrap().unwrap();
        assert_eq!(event.to, to);
        assert_eq!(event.token, token);
        assert_eq!(event.amount, amount);
        assert_eq!(event.block, 100);
    }

    #[test]
    fn test_decode_skips_foreign_topics() {
        let log = RawLog {
            address: Address::with_last_byte(9),
            topics: vec![B256::with_last_byte(1)],
            data: Bytes::new(),
            block_number: "0x1".to_string(),
            transaction_hash: B256::with_last_byte(2),
        };
        assert_eq!(decode_transfer(&log).unwrap(), None);
    }

    #[test]
    fn test_decode_skips_erc721_shape() {
        // same topic0 but the token id rides in a fourth topic, no data
        let log = RawLog {
            address: Address::with_last_byte(9),
            topics: vec![
                transfer_topic(),
                Address::with_last_byte(1).into_word(),
                Address::with_last_byte(2).into_word(),
                B256::with_last_byte(5),
            ],
            data: Bytes::new(),
            block_number: "0x1".to_string(),
            transaction_hash: B256::with_last_byte(2),
        };
        assert_eq!(decode_transfer(&log).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_short_data() {
        let log = RawLog {
            address: Address::with_last_byte(9),
            topics: vec![
                transfer_topic(),
                Address::with_last_byte(1).into_word(),
                Address::with_last_byte(2).into_word(),
            ],
            data: Bytes::from(vec![0u8; 16]),
            block_number: "0x1".to_string(),
            transaction_hash: B256::with_last_byte(2),
        };
        assert!(decode_transfer(&log).is_err());
    }
}
