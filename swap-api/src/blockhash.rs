//! Recent-blockhash lookup for transaction finalisation (§4.6): a trait so
//! handler tests can substitute a fixed hash without reaching the network,
//! matching the same trait-isolation pattern `swap-execution` uses for the
//! external price aggregator (`swap_execution::fallback::PriceAggregator`).

use crate::error::ApiError;
use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::hash::Hash;
use std::str::FromStr;

#[async_trait]
pub trait BlockhashProvider: Send + Sync {
    async fn get_latest_blockhash(&self) -> Result<Hash, ApiError>;
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    result: RpcResult,
}

#[derive(Debug, Deserialize)]
struct RpcResult {
    value: RpcBlockhashValue,
}

#[derive(Debug, Deserialize)]
struct RpcBlockhashValue {
    blockhash: String,
}

/// Fetches `getLatestBlockhash` from a configured Solana JSON-RPC endpoint.
pub struct RpcBlockhashProvider {
    client: reqwest::Client,
    rpc_url: String,
}

impl RpcBlockhashProvider {
    pub fn new(client: reqwest::Client, rpc_url: impl Into<String>) -> Self {
        Self {
            client,
            rpc_url: rpc_url.into(),
        }
    }
}

#[async_trait]
impl BlockhashProvider for RpcBlockhashProvider {
    async fn get_latest_blockhash(&self) -> Result<Hash, ApiError> {
        let body = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "getLatestBlockhash",
            "params": [{"commitment": "confirmed"}],
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ApiError::Internal(format!("blockhash request failed: {e}")))?
            .json::<RpcResponse>()
            .await
            .map_err(|e| ApiError::Internal(format!("blockhash response malformed: {e}")))?;

        Hash::from_str(&response.result.value.blockhash)
            .map_err(|e| ApiError::Internal(format!("blockhash not parseable: {e}")))
    }
}

#[cfg(test)]
pub struct FixedBlockhashProvider(pub Hash);

#[cfg(test)]
#[async_trait]
impl BlockhashProvider for FixedBlockhashProvider {
    async fn get_latest_blockhash(&self) -> Result<Hash, ApiError> {
        Ok(self.0)
    }
}
