//! Wire-format request/response bodies for the Quote/Swap API (F, §6),
//! kept distinct from the domain types in `swap-instrument` so the JSON
//! shape (camelCase, string-encoded pubkeys, the amountIn/amountOut
//! either-or) can evolve independently of the internal representation.

use serde::{Deserialize, Serialize};
use swap_instrument::{Observation, TradeType, TransactionEncoding};

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub uptime: f64,
}

#[derive(Debug, Serialize)]
pub struct QuoteDto {
    pub mint: String,
    pub pool: String,
    #[serde(rename = "avgPrice")]
    pub avg_price: f64,
    #[serde(rename = "programId")]
    pub program_id: String,
    pub slot: String,
}

impl From<&Observation> for QuoteDto {
    fn from(observation: &Observation) -> Self {
        Self {
            mint: observation.mint.to_string(),
            pool: observation.pool.to_string(),
            avg_price: observation.avg_price,
            program_id: observation.program_id.to_string(),
            slot: observation.slot.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct QuoteResponseBody {
    pub success: bool,
    pub quote: QuoteDto,
}

/// Inbound `quote` override, as carried in a swap request body (§4.6: "if
/// body carries a `quote` override, validate it has {mint matching the
/// path, pool, avgPrice, programId, slot} and use it").
#[derive(Debug, Clone, Deserialize)]
pub struct QuoteOverrideDto {
    pub mint: String,
    pub pool: String,
    #[serde(rename = "avgPrice")]
    pub avg_price: f64,
    #[serde(rename = "programId")]
    pub program_id: String,
    pub slot: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SwapRequestBody {
    pub signer: String,
    #[serde(rename = "type")]
    pub side: TradeType,
    #[serde(rename = "amountIn")]
    pub amount_in: Option<u64>,
    #[serde(rename = "amountOut")]
    pub amount_out: Option<u64>,
    pub slippage: u16,
    pub quote: Option<QuoteOverrideDto>,
    #[serde(default)]
    pub encoding: TransactionEncoding,
}

#[derive(Debug, Serialize)]
pub struct SwapResponseBody {
    pub success: bool,
    pub tx: String,
}
