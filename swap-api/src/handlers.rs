//! The three HTTP operations of the Quote/Swap API (F, §4.6/§6):
//! `GET /health`, `GET /api/quote/:mint`, `POST /api/swap/:mint`.

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
};
use base64::Engine;
use chrono::Utc;
use solana_sdk::{
    hash::Hash,
    instruction::Instruction,
    message::{VersionedMessage, v0},
    pubkey::Pubkey,
    signature::Signature,
    transaction::VersionedTransaction,
};
use swap_execution::BuildParams;
use swap_instrument::{
    AmountSpec, Observation, SwapRequest, TransactionEncoding,
    constants::{MAX_SLIPPAGE_BPS, MIN_SLIPPAGE_BPS},
};
use tracing::{debug, info};

use crate::dto::{
    HealthResponse, QuoteDto, QuoteOverrideDto, QuoteResponseBody, SwapRequestBody,
    SwapResponseBody,
};
use crate::error::ApiError;
use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        timestamp: Utc::now().to_rfc3339(),
        uptime: state.uptime_seconds(),
    })
}

/// `GET /api/quote/:mint` (§4.6): consult the Price Index, falling back to
/// the external aggregator (G) on a miss or an invalid cached price.
pub async fn get_quote(
    State(state): State<AppState>,
    Path(mint_str): Path<String>,
) -> Result<Json<QuoteResponseBody>, ApiError> {
    let mint = parse_pubkey(&mint_str, "mint")?;

    let observation = match state.index.get(&mint).filter(is_usable) {
        Some(observation) => observation,
        None => resolve_via_fallback(&state, mint).await?,
    };

    Ok(Json(QuoteResponseBody {
        success: true,
        quote: QuoteDto::from(&observation),
    }))
}

fn is_usable(observation: &Observation) -> bool {
    observation.avg_price.is_finite() && observation.avg_price > 0.0
}

async fn resolve_via_fallback(state: &AppState, mint: Pubkey) -> Result<Observation, ApiError> {
    let fallback = state
        .fallback
        .as_ref()
        .ok_or_else(|| ApiError::NotFound(format!("mint {mint} not found")))?;

    fallback
        .resolve(mint)
        .await
        .map_err(|e| ApiError::NotFound(format!("mint {mint} not found: {e}")))
}

/// `POST /api/swap/:mint` (§4.6): validate the request body, resolve an
/// observation (override or cached), project raw amounts, dispatch to the
/// registered builder, and finalise an unsigned v0 transaction.
pub async fn post_swap(
    State(state): State<AppState>,
    Path(mint_str): Path<String>,
    Json(body): Json<SwapRequestBody>,
) -> Result<Json<SwapResponseBody>, ApiError> {
    let mint = parse_pubkey(&mint_str, "mint")?;
    let signer = validate_signer(&body.signer)?;
    let amount = validate_amount(body.amount_in, body.amount_out)?;
    validate_slippage(body.slippage)?;

    let observation = match &body.quote {
        Some(quote_override) => resolve_quote_override(quote_override, &mint_str)?,
        None => state
            .index
            .get(&mint)
            .ok_or_else(|| ApiError::NotFound(format!("mint {mint} not found")))?,
    };

    let request = SwapRequest {
        mint,
        signer,
        side: body.side,
        amount,
        slippage_bps: body.slippage,
        quote_override: body.quote.as_ref().map(|_| observation.clone()),
        encoding: body.encoding,
    };

    let projected = request.project_amounts(observation.avg_price);

    if !state.registry.has_builder(&observation.program_id) {
        return Err(ApiError::UnsupportedProtocol {
            program_id: observation.program_id.to_string(),
            supported: state
                .registry
                .supported_markets()
                .into_iter()
                .map(str::to_string)
                .collect(),
        });
    }

    let params = BuildParams {
        mint,
        signer,
        side: body.side,
        amount,
        input_amount_raw: projected.input_amount_raw,
        output_amount_raw: projected.output_amount_raw,
        slippage_bps: body.slippage,
        observation: observation.clone(),
    };

    let instructions = state
        .registry
        .build(&observation.program_id, &params)
        .map_err(|e| ApiError::BuilderFailed(e.to_string()))?;

    let tx = finalize_transaction(&state, signer, instructions, body.encoding).await?;

    let market = state.registry.market_for_program_id(&observation.program_id);
    info!(%mint, %signer, ?market, "assembled unsigned swap transaction");

    Ok(Json(SwapResponseBody { success: true, tx }))
}

fn parse_pubkey(raw: &str, field: &str) -> Result<Pubkey, ApiError> {
    Pubkey::from_str(raw).map_err(|_| ApiError::Validation(format!("{field} is not a valid pubkey")))
}

/// `signer non-empty, >=32 characters` (§4.6), then must parse as a pubkey
/// since it becomes the transaction's fee payer.
fn validate_signer(raw: &str) -> Result<Pubkey, ApiError> {
    if raw.len() < 32 {
        return Err(ApiError::Validation(
            "signer must be at least 32 characters".into(),
        ));
    }
    parse_pubkey(raw, "signer")
}

/// Exactly one of amountIn/amountOut, positive (§4.6, §8 boundaries:
/// `amountIn = 0` rejected, negative values are unrepresentable in `u64`
/// and rejected by the JSON deserializer itself).
fn validate_amount(amount_in: Option<u64>, amount_out: Option<u64>) -> Result<AmountSpec, ApiError> {
    match (amount_in, amount_out) {
        (Some(amount_in), None) if amount_in > 0 => Ok(AmountSpec::In(amount_in)),
        (None, Some(amount_out)) if amount_out > 0 => Ok(AmountSpec::Out(amount_out)),
        (Some(_), Some(_)) => Err(ApiError::Validation(
            "exactly one of amountIn/amountOut must be given, not both".into(),
        )),
        (None, None) => Err(ApiError::Validation(
            "one of amountIn/amountOut is required".into(),
        )),
        _ => Err(ApiError::Validation(
            "amountIn/amountOut must be positive".into(),
        )),
    }
}

/// `slippageBps ∈ [1000, 10000]` (§3, §8 boundaries).
fn validate_slippage(slippage_bps: u16) -> Result<(), ApiError> {
    if (MIN_SLIPPAGE_BPS..=MAX_SLIPPAGE_BPS).contains(&slippage_bps) {
        Ok(())
    } else {
        Err(ApiError::Validation(format!(
            "slippage must be between {MIN_SLIPPAGE_BPS} and {MAX_SLIPPAGE_BPS} basis points"
        )))
    }
}

fn resolve_quote_override(
    quote_override: &QuoteOverrideDto,
    path_mint: &str,
) -> Result<Observation, ApiError> {
    if quote_override.mint != path_mint {
        return Err(ApiError::Validation(
            "quote override mint does not match the path mint".into(),
        ));
    }

    let mint = parse_pubkey(&quote_override.mint, "quote.mint")?;
    let pool = parse_pubkey(&quote_override.pool, "quote.pool")?;
    let program_id = parse_pubkey(&quote_override.program_id, "quote.programId")?;

    if quote_override.slot.is_empty() {
        return Err(ApiError::Validation("quote.slot must be non-empty".into()));
    }

    let now = Utc::now().timestamp_millis();
    let observation = Observation {
        mint,
        pool,
        avg_price: quote_override.avg_price,
        program_id,
        slot: quote_override.slot.clone(),
        stored_at_ms: now,
        last_access_ms: now,
    };

    observation
        .validate_structure()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    Ok(observation)
}

async fn finalize_transaction(
    state: &AppState,
    payer: Pubkey,
    instructions: Vec<Instruction>,
    encoding: TransactionEncoding,
) -> Result<String, ApiError> {
    let recent_blockhash: Hash = state.blockhash_provider.get_latest_blockhash().await?;

    let message = v0::Message::try_compile(&payer, &instructions, &[], recent_blockhash)
        .map_err(|e| ApiError::Internal(format!("failed to compile v0 message: {e}")))?;

    let num_signatures = message.header.num_required_signatures as usize;
    let transaction = VersionedTransaction {
        signatures: vec![Signature::default(); num_signatures.max(1)],
        message: VersionedMessage::V0(message),
    };

    let bytes = bincode::serialize(&transaction)
        .map_err(|e| ApiError::Internal(format!("failed to serialize transaction: {e}")))?;

    debug!(bytes = bytes.len(), "serialized unsigned swap transaction");

    Ok(match encoding {
        TransactionEncoding::Base64 => base64::engine::general_purpose::STANDARD.encode(bytes),
        TransactionEncoding::Base58 => bs58::encode(bytes).into_string(),
    })
}

/// Re-export so `swap-service` can hand a pre-built [`Arc`] around without
/// importing `swap-execution` directly in every call site.
pub type SharedAppState = Arc<AppState>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_amount_rejects_both_given() {
        assert!(matches!(
            validate_amount(Some(1), Some(1)),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn validate_amount_rejects_neither_given() {
        assert!(matches!(validate_amount(None, None), Err(ApiError::Validation(_))));
    }

    #[test]
    fn validate_amount_rejects_zero() {
        assert!(matches!(
            validate_amount(Some(0), None),
            Err(ApiError::Validation(_))
        ));
    }

    #[test]
    fn validate_amount_accepts_single_positive_side() {
        assert_eq!(validate_amount(Some(5), None).unwrap(), AmountSpec::In(5));
        assert_eq!(validate_amount(None, Some(5)).unwrap(), AmountSpec::Out(5));
    }

    #[test]
    fn slippage_boundaries_match_spec() {
        assert!(validate_slippage(1000).is_ok());
        assert!(validate_slippage(999).is_err());
        assert!(validate_slippage(10000).is_ok());
        assert!(validate_slippage(10001).is_err());
    }

    #[test]
    fn signer_below_length_floor_rejected() {
        assert!(matches!(validate_signer("short"), Err(ApiError::Validation(_))));
    }
}
