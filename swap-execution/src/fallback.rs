//! External Price Fallback (G, §4.7): when the Price Index has no entry for
//! a mint, or the entry is stale/zero, consult an external aggregator for a
//! SOL→token quote and, if it resolves to a single-hop route through a
//! supported builder, write the derived observation back into the index.

use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::Arc;
use swap_cache::PriceIndex;
use swap_instrument::Observation;
use thiserror::Error;

use crate::registry::BuilderRegistry;

/// Fixed probe size (in lamports) used for the SOL→token quote request.
/// The aggregator is asked "how much `mint` would I get for this much SOL",
/// and the ratio of the two legs becomes the fallback price.
pub const PROBE_AMOUNT_LAMPORTS: u64 = 1_000_000_000; // 1 SOL

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    #[error("aggregator request failed: {0}")]
    RequestFailed(String),

    #[error("aggregator returned a multi-hop route; only single-hop quotes are accepted")]
    MultiHopRoute,

    #[error("aggregator route label {0:?} is not in the program label table")]
    UnknownLabel(String),

    #[error("program {0} resolved from the aggregator label has no registered builder")]
    UnsupportedProgram(Pubkey),

    #[error("aggregator returned a non-positive quote")]
    NonPositiveQuote,
}

/// A single quoted route leg, as returned by an aggregator's route plan.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteLeg {
    /// Human-readable market label (e.g. `"Raydium CLMM"`), mapped to a
    /// program id through the fixed label table below.
    pub label: String,
}

/// The subset of an aggregator quote response this fallback depends on.
#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorQuote {
    pub in_amount: u64,
    pub out_amount: u64,
    pub route_plan: Vec<RouteLeg>,
}

/// Abstraction over the external aggregator HTTP call, so call sites can be
/// exercised against a stub in tests without reaching the network.
#[async_trait]
pub trait PriceAggregator: Send + Sync {
    async fn quote_sol_to_token(
        &self,
        mint: &Pubkey,
        probe_lamports: u64,
    ) -> Result<AggregatorQuote, FallbackError>;
}

/// Jupiter-shaped aggregator client. Only the fields this fallback needs are
/// deserialised; the rest of the response is ignored.
pub struct HttpPriceAggregator {
    client: reqwest::Client,
    base_url: String,
    input_mint: Pubkey,
}

impl HttpPriceAggregator {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, wsol_mint: Pubkey) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            input_mint: wsol_mint,
        }
    }
}

/// Lets a boxed trait object stand in for `A` in [`FallbackLookup<A>`], so
/// the HTTP layer can hold one aggregator behind a single concrete type
/// regardless of which implementation is wired up.
#[async_trait]
impl PriceAggregator for Box<dyn PriceAggregator> {
    async fn quote_sol_to_token(
        &self,
        mint: &Pubkey,
        probe_lamports: u64,
    ) -> Result<AggregatorQuote, FallbackError> {
        (**self).quote_sol_to_token(mint, probe_lamports).await
    }
}

#[async_trait]
impl PriceAggregator for HttpPriceAggregator {
    async fn quote_sol_to_token(
        &self,
        mint: &Pubkey,
        probe_lamports: u64,
    ) -> Result<AggregatorQuote, FallbackError> {
        let url = format!(
            "{}/quote?inputMint={}&outputMint={}&amount={}",
            self.base_url, self.input_mint, mint, probe_lamports
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FallbackError::RequestFailed(e.to_string()))?;

        response
            .json::<AggregatorQuote>()
            .await
            .map_err(|e| FallbackError::RequestFailed(e.to_string()))
    }
}

/// Maps an aggregator route label to the program id our builders know how
/// to assemble instructions for. Kept as a small fixed table rather than a
/// dynamic registry lookup, since aggregator labels are a presentation
/// concern distinct from on-chain program identity (§4.7).
pub struct LabelTable {
    entries: Vec<(&'static str, &'static str)>,
}

impl LabelTable {
    pub fn new(entries: Vec<(&'static str, &'static str)>) -> Self {
        Self { entries }
    }

    pub fn resolve(&self, label: &str) -> Option<Pubkey> {
        self.entries
            .iter()
            .find(|(known_label, _)| *known_label == label)
            .and_then(|(_, program_id)| Pubkey::from_str(program_id).ok())
    }
}

impl Default for LabelTable {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

/// Orchestrates the fallback lookup described in §4.7: quote, validate
/// single-hop, resolve label, check the builder whitelist, then persist.
pub struct FallbackLookup<A: PriceAggregator> {
    aggregator: A,
    labels: LabelTable,
    registry: Arc<BuilderRegistry>,
    index: PriceIndex,
}

impl<A: PriceAggregator> FallbackLookup<A> {
    pub fn new(
        aggregator: A,
        labels: LabelTable,
        registry: Arc<BuilderRegistry>,
        index: PriceIndex,
    ) -> Self {
        Self {
            aggregator,
            labels,
            registry,
            index,
        }
    }

    /// Resolve a fallback price for `mint`, writing the result back into the
    /// price index on success and returning the derived observation.
    pub async fn resolve(&self, mint: Pubkey) -> Result<Observation, FallbackError> {
        let quote = self
            .aggregator
            .quote_sol_to_token(&mint, PROBE_AMOUNT_LAMPORTS)
            .await?;

        if quote.route_plan.len() != 1 {
            return Err(FallbackError::MultiHopRoute);
        }

        if quote.in_amount == 0 || quote.out_amount == 0 {
            return Err(FallbackError::NonPositiveQuote);
        }

        let label = &quote.route_plan[0].label;
        let program_id = self
            .labels
            .resolve(label)
            .ok_or_else(|| FallbackError::UnknownLabel(label.clone()))?;

        if !self.registry.has_builder(&program_id) {
            return Err(FallbackError::UnsupportedProgram(program_id));
        }

        let avg_price = quote.in_amount as f64 / quote.out_amount as f64;
        let now = chrono::Utc::now().timestamp_millis();

        // The aggregator's route plan carries a market label, not a pool
        // address, so there is no on-chain pool identifier to attach here.
        // `Observation` requires a non-default pool (§3), so the mint
        // itself stands in as the pool reference for fallback-derived
        // entries — it is the only value G has that is both stable and
        // guaranteed non-default.
        let observation = Observation {
            mint,
            pool: mint,
            avg_price,
            program_id,
            slot: "0".into(),
            stored_at_ms: now,
            last_access_ms: now,
        };

        self.index
            .put(observation.clone())
            .map_err(|e| FallbackError::RequestFailed(e.to_string()))?;

        Ok(observation)
    }
}
