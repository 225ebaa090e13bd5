//! Shared, cheaply-cloneable handle threaded through every axum handler:
//! the Price Index (D), the Builder Registry (E), the optional External
//! Price Fallback (G), and the block-hash provider used to finalise
//! transactions. Owned once by `swap-service`'s `main` and cloned per
//! request per axum's per-request task model (§5).

use std::sync::Arc;
use std::time::Instant;

use swap_cache::PriceIndex;
use swap_execution::{BuilderRegistry, FallbackLookup, PriceAggregator};

use crate::blockhash::BlockhashProvider;

#[derive(Clone)]
pub struct AppState {
    pub index: PriceIndex,
    pub registry: Arc<BuilderRegistry>,
    pub fallback: Option<Arc<FallbackLookup<Box<dyn PriceAggregator>>>>,
    pub blockhash_provider: Arc<dyn BlockhashProvider>,
    started_at: Instant,
}

impl AppState {
    pub fn new(
        index: PriceIndex,
        registry: Arc<BuilderRegistry>,
        fallback: Option<Arc<FallbackLookup<Box<dyn PriceAggregator>>>>,
        blockhash_provider: Arc<dyn BlockhashProvider>,
    ) -> Self {
        Self {
            index,
            registry,
            fallback,
            blockhash_provider,
            started_at: Instant::now(),
        }
    }

    pub fn uptime_seconds(&self) -> f64 {
        self.started_at.elapsed().as_secs_f64()
    }
}
