//! The ingestion pipeline: Transaction Source (A), Trade Extractor (B) and
//! Trade Validator (C). Produces validated [`Observation`]s ready for the
//! Price Index (D); nothing in this crate knows about the HTTP surface or
//! the builder registry.

pub mod commitment;
pub mod extractor;
pub mod source;
pub mod stats;
pub mod validator;

pub use commitment::Commitment;
pub use extractor::{ExtractionOutput, ExtractionStats, NullParser, SwapParser, TradeExtractor};
pub use source::{ConnectionHandle, SubscribeConfig, TransactionSource};
pub use source::grpc::GrpcTransactionSource;
pub use source::websocket::WebSocketTransactionSource;
pub use stats::{IngestionStats, IngestionStatsSnapshot};
pub use validator::{RejectionReason, TradeValidator, ValidationStats};

use std::collections::HashSet;
use swap_cache::PriceIndex;
use swap_instrument::TransactionRecord;

/// Run a single [`TransactionRecord`] through B then C and write every
/// accepted observation into `index`, discarding stragglers from a
/// superseded connection (§4.1 cleanup-on-drop) before extraction even
/// starts. Returns the number of observations written.
pub fn ingest_record<P: SwapParser>(
    record: &TransactionRecord,
    current_connection_id: &swap_instrument::ConnectionId,
    extractor: &TradeExtractor<P>,
    whitelist: &HashSet<solana_sdk::pubkey::Pubkey>,
    index: &PriceIndex,
    now_ms: i64,
) -> usize {
    if record.is_stale(current_connection_id) {
        return 0;
    }

    let extraction = extractor.extract(record);
    let validator = TradeValidator::new(whitelist);
    let (observations, _rejections, _stats) = validator.validate_batch(
        extraction.trades,
        &record.meta,
        &extraction.meme_events,
        now_ms,
    );

    let mut written = 0;
    for observation in observations {
        if index.put(observation).is_ok() {
            written += 1;
        }
    }
    written
}
