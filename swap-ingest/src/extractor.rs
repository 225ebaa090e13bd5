//! Trade Extractor (B, §4.2): decodes a [`TransactionRecord`]'s
//! instructions and inner instructions into trade candidates and meme
//! events. The actual instruction->protocol classification is delegated to
//! a [`SwapParser`] implementation, treated here as a black box; this
//! module only owns the whitelist gate, version handling, and the fault
//! barrier around the parser call (§4.2).

use solana_sdk::pubkey::Pubkey;
use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use swap_instrument::{MemeEvent, TradeCandidate, TransactionRecord};
use tracing::warn;

/// Counters produced by a single [`TradeExtractor::extract`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtractionStats {
    pub total_trades: usize,
    pub total_meme_events: usize,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractionOutput {
    pub trades: Vec<TradeCandidate>,
    pub meme_events: Vec<MemeEvent>,
    pub stats: ExtractionStats,
}

/// A decoder for one or more DEX protocols' instruction formats. Given a
/// transaction and the set of whitelisted program identifiers, returns the
/// trades and meme events it recognizes. Implementations are free to
/// delegate to per-protocol decoders internally (out of scope here, §1).
pub trait SwapParser: Send + Sync {
    fn parse(
        &self,
        record: &TransactionRecord,
        whitelist: &HashSet<Pubkey>,
    ) -> (Vec<TradeCandidate>, Vec<MemeEvent>);
}

/// A [`SwapParser`] that recognizes nothing — useful as a safe default
/// when no protocol decoders are wired up yet.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullParser;

impl SwapParser for NullParser {
    fn parse(
        &self,
        _record: &TransactionRecord,
        _whitelist: &HashSet<Pubkey>,
    ) -> (Vec<TradeCandidate>, Vec<MemeEvent>) {
        (Vec::new(), Vec::new())
    }
}

pub struct TradeExtractor<P> {
    parser: P,
    whitelist: HashSet<Pubkey>,
}

impl<P: SwapParser> TradeExtractor<P> {
    pub fn new(parser: P, whitelist: HashSet<Pubkey>) -> Self {
        Self { parser, whitelist }
    }

    /// Decode `record`, wrapped in a fault barrier: a panicking parser
    /// yields an empty result with `total_trades = 0` rather than
    /// propagating (§4.2).
    pub fn extract(&self, record: &TransactionRecord) -> ExtractionOutput {
        let parser = &self.parser;
        let whitelist = &self.whitelist;

        let result = catch_unwind(AssertUnwindSafe(|| parser.parse(record, whitelist)));

        match result {
            Ok((trades, meme_events)) => {
                let stats = ExtractionStats {
                    total_trades: trades.len(),
                    total_meme_events: meme_events.len(),
                };
                ExtractionOutput {
                    trades,
                    meme_events,
                    stats,
                }
            }
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "parser panicked with a non-string payload".to_string());
                warn!(signature = %record.signature, message, "parser panicked, discarding transaction");
                ExtractionOutput::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signature;
    use swap_instrument::{TransactionMessage, TransactionMeta, TransactionVersion};

    fn record() -> TransactionRecord {
        TransactionRecord {
            signature: Signature::default(),
            slot: 1,
            message: TransactionMessage {
                version: TransactionVersion::Legacy,
                account_keys: vec![],
                instructions: vec![],
                address_table_lookups: vec![],
            },
            meta: TransactionMeta::default(),
            block_time: None,
            connection_id: swap_instrument::ConnectionId::new("c".into()),
        }
    }

    struct PanickingParser;
    impl SwapParser for PanickingParser {
        fn parse(
            &self,
            _record: &TransactionRecord,
            _whitelist: &HashSet<Pubkey>,
        ) -> (Vec<TradeCandidate>, Vec<MemeEvent>) {
            panic!("boom");
        }
    }

    #[test]
    fn null_parser_yields_empty_output() {
        let extractor = TradeExtractor::new(NullParser, HashSet::new());
        let output = extractor.extract(&record());
        assert_eq!(output.stats.total_trades, 0);
        assert!(output.trades.is_empty());
    }

    #[test]
    fn panicking_parser_is_contained_by_fault_barrier() {
        let extractor = TradeExtractor::new(PanickingParser, HashSet::new());
        let output = extractor.extract(&record());
        assert_eq!(output.stats, ExtractionStats::default());
    }
}
