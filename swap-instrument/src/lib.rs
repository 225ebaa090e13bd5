//! Core data model for the swap-quote-service.
//!
//! Defines the wire/domain types that flow between the Transaction Source,
//! Trade Extractor, Trade Validator, Price Index, Builder Registry and
//! Quote/Swap API components, plus the fixed constants shared across all of
//! them (the WSOL mint, slippage bounds).

pub mod constants;
pub mod observation;
pub mod swap_request;
pub mod trade;
pub mod transaction;

pub use constants::WSOL_MINT;
pub use observation::{Observation, ObservationError};
pub use swap_request::{AmountSpec, ProjectedAmounts, SwapRequest, SwapResult, TransactionEncoding};
pub use trade::{MemeEvent, TradeCandidate, TradeType};
pub use transaction::{
    AddressTableLookup, CompiledInstruction, ConnectionId, InnerInstructions, TokenBalance,
    TransactionMessage, TransactionMeta, TransactionRecord, TransactionVersion,
};
