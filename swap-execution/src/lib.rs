//! The Builder Registry (E) and External Price Fallback (G): dispatching
//! swap-instruction assembly to a protocol-specific builder, and falling
//! back to an external aggregator quote when the Price Index has nothing
//! usable for a mint.

pub mod builders;
pub mod fallback;
pub mod registry;

pub use builders::{BondingCurveBuilder, ConstantProductAmmBuilder};
pub use fallback::{
    AggregatorQuote, FallbackError, FallbackLookup, HttpPriceAggregator, LabelTable,
    PriceAggregator, RouteLeg, PROBE_AMOUNT_LAMPORTS,
};
pub use registry::{BuildParams, BuilderError, BuilderRegistry, SwapInstructionBuilder};
