use crate::{observation::Observation, trade::TradeType};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

/// Text encoding applied to the serialized, unsigned transaction returned
/// by the Quote/Swap API (F).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionEncoding {
    #[default]
    Base64,
    Base58,
}

/// Exactly one of `amount_in`/`amount_out` must be supplied and positive —
/// enforced at the HTTP boundary in `swap-api`, represented here as an enum
/// so downstream code can't observe the "neither" or "both" states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum AmountSpec {
    In(u64),
    Out(u64),
}

/// A validated request to assemble an unsigned swap transaction — the
/// Builder Registry's (E) `build` parameters, assembled by F from the
/// inbound HTTP body plus the resolved [`Observation`].
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SwapRequest {
    pub mint: Pubkey,
    pub signer: Pubkey,
    pub side: TradeType,
    pub amount: AmountSpec,
    pub slippage_bps: u16,
    pub quote_override: Option<Observation>,
    pub encoding: TransactionEncoding,
}

/// F's output: the encoded unsigned transaction plus a success flag, per §3/§6.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct SwapResult {
    pub success: bool,
    pub tx: String,
}

/// Resolved input/output raw amounts for a swap, derived from an
/// [`AmountSpec`] and an [`Observation::avg_price`] per the projection
/// rules in §4.6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProjectedAmounts {
    pub input_amount_raw: u64,
    pub output_amount_raw: u64,
}

impl SwapRequest {
    /// Project `self.amount` into both sides of the trade using `avg_price`,
    /// following the four buy/sell × amountIn/amountOut cases in §4.6.
    ///
    /// `avg_price` is quote-per-base (WSOL per unit of the non-WSOL mint),
    /// matching [`Observation::avg_price`].
    pub fn project_amounts(&self, avg_price: f64) -> ProjectedAmounts {
        match (self.side, self.amount) {
            (TradeType::Buy, AmountSpec::In(amount_in)) => ProjectedAmounts {
                input_amount_raw: amount_in,
                output_amount_raw: (amount_in as f64 / avg_price) as u64,
            },
            (TradeType::Buy, AmountSpec::Out(amount_out)) => ProjectedAmounts {
                input_amount_raw: (amount_out as f64 * avg_price) as u64,
                output_amount_raw: amount_out,
            },
            (TradeType::Sell, AmountSpec::In(amount_in)) => ProjectedAmounts {
                input_amount_raw: amount_in,
                output_amount_raw: (amount_in as f64 * avg_price).floor() as u64,
            },
            (TradeType::Sell, AmountSpec::Out(amount_out)) => ProjectedAmounts {
                input_amount_raw: (amount_out as f64 / avg_price).floor() as u64,
                output_amount_raw: amount_out,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(side: TradeType, amount: AmountSpec) -> SwapRequest {
        SwapRequest {
            mint: Pubkey::new_unique(),
            signer: Pubkey::new_unique(),
            side,
            amount,
            slippage_bps: 5000,
            quote_override: None,
            encoding: TransactionEncoding::Base64,
        }
    }

    #[test]
    fn buy_amount_in_divides_by_price() {
        let req = request(TradeType::Buy, AmountSpec::In(1_000_000));
        let projected = req.project_amounts(2000.0);
        assert_eq!(projected.input_amount_raw, 1_000_000);
        assert_eq!(projected.output_amount_raw, 500);
    }

    #[test]
    fn buy_amount_out_multiplies_by_price() {
        let req = request(TradeType::Buy, AmountSpec::Out(500));
        let projected = req.project_amounts(2000.0);
        assert_eq!(projected.output_amount_raw, 500);
        assert_eq!(projected.input_amount_raw, 1_000_000);
    }

    #[test]
    fn sell_amount_in_multiplies_and_floors() {
        let req = request(TradeType::Sell, AmountSpec::In(7));
        let projected = req.project_amounts(2.5);
        assert_eq!(projected.input_amount_raw, 7);
        assert_eq!(projected.output_amount_raw, 17); // floor(17.5)
    }

    #[test]
    fn sell_amount_out_divides_and_floors() {
        let req = request(TradeType::Sell, AmountSpec::Out(17));
        let projected = req.project_amounts(2.5);
        assert_eq!(projected.output_amount_raw, 17);
        assert_eq!(projected.input_amount_raw, 6); // floor(17/2.5) = floor(6.8)
    }

    #[test]
    fn default_encoding_is_base64() {
        assert_eq!(TransactionEncoding::default(), TransactionEncoding::Base64);
    }
}
