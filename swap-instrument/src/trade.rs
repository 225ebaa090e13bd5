use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Direction of a trade. `Buy` moves value quote (WSOL) -> base; `Sell`
/// moves base -> quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeType {
    Buy,
    Sell,
}

/// A trade candidate produced by the Trade Extractor (B), before validation.
///
/// Ephemeral: it exists only on the pipeline stack between B and the Trade
/// Validator (C); it is never stored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TradeCandidate {
    pub kind: TradeType,
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,
    pub input_amount_raw: u64,
    pub output_amount_raw: u64,
    pub program_id: Pubkey,
    pub pool: Option<Pubkey>,
    pub signature: Signature,
    pub slot: u64,
    pub user: Pubkey,
}

impl TradeCandidate {
    /// The non-WSOL mint side of this candidate, if any — used both by the
    /// mint-resolution step of validation and by sibling amount/mint
    /// borrowing.
    pub fn non_wsol_mint(&self) -> Option<Pubkey> {
        use crate::constants::WSOL_MINT;
        if self.output_mint != *WSOL_MINT {
            Some(self.output_mint)
        } else if self.input_mint != *WSOL_MINT {
            Some(self.input_mint)
        } else {
            None
        }
    }

    pub fn has_zero_amount(&self) -> bool {
        self.input_amount_raw == 0 || self.output_amount_raw == 0
    }

    /// `true` if this candidate shares at least one mint with `other` —
    /// the sibling-matching criterion used by the amount-repair step.
    pub fn shares_mint_with(&self, other: &TradeCandidate) -> bool {
        self.input_mint == other.input_mint
            || self.input_mint == other.output_mint
            || self.output_mint == other.input_mint
            || self.output_mint == other.output_mint
    }
}

/// An auxiliary bonding-curve creation/update log record, emitted alongside
/// a trade by launchpad-style protocols. Used by the validator's pool-join
/// fallback when a [`TradeCandidate`] itself lacks a `pool`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MemeEvent {
    pub signature: Signature,
    pub instruction_index: u8,
    pub user: Pubkey,
    pub base_mint: Option<Pubkey>,
    pub quote_mint: Option<Pubkey>,
    pub bonding_curve: Option<Pubkey>,
}

impl MemeEvent {
    /// `true` if this event's base/quote pair matches the candidate's
    /// mint pair, independent of order — the join-strength-2 criterion.
    pub fn pair_matches(&self, input_mint: &Pubkey, output_mint: &Pubkey) -> bool {
        match (self.base_mint, self.quote_mint) {
            (Some(base), Some(quote)) => {
                (base == *input_mint && quote == *output_mint)
                    || (base == *output_mint && quote == *input_mint)
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(input: Pubkey, output: Pubkey, in_amt: u64, out_amt: u64) -> TradeCandidate {
        TradeCandidate {
            kind: TradeType::Buy,
            input_mint: input,
            output_mint: output,
            input_amount_raw: in_amt,
            output_amount_raw: out_amt,
            program_id: Pubkey::new_unique(),
            pool: None,
            signature: Signature::default(),
            slot: 1,
            user: Pubkey::new_unique(),
        }
    }

    #[test]
    fn shares_mint_with_detects_overlap() {
        let a_mint = Pubkey::new_unique();
        let b_mint = Pubkey::new_unique();
        let c_mint = Pubkey::new_unique();

        let d_mint = Pubkey::new_unique();
        let a = candidate(a_mint, b_mint, 1, 2);
        let b = candidate(b_mint, c_mint, 1, 2);
        let unrelated = candidate(c_mint, d_mint, 1, 2);

        assert!(a.shares_mint_with(&b));
        assert!(!a.shares_mint_with(&unrelated));
    }

    #[test]
    fn meme_event_pair_matches_either_order() {
        let base = Pubkey::new_unique();
        let quote = Pubkey::new_unique();
        let event = MemeEvent {
            signature: Signature::default(),
            instruction_index: 0,
            user: Pubkey::new_unique(),
            base_mint: Some(base),
            quote_mint: Some(quote),
            bonding_curve: Some(Pubkey::new_unique()),
        };

        assert!(event.pair_matches(&base, &quote));
        assert!(event.pair_matches(&quote, &base));

        let other = Pubkey::new_unique();
        assert!(!event.pair_matches(&base, &other));
    }
}
