use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

/// The value stored in the Price Index (D): the latest validated price
/// observation for a non-WSOL mint.
///
/// `slot` is kept in its decimal string-printed form per §3/§6 of the
/// specification — the wire contract serializes it as a string, not a
/// number, so the struct mirrors that rather than reparsing it to `u64`
/// and losing the distinction from [`TradeCandidate::slot`](crate::trade::TradeCandidate::slot).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Observation {
    pub mint: Pubkey,
    pub pool: Pubkey,
    pub avg_price: f64,
    pub program_id: Pubkey,
    pub slot: String,
    pub stored_at_ms: i64,
    pub last_access_ms: i64,
}

/// Reasons an [`Observation`] fails its own structural invariants, checked
/// independently of cache membership or program whitelisting.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ObservationError {
    #[error("avgPrice must be finite and positive, got {0}")]
    NonPositivePrice(String),
    #[error("pool must be a non-default pubkey")]
    EmptyPool,
    #[error("mint must be a non-default pubkey")]
    EmptyMint,
    #[error("slot must be non-empty")]
    EmptySlot,
}

impl Observation {
    /// Validate the structural invariants listed in §3/§8.1 that don't
    /// depend on the builder whitelist (that check is layered on top by
    /// the caller, since `Observation` itself must stay whitelist-agnostic).
    pub fn validate_structure(&self) -> Result<(), ObservationError> {
        if !(self.avg_price.is_finite() && self.avg_price > 0.0) {
            return Err(ObservationError::NonPositivePrice(self.avg_price.to_string()));
        }
        if self.pool == Pubkey::default() {
            return Err(ObservationError::EmptyPool);
        }
        if self.mint == Pubkey::default() {
            return Err(ObservationError::EmptyMint);
        }
        if self.slot.is_empty() {
            return Err(ObservationError::EmptySlot);
        }
        Ok(())
    }

    /// Estimated byte footprint of storing this entry in the Price Index,
    /// per the fixed per-language constant in §4.4.
    pub const BYTES_PER_ENTRY: usize = 400;
    pub const MAP_OVERHEAD: usize = 24;
    pub const KEY_REF_OVERHEAD: usize = 50;

    pub const ESTIMATED_FOOTPRINT_BYTES: usize =
        Self::BYTES_PER_ENTRY + Self::MAP_OVERHEAD + Self::KEY_REF_OVERHEAD;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> Observation {
        Observation {
            mint: Pubkey::new_unique(),
            pool: Pubkey::new_unique(),
            avg_price: 2000.0,
            program_id: Pubkey::new_unique(),
            slot: "123".into(),
            stored_at_ms: 0,
            last_access_ms: 0,
        }
    }

    #[test]
    fn valid_observation_passes() {
        assert!(valid().validate_structure().is_ok());
    }

    #[test]
    fn zero_price_rejected() {
        let mut o = valid();
        o.avg_price = 0.0;
        assert_eq!(
            o.validate_structure(),
            Err(ObservationError::NonPositivePrice("0".into()))
        );
    }

    #[test]
    fn nan_price_rejected() {
        let mut o = valid();
        o.avg_price = f64::NAN;
        assert!(o.validate_structure().is_err());
    }

    #[test]
    fn default_pool_rejected() {
        let mut o = valid();
        o.pool = Pubkey::default();
        assert_eq!(o.validate_structure(), Err(ObservationError::EmptyPool));
    }

    #[test]
    fn footprint_constant_matches_spec() {
        assert_eq!(Observation::ESTIMATED_FOOTPRINT_BYTES, 474);
    }
}
