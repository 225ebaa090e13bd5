//! Construction of the process-wide Builder Registry (E) and aggregator
//! label table (G). The per-protocol instruction encoders are out of
//! scope (§1); the two builders registered here are the illustrative
//! bonding-curve and constant-product-AMM shapes `swap-execution` ships,
//! wired to the public program identifiers of the real protocols they
//! stand in for so the dispatch/whitelist path is exercised against
//! recognisable addresses rather than opaque placeholders.

use std::str::FromStr;
use std::sync::Arc;

use solana_sdk::pubkey::Pubkey;
use swap_execution::{BondingCurveBuilder, BuilderRegistry, ConstantProductAmmBuilder, LabelTable};

/// Pump.fun's bonding-curve program — the launchpad-style protocol whose
/// "meme events" the Trade Validator's pool-join fallback (§4.3 step 5)
/// is built against.
const PUMP_FUN_PROGRAM_ID: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";

/// Raydium's AMM v4 program — stands in for the generic constant-product
/// market the second illustrative builder targets.
const RAYDIUM_AMM_V4_PROGRAM_ID: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";

const SPL_TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";

pub fn build_registry() -> BuilderRegistry {
    let mut registry = BuilderRegistry::new();

    let pump_fun = Pubkey::from_str(PUMP_FUN_PROGRAM_ID).expect("valid pump.fun program id");
    registry.register(pump_fun, Arc::new(BondingCurveBuilder { program_id: pump_fun }));

    let raydium =
        Pubkey::from_str(RAYDIUM_AMM_V4_PROGRAM_ID).expect("valid raydium amm v4 program id");
    let token_program =
        Pubkey::from_str(SPL_TOKEN_PROGRAM_ID).expect("valid spl token program id");
    registry.register(
        raydium,
        Arc::new(ConstantProductAmmBuilder {
            program_id: raydium,
            token_program_id: token_program,
        }),
    );

    registry
}

/// The aggregator route-label -> program-id table consumed by the
/// External Price Fallback (G, §4.7).
pub fn build_label_table() -> LabelTable {
    LabelTable::new(vec![
        ("Pump.fun", PUMP_FUN_PROGRAM_ID),
        ("Raydium", RAYDIUM_AMM_V4_PROGRAM_ID),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_has_both_illustrative_builders() {
        let registry = build_registry();
        assert_eq!(registry.supported_program_ids().len(), 2);
        assert!(registry.supported_markets().contains(&"bonding_curve"));
        assert!(registry.supported_markets().contains(&"constant_product_amm"));
    }
}
