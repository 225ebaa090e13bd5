use solana_sdk::{instruction::Instruction, pubkey::Pubkey};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use swap_instrument::{AmountSpec, Observation, TradeType};
use thiserror::Error;

/// Uniform build parameters for every protocol-specific builder (§4.5).
#[derive(Debug, Clone)]
pub struct BuildParams {
    pub mint: Pubkey,
    pub signer: Pubkey,
    pub side: TradeType,
    pub amount: AmountSpec,
    pub input_amount_raw: u64,
    pub output_amount_raw: u64,
    pub slippage_bps: u16,
    pub observation: Observation,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("no builder registered for program {0}")]
    UnsupportedProgram(Pubkey),

    #[error("builder for {market} failed to assemble instructions: {reason}")]
    BuildFailed { market: String, reason: String },
}

/// A protocol-specific swap-instruction builder. Individual builders may
/// consult the chain for pool state, derived addresses and reserves; those
/// reads are authoritative but deliberately out of scope here (§4.5) — the
/// trait only commits to the uniform `build` contract.
pub trait SwapInstructionBuilder: Send + Sync {
    /// Short market tag surfaced by [`BuilderRegistry::market_for_program_id`].
    fn market(&self) -> &'static str;

    fn build(&self, params: &BuildParams) -> Result<Vec<Instruction>, BuilderError>;
}

struct Registration {
    market: &'static str,
    builder: Arc<dyn SwapInstructionBuilder>,
}

/// Maps a DEX program identifier to its builder and market tag. The set of
/// keys (`supported_program_ids`) *is* the whitelist consumed upstream by
/// the Trade Validator (C) and the Price Index (D) — adding or removing a
/// builder immediately changes which trades are admitted (§4.5).
#[derive(Default)]
pub struct BuilderRegistry {
    registrations: HashMap<Pubkey, Registration>,
}

impl BuilderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        program_id: Pubkey,
        builder: Arc<dyn SwapInstructionBuilder>,
    ) -> &mut Self {
        let market = builder.market();
        self.registrations.insert(program_id, Registration { market, builder });
        self
    }

    pub fn has_builder(&self, program_id: &Pubkey) -> bool {
        self.registrations.contains_key(program_id)
    }

    pub fn market_for_program_id(&self, program_id: &Pubkey) -> Option<&'static str> {
        self.registrations.get(program_id).map(|r| r.market)
    }

    pub fn supported_program_ids(&self) -> HashSet<Pubkey> {
        self.registrations.keys().copied().collect()
    }

    /// Human-readable list for error messages (§7 "Unsupported protocol").
    pub fn supported_markets(&self) -> Vec<&'static str> {
        self.registrations.values().map(|r| r.market).collect()
    }

    pub fn build(
        &self,
        program_id: &Pubkey,
        params: &BuildParams,
    ) -> Result<Vec<Instruction>, BuilderError> {
        let registration = self
            .registrations
            .get(program_id)
            .ok_or(BuilderError::UnsupportedProgram(*program_id))?;

        registration.builder.build(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct StubBuilder;
    impl SwapInstructionBuilder for StubBuilder {
        fn market(&self) -> &'static str {
            "stub"
        }

        fn build(&self, _params: &BuildParams) -> Result<Vec<Instruction>, BuilderError> {
            Ok(vec![])
        }
    }

    fn params(mint: Pubkey, observation: Observation) -> BuildParams {
        BuildParams {
            mint,
            signer: Pubkey::new_unique(),
            side: TradeType::Buy,
            amount: AmountSpec::In(1),
            input_amount_raw: 1,
            output_amount_raw: 1,
            slippage_bps: 5000,
            observation,
        }
    }

    fn observation(mint: Pubkey, program_id: Pubkey) -> Observation {
        Observation {
            mint,
            pool: Pubkey::new_unique(),
            avg_price: 1.0,
            program_id,
            slot: "1".into(),
            stored_at_ms: 0,
            last_access_ms: 0,
        }
    }

    #[test]
    fn build_dispatches_to_registered_builder() {
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();
        let mut registry = BuilderRegistry::new();
        registry.register(program, Arc::new(StubBuilder));

        assert!(registry.has_builder(&program));
        assert_eq!(registry.market_for_program_id(&program), Some("stub"));

        let result = registry.build(&program, &params(mint, observation(mint, program)));
        assert!(result.is_ok());
    }

    #[test]
    fn build_rejects_unsupported_program() {
        let registry = BuilderRegistry::new();
        let program = Pubkey::new_unique();
        let mint = Pubkey::new_unique();

        let err = registry
            .build(&program, &params(mint, observation(mint, program)))
            .unwrap_err();
        assert_eq!(err, BuilderError::UnsupportedProgram(program));
    }

    #[test]
    fn supported_program_ids_tracks_registrations() {
        let mut registry = BuilderRegistry::new();
        assert!(registry.supported_program_ids().is_empty());

        let program = Pubkey::new_unique();
        registry.register(program, Arc::new(StubBuilder));
        assert_eq!(registry.supported_program_ids().len(), 1);
        assert!(registry.supported_program_ids().contains(&program));
    }
}
