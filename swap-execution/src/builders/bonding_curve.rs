use crate::registry::{BuildParams, BuilderError, SwapInstructionBuilder};
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
    system_program,
};
use swap_instrument::TradeType;

/// Illustrative builder for launchpad-style bonding-curve protocols (the
/// "meme event" family in §4.3), where the pool identifier doubles as the
/// bonding-curve state account.
///
/// The actual instruction layout of any given protocol is out of scope
/// (§1) — this builder exists to demonstrate the uniform `build` contract
/// and to drive the end-to-end dispatch tests in §8, not to be a
/// protocol-accurate encoder.
pub struct BondingCurveBuilder {
    pub program_id: Pubkey,
}

#[derive(BorshSerialize)]
struct BondingCurveSwapData {
    discriminator: u8,
    amount_in: u64,
    min_amount_out: u64,
}

impl SwapInstructionBuilder for BondingCurveBuilder {
    fn market(&self) -> &'static str {
        "bonding_curve"
    }

    fn build(&self, params: &BuildParams) -> Result<Vec<Instruction>, BuilderError> {
        let min_amount_out = apply_slippage(params.output_amount_raw, params.slippage_bps);

        let data = BondingCurveSwapData {
            discriminator: match params.side {
                TradeType::Buy => 0,
                TradeType::Sell => 1,
            },
            amount_in: params.input_amount_raw,
            min_amount_out,
        }
        .try_to_vec()
        .map_err(|e| BuilderError::BuildFailed {
            market: self.market().into(),
            reason: e.to_string(),
        })?;

        let accounts = vec![
            AccountMeta::new(params.signer, true),
            AccountMeta::new(params.observation.pool, false),
            AccountMeta::new(params.mint, false),
            AccountMeta::new_readonly(system_program::ID, false),
        ];

        Ok(vec![Instruction {
            program_id: self.program_id,
            accounts,
            data,
        }])
    }
}

/// Apply a slippage tolerance (basis points) to compute a minimum
/// acceptable output amount.
fn apply_slippage(amount_out: u64, slippage_bps: u16) -> u64 {
    let bps = slippage_bps as u128;
    let reduced = (amount_out as u128) * (10_000u128 - bps.min(10_000)) / 10_000;
    reduced as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_instrument::{AmountSpec, Observation};

    fn params() -> BuildParams {
        BuildParams {
            mint: Pubkey::new_unique(),
            signer: Pubkey::new_unique(),
            side: TradeType::Buy,
            amount: AmountSpec::In(1_000_000),
            input_amount_raw: 1_000_000,
            output_amount_raw: 500,
            slippage_bps: 5000,
            observation: Observation {
                mint: Pubkey::new_unique(),
                pool: Pubkey::new_unique(),
                avg_price: 2000.0,
                program_id: Pubkey::new_unique(),
                slot: "1".into(),
                stored_at_ms: 0,
                last_access_ms: 0,
            },
        }
    }

    #[test]
    fn builds_one_instruction_with_signer_as_writable_signer() {
        let builder = BondingCurveBuilder {
            program_id: Pubkey::new_unique(),
        };
        let p = params();
        let instructions = builder.build(&p).unwrap();

        assert_eq!(instructions.len(), 1);
        let ix = &instructions[0];
        assert_eq!(ix.program_id, builder.program_id);
        assert_eq!(ix.accounts[0].pubkey, p.signer);
        assert!(ix.accounts[0].is_signer);
        assert!(ix.accounts[0].is_writable);
    }

    #[test]
    fn slippage_lowers_minimum_output() {
        assert_eq!(apply_slippage(1000, 1000), 900); // 10% slippage tolerance
        assert_eq!(apply_slippage(1000, 10000), 0);
        assert_eq!(apply_slippage(1000, 0), 1000);
    }
}
