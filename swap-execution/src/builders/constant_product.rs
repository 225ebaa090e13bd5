use crate::registry::{BuildParams, BuilderError, SwapInstructionBuilder};
use borsh::BorshSerialize;
use solana_sdk::{
    instruction::{AccountMeta, Instruction},
    pubkey::Pubkey,
};
use swap_instrument::TradeType;

/// Illustrative builder for a generic constant-product AMM pool, where the
/// pool account holds both token vaults and `pool` from the [`Observation`]
/// identifies the pool state account directly.
///
/// Vault derivation and token-program selection (Token vs Token-2022) are
/// protocol details explicitly out of scope (§1); this builder stands in
/// for any such encoder so the registry dispatch path (§4.5) has a second,
/// distinct market to exercise end to end.
///
/// [`Observation`]: swap_instrument::Observation
pub struct ConstantProductAmmBuilder {
    pub program_id: Pubkey,
    pub token_program_id: Pubkey,
}

#[derive(BorshSerialize)]
struct AmmSwapData {
    discriminator: [u8; 8],
    direction: u8,
    amount_in: u64,
    minimum_amount_out: u64,
}

const SWAP_DISCRIMINATOR: [u8; 8] = [0xf8, 0xc6, 0x9e, 0x91, 0xe1, 0x75, 0x87, 0xc8];

impl SwapInstructionBuilder for ConstantProductAmmBuilder {
    fn market(&self) -> &'static str {
        "constant_product_amm"
    }

    fn build(&self, params: &BuildParams) -> Result<Vec<Instruction>, BuilderError> {
        if params.observation.pool == Pubkey::default() {
            return Err(BuilderError::BuildFailed {
                market: self.market().into(),
                reason: "observation is missing a pool account".into(),
            });
        }

        let minimum_amount_out = scale_by_slippage(params.output_amount_raw, params.slippage_bps);

        let data = AmmSwapData {
            discriminator: SWAP_DISCRIMINATOR,
            direction: match params.side {
                TradeType::Buy => 0,
                TradeType::Sell => 1,
            },
            amount_in: params.input_amount_raw,
            minimum_amount_out,
        }
        .try_to_vec()
        .map_err(|e| BuilderError::BuildFailed {
            market: self.market().into(),
            reason: e.to_string(),
        })?;

        let accounts = vec![
            AccountMeta::new_readonly(params.signer, true),
            AccountMeta::new(params.observation.pool, false),
            AccountMeta::new(params.mint, false),
            AccountMeta::new_readonly(self.token_program_id, false),
        ];

        Ok(vec![Instruction {
            program_id: self.program_id,
            accounts,
            data,
        }])
    }
}

fn scale_by_slippage(amount_out: u64, slippage_bps: u16) -> u64 {
    let bps = (slippage_bps as u128).min(10_000);
    ((amount_out as u128) * (10_000 - bps) / 10_000) as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use swap_instrument::{AmountSpec, Observation};

    fn base_observation(mint: Pubkey, program_id: Pubkey) -> Observation {
        Observation {
            mint,
            pool: Pubkey::new_unique(),
            avg_price: 0.5,
            program_id,
            slot: "42".into(),
            stored_at_ms: 0,
            last_access_ms: 0,
        }
    }

    #[test]
    fn builds_instruction_for_sell_direction() {
        let program_id = Pubkey::new_unique();
        let builder = ConstantProductAmmBuilder {
            program_id,
            token_program_id: Pubkey::new_unique(),
        };
        let mint = Pubkey::new_unique();
        let params = BuildParams {
            mint,
            signer: Pubkey::new_unique(),
            side: TradeType::Sell,
            amount: AmountSpec::In(2_000),
            input_amount_raw: 2_000,
            output_amount_raw: 1_000,
            slippage_bps: 1000,
            observation: base_observation(mint, program_id),
        };

        let instructions = builder.build(&params).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(instructions[0].program_id, program_id);
    }

    #[test]
    fn rejects_observation_with_default_pool() {
        let program_id = Pubkey::new_unique();
        let builder = ConstantProductAmmBuilder {
            program_id,
            token_program_id: Pubkey::new_unique(),
        };
        let mint = Pubkey::new_unique();
        let mut observation = base_observation(mint, program_id);
        observation.pool = Pubkey::default();

        let params = BuildParams {
            mint,
            signer: Pubkey::new_unique(),
            side: TradeType::Buy,
            amount: AmountSpec::In(1),
            input_amount_raw: 1,
            output_amount_raw: 1,
            slippage_bps: 5000,
            observation,
        };

        assert!(builder.build(&params).is_err());
    }
}
