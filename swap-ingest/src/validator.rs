//! Trade Validator (C, §4.3): turns each [`TradeCandidate`] produced by B
//! into either an [`Observation`] or a typed, counted [`RejectionReason`].
//! The seven steps below run in the fixed order the specification lays
//! out; each step's output feeds the next.

use solana_sdk::pubkey::Pubkey;
use swap_instrument::{
    constants::{is_sol_sol, MIN_SIGNIFICANT_LAMPORT_DELTA, WSOL_MINT},
    MemeEvent, Observation, TradeCandidate, TradeType, TransactionMeta,
};
use thiserror::Error;

/// Why a candidate failed validation. Counted by callers but never
/// surfaced to HTTP clients (§4.3: "a human-readable reason that is
/// counted but not propagated").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectionReason {
    #[error("input and output mints are both WSOL")]
    SolSolNoise,

    #[error("mint could not be resolved")]
    MissingMint,

    #[error("pool could not be resolved")]
    MissingPool,

    #[error("average price is not positive")]
    NonPositivePrice,

    #[error("program id is missing or not whitelisted")]
    ProgramNotWhitelisted,

    #[error("slot is missing")]
    MissingSlot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub accepted: usize,
    pub rejected: usize,
}

pub struct TradeValidator<'a> {
    whitelist: &'a std::collections::HashSet<Pubkey>,
}

impl<'a> TradeValidator<'a> {
    pub fn new(whitelist: &'a std::collections::HashSet<Pubkey>) -> Self {
        Self { whitelist }
    }

    /// Validate every candidate extracted from a single transaction,
    /// returning the accepted observations, the rejections (with reason),
    /// and the running tallies. Candidates are processed together because
    /// several repair steps (amount/pool/mint borrowing) draw on sibling
    /// candidates from the same transaction (§4.3).
    pub fn validate_batch(
        &self,
        candidates: Vec<TradeCandidate>,
        meta: &TransactionMeta,
        meme_events: &[MemeEvent],
        now_ms: i64,
    ) -> (Vec<Observation>, Vec<RejectionReason>, ValidationStats) {
        let siblings = candidates.clone();
        let mut observations = Vec::new();
        let mut rejections = Vec::new();
        let mut stats = ValidationStats::default();

        for candidate in candidates {
            match self.validate_one(candidate, &siblings, meta, meme_events, now_ms) {
                Ok(observation) => {
                    stats.accepted += 1;
                    observations.push(observation);
                }
                Err(reason) => {
                    stats.rejected += 1;
                    rejections.push(reason);
                }
            }
        }

        (observations, rejections, stats)
    }

    fn validate_one(
        &self,
        mut candidate: TradeCandidate,
        siblings: &[TradeCandidate],
        meta: &TransactionMeta,
        meme_events: &[MemeEvent],
        now_ms: i64,
    ) -> Result<Observation, RejectionReason> {
        // Step 1: SOL-SOL filter.
        if is_sol_sol(&candidate.input_mint, &candidate.output_mint) {
            return Err(RejectionReason::SolSolNoise);
        }

        // Step 2: amount repair.
        if candidate.has_zero_amount() {
            repair_amounts(&mut candidate, siblings);
        }

        // Step 3: average-price computation.
        let mut avg_price = compute_avg_price(&candidate);

        // Step 4: balance-delta fallback.
        if avg_price <= 0.0 {
            if let Some(fallback) = balance_delta_fallback(&candidate, meta) {
                avg_price = fallback;
            }
        }

        // Step 5: pool resolution.
        let pool = resolve_pool(&candidate, meme_events);

        // Step 6: mint resolution.
        let mint = resolve_mint(&candidate, siblings);

        // Step 7: final validation.
        let mint = mint.ok_or(RejectionReason::MissingMint)?;
        let pool = pool.ok_or(RejectionReason::MissingPool)?;
        if avg_price <= 0.0 || !avg_price.is_finite() {
            return Err(RejectionReason::NonPositivePrice);
        }
        if candidate.program_id == Pubkey::default()
            || !self.whitelist.contains(&candidate.program_id)
        {
            return Err(RejectionReason::ProgramNotWhitelisted);
        }

        Ok(Observation {
            mint,
            pool,
            avg_price,
            program_id: candidate.program_id,
            slot: candidate.slot.to_string(),
            stored_at_ms: now_ms,
            last_access_ms: now_ms,
        })
    }
}

/// Borrow the missing amount side from a sibling candidate sharing at
/// least one mint; fall back to the first sibling with non-zero amounts
/// (§4.3 step 2).
fn repair_amounts(candidate: &mut TradeCandidate, siblings: &[TradeCandidate]) {
    let sharing_sibling = siblings
        .iter()
        .find(|s| s.signature == candidate.signature && !s.has_zero_amount() && s.shares_mint_with(candidate));

    let donor = sharing_sibling.or_else(|| {
        siblings
            .iter()
            .find(|s| s.signature == candidate.signature && !s.has_zero_amount())
    });

    if let Some(donor) = donor {
        if candidate.input_amount_raw == 0 {
            candidate.input_amount_raw = donor.input_amount_raw;
        }
        if candidate.output_amount_raw == 0 {
            candidate.output_amount_raw = donor.output_amount_raw;
        }
    }
}

/// `inputAmountRaw / outputAmountRaw` for BUY, the inverse for SELL, in raw
/// (decimals-ignored) units (§4.3 step 3).
fn compute_avg_price(candidate: &TradeCandidate) -> f64 {
    if candidate.output_amount_raw == 0 || candidate.input_amount_raw == 0 {
        return 0.0;
    }

    match candidate.kind {
        TradeType::Buy => candidate.input_amount_raw as f64 / candidate.output_amount_raw as f64,
        TradeType::Sell => candidate.output_amount_raw as f64 / candidate.input_amount_raw as f64,
    }
}

/// Scan pre/post SOL and token balances for a significant delta and derive
/// `|deltaSOL| / |deltaToken|` when both exist (§4.3 step 4).
fn balance_delta_fallback(candidate: &TradeCandidate, meta: &TransactionMeta) -> Option<f64> {
    let sol_delta = meta
        .pre_balances
        .iter()
        .zip(meta.post_balances.iter())
        .map(|(pre, post)| post - pre)
        .find(|delta| delta.unsigned_abs() as i64 > MIN_SIGNIFICANT_LAMPORT_DELTA)?;

    let mint = candidate.non_wsol_mint()?;

    let token_delta = meta
        .post_token_balances
        .iter()
        .filter(|post| post.mint == mint)
        .find_map(|post| {
            let pre_amount = meta
                .pre_token_balances
                .iter()
                .find(|pre| pre.account_index == post.account_index && pre.mint == mint)
                .map(|pre| pre.amount_raw as i128)
                .unwrap_or(0);
            let delta = post.amount_raw as i128 - pre_amount;
            if delta != 0 {
                Some(delta)
            } else {
                None
            }
        })?;

    if sol_delta == 0 || token_delta == 0 {
        return None;
    }

    Some(sol_delta.unsigned_abs() as f64 / token_delta.unsigned_abs() as f64)
}

/// Resolve the pool: use `candidate.pool` directly if present, otherwise
/// join with the meme-event list in three progressively looser steps
/// (§4.3 step 5).
fn resolve_pool(candidate: &TradeCandidate, meme_events: &[MemeEvent]) -> Option<Pubkey> {
    if let Some(pool) = candidate.pool {
        return Some(pool);
    }

    // Strength 1: same signature and same instruction index isn't tracked
    // on TradeCandidate directly, so this join degrades to same signature
    // with an exact pair match, which is the strongest signal available.
    let same_signature_and_pair = meme_events.iter().find(|event| {
        event.signature == candidate.signature
            && event.pair_matches(&candidate.input_mint, &candidate.output_mint)
    });
    if let Some(event) = same_signature_and_pair {
        if let Some(pool) = event.bonding_curve {
            return Some(pool);
        }
    }

    // Strength 2: same user and matching base/quote pair.
    let same_user_and_pair = meme_events.iter().find(|event| {
        event.user == candidate.user
            && event.pair_matches(&candidate.input_mint, &candidate.output_mint)
    });
    if let Some(event) = same_user_and_pair {
        if let Some(pool) = event.bonding_curve {
            return Some(pool);
        }
    }

    // Strength 3: same user, any pair.
    meme_events
        .iter()
        .find(|event| event.user == candidate.user)
        .and_then(|event| event.bonding_curve)
}

/// `outputMint` if non-WSOL, else `inputMint`; borrow from a sibling in the
/// same transaction if neither side qualifies (§4.3 step 6).
fn resolve_mint(candidate: &TradeCandidate, siblings: &[TradeCandidate]) -> Option<Pubkey> {
    if let Some(mint) = candidate.non_wsol_mint() {
        return Some(mint);
    }

    siblings
        .iter()
        .filter(|s| s.signature == candidate.signature)
        .find_map(|s| s.non_wsol_mint())
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signature;
    use std::collections::HashSet;

    fn candidate(
        kind: TradeType,
        input: Pubkey,
        output: Pubkey,
        in_amt: u64,
        out_amt: u64,
        program_id: Pubkey,
        pool: Option<Pubkey>,
        signature: Signature,
    ) -> TradeCandidate {
        TradeCandidate {
            kind,
            input_mint: input,
            output_mint: output,
            input_amount_raw: in_amt,
            output_amount_raw: out_amt,
            program_id,
            pool,
            signature,
            slot: 42,
            user: Pubkey::new_unique(),
        }
    }

    #[test]
    fn rejects_sol_sol_noise() {
        let whitelist = HashSet::new();
        let validator = TradeValidator::new(&whitelist);
        let candidate = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            *WSOL_MINT,
            1,
            1,
            Pubkey::new_unique(),
            Some(Pubkey::new_unique()),
            Signature::default(),
        );
        let (obs, rejections, stats) =
            validator.validate_batch(vec![candidate], &TransactionMeta::default(), &[], 0);
        assert!(obs.is_empty());
        assert_eq!(rejections, vec![RejectionReason::SolSolNoise]);
        assert_eq!(stats.rejected, 1);
    }

    #[test]
    fn accepts_well_formed_candidate() {
        let program = Pubkey::new_unique();
        let mut whitelist = HashSet::new();
        whitelist.insert(program);
        let validator = TradeValidator::new(&whitelist);

        let mint = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let candidate = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            1_000_000,
            500,
            program,
            Some(pool),
            Signature::default(),
        );

        let (obs, rejections, stats) =
            validator.validate_batch(vec![candidate], &TransactionMeta::default(), &[], 1000);
        assert!(rejections.is_empty());
        assert_eq!(stats.accepted, 1);
        assert_eq!(obs.len(), 1);
        assert_eq!(obs[0].mint, mint);
        assert_eq!(obs[0].pool, pool);
        assert_eq!(obs[0].avg_price, 2000.0);
    }

    #[test]
    fn borrows_amount_from_sharing_sibling() {
        let program = Pubkey::new_unique();
        let mut whitelist = HashSet::new();
        whitelist.insert(program);
        let validator = TradeValidator::new(&whitelist);

        let mint = Pubkey::new_unique();
        let pool = Pubkey::new_unique();
        let signature = Signature::default();

        let zero_amount = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            0,
            0,
            program,
            Some(pool),
            signature,
        );
        let sibling_with_amounts = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            2_000_000,
            1_000,
            program,
            Some(pool),
            signature,
        );

        let (obs, rejections, stats) = validator.validate_batch(
            vec![zero_amount, sibling_with_amounts],
            &TransactionMeta::default(),
            &[],
            1000,
        );
        assert_eq!(stats.accepted, 2);
        assert!(rejections.is_empty());
        assert_eq!(obs[0].avg_price, obs[1].avg_price);
    }

    #[test]
    fn rejects_missing_pool() {
        let program = Pubkey::new_unique();
        let mut whitelist = HashSet::new();
        whitelist.insert(program);
        let validator = TradeValidator::new(&whitelist);

        let mint = Pubkey::new_unique();
        let candidate = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            1_000_000,
            500,
            program,
            None,
            Signature::default(),
        );

        let (obs, rejections, _) =
            validator.validate_batch(vec![candidate], &TransactionMeta::default(), &[], 1000);
        assert!(obs.is_empty());
        assert_eq!(rejections, vec![RejectionReason::MissingPool]);
    }

    #[test]
    fn rejects_unwhitelisted_program() {
        let whitelist = HashSet::new();
        let validator = TradeValidator::new(&whitelist);
        let mint = Pubkey::new_unique();
        let candidate = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            1_000_000,
            500,
            Pubkey::new_unique(),
            Some(Pubkey::new_unique()),
            Signature::default(),
        );

        let (obs, rejections, _) =
            validator.validate_batch(vec![candidate], &TransactionMeta::default(), &[], 1000);
        assert!(obs.is_empty());
        assert_eq!(rejections, vec![RejectionReason::ProgramNotWhitelisted]);
    }

    #[test]
    fn resolves_pool_from_meme_event_by_signature() {
        let program = Pubkey::new_unique();
        let mut whitelist = HashSet::new();
        whitelist.insert(program);
        let validator = TradeValidator::new(&whitelist);

        let mint = Pubkey::new_unique();
        let signature = Signature::default();
        let candidate = candidate(
            TradeType::Buy,
            *WSOL_MINT,
            mint,
            1_000_000,
            500,
            program,
            None,
            signature,
        );

        let bonding_curve = Pubkey::new_unique();
        let meme_event = MemeEvent {
            signature,
            instruction_index: 0,
            user: candidate.user,
            base_mint: Some(mint),
            quote_mint: Some(*WSOL_MINT),
            bonding_curve: Some(bonding_curve),
        };

        let (obs, rejections, _) = validator.validate_batch(
            vec![candidate],
            &TransactionMeta::default(),
            &[meme_event],
            1000,
        );
        assert!(rejections.is_empty());
        assert_eq!(obs[0].pool, bonding_curve);
    }
}
