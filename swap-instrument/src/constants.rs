use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::sync::LazyLock;

/// Wrapped native SOL mint — the universal quote token for every supported DEX.
pub const WSOL_MINT_STR: &str = "So11111111111111111111111111111111111111112";

/// Lazily-parsed [`Pubkey`] for [`WSOL_MINT_STR`].
///
/// Parsed once at first use rather than hard-coded as a byte array so the
/// canonical string constant above stays the single source of truth.
pub static WSOL_MINT: LazyLock<Pubkey> =
    LazyLock::new(|| Pubkey::from_str(WSOL_MINT_STR).expect("WSOL_MINT_STR is a valid pubkey"));

/// `true` if both mints are WSOL — the "SOL-SOL" noise filter in the trade validator.
pub fn is_sol_sol(input_mint: &Pubkey, output_mint: &Pubkey) -> bool {
    *input_mint == *WSOL_MINT && *output_mint == *WSOL_MINT
}

/// Lower bound (inclusive) of the accepted slippage window, in basis points.
pub const MIN_SLIPPAGE_BPS: u16 = 1000;

/// Upper bound (inclusive) of the accepted slippage window, in basis points.
pub const MAX_SLIPPAGE_BPS: u16 = 10000;

/// Minimum absolute lamport delta considered meaningful by the balance-delta
/// average-price fallback (step 4 of the trade validator).
pub const MIN_SIGNIFICANT_LAMPORT_DELTA: i64 = 1_000_000;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wsol_mint_parses() {
        assert_eq!(WSOL_MINT.to_string(), WSOL_MINT_STR);
    }

    #[test]
    fn sol_sol_filter() {
        let other = Pubkey::new_unique();
        assert!(is_sol_sol(&WSOL_MINT, &WSOL_MINT));
        assert!(!is_sol_sol(&WSOL_MINT, &other));
        assert!(!is_sol_sol(&other, &WSOL_MINT));
    }
}
