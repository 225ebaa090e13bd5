use derive_more::{Constructor, Display, From};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};

/// Opaque identifier of the subscription that produced a [`TransactionRecord`].
///
/// Generated fresh on every successful reconnect of the Transaction Source
/// (A) so that stragglers from a torn-down connection can be identified and
/// dropped during a race with the replacement connection.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, Display, From, Constructor, Deserialize, Serialize,
)]
pub struct ConnectionId(pub String);

/// Whether a [`TransactionMessage`] used the legacy wire format or the
/// versioned (v0) format with address-table lookups.
///
/// Modeled as a discriminated union per the REDESIGN FLAG calling for
/// version-conditional field access to be replaced with a tagged variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum TransactionVersion {
    Legacy,
    V0,
}

/// A single compiled instruction: an index into `account_keys` for the
/// program, indices into `account_keys` for the accounts, and raw
/// instruction data.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CompiledInstruction {
    pub program_id_index: u8,
    pub accounts: Vec<u8>,
    pub data: Vec<u8>,
}

/// An address-table lookup entry present only on v0 messages.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AddressTableLookup {
    pub account_key: Pubkey,
    pub writable_indexes: Vec<u8>,
    pub readonly_indexes: Vec<u8>,
}

/// The account-key list and instruction list of a transaction, tagged with
/// its wire version.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionMessage {
    pub version: TransactionVersion,
    pub account_keys: Vec<Pubkey>,
    pub instructions: Vec<CompiledInstruction>,
    pub address_table_lookups: Vec<AddressTableLookup>,
}

impl TransactionMessage {
    /// Resolve the [`TransactionVersion`] the way §4.2 specifies: a header
    /// field is used directly when present; otherwise the presence of
    /// compiled-instruction/lookup-table data implies v0 and plain
    /// instructions imply legacy.
    pub fn infer_version(has_address_table_lookups: bool) -> TransactionVersion {
        if has_address_table_lookups {
            TransactionVersion::V0
        } else {
            TransactionVersion::Legacy
        }
    }
}

/// A single pre/post SPL token balance entry keyed by `(account_index, mint)`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TokenBalance {
    pub account_index: u8,
    pub mint: Pubkey,
    pub amount_raw: u64,
}

/// An inner-instruction list produced by a top-level instruction at `index`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct InnerInstructions {
    pub index: u8,
    pub instructions: Vec<CompiledInstruction>,
}

/// Execution metadata accompanying a [`TransactionRecord`]: balance deltas,
/// inner instructions, log output and the error indicator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionMeta {
    pub pre_balances: Vec<i64>,
    pub post_balances: Vec<i64>,
    pub pre_token_balances: Vec<TokenBalance>,
    pub post_token_balances: Vec<TokenBalance>,
    pub inner_instructions: Vec<InnerInstructions>,
    pub log_messages: Vec<String>,
    /// `Some(reason)` if the transaction failed on-chain.
    pub err: Option<String>,
}

impl TransactionMeta {
    pub fn is_failed(&self) -> bool {
        self.err.is_some()
    }
}

/// The unit handed from the Transaction Source (A) to the Trade Extractor (B).
///
/// `signature` is unique per record within a `connection_id`; `slot` is
/// non-decreasing within a single source but not globally (§3).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransactionRecord {
    pub signature: Signature,
    pub slot: u64,
    pub message: TransactionMessage,
    pub meta: TransactionMeta,
    pub block_time: Option<i64>,
    pub connection_id: ConnectionId,
}

impl TransactionRecord {
    /// `true` if this record was produced by a connection other than
    /// `current`, meaning it is a straggler from a torn-down subscription
    /// and must be dropped (§4.1 cleanup-on-drop).
    pub fn is_stale(&self, current: &ConnectionId) -> bool {
        &self.connection_id != current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infers_v0_from_address_table_lookups() {
        assert_eq!(
            TransactionMessage::infer_version(true),
            TransactionVersion::V0
        );
        assert_eq!(
            TransactionMessage::infer_version(false),
            TransactionVersion::Legacy
        );
    }

    #[test]
    fn stale_record_detected_by_connection_id() {
        let record = TransactionRecord {
            signature: Signature::default(),
            slot: 1,
            message: TransactionMessage {
                version: TransactionVersion::Legacy,
                account_keys: vec![],
                instructions: vec![],
                address_table_lookups: vec![],
            },
            meta: TransactionMeta::default(),
            block_time: None,
            connection_id: ConnectionId::new("conn-a".into()),
        };

        assert!(!record.is_stale(&ConnectionId::new("conn-a".into())));
        assert!(record.is_stale(&ConnectionId::new("conn-b".into())));
    }
}
