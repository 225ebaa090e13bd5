//! Implementation α (§4.1): a single long-lived bidirectional gRPC stream
//! against a Yellowstone-Geyser-shaped push service, restricted to
//! non-vote, non-failed transactions touching at least one configured
//! program account. Keepalive is a ping message written into the same
//! outbound stream every 10s; a failed ping send moves the connection to
//! RECONNECTING just like a stream error.

use super::{ConnectionHandle, SubscribeConfig, TransactionSource};
use crate::commitment::Commitment;
use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;
use swap_instrument::{
    AddressTableLookup, CompiledInstruction, InnerInstructions, TokenBalance, TransactionMessage,
    TransactionMeta, TransactionRecord,
};
use swap_integration::{
    init_reconnecting_stream, mpsc_unbounded, ConnectionState, ReconnectingStream, SocketError,
    Tx, UnboundedRx,
};
use tokio::sync::mpsc::UnboundedSender;
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt as TokioStreamExt};
use tonic::transport::Endpoint;
use tracing::{debug, warn};
use yellowstone_grpc_proto::geyser::{
    geyser_client::GeyserClient, subscribe_update::UpdateOneof, CommitmentLevel, SubscribeRequest,
    SubscribeRequestFilterTransactions, SubscribeRequestPing, SubscribeUpdate,
};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(10);

pub struct GrpcTransactionSource {
    endpoint: String,
    x_token: Option<String>,
    handle: ConnectionHandle,
}

impl GrpcTransactionSource {
    pub fn new(endpoint: impl Into<String>, x_token: Option<String>, start_time_ms: i64) -> Self {
        Self {
            endpoint: endpoint.into(),
            x_token,
            handle: ConnectionHandle::new(start_time_ms),
        }
    }

    fn subscribe_request(&self, config: &SubscribeConfig) -> SubscribeRequest {
        let mut transactions = HashMap::new();
        transactions.insert(
            "core".to_string(),
            SubscribeRequestFilterTransactions {
                vote: Some(false),
                failed: Some(false),
                signature: None,
                account_include: config.accounts.iter().map(|p| p.to_string()).collect(),
                account_exclude: vec![],
                account_required: vec![],
            },
        );

        SubscribeRequest {
            accounts: HashMap::new(),
            slots: HashMap::new(),
            transactions,
            transactions_status: HashMap::new(),
            blocks: HashMap::new(),
            blocks_meta: HashMap::new(),
            entry: HashMap::new(),
            commitment: Some(commitment_level(config.commitment) as i32),
            accounts_data_slice: vec![],
            ping: None,
        }
    }
}

/// Map the requested finality level to the proto's `CommitmentLevel`
/// (§6 α: "the configured commitment ... [is] forwarded").
fn commitment_level(commitment: Commitment) -> CommitmentLevel {
    match commitment {
        Commitment::Processed => CommitmentLevel::Processed,
        Commitment::Confirmed => CommitmentLevel::Confirmed,
        Commitment::Finalized => CommitmentLevel::Finalized,
    }
}

#[async_trait]
impl TransactionSource for GrpcTransactionSource {
    async fn subscribe(
        &self,
        config: SubscribeConfig,
    ) -> Result<UnboundedRx<TransactionRecord>, SocketError> {
        let initial_request = self.subscribe_request(&config);
        let endpoint = self.endpoint.clone();
        let x_token = self.x_token.clone();
        let handle = self.handle.clone();

        let connect = {
            let endpoint = endpoint.clone();
            let x_token = x_token.clone();
            let request = initial_request.clone();
            let handle = handle.clone();
            move || {
                let endpoint = endpoint.clone();
                let x_token = x_token.clone();
                let request = request.clone();
                let handle = handle.clone();
                async move { connect_once(&endpoint, x_token.as_deref(), request, &handle).await }
            }
        };

        let attempts = init_reconnecting_stream(connect).await?;

        let (tx, rx) = mpsc_unbounded::<TransactionRecord>();
        tokio::spawn(async move {
            run_ingestion_loop(attempts, handle, tx).await;
        });

        Ok(rx)
    }

    fn connection_handle(&self) -> ConnectionHandle {
        self.handle.clone()
    }
}

type InboundStream =
    std::pin::Pin<Box<dyn futures::Stream<Item = Result<SubscribeUpdate, tonic::Status>> + Send>>;

async fn connect_once(
    endpoint: &str,
    x_token: Option<&str>,
    initial_request: SubscribeRequest,
    handle: &ConnectionHandle,
) -> Result<(UnboundedSender<SubscribeRequest>, InboundStream), SocketError> {
    handle.begin_connecting();

    let channel = Endpoint::from_shared(endpoint.to_string())
        .map_err(|e| SocketError::Grpc(e.to_string()))?
        .timeout(HANDSHAKE_TIMEOUT);

    let channel = tokio::time::timeout(HANDSHAKE_TIMEOUT, channel.connect())
        .await
        .map_err(|_| SocketError::HandshakeTimeout)?
        .map_err(|e| SocketError::Grpc(e.to_string()))?;

    let has_token = x_token.is_some();
    let token = x_token.map(str::to_string);
    let mut client = GeyserClient::with_interceptor(channel, move |mut req: tonic::Request<()>| {
        if let Some(token) = &token {
            let value = token
                .parse::<tonic::metadata::MetadataValue<tonic::metadata::Ascii>>()
                .map_err(|e| tonic::Status::invalid_argument(format!("invalid x-token: {e}")))?;
            req.metadata_mut().insert("x-token", value);
        }
        Ok(req)
    });
    debug!(has_token, "connecting to gRPC transaction source");

    let (req_tx, req_rx) = tokio::sync::mpsc::unbounded_channel::<SubscribeRequest>();
    req_tx
        .send(initial_request)
        .map_err(|e| SocketError::Subscribe(e.to_string()))?;

    let outbound = UnboundedReceiverStream::new(req_rx);
    let response = client
        .subscribe(outbound)
        .await
        .map_err(|e| SocketError::Subscribe(e.to_string()))?;

    Ok((req_tx, Box::pin(response.into_inner())))
}

async fn run_ingestion_loop<S>(
    attempts: S,
    handle: ConnectionHandle,
    tx: swap_integration::UnboundedTx<TransactionRecord>,
) where
    S: futures::Stream<
            Item = Result<(UnboundedSender<SubscribeRequest>, InboundStream), SocketError>,
        > + Send
        + 'static,
{
    let mut streams = Box::pin(
        attempts.with_reconnect_backoff(Default::default(), "grpc-transaction-source"),
    );

    while let Some((outbound, mut updates)) = streams.next().await {
        handle.set_state(ConnectionState::Running);
        let connection_id = handle.connection_id();
        let mut keepalive_id: i32 = 0;

        loop {
            tokio::select! {
                next = updates.next() => {
                    match next {
                        Some(Ok(update)) => {
                            if let Some(record) = decode_update(update, &connection_id) {
                                handle.stats.record_transaction();
                                let mut tx = tx.clone();
                                if tx.send(record).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Err(status)) => {
                            warn!(error = %status, "gRPC stream error, reconnecting");
                            handle.stats.record_error();
                            handle.set_state(ConnectionState::Reconnecting);
                            break;
                        }
                        None => {
                            warn!("gRPC stream ended, reconnecting");
                            handle.set_state(ConnectionState::Reconnecting);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {
                    keepalive_id = keepalive_id.wrapping_add(1);
                    let ping = SubscribeRequest {
                        ping: Some(SubscribeRequestPing { id: keepalive_id }),
                        ..Default::default()
                    };
                    if outbound.send(ping).is_err() {
                        warn!("gRPC keepalive ping failed to send, reconnecting");
                        handle.stats.record_error();
                        handle.set_state(ConnectionState::Reconnecting);
                        break;
                    }
                    debug!(keepalive_id, "sent gRPC keepalive ping");
                }
            }
        }
    }
}

/// Translate a decoded `SubscribeUpdate` into a [`TransactionRecord`].
/// Pong/ping/slot/account/block updates are not part of the A->B contract
/// and are silently consumed.
fn decode_update(
    update: SubscribeUpdate,
    connection_id: &swap_instrument::ConnectionId,
) -> Option<TransactionRecord> {
    match update.update_oneof? {
        UpdateOneof::Transaction(tx_update) => {
            let info = tx_update.transaction?;
            let transaction = info.transaction?;
            let message = transaction.message?;
            let meta = info.meta?;

            let signature = Signature::try_from(info.signature.as_slice()).ok()?;

            let account_keys = message
                .account_keys
                .iter()
                .filter_map(|bytes| Pubkey::try_from(bytes.as_slice()).ok())
                .collect::<Vec<_>>();

            let instructions = message
                .instructions
                .into_iter()
                .map(|ix| CompiledInstruction {
                    program_id_index: ix.program_id_index as u8,
                    accounts: ix.accounts,
                    data: ix.data,
                })
                .collect();

            let address_table_lookups = message
                .address_table_lookups
                .into_iter()
                .filter_map(|lookup| {
                    Some(AddressTableLookup {
                        account_key: Pubkey::try_from(lookup.account_key.as_slice()).ok()?,
                        writable_indexes: lookup.writable_indexes,
                        readonly_indexes: lookup.readonly_indexes,
                    })
                })
                .collect::<Vec<_>>();

            let version = TransactionMessage::infer_version(!address_table_lookups.is_empty());

            let pre_token_balances = meta
                .pre_token_balances
                .into_iter()
                .filter_map(decode_token_balance)
                .collect();
            let post_token_balances = meta
                .post_token_balances
                .into_iter()
                .filter_map(decode_token_balance)
                .collect();

            let inner_instructions = meta
                .inner_instructions
                .into_iter()
                .map(|inner| InnerInstructions {
                    index: inner.index as u8,
                    instructions: inner
                        .instructions
                        .into_iter()
                        .map(|ix| CompiledInstruction {
                            program_id_index: ix.program_id_index as u8,
                            accounts: ix.accounts,
                            data: ix.data,
                        })
                        .collect(),
                })
                .collect();

            Some(TransactionRecord {
                signature,
                slot: tx_update.slot,
                message: TransactionMessage {
                    version,
                    account_keys,
                    instructions,
                    address_table_lookups,
                },
                meta: TransactionMeta {
                    pre_balances: meta.pre_balances.into_iter().map(|b| b as i64).collect(),
                    post_balances: meta.post_balances.into_iter().map(|b| b as i64).collect(),
                    pre_token_balances,
                    post_token_balances,
                    inner_instructions,
                    log_messages: meta.log_messages,
                    err: meta.err.map(|e| format!("{e:?}")),
                },
                block_time: None,
                connection_id: connection_id.clone(),
            })
        }
        _ => None,
    }
}

fn decode_token_balance(
    balance: yellowstone_grpc_proto::geyser::TokenBalance,
) -> Option<TokenBalance> {
    let mint = Pubkey::from_str(&balance.mint).ok()?;
    let amount_raw = balance
        .ui_token_amount
        .as_ref()
        .and_then(|ui| ui.amount.parse::<u64>().ok())
        .unwrap_or(0);

    Some(TokenBalance {
        account_index: balance.account_index as u8,
        mint,
        amount_raw,
    })
}
