//! Implementation β (§4.1): a single JSON-RPC subscription
//! (`transactionSubscribe`) over a framed WebSocket, forwarding the
//! requested commitment and v0-transaction flag. Keepalive is a
//! protocol-level WebSocket ping every 30s.

use super::{ConnectionHandle, SubscribeConfig, TransactionSource};
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use solana_sdk::{pubkey::Pubkey, signature::Signature};
use std::str::FromStr;
use std::time::Duration;
use swap_instrument::{
    AddressTableLookup, CompiledInstruction, InnerInstructions, TokenBalance, TransactionMessage,
    TransactionMeta, TransactionRecord,
};
use swap_integration::{
    init_reconnecting_stream, mpsc_unbounded, websocket, ConnectionState, ReconnectingStream,
    SocketError, Tx, UnboundedRx, WsMessage, WsSink, WsStream,
};
use tracing::{debug, warn};

const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(30);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

pub struct WebSocketTransactionSource {
    url: String,
    handle: ConnectionHandle,
}

impl WebSocketTransactionSource {
    pub fn new(url: impl Into<String>, start_time_ms: i64) -> Self {
        Self {
            url: url.into(),
            handle: ConnectionHandle::new(start_time_ms),
        }
    }
}

#[derive(Debug, Serialize)]
struct SubscribeRequestFilter {
    #[serde(rename = "accountInclude")]
    account_include: Vec<String>,
    vote: bool,
    failed: bool,
}

#[derive(Debug, Serialize)]
struct SubscribeRequestOptions {
    commitment: &'static str,
    encoding: &'static str,
    #[serde(rename = "showRewards")]
    show_rewards: bool,
    #[serde(rename = "maxSupportedTransactionVersion", skip_serializing_if = "Option::is_none")]
    max_supported_transaction_version: Option<u8>,
}

#[derive(Debug, Serialize)]
struct SubscribeRequestEnvelope {
    jsonrpc: &'static str,
    id: u64,
    method: &'static str,
    params: (SubscribeRequestFilter, SubscribeRequestOptions),
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<serde_json::Value>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    params: Option<NotificationParams>,
}

#[derive(Debug, Deserialize)]
struct NotificationParams {
    result: WsTransactionNotification,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsTransactionNotification {
    transaction: WsTransactionEnvelope,
    slot: u64,
}

#[derive(Debug, Deserialize)]
struct WsTransactionEnvelope {
    transaction: WsTransaction,
    meta: WsMeta,
}

#[derive(Debug, Deserialize)]
struct WsTransaction {
    signatures: Vec<String>,
    message: WsMessageBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsMessageBody {
    account_keys: Vec<String>,
    instructions: Vec<WsCompiledInstruction>,
    #[serde(default)]
    address_table_lookups: Vec<WsAddressTableLookup>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsCompiledInstruction {
    program_id_index: u8,
    accounts: Vec<u8>,
    data: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsAddressTableLookup {
    account_key: String,
    writable_indexes: Vec<u8>,
    readonly_indexes: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsMeta {
    #[serde(default)]
    err: Option<serde_json::Value>,
    #[serde(default)]
    pre_balances: Vec<i64>,
    #[serde(default)]
    post_balances: Vec<i64>,
    #[serde(default)]
    pre_token_balances: Vec<WsTokenBalance>,
    #[serde(default)]
    post_token_balances: Vec<WsTokenBalance>,
    #[serde(default)]
    inner_instructions: Vec<WsInnerInstructions>,
    #[serde(default)]
    log_messages: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsTokenBalance {
    account_index: u8,
    mint: String,
    ui_token_amount: WsUiTokenAmount,
}

#[derive(Debug, Deserialize)]
struct WsUiTokenAmount {
    amount: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WsInnerInstructions {
    index: u8,
    instructions: Vec<WsCompiledInstruction>,
}

#[async_trait]
impl TransactionSource for WebSocketTransactionSource {
    async fn subscribe(
        &self,
        config: SubscribeConfig,
    ) -> Result<UnboundedRx<TransactionRecord>, SocketError> {
        let url = self.url.clone();
        let handle = self.handle.clone();

        let connect = {
            let url = url.clone();
            let handle = handle.clone();
            move || {
                let url = url.clone();
                let handle = handle.clone();
                let config = config.clone();
                async move { connect_once(&url, &config, &handle).await }
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

async fn connect_once(
    url: &str,
    config: &SubscribeConfig,
    handle: &ConnectionHandle,
) -> Result<(WsSink, WsStream), SocketError> {
    handle.begin_connecting();

    let ws = tokio::time::timeout(HANDSHAKE_TIMEOUT, websocket::connect(url.to_string()))
        .await
        .map_err(|_| SocketError::HandshakeTimeout)??;

    let (mut sink, stream) = ws.split();

    let request = SubscribeRequestEnvelope {
        jsonrpc: "2.0",
        id: 1,
        method: "transactionSubscribe",
        params: (
            SubscribeRequestFilter {
                account_include: config.accounts.iter().map(|p| p.to_string()).collect(),
                vote: false,
                failed: false,
            },
            SubscribeRequestOptions {
                commitment: config.commitment.as_str(),
                encoding: "base64",
                show_rewards: false,
                max_supported_transaction_version: if config.enable_v0 { Some(0) } else { None },
            },
        ),
    };

    let payload = serde_json::to_string(&request).map_err(|e| SocketError::Deserialise {
        error: e,
        payload: "subscribe request".into(),
    })?;

    sink.send(WsMessage::Text(payload.into()))
        .await
        .map_err(SocketError::from)?;

    Ok((sink, stream))
}

async fn run_ingestion_loop<S>(attempts: S, handle: ConnectionHandle, tx: swap_integration::UnboundedTx<TransactionRecord>)
where
    S: futures::Stream<Item = Result<(WsSink, WsStream), SocketError>> + Send + 'static,
{
    let mut streams = Box::pin(
        attempts.with_reconnect_backoff(Default::default(), "websocket-transaction-source"),
    );

    while let Some((mut sink, mut stream)) = streams.next().await {
        handle.set_state(ConnectionState::Running);
        let connection_id = handle.connection_id();

        loop {
            tokio::select! {
                next = stream.next() => {
                    match next {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(record) = decode_text(&text, &connection_id) {
                                handle.stats.record_transaction();
                                let mut tx = tx.clone();
                                if tx.send(record).is_err() {
                                    return;
                                }
                            }
                        }
                        Some(Ok(WsMessage::Pong(_))) => {
                            debug!("received websocket pong");
                        }
                        Some(Ok(_)) => {}
                        Some(Err(error)) => {
                            warn!(?error, "websocket stream error, reconnecting");
                            handle.stats.record_error();
                            handle.set_state(ConnectionState::Reconnecting);
                            break;
                        }
                        None => {
                            warn!("websocket stream ended, reconnecting");
                            handle.set_state(ConnectionState::Reconnecting);
                            break;
                        }
                    }
                }
                _ = tokio::time::sleep(KEEPALIVE_INTERVAL) => {
                    if sink.send(WsMessage::Ping(Vec::new().into())).await.is_err() {
                        warn!("websocket keepalive ping failed to send, reconnecting");
                        handle.stats.record_error();
                        handle.set_state(ConnectionState::Reconnecting);
                        break;
                    }
                    debug!("sent websocket keepalive ping");
                }
            }
        }
    }
}

fn decode_text(
    text: &str,
    connection_id: &swap_instrument::ConnectionId,
) -> Option<TransactionRecord> {
    let response: RpcResponse = serde_json::from_str(text).ok()?;
    if response.method.as_deref() != Some("transactionNotification") {
        return None;
    }
    let notification = response.params?.result;
    decode_notification(notification, connection_id)
}

fn decode_notification(
    notification: WsTransactionNotification,
    connection_id: &swap_instrument::ConnectionId,
) -> Option<TransactionRecord> {
    let WsTransactionNotification {
        transaction: WsTransactionEnvelope { transaction, meta },
        slot,
    } = notification;
    let WsTransaction { signatures, message } = transaction;

    let signature = Signature::from_str(signatures.first()?).ok()?;

    let account_keys = message
        .account_keys
        .iter()
        .filter_map(|s| Pubkey::from_str(s).ok())
        .collect::<Vec<_>>();

    let instructions = message.instructions.into_iter().map(decode_instruction).collect();

    let address_table_lookups = message
        .address_table_lookups
        .into_iter()
        .filter_map(|lookup| {
            Some(AddressTableLookup {
                account_key: Pubkey::from_str(&lookup.account_key).ok()?,
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
            index: inner.index,
            instructions: inner.instructions.into_iter().map(decode_instruction).collect(),
        })
        .collect();

    Some(TransactionRecord {
        signature,
        slot,
        message: TransactionMessage {
            version,
            account_keys,
            instructions,
            address_table_lookups,
        },
        meta: TransactionMeta {
            pre_balances: meta.pre_balances,
            post_balances: meta.post_balances,
            pre_token_balances,
            post_token_balances,
            inner_instructions,
            log_messages: meta.log_messages,
            err: meta.err.map(|e| e.to_string()),
        },
        block_time: None,
        connection_id: connection_id.clone(),
    })
}

fn decode_instruction(ix: WsCompiledInstruction) -> CompiledInstruction {
    CompiledInstruction {
        program_id_index: ix.program_id_index,
        accounts: ix.accounts,
        data: bs58::decode(ix.data).into_vec().unwrap_or_default(),
    }
}

fn decode_token_balance(balance: WsTokenBalance) -> Option<TokenBalance> {
    Some(TokenBalance {
        account_index: balance.account_index,
        mint: Pubkey::from_str(&balance.mint).ok()?,
        amount_raw: balance.ui_token_amount.amount.parse().unwrap_or(0),
    })
}
