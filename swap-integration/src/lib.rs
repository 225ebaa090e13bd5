//! Low-level, provider-agnostic streaming primitives shared by the
//! swap-quote-service: channel fan-out, the reconnecting-stream combinator
//! and its fixed backoff policy, the connection-lifecycle state machine,
//! and a thin WebSocket connect/disconnect-detection layer.
//!
//! Nothing here knows about Solana transactions or DEX protocols — those
//! live in `swap-ingest` and `swap-execution`. This crate only knows how to
//! keep a push connection alive.

pub mod backoff;
pub mod channel;
pub mod error;
pub mod reconnect;
pub mod websocket;

pub use backoff::{ReconnectionBackoffPolicy, ReconnectionState};
pub use channel::{mpsc_unbounded, Channel, ChannelTxDroppable, Tx, UnboundedRx, UnboundedTx};
pub use error::{SocketError, Unrecoverable};
pub use reconnect::{init_reconnecting_stream, ConnectionState, ReconnectingStream};
pub use websocket::{WsError, WsMessage, WsSink, WsStream, WebSocket};
