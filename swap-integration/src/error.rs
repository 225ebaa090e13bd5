use thiserror::Error;

/// All socket/IO related errors generated while operating a Transaction
/// Source (A) connection, shared by both the bidirectional-gRPC and the
/// WebSocket-JSON-RPC implementations.
#[derive(Debug, Error)]
pub enum SocketError {
    #[error("failed to establish connection within the handshake timeout")]
    HandshakeTimeout,

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("gRPC transport error: {0}")]
    Grpc(String),

    #[error("deserialising JSON error: {error} for payload: {payload}")]
    Deserialise {
        error: serde_json::Error,
        payload: String,
    },

    #[error("error subscribing to the upstream push provider: {0}")]
    Subscribe(String),

    #[error("stream terminated with closing frame: {0}")]
    Terminated(String),

    #[error("keepalive ping failed to send")]
    KeepaliveFailed,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("error parsing Url: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Determines if something is considered "unrecoverable" in the current
/// context — used by [`crate::channel::Tx`] to decide whether a send
/// failure should disable the channel rather than merely be logged.
pub trait Unrecoverable {
    fn is_unrecoverable(&self) -> bool;
}

impl<T> Unrecoverable for tokio::sync::mpsc::error::SendError<T> {
    fn is_unrecoverable(&self) -> bool {
        true
    }
}
