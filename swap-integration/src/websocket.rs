use crate::error::SocketError;
use std::fmt::Debug;
use tokio::net::TcpStream;
use tokio_tungstenite::{
    MaybeTlsStream, connect_async,
    tungstenite::{client::IntoClientRequest, error::ProtocolError},
};

/// Convenient type alias for a tungstenite `WebSocketStream`.
pub type WebSocket = tokio_tungstenite::WebSocketStream<MaybeTlsStream<TcpStream>>;
pub type WsSink = futures::stream::SplitSink<WebSocket, WsMessage>;
pub type WsStream = futures::stream::SplitStream<WebSocket>;
pub type WsMessage = tokio_tungstenite::tungstenite::Message;
pub type WsError = tokio_tungstenite::tungstenite::Error;

/// Connect asynchronously to a WebSocket server, wrapping the handshake in
/// the handshake-timeout caller is expected to apply via `tokio::time::timeout`.
pub async fn connect<R>(request: R) -> Result<WebSocket, SocketError>
where
    R: IntoClientRequest + Unpin + Debug,
{
    tracing::debug!(?request, "attempting to establish WebSocket connection");
    connect_async(request).await.map(|(ws, _)| ws).map_err(SocketError::from)
}

/// Determine whether a [`WsError`] indicates the socket has disconnected —
/// used to decide whether a mid-stream error should trigger the
/// RECONNECTING transition (§4.1).
pub fn is_disconnected(error: &WsError) -> bool {
    matches!(
        error,
        WsError::ConnectionClosed
            | WsError::AlreadyClosed
            | WsError::Io(_)
            | WsError::Protocol(ProtocolError::SendAfterClosing)
    )
}
