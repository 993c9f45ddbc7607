//! Error types shared by the history fetch and the live transport.

use std::time::Duration;

/// Errors surfaced by the chat client library.
///
/// None of these are fatal to a running session: history failures are
/// logged and transport failures collapse into a reconnect.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("unexpected frame: {0}")]
    Frame(String),

    #[error("handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),
}

impl From<url::ParseError> for Error {
    fn from(e: url::ParseError) -> Self {
        Error::Endpoint(e.to_string())
    }
}
