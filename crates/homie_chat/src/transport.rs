//! Live transport: the open/message/close event surface the session drives,
//! and its WebSocket implementation.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tracing::{debug, warn};
use url::Url;

/// Events a transport reports, in order. `Closed` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Opened,
    Frame(String),
    Closed { reason: Option<String> },
}

/// One transport instance. Dropping every outbound sender closes it.
#[derive(Debug)]
pub struct TransportHandle {
    pub outbound: mpsc::UnboundedSender<String>,
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportHandle {
    /// A connected pair: the handle the session holds and the ends a
    /// transport implementation drives.
    pub fn pair() -> (
        TransportHandle,
        mpsc::UnboundedSender<TransportEvent>,
        mpsc::UnboundedReceiver<String>,
    ) {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (
            TransportHandle {
                outbound: outbound_tx,
                events: events_rx,
            },
            events_tx,
            outbound_rx,
        )
    }
}

/// Opens transports. `open` must not block: the handshake result arrives
/// later as `Opened` or `Closed`.
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &Url) -> TransportHandle;
}

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone)]
pub struct WsConnector {
    handshake_timeout: Duration,
}

impl WsConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bound on the TCP connect plus WebSocket upgrade. A handshake that has
    /// not completed by then is reported as `Closed`.
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }
}

impl Default for WsConnector {
    fn default() -> Self {
        Self {
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }
}

impl Connector for WsConnector {
    fn open(&self, url: &Url) -> TransportHandle {
        let (handle, events_tx, outbound_rx) = TransportHandle::pair();
        tokio::spawn(run_socket(
            url.to_string(),
            self.handshake_timeout,
            events_tx,
            outbound_rx,
        ));
        handle
    }
}

async fn run_socket(
    url: String,
    handshake_timeout: Duration,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let reason = match pump(&url, handshake_timeout, &events, &mut outbound).await {
        Ok(()) => None,
        Err(e) => {
            warn!(error = %e, "live transport error");
            Some(e.to_string())
        }
    };
    // Receiver may be gone after teardown.
    let _ = events.send(TransportEvent::Closed { reason });
}

/// Connect, then forward frames both ways until either side closes.
async fn pump(
    url: &str,
    handshake_timeout: Duration,
    events: &mpsc::UnboundedSender<TransportEvent>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), crate::Error> {
    let (ws_stream, _) =
        tokio::time::timeout(handshake_timeout, tokio_tungstenite::connect_async(url))
            .await
            .map_err(|_| crate::Error::HandshakeTimeout(handshake_timeout))??;
    let (mut sink, mut reader) = ws_stream.split();
    let _ = events.send(TransportEvent::Opened);

    loop {
        tokio::select! {
            incoming = reader.next() => {
                match incoming {
                    Some(Ok(WsMessage::Text(text))) => {
                        let _ = events.send(TransportEvent::Frame(text));
                    }
                    Some(Ok(WsMessage::Ping(data))) => {
                        sink.send(WsMessage::Pong(data)).await?;
                    }
                    Some(Ok(WsMessage::Close(_))) | None => {
                        debug!("live transport closed by server");
                        return Ok(());
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => return Err(e.into()),
                }
            }
            frame = outbound.recv() => {
                match frame {
                    Some(text) => sink.send(WsMessage::Text(text)).await?,
                    None => {
                        // Every sender dropped: local close.
                        let _ = sink.send(WsMessage::Close(None)).await;
                        return Ok(());
                    }
                }
            }
        }
    }
}
