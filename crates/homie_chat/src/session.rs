//! One channel subscription: history load, live connection with fixed-delay
//! reconnect, reconciled feed and presence flag.
//!
//! All shared state sits behind one mutex and every event from a transport
//! or the history fetch is checked against the subscription flag before it
//! touches that state, so nothing reaches the feed once [`ChatSession::close`]
//! has returned.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use url::Url;

use crate::connection::{
    ConnectionMachine, ConnectionState, ReconnectPolicy, DEFAULT_RECONNECT_DELAY,
};
use crate::endpoint;
use crate::history::HistorySource;
use crate::messages::{InboundFrame, Message, OutboundMessage};
use crate::presence::PresencePatterns;
use crate::reconciler::Reconciler;
use crate::transport::{Connector, TransportEvent, TransportHandle};
use crate::Error;

/// Per-session settings, usually built from [`crate::Config`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub base_url: Url,
    pub reconnect_delay: Duration,
    pub patterns: PresencePatterns,
}

impl SessionOptions {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            patterns: PresencePatterns::default(),
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_assistant_name(mut self, name: &str) -> Self {
        self.patterns = PresencePatterns::new(name);
        self
    }
}

/// Observable summary published after every state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionStatus {
    pub state: ConnectionState,
    pub feed_len: usize,
    pub peer_is_active: bool,
    pub attempts: u32,
}

impl SessionStatus {
    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }
}

struct Inner {
    machine: ConnectionMachine,
    reconciler: Reconciler,
    outbound: Option<mpsc::UnboundedSender<String>>,
}

impl Inner {
    fn status(&self) -> SessionStatus {
        SessionStatus {
            state: self.machine.state(),
            feed_len: self.reconciler.feed().len(),
            peer_is_active: self.reconciler.peer_is_active(),
            attempts: self.machine.attempts(),
        }
    }
}

struct Shared {
    channel_id: String,
    inner: Mutex<Inner>,
    status: watch::Sender<SessionStatus>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, inner: &Inner) {
        self.status.send_replace(inner.status());
    }
}

/// A live subscription to one channel. Dropping it tears it down.
pub struct ChatSession {
    shared: Arc<Shared>,
    tasks: Vec<JoinHandle<()>>,
}

impl ChatSession {
    /// Start the history fetch and the connection driver on the current tokio
    /// runtime. Returns immediately.
    pub fn open<H: HistorySource>(
        options: &SessionOptions,
        channel_id: &str,
        credential: &str,
        connector: Arc<dyn Connector>,
        history: H,
    ) -> Result<Self, Error> {
        let url = endpoint::live_url(&options.base_url, channel_id, credential)?;
        let inner = Inner {
            machine: ConnectionMachine::new(ReconnectPolicy::new(options.reconnect_delay)),
            reconciler: Reconciler::new(options.patterns.clone()),
            outbound: None,
        };
        let (status, _) = watch::channel(inner.status());
        let shared = Arc::new(Shared {
            channel_id: channel_id.to_owned(),
            inner: Mutex::new(inner),
            status,
        });

        info!(channel = %channel_id, "opening chat session");
        let history_task = tokio::spawn(load_history(
            Arc::clone(&shared),
            history,
            credential.to_owned(),
        ));
        let driver = tokio::spawn(drive(Arc::clone(&shared), connector, url));

        Ok(Self {
            shared,
            tasks: vec![history_task, driver],
        })
    }

    pub fn channel_id(&self) -> &str {
        &self.shared.channel_id
    }

    pub fn state(&self) -> ConnectionState {
        self.shared.lock().machine.state()
    }

    pub fn is_live(&self) -> bool {
        self.state().is_live()
    }

    pub fn peer_is_active(&self) -> bool {
        self.shared.lock().reconciler.peer_is_active()
    }

    /// Snapshot of the whole feed.
    pub fn feed(&self) -> Vec<Message> {
        self.shared.lock().reconciler.feed().as_slice().to_vec()
    }

    /// Messages after the first `n`.
    pub fn messages_since(&self, n: usize) -> Vec<Message> {
        self.shared.lock().reconciler.feed().since(n).to_vec()
    }

    /// Messages in the feed not sent by `sender_id`.
    pub fn count_not_from(&self, sender_id: &str) -> usize {
        self.shared.lock().reconciler.feed().count_not_from(sender_id)
    }

    /// Wait for the first message past the first `since` entries whose
    /// content is `text`. Earlier entries with the same content are ignored,
    /// so take `since` from the feed length before sending. `None` once the
    /// session is gone.
    pub async fn wait_for_echo(&self, text: &str, since: usize) -> Option<Message> {
        let mut status = self.status();
        loop {
            status.borrow_and_update();
            {
                let inner = self.shared.lock();
                if let Some(m) = inner
                    .reconciler
                    .feed()
                    .since(since)
                    .iter()
                    .find(|m| m.content == text)
                {
                    return Some(m.clone());
                }
                if !inner.machine.is_subscribed() {
                    return None;
                }
            }
            status.changed().await.ok()?;
        }
    }

    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.shared.status.subscribe()
    }

    /// Transmit `{content: text}`. Returns false, sending nothing, when the
    /// text is blank or the connection is not open. The message shows up in
    /// the feed only once the server broadcasts it back.
    pub fn send(&self, text: &str) -> bool {
        if text.trim().is_empty() {
            debug!("ignoring blank message");
            return false;
        }
        let mut inner = self.shared.lock();
        if !inner.machine.is_live() {
            debug!(state = ?inner.machine.state(), "not connected, message not sent");
            return false;
        }
        let frame = match OutboundMessage::new(text).to_json() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "failed to encode message");
                return false;
            }
        };
        let Some(outbound) = inner.outbound.as_ref() else {
            return false;
        };
        if outbound.send(frame).is_err() {
            debug!("transport already gone, message not sent");
            return false;
        }
        inner.reconciler.presence_mut().observe_outbound(text);
        self.shared.publish(&inner);
        true
    }

    /// Tear down: suppress reconnects, close the transport, cancel the
    /// reconnect timer and the history fetch. Idempotent.
    pub fn close(&self) {
        let mut inner = self.shared.lock();
        if !inner.machine.begin_teardown() {
            return;
        }
        info!(channel = %self.shared.channel_id, "closing chat session");
        inner.outbound = None;
        for task in &self.tasks {
            task.abort();
        }
        inner.machine.finish_teardown();
        self.shared.publish(&inner);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("channel_id", &self.shared.channel_id)
            .field("status", &*self.shared.status.borrow())
            .finish()
    }
}

async fn load_history<H: HistorySource>(shared: Arc<Shared>, history: H, credential: String) {
    let result = history.fetch(&shared.channel_id, &credential).await;
    let mut inner = shared.lock();
    if !inner.machine.is_subscribed() {
        return;
    }
    match result {
        Ok(messages) => {
            info!(channel = %shared.channel_id, count = messages.len(), "loaded chat history");
            inner.reconciler.load_history(messages);
            shared.publish(&inner);
        }
        Err(e) => {
            warn!(channel = %shared.channel_id, error = %e, "failed to load chat history");
        }
    }
}

/// Connection driver. One transport at a time: the next one is opened only
/// after the previous one reported `Closed` and the delay elapsed.
async fn drive(shared: Arc<Shared>, connector: Arc<dyn Connector>, url: Url) {
    loop {
        let mut events = {
            let mut inner = shared.lock();
            if !inner.machine.begin_connect() {
                return;
            }
            info!(
                channel = %shared.channel_id,
                attempt = inner.machine.attempts(),
                "connecting to live chat"
            );
            let TransportHandle { outbound, events } = connector.open(&url);
            inner.outbound = Some(outbound);
            shared.publish(&inner);
            events
        };

        let mut reason = None;
        while let Some(event) = events.recv().await {
            let mut inner = shared.lock();
            if !inner.machine.is_subscribed() {
                debug!("dropping event from closed session");
                return;
            }
            match event {
                TransportEvent::Opened => {
                    if inner.machine.handshake_ok() {
                        info!(channel = %shared.channel_id, "connected to live chat");
                    }
                }
                TransportEvent::Frame(text) => match InboundFrame::from_json(&text) {
                    Ok(frame) => {
                        inner.reconciler.accept(frame);
                    }
                    Err(e) => warn!(error = %e, "dropping malformed frame"),
                },
                TransportEvent::Closed { reason: why } => {
                    reason = why;
                    break;
                }
            }
            shared.publish(&inner);
        }
        drop(events);

        let delay = {
            let mut inner = shared.lock();
            inner.outbound = None;
            let reconnect = inner.machine.transport_closed();
            shared.publish(&inner);
            if !reconnect {
                return;
            }
            inner.machine.policy().delay()
        };
        info!(
            channel = %shared.channel_id,
            delay_ms = delay.as_millis() as u64,
            reason = reason.as_deref().unwrap_or("closed"),
            "disconnected, reconnecting after delay"
        );
        tokio::time::sleep(delay).await;
    }
}
