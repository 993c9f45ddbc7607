//! Facade for the surrounding app: follows the current channel and keeps at
//! most one [`ChatSession`] alive.

use std::sync::Arc;

use tracing::info;

use crate::history::{HistorySource, HttpHistory};
use crate::session::{ChatSession, SessionOptions};
use crate::transport::{Connector, WsConnector};
use crate::Error;

pub struct ChatClient<H> {
    options: SessionOptions,
    connector: Arc<dyn Connector>,
    history: H,
    session: Option<ChatSession>,
    credential: Option<String>,
}

impl ChatClient<HttpHistory> {
    /// WebSocket transport plus HTTP history against `options.base_url`.
    pub fn connect_default(options: SessionOptions) -> Self {
        let history = HttpHistory::new(options.base_url.clone());
        Self::new(options, Arc::new(WsConnector::new()), history)
    }
}

impl<H: HistorySource + Clone> ChatClient<H> {
    pub fn new(options: SessionOptions, connector: Arc<dyn Connector>, history: H) -> Self {
        Self {
            options,
            connector,
            history,
            session: None,
            credential: None,
        }
    }

    /// Follow `channel_id`. The previous session, if any, is fully torn down
    /// before the new one opens. Same channel and credential is a no-op.
    pub fn subscribe(&mut self, channel_id: &str, credential: &str) -> Result<&ChatSession, Error> {
        let same_credential = self.credential.as_deref() == Some(credential);
        match self.session.take() {
            Some(current) if same_credential && current.channel_id() == channel_id => {
                Ok(&*self.session.insert(current))
            }
            previous => {
                if let Some(previous) = previous {
                    previous.close();
                }
                self.credential = None;
                info!(channel = %channel_id, "subscribing to channel");
                let session = ChatSession::open(
                    &self.options,
                    channel_id,
                    credential,
                    Arc::clone(&self.connector),
                    self.history.clone(),
                )?;
                self.credential = Some(credential.to_owned());
                Ok(&*self.session.insert(session))
            }
        }
    }

    pub fn unsubscribe(&mut self) {
        if let Some(session) = self.session.take() {
            session.close();
        }
        self.credential = None;
    }

    pub fn session(&self) -> Option<&ChatSession> {
        self.session.as_ref()
    }

    pub fn is_live(&self) -> bool {
        self.session.as_ref().is_some_and(ChatSession::is_live)
    }

    pub fn send(&self, text: &str) -> bool {
        self.session.as_ref().is_some_and(|s| s.send(text))
    }
}
