//! One-shot fetch of a channel's prior messages.

use std::future::Future;

use url::Url;

use crate::endpoint;
use crate::messages::Message;
use crate::Error;

/// Source of prior messages. Called once per subscription.
pub trait HistorySource: Send + Sync + 'static {
    fn fetch(
        &self,
        channel_id: &str,
        credential: &str,
    ) -> impl Future<Output = Result<Vec<Message>, Error>> + Send;
}

/// `GET {base}/api/v1/chat/{channel}/history` with a bearer credential.
#[derive(Debug, Clone)]
pub struct HttpHistory {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpHistory {
    pub fn new(base_url: Url) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }
}

impl HistorySource for HttpHistory {
    async fn fetch(&self, channel_id: &str, credential: &str) -> Result<Vec<Message>, Error> {
        let url = endpoint::history_url(&self.base_url, channel_id)?;
        let messages = self
            .http
            .get(url)
            .bearer_auth(credential)
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<Message>>()
            .await?;
        Ok(messages)
    }
}

/// Skips the history fetch; the live path alone fills the feed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHistory;

impl HistorySource for NoHistory {
    async fn fetch(&self, _channel_id: &str, _credential: &str) -> Result<Vec<Message>, Error> {
        Ok(Vec::new())
    }
}
