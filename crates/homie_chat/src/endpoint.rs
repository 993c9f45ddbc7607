//! URLs for the history fetch and the live channel.

use url::Url;

use crate::Error;

/// `{base}/api/v1/chat/{channel}/history`
pub fn history_url(base: &Url, channel_id: &str) -> Result<Url, Error> {
    let mut url = chat_url(base, channel_id)?;
    url.path_segments_mut()
        .map_err(|_| Error::Endpoint(format!("cannot-be-a-base URL: {}", base)))?
        .push("history");
    Ok(url)
}

/// `{ws base}/api/v1/chat/{channel}?token={credential}`. The credential rides
/// in the URI because the handshake is its only carrier.
pub fn live_url(base: &Url, channel_id: &str, credential: &str) -> Result<Url, Error> {
    let mut url = chat_url(base, channel_id)?;
    let scheme = match url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => return Err(Error::Endpoint(format!("unsupported scheme: {}", other))),
    };
    url.set_scheme(scheme)
        .map_err(|_| Error::Endpoint(format!("cannot switch {} to {}", base, scheme)))?;
    url.query_pairs_mut().append_pair("token", credential);
    Ok(url)
}

fn chat_url(base: &Url, channel_id: &str) -> Result<Url, Error> {
    if channel_id.is_empty() {
        return Err(Error::Endpoint("empty channel id".into()));
    }
    let mut url = base.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|_| Error::Endpoint(format!("cannot-be-a-base URL: {}", base)))?
        .pop_if_empty()
        .extend(["api", "v1", "chat", channel_id]);
    Ok(url)
}
