//! Resilient realtime group chat client: history fetch, live WebSocket feed
//! with fixed-delay reconnect, deduplicated feed and an "assistant is
//! replying" flag. Used by the `homie-chat` binary.

pub mod client;
pub mod config;
pub mod connection;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod feed;
pub mod history;
pub mod messages;
pub mod presence;
pub mod reconciler;
pub mod session;
pub mod transport;

pub use client::ChatClient;
pub use config::{
    default_config_path, AuthSection, ChatSection, Config, ConfigError, ServerSection,
};
pub use connection::{ConnectionState, ReconnectPolicy};
pub use dispatch::Composer;
pub use error::Error;
pub use feed::Feed;
pub use history::{HistorySource, HttpHistory, NoHistory};
pub use messages::{InboundFrame, Message, OutboundMessage};
pub use presence::PresencePatterns;
pub use session::{ChatSession, SessionOptions, SessionStatus};
pub use transport::{Connector, TransportEvent, TransportHandle, WsConnector};
