//! Chat wire types. Client ↔ server JSON for the history endpoint and the
//! live channel.

use serde::{Deserialize, Serialize};

use crate::Error;

/// One chat message as the server broadcasts it.
///
/// `created_at` is kept as the server's string; it is only ever compared for
/// equality, never parsed or ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub content: String,
    pub sender_id: String,
    #[serde(default)]
    pub sender_name: String,
    pub created_at: String,
}

impl Message {
    pub fn new(
        content: impl Into<String>,
        sender_id: impl Into<String>,
        sender_name: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            content: content.into(),
            sender_id: sender_id.into(),
            sender_name: sender_name.into(),
            created_at: created_at.into(),
        }
    }

    /// Dedup equality: `(content, sender_id, created_at)` all match.
    /// `sender_name` is display data and takes no part.
    pub fn same_as(&self, other: &Message) -> bool {
        self.content == other.content
            && self.sender_id == other.sender_id
            && self.created_at == other.created_at
    }
}

/// Client → server: a composed message. Sender identity is attached by the
/// server from the authenticated connection.
#[derive(Debug, Clone, Serialize)]
pub struct OutboundMessage<'a> {
    pub content: &'a str,
}

impl<'a> OutboundMessage<'a> {
    pub fn new(content: &'a str) -> Self {
        Self { content }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Server → client: one live frame, either a single message or a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundFrame {
    Single(Message),
    Batch(Vec<Message>),
}

impl InboundFrame {
    /// Parse a text frame; the JSON shape (object vs array) is the
    /// discriminator.
    pub fn from_json(text: &str) -> Result<Self, Error> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        match value {
            serde_json::Value::Array(_) => Ok(InboundFrame::Batch(serde_json::from_value(value)?)),
            serde_json::Value::Object(_) => {
                Ok(InboundFrame::Single(serde_json::from_value(value)?))
            }
            other => Err(Error::Frame(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_single_message_frame() {
        let frame = InboundFrame::from_json(
            r#"{"content":"hi","sender_id":"u1","sender_name":"Ana","created_at":"t1"}"#,
        )
        .unwrap();
        assert_eq!(frame, InboundFrame::Single(Message::new("hi", "u1", "Ana", "t1")));
    }

    #[test]
    fn parses_batch_frame_in_order() {
        let frame = InboundFrame::from_json(
            r#"[{"content":"a","sender_id":"u1","created_at":"t1"},
                {"content":"b","sender_id":"u2","created_at":"t2"}]"#,
        )
        .unwrap();
        let InboundFrame::Batch(batch) = frame else {
            panic!("expected batch");
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].content, "a");
        assert_eq!(batch[1].content, "b");
        assert_eq!(batch[0].sender_name, "");
    }

    #[test]
    fn rejects_scalar_and_incomplete_frames() {
        assert!(matches!(InboundFrame::from_json("42"), Err(Error::Frame(f)) if f == "42"));
        assert!(matches!(
            InboundFrame::from_json(r#"{"content":"no sender"}"#),
            Err(Error::Json(_))
        ));
        assert!(matches!(InboundFrame::from_json("not json"), Err(Error::Json(_))));
    }

    #[test]
    fn outbound_frame_carries_only_content() {
        let json = OutboundMessage::new("@homie remind me").to_json().unwrap();
        assert_eq!(json, r#"{"content":"@homie remind me"}"#);
    }

    #[test]
    fn equality_ignores_sender_name() {
        let a = Message::new("hi", "u1", "Ana", "t1");
        let b = Message::new("hi", "u1", "Ana B.", "t1");
        assert!(a.same_as(&b));
        assert!(!a.same_as(&Message::new("hi", "u1", "Ana", "t2")));
        assert!(!a.same_as(&Message::new("hi", "u2", "Ana", "t1")));
        assert!(!a.same_as(&Message::new("hey", "u1", "Ana", "t1")));
    }
}
