//! "Assistant is replying" heuristic.
//!
//! There is no typing event on the wire. The flag goes up optimistically
//! when the user sends something addressed to the assistant and comes down
//! when the next message from the assistant arrives. Nothing else clears it.

/// Patterns derived from the assistant's display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresencePatterns {
    assistant_name: String,
    keyword: String,
    mention: String,
}

pub const DEFAULT_ASSISTANT_NAME: &str = "Homie";

impl PresencePatterns {
    pub fn new(assistant_name: impl Into<String>) -> Self {
        let assistant_name = assistant_name.into();
        let keyword = assistant_name.to_lowercase();
        let mention = format!("@{}", keyword);
        Self {
            assistant_name,
            keyword,
            mention,
        }
    }

    /// Lower-cased content contains the mention token or the bare keyword.
    pub fn is_trigger(&self, content: &str) -> bool {
        if self.keyword.is_empty() {
            return false;
        }
        let lowered = content.to_lowercase();
        lowered.contains(&self.mention) || lowered.contains(&self.keyword)
    }

    /// Case-sensitive match on the display name, e.g. "Homie 🤖".
    pub fn is_assistant(&self, sender_name: &str) -> bool {
        !self.assistant_name.is_empty() && sender_name.contains(&self.assistant_name)
    }

    pub fn assistant_name(&self) -> &str {
        &self.assistant_name
    }
}

impl Default for PresencePatterns {
    fn default() -> Self {
        Self::new(DEFAULT_ASSISTANT_NAME)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Presence {
    patterns: PresencePatterns,
    peer_is_active: bool,
}

impl Presence {
    pub fn new(patterns: PresencePatterns) -> Self {
        Self {
            patterns,
            peer_is_active: false,
        }
    }

    pub fn peer_is_active(&self) -> bool {
        self.peer_is_active
    }

    /// Arm on an outbound trigger. Returns the new flag value.
    pub fn observe_outbound(&mut self, content: &str) -> bool {
        if self.patterns.is_trigger(content) {
            self.peer_is_active = true;
        }
        self.peer_is_active
    }

    /// Clear on an inbound message from the assistant.
    pub fn observe_inbound(&mut self, sender_name: &str) {
        if self.patterns.is_assistant(sender_name) {
            self.peer_is_active = false;
        }
    }
}
