//! Local input buffer for the outbound side.

use crate::session::ChatSession;

/// Holds what the user is typing until it is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Composer {
    buffer: String,
}

impl Composer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn set(&mut self, text: impl Into<String>) {
        self.buffer = text.into();
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    /// Send the buffer through `session`; cleared only if a frame went out.
    pub fn submit(&mut self, session: &ChatSession) -> bool {
        let sent = session.send(&self.buffer);
        if sent {
            self.buffer.clear();
        }
        sent
    }
}
