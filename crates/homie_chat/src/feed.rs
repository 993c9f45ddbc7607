//! Append-only message log. Never holds two messages that are equal under
//! [`Message::same_as`].

use crate::messages::Message;

/// Ordered chat feed; order is arrival order, not timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Feed {
    entries: Vec<Message>,
}

impl Feed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scans most recent first; replays after a reconnect hit the tail.
    pub fn contains(&self, candidate: &Message) -> bool {
        self.entries.iter().rev().any(|m| m.same_as(candidate))
    }

    /// Append unless an equal message is already present. Returns whether
    /// the candidate was appended.
    pub fn push(&mut self, candidate: Message) -> bool {
        if self.contains(&candidate) {
            return false;
        }
        self.entries.push(candidate);
        true
    }

    /// Append every message not already present (in the feed or earlier in
    /// `batch`), preserving batch order. Returns the appended messages.
    pub fn extend(&mut self, batch: Vec<Message>) -> &[Message] {
        let start = self.entries.len();
        for candidate in batch {
            self.push(candidate);
        }
        &self.entries[start..]
    }

    /// Replace the whole log with `prefix`, then re-apply the previous
    /// entries after it under the dedup rule.
    pub(crate) fn rebase(&mut self, prefix: Vec<Message>) {
        let previous = std::mem::take(&mut self.entries);
        self.extend(prefix);
        self.extend(previous);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Message> {
        self.entries.iter()
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.entries
    }

    /// Messages after the first `n`; empty when `n` is past the end.
    pub fn since(&self, n: usize) -> &[Message] {
        self.entries.get(n..).unwrap_or(&[])
    }

    /// How many messages came from someone other than `sender_id`.
    pub fn count_not_from(&self, sender_id: &str) -> usize {
        self.entries
            .iter()
            .filter(|m| m.sender_id != sender_id)
            .count()
    }
}

impl<'a> IntoIterator for &'a Feed {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
