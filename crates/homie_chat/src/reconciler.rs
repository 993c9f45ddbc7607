//! Merges history, live frames and batches into the [`Feed`]. Every
//! mutation of the feed goes through here so the no-duplicate rule and the
//! presence rule are applied in one place.

use tracing::debug;

use crate::feed::Feed;
use crate::messages::{InboundFrame, Message};
use crate::presence::{Presence, PresencePatterns};

#[derive(Debug, Clone, Default)]
pub struct Reconciler {
    feed: Feed,
    presence: Presence,
}

impl Reconciler {
    pub fn new(patterns: PresencePatterns) -> Self {
        Self {
            feed: Feed::new(),
            presence: Presence::new(patterns),
        }
    }

    pub fn feed(&self) -> &Feed {
        &self.feed
    }

    pub fn presence_mut(&mut self) -> &mut Presence {
        &mut self.presence
    }

    pub fn peer_is_active(&self) -> bool {
        self.presence.peer_is_active()
    }

    /// Idempotent append. Returns whether the candidate was new.
    pub fn append(&mut self, candidate: Message) -> bool {
        let sender_name = candidate.sender_name.clone();
        if !self.feed.push(candidate) {
            debug!(sender = %sender_name, "dropping duplicate message");
            return false;
        }
        self.presence.observe_inbound(&sender_name);
        true
    }

    /// Apply a whole batch in one operation. Returns how many were new.
    pub fn append_batch(&mut self, batch: Vec<Message>) -> usize {
        let offered = batch.len();
        let added = self.feed.extend(batch);
        for m in added {
            self.presence.observe_inbound(&m.sender_name);
        }
        let count = added.len();
        if count < offered {
            debug!(offered, appended = count, "dropped duplicates from batch");
        }
        count
    }

    pub fn accept(&mut self, frame: InboundFrame) -> usize {
        match frame {
            InboundFrame::Single(m) => usize::from(self.append(m)),
            InboundFrame::Batch(batch) => self.append_batch(batch),
        }
    }

    /// History becomes the feed prefix; anything the live path delivered
    /// before history resolved is kept after it. Past assistant messages do
    /// not touch presence: they cannot be a reply to something sent now.
    pub fn load_history(&mut self, history: Vec<Message>) {
        let before = self.feed.len();
        self.feed.rebase(history);
        debug!(before, after = self.feed.len(), "history loaded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(content: &str, sender_name: &str, at: &str) -> Message {
        Message::new(content, sender_name.to_lowercase(), sender_name, at)
    }

    #[test]
    fn history_then_identical_live_message_keeps_one() {
        let mut r = Reconciler::default();
        r.load_history(vec![Message::new("hi", "u1", "", "t1")]);
        assert!(!r.append(Message::new("hi", "u1", "", "t1")));
        assert_eq!(r.feed().len(), 1);
    }

    #[test]
    fn replayed_batch_cannot_resurrect_duplicates() {
        let mut r = Reconciler::default();
        let batch = vec![msg("a", "Ana", "t1"), msg("b", "Bo", "t2")];
        assert_eq!(r.append_batch(batch.clone()), 2);
        assert_eq!(r.append_batch(batch.clone()), 0);
        assert_eq!(r.accept(InboundFrame::Batch(batch)), 0);
        assert_eq!(r.feed().len(), 2);
    }

    #[test]
    fn assistant_reply_clears_presence() {
        let mut r = Reconciler::default();
        r.presence_mut().observe_outbound("@homie remind me");
        r.append(msg("sure", "Alice", "t1"));
        assert!(r.peer_is_active());
        r.append(msg("Reminder set", "Homie AI", "t2"));
        assert!(!r.peer_is_active());
    }

    #[test]
    fn duplicate_assistant_message_does_not_clear_presence() {
        let mut r = Reconciler::default();
        r.append(msg("Reminder set", "Homie AI", "t2"));
        r.presence_mut().observe_outbound("homie again");
        r.append(msg("Reminder set", "Homie AI", "t2"));
        assert!(r.peer_is_active());
    }

    #[test]
    fn assistant_inside_batch_clears_presence() {
        let mut r = Reconciler::default();
        r.presence_mut().observe_outbound("@homie");
        r.append_batch(vec![msg("x", "Bo", "t1"), msg("done", "Homie 🤖", "t2")]);
        assert!(!r.peer_is_active());
    }

    #[test]
    fn old_assistant_messages_in_history_leave_presence_armed() {
        let mut r = Reconciler::default();
        r.presence_mut().observe_outbound("@homie remind me");
        r.load_history(vec![msg("earlier reply", "Homie AI", "t0")]);
        assert!(r.peer_is_active());
    }

    #[test]
    fn history_keeps_messages_that_arrived_live_first() {
        let mut r = Reconciler::default();
        r.append(msg("live", "Bo", "t5"));
        r.load_history(vec![msg("old", "Ana", "t1"), msg("live", "Bo", "t5")]);
        let contents: Vec<_> = r.feed().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, ["old", "live"]);
    }
}
