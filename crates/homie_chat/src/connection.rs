//! Connection lifecycle and reconnect policy.
//!
//! `Idle → Connecting → Open → Closed → Connecting …` while the subscription
//! lives; teardown goes through `Closing` to a final `Closed`. Handshake
//! failures, transport errors and peer closes all land in `Closed`.

use std::time::Duration;

use tracing::debug;

/// Fixed delay between a close and the next connect attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Connecting,
    Open,
    Closing,
    Closed,
}

impl ConnectionState {
    pub fn is_live(self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

/// `should_reconnect` is true for the whole subscription and flips false
/// exactly once, at teardown.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    should_reconnect: bool,
    delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(delay: Duration) -> Self {
        Self {
            should_reconnect: true,
            delay,
        }
    }

    pub fn should_reconnect(&self) -> bool {
        self.should_reconnect
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Returns false if already suppressed.
    fn suppress(&mut self) -> bool {
        std::mem::replace(&mut self.should_reconnect, false)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_RECONNECT_DELAY)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConnectionMachine {
    state: ConnectionState,
    policy: ReconnectPolicy,
    attempts: u32,
}

impl ConnectionMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            policy,
            attempts: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state.is_live()
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Still subscribed: events may be dispatched into shared state.
    pub fn is_subscribed(&self) -> bool {
        self.policy.should_reconnect()
    }

    /// Number of `Connecting` transitions so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// `Idle | Closed → Connecting`, only while subscribed.
    pub fn begin_connect(&mut self) -> bool {
        if !self.policy.should_reconnect() {
            return false;
        }
        match self.state {
            ConnectionState::Idle | ConnectionState::Closed => {
                self.state = ConnectionState::Connecting;
                self.attempts += 1;
                true
            }
            other => {
                debug!(state = ?other, "ignoring connect request");
                false
            }
        }
    }

    /// `Connecting → Open`.
    pub fn handshake_ok(&mut self) -> bool {
        if self.state != ConnectionState::Connecting {
            debug!(state = ?self.state, "ignoring handshake outside connecting");
            return false;
        }
        self.state = ConnectionState::Open;
        true
    }

    /// Any non-idle state → `Closed`. Returns whether a reconnect should be
    /// scheduled.
    pub fn transport_closed(&mut self) -> bool {
        if self.state != ConnectionState::Idle {
            self.state = ConnectionState::Closed;
        }
        self.policy.should_reconnect()
    }

    /// Suppress reconnects and move to `Closing`. Returns false when
    /// teardown already ran.
    pub fn begin_teardown(&mut self) -> bool {
        if !self.policy.suppress() {
            return false;
        }
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Open
        ) {
            self.state = ConnectionState::Closing;
        }
        true
    }

    /// Final state after teardown.
    pub fn finish_teardown(&mut self) {
        self.state = ConnectionState::Closed;
    }
}
