//! Connection lifecycle state machine for the live-update channel.
//!
//! No I/O happens here; `ws::run_link` feeds transport events in and acts on
//! the returned decisions. Every transition is driven by one of the `on_*`
//! handlers, so the state and the retry counter have a single writer.

use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Reconnecting,
    Error,
}

impl ConnectionState {
    pub fn label(self) -> &'static str {
        match self {
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Reconnecting => "reconnecting",
            ConnectionState::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Linear, capped reconnect delay: `min(step * attempt, cap)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    pub step: Duration,
    pub cap: Duration,
    pub max_attempts: u32,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            step: Duration::from_millis(1000),
            cap: Duration::from_millis(10_000),
            max_attempts: 5,
        }
    }
}

impl Backoff {
    /// Delay before retry `attempt` (1-indexed).
    pub fn delay(&self, attempt: u32) -> Duration {
        self.step.saturating_mul(attempt).min(self.cap)
    }
}

/// A single-shot reconnect decision. Only the timer carrying the current
/// generation may start a new attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTimer {
    pub generation: u64,
    pub attempt: u32,
    pub delay: Duration,
}

#[derive(Debug)]
pub struct ConnectionManager {
    state: ConnectionState,
    attempts: u32,
    backoff: Backoff,
    generation: u64,
    alive: bool,
    exhausted: bool,
}

impl ConnectionManager {
    pub fn new(backoff: Backoff) -> Self {
        Self {
            state: ConnectionState::Connecting,
            attempts: 0,
            backoff,
            generation: 0,
            alive: true,
            exhausted: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn backoff(&self) -> Backoff {
        self.backoff
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Retries are exhausted; only a restart gets a new connection.
    pub fn is_terminal(&self) -> bool {
        self.exhausted
    }

    /// Channel established. Returns false when the manager was torn down
    /// while the attempt was in flight; the caller must drop the channel.
    pub fn on_open(&mut self) -> bool {
        if !self.alive || self.exhausted {
            return false;
        }
        self.state = ConnectionState::Connected;
        self.attempts = 0;
        true
    }

    /// Transport failure. Logged only; the closure that follows decides
    /// whether to retry.
    pub fn on_error(&mut self) {
        if !self.alive || self.exhausted {
            return;
        }
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Connected
        ) {
            self.state = ConnectionState::Error;
        }
    }

    /// Channel closed for any reason. Returns the reconnect to schedule, or
    /// `None` when torn down or out of attempts (terminal `Error`).
    pub fn on_close(&mut self) -> Option<ReconnectTimer> {
        if !self.alive || self.exhausted {
            return None;
        }
        self.state = ConnectionState::Disconnected;
        if self.attempts >= self.backoff.max_attempts {
            self.state = ConnectionState::Error;
            self.exhausted = true;
            return None;
        }
        self.attempts += 1;
        self.generation += 1;
        self.state = ConnectionState::Reconnecting;
        Some(ReconnectTimer {
            generation: self.generation,
            attempt: self.attempts,
            delay: self.backoff.delay(self.attempts),
        })
    }

    /// The reconnect delay elapsed. Returns true when a new attempt should
    /// start; stale or post-teardown timers are ignored.
    pub fn on_timer(&mut self, timer: &ReconnectTimer) -> bool {
        if !self.alive
            || timer.generation != self.generation
            || self.state != ConnectionState::Reconnecting
        {
            return false;
        }
        self.state = ConnectionState::Connecting;
        true
    }

    /// Intentional teardown. Invalidates any queued timer.
    pub fn shutdown(&mut self) {
        self.alive = false;
        self.generation += 1;
        if !self.exhausted {
            self.state = ConnectionState::Disconnected;
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new(Backoff::default())
    }
}
