//! Live update state machine.
//!
//! Every connect cycle runs under its own [`Generation`]. Stream messages,
//! snapshot results and reconnect timers carry the generation they were
//! issued under, and the session ignores anything that is not current.
//! Pausing or resuming advances the generation, so a timer scheduled before
//! a pause can never bring the connection back.

use std::fmt;
use std::time::Duration;

pub const RECONNECT_DELAY: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Generation(u64);

impl Generation {
    fn next(self) -> Self {
        Self(self.0.wrapping_add(1))
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveState {
    Disconnected,
    Connecting,
    Live,
    Paused,
}

impl LiveState {
    pub fn label(self) -> &'static str {
        match self {
            LiveState::Disconnected => "disconnected",
            LiveState::Connecting => "connecting",
            LiveState::Live => "live",
            LiveState::Paused => "paused",
        }
    }
}

/// A reconnect the caller should fire after `delay`, then hand back through
/// [`LiveSession::reconnect_due`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectTicket {
    pub generation: Generation,
    pub delay: Duration,
}

#[derive(Debug, Clone)]
pub struct LiveSession {
    state: LiveState,
    generation: Generation,
    stream_open: bool,
    snapshot_settled: bool,
    reconnect_delay: Duration,
}

impl Default for LiveSession {
    fn default() -> Self {
        Self::new(RECONNECT_DELAY)
    }
}

impl LiveSession {
    pub fn new(reconnect_delay: Duration) -> Self {
        Self {
            state: LiveState::Disconnected,
            generation: Generation::default(),
            stream_open: false,
            snapshot_settled: false,
            reconnect_delay,
        }
    }

    pub fn state(&self) -> LiveState {
        self.state
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    pub fn is_updating(&self) -> bool {
        matches!(self.state, LiveState::Connecting | LiveState::Live)
    }

    pub fn is_paused(&self) -> bool {
        self.state == LiveState::Paused
    }

    fn is_current(&self, generation: Generation) -> bool {
        generation == self.generation
    }

    fn begin_cycle(&mut self) -> Generation {
        self.generation = self.generation.next();
        self.state = LiveState::Connecting;
        self.stream_open = false;
        self.snapshot_settled = false;
        self.generation
    }

    fn maybe_go_live(&mut self) {
        if self.state == LiveState::Connecting && self.stream_open && self.snapshot_settled {
            self.state = LiveState::Live;
        }
    }

    /// Starts a fetch-and-subscribe cycle from `Disconnected`.
    pub fn connect(&mut self) -> Option<Generation> {
        if self.state != LiveState::Disconnected {
            return None;
        }
        Some(self.begin_cycle())
    }

    pub fn stream_opened(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || !self.is_updating() {
            return false;
        }
        self.stream_open = true;
        self.maybe_go_live();
        true
    }

    /// Records that the snapshot fetch finished. Returns whether a fetched
    /// snapshot should be loaded into the task set.
    pub fn snapshot_settled(&mut self, generation: Generation) -> bool {
        if !self.is_current(generation) || !self.is_updating() {
            return false;
        }
        self.snapshot_settled = true;
        self.maybe_go_live();
        true
    }

    /// Whether a stream event issued under `generation` may be applied.
    pub fn accepts_events(&self, generation: Generation) -> bool {
        self.is_current(generation) && self.is_updating()
    }

    /// Stream closed or failed. Returns the reconnect to schedule, if any.
    pub fn stream_failed(&mut self, generation: Generation) -> Option<ReconnectTicket> {
        if !self.is_current(generation) || !self.is_updating() {
            return None;
        }
        self.state = LiveState::Disconnected;
        self.stream_open = false;
        self.snapshot_settled = false;
        Some(ReconnectTicket {
            generation,
            delay: self.reconnect_delay,
        })
    }

    /// A reconnect timer fired. Only the timer of the current, still
    /// disconnected generation starts a new cycle.
    pub fn reconnect_due(&mut self, generation: Generation) -> Option<Generation> {
        if !self.is_current(generation) || self.state != LiveState::Disconnected {
            return None;
        }
        Some(self.begin_cycle())
    }

    /// Returns true when the session actually transitioned.
    pub fn pause(&mut self) -> bool {
        if self.state == LiveState::Paused {
            return false;
        }
        self.generation = self.generation.next();
        self.state = LiveState::Paused;
        self.stream_open = false;
        self.snapshot_settled = false;
        true
    }

    pub fn resume(&mut self) -> Option<Generation> {
        if self.state != LiveState::Paused {
            return None;
        }
        Some(self.begin_cycle())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn live_session() -> (LiveSession, Generation) {
        let mut session = LiveSession::default();
        let generation = session.connect().unwrap();
        assert!(session.stream_opened(generation));
        assert!(session.snapshot_settled(generation));
        (session, generation)
    }

    #[test]
    fn connect_goes_live_after_stream_and_snapshot() {
        let mut session = LiveSession::default();
        assert_eq!(session.state(), LiveState::Disconnected);
        let generation = session.connect().unwrap();
        assert_eq!(session.state(), LiveState::Connecting);
        assert!(session.accepts_events(generation));

        session.stream_opened(generation);
        assert_eq!(session.state(), LiveState::Connecting);
        session.snapshot_settled(generation);
        assert_eq!(session.state(), LiveState::Live);
        assert!(session.connect().is_none());
    }

    #[test]
    fn snapshot_may_settle_before_stream_opens() {
        let mut session = LiveSession::default();
        let generation = session.connect().unwrap();
        session.snapshot_settled(generation);
        assert_eq!(session.state(), LiveState::Connecting);
        session.stream_opened(generation);
        assert_eq!(session.state(), LiveState::Live);
    }

    #[test]
    fn stream_failure_schedules_fixed_delay_reconnect() {
        let (mut session, generation) = live_session();
        let ticket = session.stream_failed(generation).unwrap();
        assert_eq!(session.state(), LiveState::Disconnected);
        assert_eq!(ticket.delay, RECONNECT_DELAY);
        assert_eq!(ticket.generation, generation);

        let next = session.reconnect_due(ticket.generation).unwrap();
        assert_ne!(next, generation);
        assert_eq!(session.state(), LiveState::Connecting);

        let again = session.stream_failed(next).unwrap();
        assert_eq!(again.delay, RECONNECT_DELAY);
    }

    #[test]
    fn duplicate_failure_reports_only_once() {
        let (mut session, generation) = live_session();
        assert!(session.stream_failed(generation).is_some());
        assert!(session.stream_failed(generation).is_none());
    }

    #[test]
    fn pause_blocks_pending_reconnect() {
        let (mut session, generation) = live_session();
        let ticket = session.stream_failed(generation).unwrap();
        assert!(session.pause());
        assert!(session.reconnect_due(ticket.generation).is_none());
        assert_eq!(session.state(), LiveState::Paused);
    }

    #[test]
    fn stale_timer_cannot_revive_a_resumed_session() {
        let (mut session, generation) = live_session();
        let ticket = session.stream_failed(generation).unwrap();
        session.pause();
        let resumed = session.resume().unwrap();
        assert!(session.reconnect_due(ticket.generation).is_none());
        assert_eq!(session.generation(), resumed);
        assert_eq!(session.state(), LiveState::Connecting);
    }

    #[test]
    fn pause_is_idempotent() {
        let (mut session, _) = live_session();
        assert!(session.pause());
        let generation = session.generation();
        assert!(!session.pause());
        assert_eq!(session.generation(), generation);
    }

    #[test]
    fn paused_session_rejects_old_stream_messages() {
        let (mut session, generation) = live_session();
        session.pause();
        assert!(!session.accepts_events(generation));
        assert!(!session.stream_opened(generation));
        assert!(!session.snapshot_settled(generation));
        assert!(session.stream_failed(generation).is_none());
    }

    #[test]
    fn resume_runs_a_fresh_cycle() {
        let (mut session, old) = live_session();
        session.pause();
        assert!(session.connect().is_none());
        let resumed = session.resume().unwrap();
        assert_ne!(resumed, old);
        assert!(!session.accepts_events(old));
        assert!(session.accepts_events(resumed));
        assert!(session.resume().is_none());
    }
}
