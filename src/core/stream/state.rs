//! The per-client connection state machine.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    Idle,
    Dialing,
    Subscribing,
    Reading,
    Closing,
    Backoff,
    Terminated,
    /// Venue B only: no credential was configured at construction. Absorbing,
    /// like `Terminated`, but distinct for observability.
    Disabled,
}

impl ClientState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Dialing => 1,
            Self::Subscribing => 2,
            Self::Reading => 3,
            Self::Closing => 4,
            Self::Backoff => 5,
            Self::Terminated => 6,
            Self::Disabled => 7,
        }
    }

    const fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Dialing,
            2 => Self::Subscribing,
            3 => Self::Reading,
            4 => Self::Closing,
            5 => Self::Backoff,
            6 => Self::Terminated,
            7 => Self::Disabled,
            _ => Self::Idle,
        }
    }
}

impl fmt::Display for ClientState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Dialing => "dialing",
            Self::Subscribing => "subscribing",
            Self::Reading => "reading",
            Self::Closing => "closing",
            Self::Backoff => "backoff",
            Self::Terminated => "terminated",
            Self::Disabled => "disabled",
        };
        write!(f, "{s}")
    }
}

/// Shared, lock-free handle so the inspection server's metrics endpoint can
/// read a client's current state without touching the client itself.
#[derive(Clone)]
pub struct StateHandle(Arc<AtomicU8>);

impl StateHandle {
    #[must_use]
    pub fn new(initial: ClientState) -> Self {
        Self(Arc::new(AtomicU8::new(initial.as_u8())))
    }

    pub fn set(&self, state: ClientState) {
        self.0.store(state.as_u8(), Ordering::SeqCst);
    }

    #[must_use]
    pub fn get(&self) -> ClientState {
        ClientState::from_u8(self.0.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_u8() {
        for state in [
            ClientState::Idle,
            ClientState::Dialing,
            ClientState::Subscribing,
            ClientState::Reading,
            ClientState::Closing,
            ClientState::Backoff,
            ClientState::Terminated,
            ClientState::Disabled,
        ] {
            assert_eq!(ClientState::from_u8(state.as_u8()), state);
        }
    }

    #[test]
    fn handle_reflects_latest_set() {
        let handle = StateHandle::new(ClientState::Idle);
        assert_eq!(handle.get(), ClientState::Idle);
        handle.set(ClientState::Reading);
        assert_eq!(handle.get(), ClientState::Reading);
    }

    #[test]
    fn handle_clones_share_state() {
        let handle = StateHandle::new(ClientState::Idle);
        let clone = handle.clone();
        clone.set(ClientState::Backoff);
        assert_eq!(handle.get(), ClientState::Backoff);
    }
}
