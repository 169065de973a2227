//! Exponential backoff with a circuit breaker, shared by both stream clients.
//!
//! Adapted from the reconnect/backoff discipline used elsewhere in this
//! codebase for wrapping market data streams, but folded into an explicit
//! state machine (see [`crate::core::stream::state`]) instead of driven by a
//! reconnect-signal channel.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy)]
pub struct BackoffConfig {
    pub initial_delay_ms: u64,
    pub multiplier: f64,
    pub max_delay_ms: u64,
    pub max_consecutive_failures: u32,
    pub circuit_breaker_cooldown_ms: u64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 2_000,
            multiplier: 2.0,
            max_delay_ms: 60_000,
            max_consecutive_failures: 8,
            circuit_breaker_cooldown_ms: 120_000,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open,
}

/// Tracks consecutive dial failures, the current backoff delay, and a
/// circuit breaker that pauses dialing entirely after too many failures in
/// a row.
pub struct Backoff {
    config: BackoffConfig,
    consecutive_failures: u32,
    current_delay_ms: u64,
    circuit: CircuitState,
    opened_at: Option<Instant>,
}

impl Backoff {
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        let current_delay_ms = config.initial_delay_ms;
        Self {
            config,
            consecutive_failures: 0,
            current_delay_ms,
            circuit: CircuitState::Closed,
            opened_at: None,
        }
    }

    /// Called when the client completes a `Dialing -> Subscribing -> Reading`
    /// transition successfully.
    pub fn reset(&mut self) {
        self.consecutive_failures = 0;
        self.current_delay_ms = self.config.initial_delay_ms;
        self.circuit = CircuitState::Closed;
        self.opened_at = None;
    }

    /// Called on dial failure, read stall, or unexpected close.
    pub fn record_failure(&mut self) {
        self.consecutive_failures += 1;
        if self.consecutive_failures >= self.config.max_consecutive_failures {
            self.circuit = CircuitState::Open;
            self.opened_at = Some(Instant::now());
        }
    }

    /// The delay to wait in the Backoff state before the next dial attempt,
    /// capped at `max_delay_ms`, doubling per consecutive failure. If the
    /// circuit breaker is open, the remaining cooldown is used instead when
    /// it is longer than the plain backoff delay.
    pub fn next_delay(&mut self) -> Duration {
        let mut delay_ms = self.current_delay_ms;

        if self.circuit == CircuitState::Open {
            let elapsed = self.opened_at.map(|t| t.elapsed()).unwrap_or_default();
            let cooldown = Duration::from_millis(self.config.circuit_breaker_cooldown_ms);
            if elapsed < cooldown {
                delay_ms = delay_ms.max((cooldown - elapsed).as_millis() as u64);
            } else {
                self.circuit = CircuitState::Closed;
            }
        }

        let next = ((self.current_delay_ms as f64) * self.config.multiplier) as u64;
        self.current_delay_ms = next.min(self.config.max_delay_ms);

        Duration::from_millis(delay_ms)
    }

    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> BackoffConfig {
        BackoffConfig {
            initial_delay_ms: 10,
            multiplier: 2.0,
            max_delay_ms: 80,
            max_consecutive_failures: 100,
            circuit_breaker_cooldown_ms: 1_000,
        }
    }

    #[test]
    fn delay_doubles_per_failure_and_caps() {
        let mut backoff = Backoff::new(fast_config());
        let mut delays = Vec::new();
        for _ in 0..6 {
            backoff.record_failure();
            delays.push(backoff.next_delay().as_millis());
        }
        assert_eq!(delays, vec![10, 20, 40, 80, 80, 80]);
    }

    #[test]
    fn reset_restores_initial_delay() {
        let mut backoff = Backoff::new(fast_config());
        backoff.record_failure();
        backoff.next_delay();
        backoff.record_failure();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay().as_millis(), 10);
    }

    #[test]
    fn backoff_never_exceeds_max_delay() {
        let mut backoff = Backoff::new(fast_config());
        for _ in 0..20 {
            backoff.record_failure();
            assert!(backoff.next_delay().as_millis() <= 80);
        }
    }

    #[test]
    fn consecutive_failures_counted() {
        let mut backoff = Backoff::new(fast_config());
        backoff.record_failure();
        backoff.record_failure();
        assert_eq!(backoff.consecutive_failures(), 2);
        backoff.reset();
        assert_eq!(backoff.consecutive_failures(), 0);
    }
}
