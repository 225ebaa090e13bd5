use rand::Rng;
use std::time::Duration;

/// Reconnection backoff policy driving the RECONNECTING state of the
/// Transaction Source (A) state machine (§4.1).
///
/// The specification pins a fixed schedule rather than a tunable one:
/// the first reconnect attempt follows 5s after a drop, and every
/// subsequent attempt follows 10s after the previous failure. That
/// schedule falls out of `initial=5s, multiplier=2, max=10s` below.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectionBackoffPolicy {
    pub backoff_ms_initial: u64,
    pub backoff_multiplier: u32,
    pub backoff_ms_max: u64,
}

impl ReconnectionBackoffPolicy {
    /// The fixed 5s / 10s schedule from §4.1 and §5.
    pub const fn spec_default() -> Self {
        Self {
            backoff_ms_initial: 5_000,
            backoff_multiplier: 2,
            backoff_ms_max: 10_000,
        }
    }
}

impl Default for ReconnectionBackoffPolicy {
    fn default() -> Self {
        Self::spec_default()
    }
}

/// Mutable cursor over a [`ReconnectionBackoffPolicy`], tracking the
/// current backoff duration across repeated reconnect failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectionState {
    policy: ReconnectionBackoffPolicy,
    backoff_ms_current: u64,
}

impl From<ReconnectionBackoffPolicy> for ReconnectionState {
    fn from(policy: ReconnectionBackoffPolicy) -> Self {
        Self {
            backoff_ms_current: policy.backoff_ms_initial,
            policy,
        }
    }
}

impl ReconnectionState {
    pub fn reset(&mut self) {
        self.backoff_ms_current = self.policy.backoff_ms_initial;
    }

    pub fn next_delay(&mut self) -> Duration {
        let delay = Duration::from_millis(self.backoff_ms_current);
        let next = self.backoff_ms_current.saturating_mul(self.policy.backoff_multiplier as u64);
        self.backoff_ms_current = next.min(self.policy.backoff_ms_max);
        delay
    }

    /// Current delay with a small jitter applied, useful when many
    /// ingestion tasks might reconnect simultaneously.
    pub fn next_delay_jittered(&mut self, jitter_ms: u64) -> Duration {
        let base = self.next_delay();
        if jitter_ms == 0 {
            return base;
        }
        let jitter = rand::rng().random_range(0..=jitter_ms);
        base + Duration::from_millis(jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_spec_fixed_5s_then_10s_schedule() {
        let mut state = ReconnectionState::from(ReconnectionBackoffPolicy::spec_default());

        assert_eq!(state.next_delay(), Duration::from_secs(5));
        assert_eq!(state.next_delay(), Duration::from_secs(10));
        assert_eq!(state.next_delay(), Duration::from_secs(10));
    }

    #[test]
    fn reset_returns_to_initial_delay() {
        let mut state = ReconnectionState::from(ReconnectionBackoffPolicy::spec_default());
        state.next_delay();
        state.next_delay();
        state.reset();
        assert_eq!(state.next_delay(), Duration::from_secs(5));
    }
}
