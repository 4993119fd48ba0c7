//! Reconnection pacing for the monitor's session loop.
//!
//! A session that opened and then closed is retried at once. Only
//! consecutive failed handshakes are spaced out, and only under
//! [`ReconnectPolicy::Backoff`].

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffConfig {
    /// Delay after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
        }
    }
}

/// How the monitor paces reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReconnectPolicy {
    /// Retry with no delay, whatever happened.
    Immediate,
    /// Retry closes at once, space out failed handshakes exponentially.
    Backoff(BackoffConfig),
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::Backoff(BackoffConfig::default())
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`BackoffConfig::max_delay`].
#[must_use]
pub fn next_delay(current: Duration, config: &BackoffConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Per-monitor retry state.
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: ReconnectPolicy,
    current: Option<Duration>,
}

impl Backoff {
    /// Creates retry state with no failures recorded.
    #[must_use]
    pub const fn new(policy: ReconnectPolicy) -> Self {
        Self {
            policy,
            current: None,
        }
    }

    /// Forgets recorded failures. Called once a socket opens.
    pub fn reset(&mut self) {
        self.current = None;
    }

    /// Delay before retrying after an opened session ended.
    #[must_use]
    pub fn after_session(&mut self) -> Duration {
        self.reset();
        Duration::ZERO
    }

    /// Delay before retrying after a failed handshake. Advances the
    /// backoff for the next failure.
    pub fn after_failure(&mut self) -> Duration {
        match self.policy {
            ReconnectPolicy::Immediate => Duration::ZERO,
            ReconnectPolicy::Backoff(config) => {
                let delay = self
                    .current
                    .unwrap_or(config.initial_delay)
                    .min(config.max_delay);
                self.current = Some(next_delay(delay, &config));
                delay
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_delay_doubles() {
        let config = BackoffConfig::default();
        let d = next_delay(Duration::from_millis(250), &config);
        assert_eq!(d, Duration::from_millis(500));
    }

    #[test]
    fn next_delay_clamps_at_max() {
        let config = BackoffConfig {
            max_delay: Duration::from_secs(3),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(3));
    }

    #[test]
    fn failure_sequence_grows_then_saturates() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        let expected = [250, 500, 1000, 2000, 4000, 5000, 5000];

        for &expected_ms in &expected {
            assert_eq!(backoff.after_failure(), Duration::from_millis(expected_ms));
        }
    }

    #[test]
    fn opened_session_resets_backoff() {
        let mut backoff = Backoff::new(ReconnectPolicy::default());
        let _ = backoff.after_failure();
        let _ = backoff.after_failure();
        assert_eq!(backoff.after_session(), Duration::ZERO);
        assert_eq!(backoff.after_failure(), Duration::from_millis(250));
    }

    #[test]
    fn immediate_policy_never_waits() {
        let mut backoff = Backoff::new(ReconnectPolicy::Immediate);
        for _ in 0..5 {
            assert_eq!(backoff.after_failure(), Duration::ZERO);
        }
        assert_eq!(backoff.after_session(), Duration::ZERO);
    }

    #[test]
    fn custom_multiplier() {
        let config = BackoffConfig {
            multiplier: 3.0,
            max_delay: Duration::from_secs(60),
            ..Default::default()
        };
        let d = next_delay(Duration::from_secs(2), &config);
        assert_eq!(d, Duration::from_secs(6));
    }
}
