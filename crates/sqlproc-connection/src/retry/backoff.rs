//! Exponential backoff delays between connection attempts

use std::time::Duration;

/// Delay schedule for connection retries.
///
/// The delay for attempt `n` is `initial * multiplier^n`, capped at the
/// maximum. Jitter, when enabled, moves each delay by up to 25% either way.
///
/// # Example
///
/// ```
/// use sqlproc_connection::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// let backoff = BackoffStrategy::new(2_000, 30_000);
/// assert_eq!(backoff.calculate_delay(0), Duration::from_millis(2_000));
/// assert_eq!(backoff.calculate_delay(1), Duration::from_millis(4_000));
/// assert_eq!(backoff.calculate_delay(10), Duration::from_millis(30_000));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BackoffStrategy {
    initial_ms: u64,
    max_ms: u64,
    multiplier: f64,
    jitter: bool,
}

impl BackoffStrategy {
    /// `initial_ms` is raised to at least 1ms and `max_ms` to at least `initial_ms`.
    pub fn new(initial_ms: u64, max_ms: u64) -> Self {
        let initial_ms = initial_ms.max(1);
        Self {
            initial_ms,
            max_ms: max_ms.max(initial_ms),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// The same delay before every attempt
    pub fn constant(delay_ms: u64) -> Self {
        Self::new(delay_ms, delay_ms).with_multiplier(1.0)
    }

    /// Growth factor per attempt, at least 1.0
    pub fn with_multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier.max(1.0);
        self
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Delay before retry number `attempt` (0-based).
    pub fn calculate_delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(i32::MAX as u32) as i32;
        let delay_ms = (self.initial_ms as f64) * self.multiplier.powi(exponent);
        let capped_ms = delay_ms.min(self.max_ms as f64) as u64;

        let final_ms = if self.jitter {
            let spread = capped_ms / 4;
            let offset = (rand::random::<f64>() * (spread * 2) as f64) as u64;
            capped_ms.saturating_sub(spread).saturating_add(offset)
        } else {
            capped_ms
        };

        Duration::from_millis(final_ms)
    }

    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_ms)
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn has_jitter(&self) -> bool {
        self.jitter
    }
}

impl Default for BackoffStrategy {
    /// 2 seconds, doubling up to 30 seconds
    fn default() -> Self {
        Self::new(2_000, 30_000)
    }
}
