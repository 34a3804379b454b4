//! Delay computation between retry attempts

use std::time::Duration;

use bulwark_domain::{BackoffKind, ResilienceConfig};
use rand::Rng;

/// Lower bound of the jitter factor
pub const JITTER_MIN_FACTOR: f64 = 0.5;
/// Upper bound of the jitter factor
pub const JITTER_MAX_FACTOR: f64 = 1.5;

/// Computes the wait before each retry
///
/// Attempts are 1-indexed: `next_delay(1)` is the wait after the first failed
/// attempt. There is never a delay before the first attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    kind: BackoffKind,
    base: Duration,
    max: Duration,
    jitter: bool,
}

impl BackoffPolicy {
    /// Constant delay between attempts
    pub const fn fixed(delay: Duration) -> Self {
        Self { kind: BackoffKind::Fixed, base: delay, max: delay, jitter: false }
    }

    /// Doubling delay starting at `base`, capped at `max`
    pub const fn exponential(base: Duration, max: Duration) -> Self {
        Self { kind: BackoffKind::Exponential, base, max, jitter: false }
    }

    /// Enable or disable jitter
    ///
    /// Jitter only applies to exponential backoff.
    #[must_use]
    pub const fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Backoff described by a resolved configuration
    pub const fn from_config(config: &ResilienceConfig) -> Self {
        Self {
            kind: config.backoff,
            base: config.base_delay(),
            max: config.max_delay(),
            jitter: config.jitter,
        }
    }

    pub const fn kind(&self) -> BackoffKind {
        self.kind
    }

    pub const fn is_jittered(&self) -> bool {
        self.jitter && matches!(self.kind, BackoffKind::Exponential)
    }

    /// Delay before retrying after `attempt`, without jitter
    pub fn base_delay(&self, attempt: u32) -> Duration {
        match self.kind {
            BackoffKind::Fixed => self.base,
            BackoffKind::Exponential => {
                let exponent = attempt.max(1) - 1;
                let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
                self.base.saturating_mul(multiplier).min(self.max)
            }
        }
    }

    /// Delay before retrying after `attempt`
    pub fn next_delay(&self, attempt: u32) -> Duration {
        self.next_delay_with(attempt, &mut rand::thread_rng())
    }

    /// Same as [`next_delay`](Self::next_delay) with a caller-supplied RNG
    pub fn next_delay_with<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let delay = self.base_delay(attempt);
        if !self.is_jittered() || delay.is_zero() {
            return delay;
        }
        let factor = rng.gen_range(JITTER_MIN_FACTOR..=JITTER_MAX_FACTOR);
        delay.mul_f64(factor).min(self.max)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&ResilienceConfig::default())
    }
}
