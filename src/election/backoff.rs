//! Retry backoff with jitter
//!
//! Nominal delays double from `initial` up to `max` and never reset within
//! one election. Each sleep is sampled uniformly within ±`jitter` of the
//! nominal delay.

use rand::Rng;
use std::time::Duration;

/// Fixed backoff policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub initial: Duration,
    pub max: Duration,
    /// Fraction of the nominal delay to jitter by in either direction.
    pub jitter: f64,
}

impl BackoffPolicy {
    /// 1s initial, 16s ceiling, ±20% jitter.
    pub const DEFAULT: BackoffPolicy = BackoffPolicy {
        initial: Duration::from_secs(1),
        max: Duration::from_secs(16),
        jitter: 0.2,
    };
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Backoff state for one election
#[derive(Debug, Clone)]
pub struct Backoff {
    policy: BackoffPolicy,
    current: Duration,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self {
            current: policy.initial,
            policy,
        }
    }

    /// Delay before jitter for the next sleep.
    pub fn nominal(&self) -> Duration {
        self.current
    }

    /// Jittered delay for the next sleep.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        jitter(self.current, self.policy.jitter, rng)
    }

    /// Double the nominal delay, capped at the policy ceiling.
    pub fn advance(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.policy.max);
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Self::new(BackoffPolicy::DEFAULT)
    }
}

/// Uniformly perturb `duration` within ±`fraction` of itself.
///
/// `fraction` is clamped to `[0, 1]`; zero or NaN leaves `duration` as is.
pub fn jitter<R: Rng + ?Sized>(duration: Duration, fraction: f64, rng: &mut R) -> Duration {
    if fraction.is_nan() || fraction <= 0.0 {
        return duration;
    }
    let fraction = fraction.min(1.0);
    let factor = 1.0 + rng.gen_range(-fraction..=fraction);
    duration.mul_f64(factor.max(0.0))
}
