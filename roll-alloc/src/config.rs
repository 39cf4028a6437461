use std::time::Duration;

use rand::Rng;
use roll_core::{RollConfigSnapshot, RollError, RollResult};

/// What happens once every attempt collided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustionPolicy {
    /// Raise `AllocationExhausted` with the last cause.
    Fail,
    /// Derive a sequence from the clock and accept it unverified.
    TimestampFallback,
}

impl ExhaustionPolicy {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fail" | "strict" => Some(Self::Fail),
            "timestamp" | "timestamp_fallback" => Some(Self::TimestampFallback),
            _ => None,
        }
    }
}

/// Exponential backoff with additive jitter between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub jitter: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_millis(150),
            max: Duration::from_millis(1500),
            jitter: Duration::from_millis(150),
        }
    }
}

impl BackoffPolicy {
    /// No waiting at all; handy for tests and single-writer tools.
    pub fn none() -> Self {
        Self {
            base: Duration::ZERO,
            max: Duration::ZERO,
            jitter: Duration::ZERO,
        }
    }

    /// Un-jittered delay after the given (1-based) failed attempt.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base.saturating_mul(factor).min(self.max)
    }

    /// Delay after the given failed attempt, jitter included.
    pub fn delay<R: Rng + ?Sized>(&self, attempt: u32, rng: &mut R) -> Duration {
        let jitter_ms = self.jitter.as_millis() as u64;
        let jitter = if jitter_ms == 0 {
            Duration::ZERO
        } else {
            Duration::from_millis(rng.gen_range(0..=jitter_ms))
        };
        self.base_delay(attempt) + jitter
    }
}

/// Configuration for the uniqueness orchestrator
#[derive(Debug, Clone)]
pub struct AllocatorConfig {
    /// Verification attempts before giving up
    pub max_attempts: u32,
    pub backoff: BackoffPolicy,
    pub exhaustion: ExhaustionPolicy,
    /// Prefer an attached atomic counter over rescanning the scope
    pub use_counter: bool,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffPolicy::default(),
            exhaustion: ExhaustionPolicy::Fail,
            use_counter: true,
        }
    }
}

impl AllocatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_exhaustion(mut self, policy: ExhaustionPolicy) -> Self {
        self.exhaustion = policy;
        self
    }

    /// Ignore any attached counter and always rescan.
    pub fn rescan_only(mut self) -> Self {
        self.use_counter = false;
        self
    }

    pub fn from_snapshot(snapshot: &RollConfigSnapshot) -> RollResult<Self> {
        let mut config = Self::default();

        if let Some(v) = snapshot.get_u32("allocator.max_attempts")? {
            config.max_attempts = v;
        }
        if let Some(ms) = snapshot.get_u64("allocator.backoff.base_ms")? {
            config.backoff.base = Duration::from_millis(ms);
        }
        if let Some(ms) = snapshot.get_u64("allocator.backoff.max_ms")? {
            config.backoff.max = Duration::from_millis(ms);
        }
        if let Some(ms) = snapshot.get_u64("allocator.backoff.jitter_ms")? {
            config.backoff.jitter = Duration::from_millis(ms);
        }
        if let Some(raw) = snapshot.get("allocator.exhaustion") {
            config.exhaustion = ExhaustionPolicy::parse(raw).ok_or_else(|| {
                RollError::invalid_config("allocator.exhaustion", format!("unknown policy '{raw}'"))
            })?;
        }
        if let Some(v) = snapshot.get_bool("allocator.use_counter")? {
            config.use_counter = v;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> RollResult<()> {
        if self.max_attempts == 0 {
            return Err(RollError::invalid_config(
                "allocator.max_attempts",
                "at least one attempt is required",
            ));
        }
        if self.backoff.base > self.backoff.max {
            return Err(RollError::invalid_config(
                "allocator.backoff.base_ms",
                "base delay exceeds the cap",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use roll_core::RollConfig;

    #[test]
    fn backoff_doubles_until_capped() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.base_delay(1), Duration::from_millis(150));
        assert_eq!(policy.base_delay(2), Duration::from_millis(300));
        assert_eq!(policy.base_delay(4), Duration::from_millis(1200));
        assert_eq!(policy.base_delay(5), Duration::from_millis(1500));
        assert_eq!(policy.base_delay(40), Duration::from_millis(1500));
    }

    #[test]
    fn jitter_stays_within_bound() {
        let policy = BackoffPolicy::default();
        let mut rng = StdRng::seed_from_u64(3);
        for attempt in 1..=10 {
            let d = policy.delay(attempt, &mut rng);
            assert!(d >= policy.base_delay(attempt));
            assert!(d <= policy.base_delay(attempt) + policy.jitter);
        }
        assert_eq!(BackoffPolicy::none().delay(3, &mut rng), Duration::ZERO);
    }

    #[test]
    fn snapshot_overrides_defaults() {
        let mut raw = RollConfig::new();
        raw.set("allocator.max_attempts", "4");
        raw.set("allocator.backoff.jitter_ms", "0");
        raw.set("allocator.exhaustion", "timestamp");

        let config = AllocatorConfig::from_snapshot(&raw.snapshot()).unwrap();
        assert_eq!(config.max_attempts, 4);
        assert_eq!(config.backoff.jitter, Duration::ZERO);
        assert_eq!(config.exhaustion, ExhaustionPolicy::TimestampFallback);

        raw.set("allocator.max_attempts", "0");
        assert!(AllocatorConfig::from_snapshot(&raw.snapshot()).is_err());
    }
}
