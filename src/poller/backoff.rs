use std::time::Duration;

pub const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
pub const DEFAULT_FACTOR: f64 = 2.0;
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(8);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;

/// Exponential backoff with a ceiling and a fixed attempt budget.
///
/// `delay(n)` is `min(initial * factor^n, max_delay)`, so the schedule is
/// non-decreasing and bounded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    initial_delay: Duration,
    factor: f64,
    max_delay: Duration,
    max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(
            DEFAULT_INITIAL_DELAY,
            DEFAULT_FACTOR,
            DEFAULT_MAX_DELAY,
            DEFAULT_MAX_ATTEMPTS,
        )
    }
}

impl BackoffPolicy {
    /// Out-of-range values are clamped: factor to at least 1, the ceiling to at
    /// least the initial delay, attempts to at least 1.
    pub fn new(initial_delay: Duration, factor: f64, max_delay: Duration, max_attempts: u32) -> Self {
        let factor = if factor.is_finite() { factor.max(1.0) } else { 1.0 };
        Self {
            initial_delay,
            factor,
            max_delay: max_delay.max(initial_delay),
            max_attempts: max_attempts.max(1),
        }
    }

    pub fn with_initial_delay(self, initial_delay: Duration) -> Self {
        Self::new(initial_delay, self.factor, self.max_delay, self.max_attempts)
    }

    pub fn with_factor(self, factor: f64) -> Self {
        Self::new(self.initial_delay, factor, self.max_delay, self.max_attempts)
    }

    pub fn with_max_delay(self, max_delay: Duration) -> Self {
        Self::new(self.initial_delay, self.factor, max_delay, self.max_attempts)
    }

    pub fn with_max_attempts(self, max_attempts: u32) -> Self {
        Self::new(self.initial_delay, self.factor, self.max_delay, max_attempts)
    }

    pub fn initial_delay(&self) -> Duration {
        self.initial_delay
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait after the `attempt`-th poll (zero based).
    pub fn delay(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(1024) as i32;
        let scaled = self.initial_delay.as_secs_f64() * self.factor.powi(exponent);
        if !scaled.is_finite() || scaled >= self.max_delay.as_secs_f64() {
            self.max_delay
        } else {
            Duration::from_secs_f64(scaled)
        }
    }

    /// Total time spent waiting if every attempt comes back non-terminal.
    /// No wait follows the final attempt.
    pub fn max_total_wait(&self) -> Duration {
        (0..self.max_attempts.saturating_sub(1)).map(|n| self.delay(n)).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_doubles_until_ceiling() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay(0), Duration::from_secs(1));
        assert_eq!(policy.delay(1), Duration::from_secs(2));
        assert_eq!(policy.delay(2), Duration::from_secs(4));
        assert_eq!(policy.delay(3), Duration::from_secs(8));
        assert_eq!(policy.delay(4), Duration::from_secs(8));
        assert_eq!(policy.delay(u32::MAX), Duration::from_secs(8));
    }

    #[test]
    fn delay_is_non_decreasing_and_bounded() {
        let policy = BackoffPolicy::new(
            Duration::from_millis(150),
            1.7,
            Duration::from_secs(5),
            50,
        );
        let mut previous = Duration::ZERO;
        for attempt in 0..200 {
            let delay = policy.delay(attempt);
            assert!(delay >= previous, "attempt {attempt}: {delay:?} < {previous:?}");
            assert!(delay <= policy.max_delay());
            previous = delay;
        }
    }

    #[test]
    fn invalid_values_are_clamped() {
        let policy = BackoffPolicy::new(Duration::from_secs(2), 0.5, Duration::from_secs(1), 0);
        assert_eq!(policy.factor(), 1.0);
        assert_eq!(policy.max_delay(), Duration::from_secs(2));
        assert_eq!(policy.max_attempts(), 1);
        assert_eq!(policy.delay(10), Duration::from_secs(2));

        let policy = BackoffPolicy::default().with_factor(f64::NAN);
        assert_eq!(policy.factor(), 1.0);
    }

    #[test]
    fn max_total_wait_skips_final_attempt() {
        let policy = BackoffPolicy::default().with_max_attempts(4);
        assert_eq!(policy.max_total_wait(), Duration::from_secs(1 + 2 + 4));
        assert_eq!(policy.with_max_attempts(1).max_total_wait(), Duration::ZERO);
    }
}
