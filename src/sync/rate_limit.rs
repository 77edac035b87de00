use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

/// Minimum spacing between sync attempts.
///
/// Exists so a user repeatedly tapping "refresh" cannot hammer the
/// backend: a drain that arrives too early is refused with the remaining
/// wait rather than performed.
pub struct RateLimiter {
    minimum_interval: Duration,
    last_attempt: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub fn new(minimum_interval: Duration) -> Self {
        Self {
            minimum_interval,
            last_attempt: Mutex::new(None),
        }
    }

    /// Whether enough time has passed since the last recorded attempt.
    pub fn can_sync(&self) -> bool {
        self.remaining_wait().is_zero()
    }

    /// Record that a sync was initiated, unconditionally.
    pub fn record_attempt(&self) {
        *self.last_attempt.lock().unwrap() = Some(Instant::now());
    }

    /// Time until the next permitted attempt; zero when one is permitted
    /// now. Never negative — callers get a wait, not an error.
    pub fn remaining_wait(&self) -> Duration {
        match *self.last_attempt.lock().unwrap() {
            Some(last) => self.minimum_interval.saturating_sub(last.elapsed()),
            None => Duration::ZERO,
        }
    }
}

/// Render a wait as a short user-facing string: `"45s"`, `"2m 05s"`.
/// Sub-second remainders round up so the message never reads `"0s"` while
/// a wait is still in force.
pub fn format_wait(wait: Duration) -> String {
    let mut secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs += 1;
    }
    if secs >= 60 {
        format!("{}m {:02}s", secs / 60, secs % 60)
    } else {
        format!("{secs}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn first_attempt_always_permitted() {
        let limiter = RateLimiter::new(Duration::from_secs(30));
        assert!(limiter.can_sync());
        assert_eq!(limiter.remaining_wait(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn second_attempt_within_interval_is_refused() {
        let limiter = RateLimiter::new(Duration::from_secs(30));
        limiter.record_attempt();

        tokio::time::advance(Duration::from_secs(10)).await;

        assert!(!limiter.can_sync());
        let wait = limiter.remaining_wait();
        assert!(wait > Duration::ZERO);
        assert!(wait <= Duration::from_secs(30));
        assert_eq!(wait, Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn interval_elapses() {
        let limiter = RateLimiter::new(Duration::from_secs(30));
        limiter.record_attempt();

        tokio::time::advance(Duration::from_secs(30)).await;

        assert!(limiter.can_sync());
    }

    #[test]
    fn format_short_waits() {
        assert_eq!(format_wait(Duration::from_secs(45)), "45s");
        assert_eq!(format_wait(Duration::from_millis(1_500)), "2s");
        assert_eq!(format_wait(Duration::ZERO), "0s");
    }

    #[test]
    fn format_minute_waits() {
        assert_eq!(format_wait(Duration::from_secs(125)), "2m 05s");
        assert_eq!(format_wait(Duration::from_secs(60)), "1m 00s");
    }
}
