//! Strip reconnection with exponential backoff.
//!
//! When a strip write fails mid-run (SPI device gone, permissions yanked,
//! USB-SPI bridge unplugged) the host drops the handle and retries
//! reopening on a doubling backoff so a dead bus is not hammered at the
//! polling cadence.

use std::time::{Duration, Instant};

use crate::strip::{PlatformStrip, open_strip};

/// Doubling backoff timer: 1 s after the first failure, capped at 30 s.
#[derive(Debug)]
pub struct Backoff {
    initial: Duration,
    max: Duration,
    current: Duration,
    last_attempt: Option<Instant>,
    failures: u32,
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Backoff {
            initial,
            max,
            current: initial,
            last_attempt: None,
            failures: 0,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(30))
    }

    /// Whether enough time has elapsed for another attempt. Always true
    /// before the first attempt.
    pub fn ready(&self) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => last.elapsed() >= self.current,
        }
    }

    /// Record a failed attempt and double the delay (capped).
    pub fn failed(&mut self) {
        self.failures += 1;
        self.last_attempt = Some(Instant::now());
        self.current = (self.current * 2).min(self.max);
    }

    /// Record a success and reset the timer.
    pub fn succeeded(&mut self) {
        self.failures = 0;
        self.current = self.initial;
        self.last_attempt = None;
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn current_delay(&self) -> Duration {
        self.current
    }
}

/// Attempt to reopen the strip, respecting backoff timing.
///
/// - Returns `None` without attempting if the backoff timer hasn't elapsed.
/// - On success, resets the backoff and returns the new strip.
/// - On failure, advances the backoff, logs the schedule, and returns `None`.
pub fn try_reopen(
    backoff: &mut Backoff,
    device: &str,
    len: usize,
    brightness: f64,
) -> Option<PlatformStrip> {
    if !backoff.ready() {
        return None;
    }
    match open_strip(device, len, brightness) {
        Ok(strip) => {
            backoff.succeeded();
            Some(strip)
        }
        Err(e) => {
            backoff.failed();
            log::warn!(
                "strip reopen failed: {e} (attempt {}, retry in {:.1}s)",
                backoff.failures(),
                backoff.current_delay().as_secs_f64()
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn initial_ready_is_true() {
        let backoff = Backoff::with_defaults();
        assert!(backoff.ready());
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.current_delay(), Duration::from_secs(1));
    }

    #[test]
    fn backoff_doubles_on_failure() {
        let mut backoff = Backoff::new(Duration::from_millis(100), Duration::from_secs(10));

        backoff.failed();
        assert_eq!(backoff.failures(), 1);
        assert_eq!(backoff.current_delay(), Duration::from_millis(200));

        backoff.failed();
        assert_eq!(backoff.current_delay(), Duration::from_millis(400));

        backoff.failed();
        assert_eq!(backoff.current_delay(), Duration::from_millis(800));
    }

    #[test]
    fn backoff_capped_at_max() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(4));

        backoff.failed(); // 1s -> 2s
        assert_eq!(backoff.current_delay(), Duration::from_secs(2));
        backoff.failed(); // 2s -> 4s (= max)
        assert_eq!(backoff.current_delay(), Duration::from_secs(4));
        backoff.failed(); // capped
        assert_eq!(backoff.current_delay(), Duration::from_secs(4));
    }

    #[test]
    fn success_resets_backoff() {
        let mut backoff = Backoff::with_defaults();
        backoff.failed();
        backoff.failed();
        assert_eq!(backoff.failures(), 2);

        backoff.succeeded();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.current_delay(), Duration::from_secs(1));
        assert!(backoff.ready());
    }

    #[test]
    fn not_ready_immediately_after_failure() {
        let mut backoff = Backoff::new(Duration::from_secs(60), Duration::from_secs(60));
        backoff.failed();
        assert!(!backoff.ready());
    }

    #[test]
    fn ready_after_delay_elapses() {
        let mut backoff = Backoff::new(Duration::from_millis(1), Duration::from_secs(1));
        backoff.failed();
        std::thread::sleep(Duration::from_millis(10));
        assert!(backoff.ready());
    }

    #[test]
    fn repeated_success_idempotent() {
        let mut backoff = Backoff::with_defaults();
        backoff.failed();
        backoff.succeeded();
        backoff.succeeded();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.current_delay(), Duration::from_secs(1));
    }
}
