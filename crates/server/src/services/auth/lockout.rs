//! Brute-force lockout for admin login.
//!
//! Counters live in process memory and reset when the server restarts. That
//! only raises the cost of guessing; it is not a hard limit.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

/// Consecutive failures that trigger a lockout.
pub const LOCKOUT_THRESHOLD: u32 = 5;

/// How long a lockout lasts, measured from the last failure.
pub const LOCKOUT_WINDOW: Duration = Duration::minutes(15);

#[derive(Debug, Clone, Copy)]
struct AttemptCounter {
    /// Settled failures inside the current window.
    count: u32,
    /// Attempts reserved but not yet settled.
    in_flight: u32,
    last_attempt_at: DateTime<Utc>,
}

impl AttemptCounter {
    const fn fresh(now: DateTime<Utc>) -> Self {
        Self {
            count: 0,
            in_flight: 0,
            last_attempt_at: now,
        }
    }

    const fn is_idle(&self) -> bool {
        self.count == 0 && self.in_flight == 0
    }
}

/// Tracks failed admin logins per client identity.
///
/// A password check must first [`reserve`](LockoutGuard::reserve) an attempt.
/// Reservations count against the threshold while the check runs, so
/// concurrent guesses from one identity cannot all slip past the limit.
#[derive(Debug)]
pub struct LockoutGuard {
    attempts: DashMap<String, AttemptCounter>,
    threshold: u32,
    window: Duration,
}

impl Default for LockoutGuard {
    fn default() -> Self {
        Self::new(LOCKOUT_THRESHOLD, LOCKOUT_WINDOW)
    }
}

impl LockoutGuard {
    /// Create a guard with a custom policy.
    #[must_use]
    pub fn new(threshold: u32, window: Duration) -> Self {
        Self {
            attempts: DashMap::new(),
            threshold,
            window,
        }
    }

    /// If `identity` is locked out as of `now`, the time left until it may
    /// try again. Unsettled reservations are not counted.
    #[must_use]
    pub fn locked_for_at(&self, identity: &str, now: DateTime<Utc>) -> Option<std::time::Duration> {
        let counter = *self.attempts.get(identity)?;
        self.remaining_lock(&counter, now)
    }

    /// Reserve one password check for `identity`.
    ///
    /// # Errors
    ///
    /// Returns the time to wait if `identity` is locked out, or if the
    /// attempts already in flight could reach the threshold.
    pub fn reserve(&self, identity: &str) -> Result<Attempt<'_>, std::time::Duration> {
        self.reserve_at(identity, Utc::now())
    }

    /// [`LockoutGuard::reserve`] as of `now`.
    ///
    /// # Errors
    ///
    /// Same as [`LockoutGuard::reserve`].
    pub fn reserve_at(
        &self,
        identity: &str,
        now: DateTime<Utc>,
    ) -> Result<Attempt<'_>, std::time::Duration> {
        let mut counter = self
            .attempts
            .entry(identity.to_owned())
            .or_insert_with(|| AttemptCounter::fresh(now));

        if now >= counter.last_attempt_at + self.window {
            counter.count = 0;
        }
        if let Some(remaining) = self.remaining_lock(&counter, now) {
            return Err(remaining);
        }
        if counter.count.saturating_add(counter.in_flight) >= self.threshold {
            // Every pending check could still fail and start a full lockout.
            return Err(self.window.to_std().unwrap_or_default());
        }

        counter.in_flight += 1;
        drop(counter);

        Ok(Attempt {
            guard: self,
            identity: identity.to_owned(),
            settled: false,
        })
    }

    /// Drop counters with nothing in flight whose window has passed.
    /// Returns how many were removed.
    pub fn purge_stale_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.attempts.len();
        self.attempts.retain(|_, counter| {
            counter.in_flight > 0 || now < counter.last_attempt_at + self.window
        });
        before.saturating_sub(self.attempts.len())
    }

    fn remaining_lock(&self, counter: &AttemptCounter, now: DateTime<Utc>) -> Option<std::time::Duration> {
        if counter.count < self.threshold {
            return None;
        }

        let unlock_at = counter.last_attempt_at + self.window;
        (now < unlock_at)
            .then(|| (unlock_at - now).to_std().ok())
            .flatten()
    }

    fn settle_failure(&self, identity: &str, now: DateTime<Utc>) -> u32 {
        let mut counter = self
            .attempts
            .entry(identity.to_owned())
            .or_insert_with(|| AttemptCounter::fresh(now));

        counter.in_flight = counter.in_flight.saturating_sub(1);
        if now >= counter.last_attempt_at + self.window {
            counter.count = 0;
        }
        counter.count = counter.count.saturating_add(1);
        counter.last_attempt_at = now;
        counter.count
    }

    fn settle_success(&self, identity: &str) {
        if let Entry::Occupied(mut entry) = self.attempts.entry(identity.to_owned()) {
            let counter = entry.get_mut();
            counter.in_flight = counter.in_flight.saturating_sub(1);
            counter.count = 0;
            if counter.is_idle() {
                entry.remove();
            }
        }
    }

    fn release(&self, identity: &str) {
        if let Entry::Occupied(mut entry) = self.attempts.entry(identity.to_owned()) {
            let counter = entry.get_mut();
            counter.in_flight = counter.in_flight.saturating_sub(1);
            if counter.is_idle() {
                entry.remove();
            }
        }
    }
}

/// A reserved password check.
///
/// Settle it with [`Attempt::failed`] or [`Attempt::succeeded`]. Dropping it
/// unsettled (the check itself errored) releases the reservation without
/// counting a failure.
#[derive(Debug)]
#[must_use = "an unsettled attempt is released without counting"]
pub struct Attempt<'a> {
    guard: &'a LockoutGuard,
    identity: String,
    settled: bool,
}

impl Attempt<'_> {
    /// Count a failed check and return the failure count.
    pub fn failed(self) -> u32 {
        self.failed_at(Utc::now())
    }

    /// [`Attempt::failed`] as of `now`.
    pub fn failed_at(mut self, now: DateTime<Utc>) -> u32 {
        self.settled = true;
        self.guard.settle_failure(&self.identity, now)
    }

    /// The check passed: forget the identity's failures.
    pub fn succeeded(mut self) {
        self.settled = true;
        self.guard.settle_success(&self.identity);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.guard.release(&self.identity);
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;

    const IP: &str = "203.0.113.7";

    fn fail(guard: &LockoutGuard, identity: &str, now: DateTime<Utc>) -> u32 {
        guard.reserve_at(identity, now).unwrap().failed_at(now)
    }

    #[test]
    fn test_locks_after_threshold() {
        let guard = LockoutGuard::default();
        let now = Utc::now();

        for i in 1..LOCKOUT_THRESHOLD {
            assert_eq!(fail(&guard, IP, now), i);
            assert!(guard.locked_for_at(IP, now).is_none());
        }
        fail(&guard, IP, now);

        let retry_after = guard.locked_for_at(IP, now);
        assert!(retry_after.is_some_and(|d| d > std::time::Duration::ZERO));
        assert!(guard.reserve_at(IP, now).is_err());
    }

    #[test]
    fn test_lock_lifts_after_window() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        for _ in 0..LOCKOUT_THRESHOLD {
            fail(&guard, IP, now);
        }

        assert!(guard.locked_for_at(IP, now + LOCKOUT_WINDOW).is_none());
        assert!(guard.reserve_at(IP, now + LOCKOUT_WINDOW).is_ok());
    }

    #[test]
    fn test_failure_after_window_restarts_count() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        for _ in 0..LOCKOUT_THRESHOLD {
            fail(&guard, IP, now);
        }

        let later = now + LOCKOUT_WINDOW + Duration::seconds(1);
        assert_eq!(fail(&guard, IP, later), 1);
        assert!(guard.locked_for_at(IP, later).is_none());
    }

    #[test]
    fn test_success_clears_failures() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        for _ in 1..LOCKOUT_THRESHOLD {
            fail(&guard, IP, now);
        }
        guard.reserve_at(IP, now).unwrap().succeeded();

        assert!(guard.locked_for_at(IP, now).is_none());
        assert_eq!(fail(&guard, IP, now), 1);
    }

    #[test]
    fn test_identities_are_independent() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        for _ in 0..LOCKOUT_THRESHOLD {
            fail(&guard, IP, now);
        }
        assert!(guard.locked_for_at("198.51.100.1", now).is_none());
        assert!(guard.reserve_at("198.51.100.1", now).is_ok());
    }

    #[test]
    fn test_retry_after_counts_from_last_failure() {
        let guard = LockoutGuard::default();
        let start = Utc::now();
        for i in 0..LOCKOUT_THRESHOLD {
            fail(&guard, IP, start + Duration::minutes(i64::from(i)));
        }
        let last = start + Duration::minutes(i64::from(LOCKOUT_THRESHOLD - 1));

        let retry_after = guard.locked_for_at(IP, last).unwrap_or_default();
        assert_eq!(retry_after.as_secs(), 15 * 60);
    }

    #[test]
    fn test_in_flight_attempts_count_against_threshold() {
        let guard = LockoutGuard::default();
        let now = Utc::now();

        let pending: Vec<_> = (0..LOCKOUT_THRESHOLD)
            .map(|_| guard.reserve_at(IP, now).unwrap())
            .collect();
        assert!(guard.reserve_at(IP, now).is_err());

        for attempt in pending {
            attempt.failed_at(now);
        }
        assert!(guard.locked_for_at(IP, now).is_some());
    }

    #[test]
    fn test_dropped_attempt_is_released() {
        let guard = LockoutGuard::default();
        let now = Utc::now();

        for _ in 0..LOCKOUT_THRESHOLD {
            drop(guard.reserve_at(IP, now).unwrap());
        }
        assert!(guard.locked_for_at(IP, now).is_none());
        assert_eq!(fail(&guard, IP, now), 1);
    }

    #[test]
    fn test_concurrent_reservations_never_exceed_threshold() {
        let guard = Arc::new(LockoutGuard::default());
        let barrier = Arc::new(std::sync::Barrier::new(32));

        let handles: Vec<_> = (0..32)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let barrier = Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    let now = Utc::now();
                    // Hold the reservation until every thread has tried.
                    let attempt = guard.reserve_at(IP, now).ok();
                    let admitted = attempt.is_some();
                    std::thread::sleep(std::time::Duration::from_millis(50));
                    if let Some(attempt) = attempt {
                        attempt.failed_at(now);
                    }
                    admitted
                })
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|admitted| *admitted)
            .count();
        assert_eq!(admitted, usize::try_from(LOCKOUT_THRESHOLD).unwrap());
        assert!(guard.locked_for_at(IP, Utc::now()).is_some());
    }

    #[test]
    fn test_purge_stale() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        fail(&guard, IP, now);
        fail(&guard, "198.51.100.1", now + LOCKOUT_WINDOW);

        assert_eq!(guard.purge_stale_at(now + LOCKOUT_WINDOW), 1);
        assert!(guard.locked_for_at(IP, now).is_none());
    }

    #[test]
    fn test_purge_keeps_in_flight() {
        let guard = LockoutGuard::default();
        let now = Utc::now();
        let attempt = guard.reserve_at(IP, now).unwrap();

        assert_eq!(guard.purge_stale_at(now + LOCKOUT_WINDOW), 0);
        assert_eq!(attempt.failed_at(now + LOCKOUT_WINDOW), 1);
    }
}
