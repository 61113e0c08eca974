// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Time sources for session expiry and rate limiting.
//!
//! The gateway never reads the system clock directly. It is handed a
//! [`Clock`] at construction so that timeout and window logic can be driven
//! deterministically in tests with [`MockClock`].

use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::security::locks::resilient_lock;

/// Source of monotonic timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Get the current instant.
    fn now(&self) -> Instant;
}

/// System clock backed by `Instant::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Controllable clock for tests.
///
/// Clones share the same underlying time, so advancing one clone advances
/// all of them.
///
/// ```
/// use agentguard::clock::{Clock, MockClock};
/// use std::time::{Duration, Instant};
///
/// let start = Instant::now();
/// let clock = MockClock::new(start);
/// clock.advance(Duration::from_secs(65));
/// assert_eq!(clock.now(), start + Duration::from_secs(65));
/// ```
#[derive(Debug, Clone)]
pub struct MockClock {
    current_time: Arc<Mutex<Instant>>,
}

impl MockClock {
    /// Create a mock clock starting at a specific instant.
    pub fn new(start: Instant) -> Self {
        Self {
            current_time: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = resilient_lock(&self.current_time);
        *time += duration;
    }

    /// Set the clock to a specific instant. May move time backwards.
    pub fn set(&self, instant: Instant) {
        let mut time = resilient_lock(&self.current_time);
        *time = instant;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *resilient_lock(&self.current_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let t1 = clock.now();
        let t2 = clock.now();
        assert!(t2 >= t1);
    }

    #[test]
    fn test_mock_clock_advance_and_set() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance(Duration::from_secs(10));
        assert_eq!(clock.now(), start + Duration::from_secs(10));

        clock.set(start + Duration::from_secs(100));
        assert_eq!(clock.now(), start + Duration::from_secs(100));
    }

    #[test]
    fn test_mock_clock_clones_share_time() {
        let start = Instant::now();
        let clock = MockClock::new(start);
        let other = clock.clone();

        let handle = std::thread::spawn(move || other.advance(Duration::from_secs(5)));
        handle.join().unwrap();

        assert_eq!(clock.now(), start + Duration::from_secs(5));
    }
}
