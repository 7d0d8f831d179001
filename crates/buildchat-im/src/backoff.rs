// SPDX-FileCopyrightText: 2026 Buildchat Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff between reconnection attempts.

use std::time::Duration;

/// Doubling backoff starting at a fixed unit, optionally capped.
///
/// The first failure waits one unit, the second two, the third four, and
/// so on. [`reset`](Self::reset) returns to the unit after a success.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    unit: Duration,
    max: Option<Duration>,
    current: Duration,
    failures: u32,
}

impl ReconnectBackoff {
    pub fn new(unit: Duration, max: Option<Duration>) -> Self {
        Self {
            unit,
            max,
            current: unit,
            failures: 0,
        }
    }

    /// Records a failed attempt and returns how long to wait before the
    /// next one.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.failures = self.failures.saturating_add(1);
        let doubled = self.current.saturating_mul(2);
        self.current = match self.max {
            Some(max) => doubled.min(max),
            None => doubled,
        };
        delay
    }

    /// Consecutive failures since the last reset.
    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn reset(&mut self) {
        self.current = self.unit;
        self.failures = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn doubles_from_unit() {
        let mut backoff = ReconnectBackoff::new(MINUTE, None);
        assert_eq!(backoff.next_delay(), MINUTE);
        assert_eq!(backoff.next_delay(), 2 * MINUTE);
        assert_eq!(backoff.next_delay(), 4 * MINUTE);
        assert_eq!(backoff.next_delay(), 8 * MINUTE);
        assert_eq!(backoff.failures(), 4);
    }

    #[test]
    fn respects_cap() {
        let mut backoff = ReconnectBackoff::new(MINUTE, Some(3 * MINUTE));
        assert_eq!(backoff.next_delay(), MINUTE);
        assert_eq!(backoff.next_delay(), 2 * MINUTE);
        assert_eq!(backoff.next_delay(), 3 * MINUTE);
        assert_eq!(backoff.next_delay(), 3 * MINUTE);
    }

    #[test]
    fn reset_returns_to_unit() {
        let mut backoff = ReconnectBackoff::new(MINUTE, None);
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.failures(), 0);
        assert_eq!(backoff.next_delay(), MINUTE);
    }

    #[test]
    fn uncapped_growth_saturates_instead_of_overflowing() {
        let mut backoff = ReconnectBackoff::new(Duration::from_secs(u64::MAX / 2), None);
        backoff.next_delay();
        backoff.next_delay();
        assert_eq!(backoff.next_delay(), Duration::MAX);
    }
}
