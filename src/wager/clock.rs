//! Time source seam.
//!
//! The engine never reads system time directly; every timestamp comes from
//! a `Clock`. Production uses `SystemClock`; tests drive a `ManualClock`
//! forward deterministically.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Monotonic: `advance_to` panics on backward movement.
#[derive(Debug)]
pub struct ManualClock {
    current: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Mutex::new(start),
        }
    }

    pub fn advance_to(&self, new_time: DateTime<Utc>) {
        let mut current = self.current.lock();
        assert!(
            new_time >= *current,
            "ManualClock: cannot go backward from {} to {}",
            *current,
            new_time
        );
        *current = new_time;
    }

    pub fn advance_by(&self, delta: Duration) {
        assert!(
            delta >= Duration::zero(),
            "ManualClock: delta must be non-negative"
        );
        let mut current = self.current.lock();
        *current = *current + delta;
    }
}

impl Clock for ManualClock {
    #[inline]
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_manual_clock_monotonic() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        assert_eq!(clock.now(), start);

        clock.advance_by(Duration::seconds(50));
        assert_eq!(clock.now(), start + Duration::seconds(50));

        clock.advance_to(start + Duration::seconds(100));
        assert_eq!(clock.now(), start + Duration::seconds(100));
    }

    #[test]
    #[should_panic(expected = "cannot go backward")]
    fn test_manual_clock_backward_panics() {
        let start = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        let clock = ManualClock::new(start);
        clock.advance_to(start - Duration::seconds(1));
    }
}
