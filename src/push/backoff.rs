//! Exponential backoff schedule for push-channel reconnects.

use std::time::Duration;

/// Clamp for the exponent so the shift can never overflow.
const MAX_EXPONENT: u32 = 10;

/// Backoff schedule: `delay = min(ceiling, unit * 2^attempts)`.
///
/// Defaults reproduce the reference behavior (1 second doubling up to a
/// 30 second ceiling). Tests shrink the unit to run in milliseconds; the
/// shape of the schedule is fixed.
#[derive(Clone, Copy, Debug)]
pub struct Backoff {
    pub unit: Duration,
    pub ceiling: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            ceiling: Duration::from_secs(30),
        }
    }
}

impl Backoff {
    /// Delay before reconnect attempt number `attempts` (0-based).
    pub fn delay(&self, attempts: u32) -> Duration {
        let factor = 1u64 << attempts.min(MAX_EXPONENT);
        self.unit
            .checked_mul(factor as u32)
            .map(|d| d.min(self.ceiling))
            .unwrap_or(self.ceiling)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_sequence() {
        let backoff = Backoff::default();
        let delays: Vec<u64> = (0..5).map(|n| backoff.delay(n).as_secs()).collect();
        assert_eq!(delays, vec![1, 2, 4, 8, 16]);
    }

    #[test]
    fn test_backoff_is_capped() {
        let backoff = Backoff::default();
        // 2^6 = 64s would exceed the ceiling.
        assert_eq!(backoff.delay(6), Duration::from_secs(30));
        assert_eq!(backoff.delay(10), Duration::from_secs(30));
    }

    #[test]
    fn test_huge_attempt_counts_do_not_overflow() {
        let backoff = Backoff::default();
        assert_eq!(backoff.delay(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_scaled_unit_keeps_shape() {
        let backoff = Backoff {
            unit: Duration::from_millis(5),
            ceiling: Duration::from_millis(60),
        };
        assert_eq!(backoff.delay(0), Duration::from_millis(5));
        assert_eq!(backoff.delay(2), Duration::from_millis(20));
        assert_eq!(backoff.delay(4), Duration::from_millis(60));
    }
}
