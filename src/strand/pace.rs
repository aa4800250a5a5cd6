//! Pacing helpers for long-running continuations.
//!
//! A strand that grinds through a large batch without yielding stalls the
//! whole scheduler. These helpers let a continuation ask, cheaply, "is it
//! time to yield yet?" — either every N checks or once a period has
//! elapsed on a caller-supplied clock reading.

use std::time::Duration;

use crate::types::Time;

/// Yields every `every`-th check.
///
/// ```
/// use strandloom::strand::YieldEvery;
///
/// let mut pacer = YieldEvery::new(3);
/// let due: Vec<bool> = (0..6).map(|_| pacer.due()).collect();
/// assert_eq!(due, [false, false, true, false, false, true]);
/// ```
#[derive(Debug, Clone)]
pub struct YieldEvery {
    every: u64,
    count: u64,
    next: u64,
}

impl YieldEvery {
    /// Creates a pacer that is due every `every` checks.
    ///
    /// # Panics
    ///
    /// Panics if `every` is zero.
    #[must_use]
    pub fn new(every: u64) -> Self {
        assert!(every > 0, "yield interval must be non-zero");
        Self {
            every,
            count: 0,
            next: every,
        }
    }

    /// Counts one unit of work; true when a yield is due.
    pub fn due(&mut self) -> bool {
        self.count += 1;
        if self.count < self.next {
            return false;
        }
        self.next += self.every;
        true
    }

    /// Units of work counted so far.
    #[must_use]
    pub const fn count(&self) -> u64 {
        self.count
    }
}

/// Yields once `period` has elapsed on the supplied clock reading.
///
/// The first check arms the deadline; pass whichever reading fits the
/// strand — `cx.now()` to pace on the active clock, `cx.wall_now()` to
/// bound real elapsed time even inside a virtual run.
#[derive(Debug, Clone)]
pub struct PeriodicYield {
    period: Duration,
    next: Option<Time>,
}

impl PeriodicYield {
    /// Creates a pacer with the given period.
    #[must_use]
    pub const fn new(period: Duration) -> Self {
        Self { period, next: None }
    }

    /// True when `period` has elapsed since the last due check.
    pub fn due(&mut self, now: Time) -> bool {
        match self.next {
            None => {
                self.next = Some(now.after(self.period));
                false
            }
            Some(deadline) if now < deadline => false,
            Some(_) => {
                self.next = Some(now.after(self.period));
                true
            }
        }
    }

    /// The period between yields.
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yield_every_cadence_is_stable() {
        let mut pacer = YieldEvery::new(2);
        let pattern: Vec<bool> = (0..8).map(|_| pacer.due()).collect();
        assert_eq!(pattern, [false, true, false, true, false, true, false, true]);
        assert_eq!(pacer.count(), 8);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn yield_every_rejects_zero() {
        let _ = YieldEvery::new(0);
    }

    #[test]
    fn periodic_arms_on_first_check() {
        let mut pacer = PeriodicYield::new(Duration::from_millis(10));
        assert!(!pacer.due(Time::from_millis(0)));
        assert!(!pacer.due(Time::from_millis(9)));
        assert!(pacer.due(Time::from_millis(10)));
        // Re-armed from the due reading, not from the original deadline.
        assert!(!pacer.due(Time::from_millis(19)));
        assert!(pacer.due(Time::from_millis(25)));
    }
}
