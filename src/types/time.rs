//! Timestamps for the scheduler.
//!
//! [`Time`] is a nanosecond count measured from the owning clock's origin.
//! Under the real discipline that origin is the instant the clock was
//! constructed; under the virtual discipline it is the configured start of
//! the simulation. All arithmetic saturates: a strand asking to run a
//! century from now must not wrap into the past.

use std::fmt;
use std::ops::{Add, AddAssign, Sub};
use std::time::Duration;

/// A point in time on whichever clock discipline is active.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Time(u64);

impl Time {
    /// The clock origin.
    pub const ZERO: Self = Self(0);

    /// The far future; used as the "never" sentinel for retired strands.
    pub const MAX: Self = Self(u64::MAX);

    /// Creates a time from nanoseconds since the clock origin.
    #[must_use]
    pub const fn from_nanos(nanos: u64) -> Self {
        Self(nanos)
    }

    /// Creates a time from microseconds since the clock origin.
    #[must_use]
    pub const fn from_micros(micros: u64) -> Self {
        Self(micros.saturating_mul(1_000))
    }

    /// Creates a time from milliseconds since the clock origin.
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    /// Creates a time from seconds since the clock origin.
    #[must_use]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(1_000_000_000))
    }

    /// Nanoseconds since the clock origin.
    #[must_use]
    pub const fn as_nanos(self) -> u64 {
        self.0
    }

    /// Milliseconds since the clock origin, truncated.
    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0 / 1_000_000
    }

    /// Seconds since the clock origin, truncated.
    #[must_use]
    pub const fn as_secs(self) -> u64 {
        self.0 / 1_000_000_000
    }

    /// The time `duration` after this one, saturating at [`Time::MAX`].
    #[must_use]
    pub fn after(self, duration: Duration) -> Self {
        let nanos = u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX);
        Self(self.0.saturating_add(nanos))
    }

    /// Elapsed duration since `earlier`, or zero if `self` precedes it.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Duration {
        Duration::from_nanos(self.0.saturating_sub(earlier.0))
    }

}

impl Add<Duration> for Time {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        self.after(rhs)
    }
}

impl AddAssign<Duration> for Time {
    fn add_assign(&mut self, rhs: Duration) {
        *self = self.after(rhs);
    }
}

impl Sub<Time> for Time {
    type Output = Duration;

    fn sub(self, rhs: Time) -> Duration {
        self.since(rhs)
    }
}

impl fmt::Debug for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Time({}ns)", self.0)
    }
}

impl fmt::Display for Time {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0 == u64::MAX {
            write!(f, "never")
        } else if self.0 >= 1_000_000_000 {
            write!(f, "{}.{:03}s", self.0 / 1_000_000_000, (self.0 / 1_000_000) % 1_000)
        } else if self.0 >= 1_000_000 {
            write!(f, "{}ms", self.0 / 1_000_000)
        } else if self.0 >= 1_000 {
            write!(f, "{}us", self.0 / 1_000)
        } else {
            write!(f, "{}ns", self.0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversions_round_trip() {
        assert_eq!(Time::from_secs(2).as_nanos(), 2_000_000_000);
        assert_eq!(Time::from_millis(5).as_nanos(), 5_000_000);
        assert_eq!(Time::from_micros(7).as_nanos(), 7_000);
        assert_eq!(Time::from_nanos(1_500_000_000).as_secs(), 1);
        assert_eq!(Time::from_nanos(1_500_000_000).as_millis(), 1_500);
    }

    #[test]
    fn after_saturates() {
        let far = Time::MAX.after(Duration::from_secs(1));
        assert_eq!(far, Time::MAX);

        let century = Duration::from_secs(100 * 365 * 24 * 3600);
        assert!(Time::ZERO.after(century) < Time::MAX);
    }

    #[test]
    fn since_clamps_to_zero() {
        let t1 = Time::from_millis(10);
        let t2 = Time::from_millis(30);
        assert_eq!(t2.since(t1), Duration::from_millis(20));
        assert_eq!(t1.since(t2), Duration::ZERO);
    }

    #[test]
    fn operator_sugar() {
        let mut t = Time::from_millis(1);
        t += Duration::from_millis(2);
        assert_eq!(t, Time::from_millis(3));
        assert_eq!(t - Time::from_millis(1), Duration::from_millis(2));
        assert_eq!(Time::from_millis(1) + Duration::from_millis(1), Time::from_millis(2));
    }

    #[test]
    fn display_scales_units() {
        assert_eq!(Time::from_nanos(17).to_string(), "17ns");
        assert_eq!(Time::from_micros(3).to_string(), "3us");
        assert_eq!(Time::from_millis(250).to_string(), "250ms");
        assert_eq!(Time::from_millis(1_250).to_string(), "1.250s");
        assert_eq!(Time::MAX.to_string(), "never");
    }
}
