//! Time sources.
//!
//! The scheduler never reads ambient time: a [`Clock`] is injected at
//! construction and carries the discipline for the whole run. Real reads
//! are monotonic (optionally served from a cached [`LowResClock`]); the
//! virtual reading is a plain timestamp the driver assigns when it jumps
//! to the next due event. Both disciplines keep a wall reading available,
//! because even a virtual run needs one to honor real-time deadlines and
//! to measure how long resumptions actually take.

use std::time::{Duration, Instant};

use crate::types::Time;

pub mod lowres;

pub use lowres::LowResClock;

/// The timing discipline a scheduler runs under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ClockMode {
    /// Delays are honored in real elapsed time; the driver sleeps.
    RealTime,
    /// Time only advances by explicit jumps; the driver never sleeps for
    /// virtual delays.
    Virtual,
}

impl std::fmt::Display for ClockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::RealTime => "real-time",
            Self::Virtual => "virtual",
        })
    }
}

/// The scheduler's time source.
///
/// `now()` answers on the active discipline; `wall_now()` always answers
/// on the wall clock. [`Time`] values are measured from this clock's
/// construction origin (real) or from the configured simulation start
/// (virtual).
#[derive(Debug)]
pub struct Clock {
    mode: ClockMode,
    origin: Instant,
    virtual_now: Time,
    lowres: Option<LowResClock>,
}

impl Clock {
    /// A wall clock reading monotonic time directly.
    #[must_use]
    pub fn real() -> Self {
        Self::with_parts(ClockMode::RealTime, Time::ZERO, None)
    }

    /// A wall clock served from a coarse cached reading refreshed every
    /// `resolution`.
    #[must_use]
    pub fn real_low_res(resolution: Duration) -> Self {
        Self::with_parts(ClockMode::RealTime, Time::ZERO, Some(LowResClock::start(resolution)))
    }

    /// A virtual clock starting at `start`, advanced only by [`set_now`].
    ///
    /// [`set_now`]: Clock::set_now
    #[must_use]
    pub fn virtual_at(start: Time) -> Self {
        Self::with_parts(ClockMode::Virtual, start, None)
    }

    pub(crate) fn with_parts(mode: ClockMode, start: Time, lowres: Option<LowResClock>) -> Self {
        Self {
            mode,
            origin: Instant::now(),
            virtual_now: start,
            lowres,
        }
    }

    /// The active discipline.
    #[must_use]
    pub const fn mode(&self) -> ClockMode {
        self.mode
    }

    /// Current time on the active discipline.
    #[must_use]
    pub fn now(&self) -> Time {
        match self.mode {
            ClockMode::RealTime => self.wall_now(),
            ClockMode::Virtual => self.virtual_now,
        }
    }

    /// Current wall-clock time, regardless of discipline.
    #[must_use]
    pub fn wall_now(&self) -> Time {
        self.lowres.as_ref().map_or_else(
            || Time::from_nanos(self.origin.elapsed().as_nanos() as u64),
            LowResClock::now,
        )
    }

    /// Jumps the virtual reading to `tp`.
    ///
    /// # Panics
    ///
    /// Panics when called on a real-time clock: wall time is not
    /// assignable.
    pub fn set_now(&mut self, tp: Time) {
        assert!(
            self.mode == ClockMode::Virtual,
            "set_now is only valid on a virtual clock"
        );
        self.virtual_now = tp;
    }
}
