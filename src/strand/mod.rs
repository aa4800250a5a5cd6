//! The resumable unit of computation.
//!
//! A [`Strand`] wraps a [`Continuation`] — a state machine with a single
//! entry point that runs to its next suspension point and reports a
//! [`YieldSignal`]. The strand owns its continuation exclusively and
//! drops it as soon as a terminal signal is reached; only the signal,
//! the scheduling bookkeeping, and the [`Profile`] survive retirement.
//!
//! Panics escaping a continuation are caught at this boundary and
//! converted to [`YieldSignal::Exception`], so one buggy strand fails the
//! run instead of unwinding through the driver.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use crate::error::Fault;
use crate::sched::StrandCx;
use crate::signal::YieldSignal;
use crate::types::{StrandId, Time};

pub mod pace;

pub use pace::{PeriodicYield, YieldEvery};

/// A resumable computation.
///
/// `resume` advances the computation exactly one suspension point and
/// returns the signal reported there. The context gives the continuation
/// its identity, both clock readings, and the cooperative control
/// surface — there is no ambient scheduler state.
///
/// Closures of the matching shape implement this trait directly:
///
/// ```
/// use strandloom::{Continuation, StrandCx, YieldSignal};
///
/// fn _takes(_: impl Continuation) {}
/// _takes(|_cx: &mut StrandCx<'_>| YieldSignal::Finished);
/// ```
pub trait Continuation {
    /// Runs to the next suspension point and reports the signal there.
    fn resume(&mut self, cx: &mut StrandCx<'_>) -> YieldSignal;
}

impl<F> Continuation for F
where
    F: FnMut(&mut StrandCx<'_>) -> YieldSignal,
{
    fn resume(&mut self, cx: &mut StrandCx<'_>) -> YieldSignal {
        self(cx)
    }
}

/// Execution statistics for one strand, maintained by the scheduler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Profile {
    /// Number of completed `resume` calls.
    pub calls: u64,
    /// Wall-clock time spent inside `resume`, cumulative.
    pub busy: Duration,
}

/// A cooperatively-scheduled strand: one continuation plus the scheduling
/// state the driver needs.
pub struct Strand {
    id: StrandId,
    continuation: Option<Box<dyn Continuation>>,
    state: YieldSignal,
    last_run: Time,
    next_run: Time,
    woken: bool,
    profile: Profile,
}

impl Strand {
    pub(crate) fn new(id: StrandId, initial: YieldSignal, continuation: Box<dyn Continuation>) -> Self {
        Self {
            id,
            continuation: Some(continuation),
            state: initial,
            last_run: Time::ZERO,
            next_run: Time::ZERO,
            woken: false,
            profile: Profile::default(),
        }
    }

    /// This strand's identity within its scheduler.
    #[must_use]
    pub const fn id(&self) -> StrandId {
        self.id
    }

    /// The signal reported at the most recent suspension point.
    #[must_use]
    pub const fn state(&self) -> &YieldSignal {
        &self.state
    }

    /// True once the strand has reached a terminal signal.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.state.is_terminal()
    }

    /// When the strand last finished a resumption, on the active clock.
    #[must_use]
    pub const fn last_run(&self) -> Time {
        self.last_run
    }

    /// When the strand is next due, on whichever clock its signal names.
    #[must_use]
    pub const fn next_run(&self) -> Time {
        self.next_run
    }

    /// Execution statistics so far.
    #[must_use]
    pub const fn profile(&self) -> Profile {
        self.profile
    }

    pub(crate) fn set_last_run(&mut self, tp: Time) {
        self.last_run = tp;
    }

    pub(crate) fn set_next_run(&mut self, tp: Time) {
        self.next_run = tp;
    }

    pub(crate) fn mark_woken(&mut self) {
        self.woken = true;
    }

    pub(crate) fn take_woken(&mut self) -> bool {
        std::mem::take(&mut self.woken)
    }

    /// Advances the continuation one suspension point.
    ///
    /// Resuming a strand that is already done is a programming error in
    /// the driver and fails fast: "never started" and "exhausted" must
    /// stay distinguishable for scheduler bookkeeping.
    pub(crate) fn resume(&mut self, cx: &mut StrandCx<'_>) -> &YieldSignal {
        assert!(
            !self.done(),
            "strand {} resumed after reaching {}",
            self.id,
            self.state.kind()
        );
        let continuation = self
            .continuation
            .as_mut()
            .expect("non-terminal strand lost its continuation");

        self.woken = false;
        self.state = match catch_unwind(AssertUnwindSafe(|| continuation.resume(cx))) {
            Ok(signal) => signal,
            Err(payload) => YieldSignal::Exception(Fault::from_panic(payload)),
        };
        if self.state.is_terminal() {
            self.continuation = None;
        }
        &self.state
    }

    /// Folds one resumption's timing into the profile.
    pub(crate) fn record(&mut self, start: Time, end: Time) {
        self.profile.calls += 1;
        self.profile.busy += end.since(start);
    }
}

impl fmt::Debug for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Strand")
            .field("id", &self.id)
            .field("state", &self.state.kind())
            .field("next_run", &self.next_run)
            .field("profile", &self.profile)
            .finish_non_exhaustive()
    }
}
