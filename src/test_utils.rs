//! Shared helpers for unit and integration tests.
//!
//! - Consistent tracing-based logging initialization
//! - Canned scheduler constructors
//! - Scripted continuations that replay a fixed signal sequence while
//!   recording every visit into a shared trace
//!
//! # Example
//! ```
//! use strandloom::test_utils::{init_test_logging, scripted, shared_trace};
//! use strandloom::{Scheduler, YieldSignal};
//!
//! init_test_logging();
//! let trace = shared_trace();
//! let mut sched = Scheduler::virtual_time();
//! sched.on_loop(scripted(&trace, vec![YieldSignal::Finished]));
//! assert!(sched.run());
//! assert_eq!(trace.borrow().len(), 1);
//! ```

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Once;

use crate::sched::{Scheduler, SchedulerConfig, StrandCx};
use crate::signal::YieldSignal;
use crate::types::{StrandId, Time};

static INIT_LOGGING: Once = Once::new();

/// Default seed for seed-driven schedule generation in tests.
pub const DEFAULT_TEST_SEED: u64 = 0xC0_FFEE;

/// Initialize test logging with debug-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::DEBUG);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_target(true)
            .with_ansi(false)
            .try_init();
    });
}

/// One recorded resumption: which strand ran, and when on the active
/// clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visit {
    /// The strand that was resumed.
    pub strand: StrandId,
    /// The active-clock time of the resumption.
    pub at: Time,
}

/// A trace shared between scripted continuations and the test body.
pub type SharedTrace = Rc<RefCell<Vec<Visit>>>;

/// Creates an empty shared trace.
#[must_use]
pub fn shared_trace() -> SharedTrace {
    Rc::default()
}

/// A continuation that records each visit and replays `signals` in order,
/// reporting [`YieldSignal::Finished`] once the script is exhausted.
#[must_use]
pub fn scripted(
    trace: &SharedTrace,
    signals: Vec<YieldSignal>,
) -> impl FnMut(&mut StrandCx<'_>) -> YieldSignal {
    let trace = Rc::clone(trace);
    let mut script = signals.into_iter();
    move |cx: &mut StrandCx<'_>| {
        trace.borrow_mut().push(Visit {
            strand: cx.strand(),
            at: cx.now(),
        });
        script.next().unwrap_or(YieldSignal::Finished)
    }
}

/// A continuation that repeats one signal `times` times, then finishes.
#[must_use]
pub fn repeating(
    trace: &SharedTrace,
    signal: YieldSignal,
    times: usize,
) -> impl FnMut(&mut StrandCx<'_>) -> YieldSignal {
    let script = std::iter::repeat_n(signal, times).collect();
    scripted(trace, script)
}

/// A virtual scheduler with logging initialized.
#[must_use]
pub fn test_virtual() -> Scheduler {
    init_test_logging();
    Scheduler::virtual_time()
}

/// A virtual scheduler with an end horizon.
#[must_use]
pub fn test_virtual_until(end: Time) -> Scheduler {
    init_test_logging();
    Scheduler::new(SchedulerConfig::virtual_time().end(end))
}

/// A real-time scheduler with logging initialized.
#[must_use]
pub fn test_real() -> Scheduler {
    init_test_logging();
    Scheduler::real()
}

/// Extracts just the strand order from a trace.
#[must_use]
pub fn visit_order(trace: &SharedTrace) -> Vec<StrandId> {
    trace.borrow().iter().map(|v| v.strand).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_replays_then_finishes() {
        let trace = shared_trace();
        let mut sched = test_virtual();
        let id = sched.on_loop(scripted(
            &trace,
            vec![YieldSignal::Resume, YieldSignal::Resume],
        ));

        assert!(sched.run());
        assert_eq!(visit_order(&trace), vec![id, id, id]);
    }

    #[test]
    fn repeating_counts_resumptions() {
        let trace = shared_trace();
        let mut sched = test_virtual();
        sched.on_loop(repeating(&trace, YieldSignal::Resume, 4));

        assert!(sched.run());
        assert_eq!(trace.borrow().len(), 5);
    }
}
