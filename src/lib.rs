//! Strandloom: a single-threaded cooperative scheduler for suspendable strands.
//!
//! # Overview
//!
//! Strandloom drives many independently-suspendable computations
//! ("strands") from one thread. Each strand reports a [`YieldSignal`] at
//! every suspension point, and the scheduler interprets that signal to
//! decide when (or whether) the strand runs again. Time comes from an
//! explicit [`Clock`] injected at construction, in one of two disciplines:
//!
//! - **Real time**: the driver honors requested delays by actually
//!   sleeping, so a strand asking for 30ms gets 30ms of wall time.
//! - **Virtual time**: the clock only advances by jumping straight to the
//!   next due strand's timestamp, so a simulation spanning years runs at
//!   machine speed — and, with no external nondeterminism, replays in an
//!   identical order every run.
//!
//! # Core Guarantees
//!
//! - **Deterministic ordering**: strands run in ascending due-time order,
//!   ties broken by insertion order — byte-identical replay under the
//!   virtual clock.
//! - **First-failure-wins**: the first `Exception` halts the run and is
//!   the one surfaced to the caller; later strands are never resumed.
//! - **No preemption**: exactly one strand executes at any instant, and a
//!   suspension point exists only where the strand reports one.
//!
//! # Module Structure
//!
//! - [`types`]: Leaf types ([`Time`], [`StrandId`])
//! - [`signal`]: The [`YieldSignal`] protocol between strands and driver
//! - [`strand`]: The resumable unit, profiling, and pacing helpers
//! - [`clock`]: Real, virtual, and low-resolution time sources
//! - [`sched`]: The run queue, resumption context, and scheduler driver
//! - [`error`]: Failure payloads and typed API errors
//! - [`util`]: Deterministic RNG for seed-driven tests
//! - [`test_utils`]: Shared helpers for unit and integration tests
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use strandloom::{Scheduler, StrandCx, YieldSignal};
//!
//! let mut sched = Scheduler::virtual_time();
//! let mut remaining = 3u32;
//! sched.on_loop(move |_cx: &mut StrandCx<'_>| {
//!     remaining -= 1;
//!     if remaining == 0 {
//!         YieldSignal::Finished
//!     } else {
//!         YieldSignal::ResumeAfter(Duration::from_millis(10))
//!     }
//! });
//! assert!(sched.run());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_truncation)]

pub mod clock;
pub mod error;
pub mod sched;
pub mod signal;
pub mod strand;
pub mod test_utils;
pub mod types;
pub mod util;

pub use clock::{Clock, ClockMode, LowResClock};
pub use error::{Fault, WakeError};
pub use sched::{Control, RunQueue, Scheduler, SchedulerConfig, StrandCx};
pub use signal::{SignalKind, YieldSignal};
pub use strand::{Continuation, Profile, Strand};
pub use types::{StrandId, Time};
