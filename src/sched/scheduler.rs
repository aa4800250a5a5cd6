//! The scheduler driver.
//!
//! Strands are registered into three phase groups. `run()` resumes every
//! setup strand once in registration order, drives the loop group through
//! the run queue under the configured clock discipline, then resumes
//! every teardown strand once. The loop is the interesting part: pop the
//! earliest-due strand (ties by insertion order), resume it, interpret
//! the reported [`YieldSignal`], and re-enqueue, park, retire, or halt.
//!
//! Failure is first-wins: the first `Exception` is captured, the run
//! halts, and `run()` returns false; the fault stays retrievable for
//! diagnostics.

use std::time::Duration;

use crate::clock::{Clock, ClockMode, LowResClock};
use crate::error::{Fault, WakeError};
use crate::sched::cx::{Control, StrandCx};
use crate::sched::queue::RunQueue;
use crate::signal::{SignalKind, YieldSignal};
use crate::strand::{Continuation, Profile, Strand};
use crate::types::{StrandId, Time};

/// Construction parameters for a [`Scheduler`].
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct SchedulerConfig {
    /// Timing discipline.
    pub mode: ClockMode,
    /// Where the virtual clock starts. Ignored under the real discipline.
    pub start: Time,
    /// Virtual horizon: the run stops cleanly once the earliest pending
    /// virtual event is due past this point. Ignored under the real
    /// discipline.
    pub end: Time,
    /// When set, wall readings come from a [`LowResClock`] refreshed at
    /// this period instead of a direct monotonic read.
    pub resolution: Option<Duration>,
}

impl SchedulerConfig {
    /// Real-time discipline with direct wall reads.
    #[must_use]
    pub const fn real() -> Self {
        Self {
            mode: ClockMode::RealTime,
            start: Time::ZERO,
            end: Time::MAX,
            resolution: None,
        }
    }

    /// Virtual discipline starting at [`Time::ZERO`] with no horizon.
    #[must_use]
    pub const fn virtual_time() -> Self {
        Self {
            mode: ClockMode::Virtual,
            start: Time::ZERO,
            end: Time::MAX,
            resolution: None,
        }
    }

    /// Sets the virtual start.
    #[must_use]
    pub const fn start(mut self, start: Time) -> Self {
        self.start = start;
        self
    }

    /// Sets the virtual horizon.
    #[must_use]
    pub const fn end(mut self, end: Time) -> Self {
        self.end = end;
        self
    }

    /// Serves wall readings from a cached low-resolution clock.
    #[must_use]
    pub const fn resolution(mut self, resolution: Duration) -> Self {
        self.resolution = Some(resolution);
        self
    }

    fn clock(&self) -> Clock {
        let lowres = self.resolution.map(LowResClock::start);
        Clock::with_parts(self.mode, self.start, lowres)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum PhaseKind {
    Setup,
    Teardown,
}

impl std::fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Setup => "setup",
            Self::Teardown => "teardown",
        })
    }
}

enum Disposition {
    Queue { due: Time },
    QueueReal { due: Time },
    Park,
    Retire,
    Fail { fault: Fault },
    Halt { immediate: bool },
}

/// The cooperative scheduler.
#[derive(Debug)]
pub struct Scheduler {
    pub(crate) config: SchedulerConfig,
    pub(crate) clock: Clock,
    pub(crate) setup: Vec<Strand>,
    pub(crate) loop_group: Vec<Strand>,
    pub(crate) teardown: Vec<Strand>,
    pub(crate) queue: RunQueue,
    pub(crate) real_queue: RunQueue,
    pub(crate) control: Control,
    pub(crate) done: bool,
    pub(crate) running: bool,
    pub(crate) fault: Option<Fault>,
    pub(crate) active: Option<StrandId>,
    next_id: u32,
}

impl Scheduler {
    /// Creates a scheduler from explicit configuration.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let clock = config.clock();
        Self {
            config,
            clock,
            setup: Vec::new(),
            loop_group: Vec::new(),
            teardown: Vec::new(),
            queue: RunQueue::new(),
            real_queue: RunQueue::new(),
            control: Control::new(),
            done: false,
            running: false,
            fault: None,
            active: None,
            next_id: 0,
        }
    }

    /// A real-time scheduler with default configuration.
    #[must_use]
    pub fn real() -> Self {
        Self::new(SchedulerConfig::real())
    }

    /// A virtual-time scheduler with default configuration.
    #[must_use]
    pub fn virtual_time() -> Self {
        Self::new(SchedulerConfig::virtual_time())
    }

    fn alloc_id(&mut self) -> StrandId {
        let id = StrandId::new(self.next_id);
        self.next_id += 1;
        id
    }

    /// Registers a setup strand, resumed once before the loop phase.
    ///
    /// # Panics
    ///
    /// Panics if called while `run()` is executing.
    pub fn on_setup<C>(&mut self, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        assert!(!self.running, "cannot register strands during run()");
        let id = self.alloc_id();
        self.setup
            .push(Strand::new(id, YieldSignal::Resume, Box::new(continuation)));
        id
    }

    /// Registers a loop strand seeded with [`YieldSignal::Resume`].
    pub fn on_loop<C>(&mut self, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        self.on_loop_with(YieldSignal::Resume, continuation)
    }

    /// Registers a loop strand with an explicit initial signal, which
    /// seeds its first scheduling decision before it has ever run.
    ///
    /// # Panics
    ///
    /// Panics if called while `run()` is executing.
    pub fn on_loop_with<C>(&mut self, initial: YieldSignal, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        assert!(!self.running, "cannot register strands during run()");
        let id = self.alloc_id();
        self.loop_group
            .push(Strand::new(id, initial, Box::new(continuation)));
        id
    }

    /// Registers a loop strand first due at an absolute time.
    pub fn at_time<C>(&mut self, tp: Time, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        self.on_loop_with(YieldSignal::ResumeAt(tp), continuation)
    }

    /// Registers a loop strand first due after a delay.
    pub fn after<C>(&mut self, delay: Duration, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        self.on_loop_with(YieldSignal::ResumeAfter(delay), continuation)
    }

    /// Registers a teardown strand, resumed once after the loop phase.
    ///
    /// # Panics
    ///
    /// Panics if called while `run()` is executing.
    pub fn on_teardown<C>(&mut self, continuation: C) -> StrandId
    where
        C: Continuation + 'static,
    {
        assert!(!self.running, "cannot register strands during run()");
        let id = self.alloc_id();
        self.teardown
            .push(Strand::new(id, YieldSignal::Resume, Box::new(continuation)));
        id
    }

    /// Runs setup, the loop phase, and teardown.
    ///
    /// Returns true on clean completion, false if a failure was captured.
    /// Teardown runs even when the loop phase failed.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly on a scheduler that is already
    /// running.
    pub fn run(&mut self) -> bool {
        assert!(!self.running, "run() is not re-entrant");
        self.running = true;
        let result = self.run_inner();
        self.running = false;
        result
    }

    fn run_inner(&mut self) -> bool {
        tracing::debug!(
            mode = %self.clock.mode(),
            setup = self.setup.len(),
            loop_strands = self.loop_group.len(),
            teardown = self.teardown.len(),
            "run starting"
        );
        self.drive_phase(PhaseKind::Setup);
        if !self.done && self.fault.is_none() {
            self.seed();
            match self.clock.mode() {
                ClockMode::RealTime => self.run_real(),
                ClockMode::Virtual => self.run_virtual(),
            }
        }
        self.drive_phase(PhaseKind::Teardown);
        let ok = self.fault.is_none();
        tracing::debug!(ok, now = %self.clock.now(), "run finished");
        ok
    }

    /// Requests a cooperative stop.
    ///
    /// Observed at the top of the next loop iteration, so an in-flight
    /// resumption always completes before the loop exits.
    pub fn stop(&mut self) {
        self.control.stop();
        self.done = true;
    }

    /// Re-enqueues a suspended strand at the current time.
    pub fn wake(&mut self, id: StrandId) -> Result<(), WakeError> {
        self.try_wake(id)
    }

    /// Clears the done flag, the captured fault, and both queues so the
    /// scheduler can be driven again. Finished strands stay finished;
    /// suspended strands stay wakeable.
    ///
    /// # Panics
    ///
    /// Panics if called while `run()` is executing.
    pub fn reset(&mut self) {
        assert!(!self.running, "cannot reset a running scheduler");
        self.done = false;
        self.fault = None;
        self.queue.clear();
        self.real_queue.clear();
        self.control.reset();
    }

    /// The strand currently inside `resume()`, if any.
    #[must_use]
    pub const fn active(&self) -> Option<StrandId> {
        self.active
    }

    /// True once a stop or halt has been observed.
    #[must_use]
    pub const fn done(&self) -> bool {
        self.done
    }

    /// The captured failure, if the run halted on an `Exception`.
    #[must_use]
    pub const fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// A clonable handle for out-of-resume stop and wake requests.
    #[must_use]
    pub fn control(&self) -> Control {
        self.control.clone()
    }

    /// The construction parameters.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The active timing discipline.
    #[must_use]
    pub const fn mode(&self) -> ClockMode {
        self.clock.mode()
    }

    /// Current time on the active clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Current wall-clock time.
    #[must_use]
    pub fn wall_now(&self) -> Time {
        self.clock.wall_now()
    }

    /// Snapshot of every loop strand's profile, in registration order.
    ///
    /// Stable once `run()` has returned: nothing mutates profiles after
    /// the loop halts.
    #[must_use]
    pub fn profiles(&self) -> Vec<Profile> {
        self.loop_group.iter().map(Strand::profile).collect()
    }

    /// The current signal kind of a registered strand, in any phase.
    #[must_use]
    pub fn state(&self, id: StrandId) -> Option<SignalKind> {
        self.setup
            .iter()
            .chain(&self.loop_group)
            .chain(&self.teardown)
            .find(|s| s.id() == id)
            .map(|s| s.state().kind())
    }

    /// One-line status summary for diagnostics.
    #[must_use]
    pub fn info(&self) -> String {
        format!(
            "scheduler mode={} now={} strands={}/{}/{} queued={} done={} fault={}",
            self.clock.mode(),
            self.clock.now(),
            self.setup.len(),
            self.loop_group.len(),
            self.teardown.len(),
            self.queue.len() + self.real_queue.len(),
            self.done,
            self.fault
                .as_ref()
                .map_or("none", Fault::description),
        )
    }

    // ------------------------------------------------------------------
    // Driver internals
    // ------------------------------------------------------------------

    fn drive_phase(&mut self, which: PhaseKind) {
        let len = match which {
            PhaseKind::Setup => self.setup.len(),
            PhaseKind::Teardown => self.teardown.len(),
        };
        for slot in 0..len {
            let strand = match which {
                PhaseKind::Setup => &mut self.setup[slot],
                PhaseKind::Teardown => &mut self.teardown[slot],
            };
            if strand.done() {
                continue;
            }
            resume_strand(
                strand,
                &mut self.clock,
                &self.queue,
                &self.control,
                &mut self.active,
            );
            let id = strand.id();
            let kind = strand.state().kind();
            let fault = match strand.state() {
                YieldSignal::Exception(f) => Some(f.clone()),
                _ => None,
            };
            let now = self.clock.now();
            match which {
                PhaseKind::Setup => self.setup[slot].set_last_run(now),
                PhaseKind::Teardown => self.teardown[slot].set_last_run(now),
            }
            match kind {
                SignalKind::Finished => {}
                SignalKind::Exception => {
                    tracing::warn!(phase = %which, strand = %id, "phase strand raised");
                    if self.fault.is_none() {
                        self.fault = fault;
                    }
                    self.done = true;
                    break;
                }
                SignalKind::Shutdown | SignalKind::Terminate => {
                    self.done = true;
                    break;
                }
                other => {
                    tracing::warn!(
                        phase = %which,
                        strand = %id,
                        signal = %other,
                        "phase strand left unfinished"
                    );
                }
            }
        }
    }

    /// Seeds the run queue from each loop strand's current signal.
    ///
    /// # Panics
    ///
    /// A strand must not begin the loop phase already terminal, or
    /// carrying a signal with no concrete restart time; that is a
    /// registration bug and fails fast.
    fn seed(&mut self) {
        self.queue.clear();
        self.real_queue.clear();
        let now = self.clock.now();
        for (slot, strand) in self.loop_group.iter_mut().enumerate() {
            if strand.done() {
                // Finished in an earlier run is fine; registered already
                // terminal is a bug.
                assert!(
                    strand.profile().calls > 0,
                    "strand {} cannot enter the loop phase reporting {}",
                    strand.id(),
                    strand.state().kind()
                );
                continue;
            }
            let due = match strand.state() {
                YieldSignal::Suspend => {
                    if strand.take_woken() {
                        now
                    } else {
                        continue;
                    }
                }
                YieldSignal::Resume => now,
                YieldSignal::ResumeAt(tp) => *tp,
                YieldSignal::ResumeAfter(d) => now.after(*d),
                other => panic!(
                    "strand {} cannot enter the loop phase reporting {}",
                    strand.id(),
                    other.kind()
                ),
            };
            strand.set_next_run(due);
            self.queue.push(due, slot);
        }
    }

    /// Applies pending control requests; called at the top of each loop
    /// iteration.
    pub(crate) fn drain_control(&mut self) {
        if self.control.stop_requested() {
            self.done = true;
        }
        for id in self.control.take_wakes() {
            if let Err(err) = self.try_wake(id) {
                tracing::warn!(strand = %id, %err, "dropping wake request");
            }
        }
    }

    fn try_wake(&mut self, id: StrandId) -> Result<(), WakeError> {
        let slot = self
            .loop_group
            .iter()
            .position(|s| s.id() == id)
            .ok_or(WakeError::UnknownStrand(id))?;
        if !matches!(self.loop_group[slot].state(), YieldSignal::Suspend) {
            return Err(WakeError::NotSuspended(id));
        }
        let now = self.clock.now();
        let strand = &mut self.loop_group[slot];
        strand.set_next_run(now);
        strand.mark_woken();
        self.queue.push(now, slot);
        tracing::trace!(strand = %id, at = %now, "suspended strand woken");
        Ok(())
    }

    /// Resumes the strand in `slot` and interprets its new signal.
    ///
    /// Returns true when the loop must halt immediately (`Exception` or
    /// `Terminate`); a `Shutdown` is observed cooperatively at the top of
    /// the next iteration instead.
    pub(crate) fn step(&mut self, slot: usize) -> bool {
        resume_strand(
            &mut self.loop_group[slot],
            &mut self.clock,
            &self.queue,
            &self.control,
            &mut self.active,
        );
        let now = self.clock.now();
        self.loop_group[slot].set_last_run(now);
        self.interpret(slot, now)
    }

    fn interpret(&mut self, slot: usize, now: Time) -> bool {
        let mode = self.clock.mode();
        let disposition = match self.loop_group[slot].state() {
            YieldSignal::Resume => Disposition::Queue { due: now },
            YieldSignal::ResumeAfter(d) => Disposition::Queue { due: now.after(*d) },
            YieldSignal::ResumeAt(tp) => Disposition::Queue { due: *tp },
            YieldSignal::ResumeAfterReal(d) => match mode {
                ClockMode::RealTime => Disposition::Queue { due: now.after(*d) },
                ClockMode::Virtual => Disposition::QueueReal {
                    due: self.clock.wall_now().after(*d),
                },
            },
            YieldSignal::Suspend => Disposition::Park,
            YieldSignal::Finished => Disposition::Retire,
            YieldSignal::Exception(fault) => Disposition::Fail {
                fault: fault.clone(),
            },
            YieldSignal::Shutdown => Disposition::Halt { immediate: false },
            YieldSignal::Terminate => Disposition::Halt { immediate: true },
        };

        match disposition {
            Disposition::Queue { due } => {
                self.loop_group[slot].set_next_run(due);
                self.queue.push(due, slot);
                false
            }
            Disposition::QueueReal { due } => {
                self.loop_group[slot].set_next_run(due);
                self.real_queue.push(due, slot);
                false
            }
            Disposition::Park => {
                self.loop_group[slot].set_next_run(now);
                false
            }
            Disposition::Retire => {
                self.loop_group[slot].set_next_run(Time::MAX);
                false
            }
            Disposition::Fail { fault } => {
                tracing::warn!(
                    strand = %self.loop_group[slot].id(),
                    %fault,
                    "strand raised; halting run"
                );
                if self.fault.is_none() {
                    self.fault = Some(fault);
                }
                self.done = true;
                true
            }
            Disposition::Halt { immediate } => {
                tracing::debug!(
                    strand = %self.loop_group[slot].id(),
                    immediate,
                    "strand requested halt"
                );
                self.done = true;
                immediate
            }
        }
    }
}

/// Resumes one strand with a freshly assembled context, maintaining the
/// active marker and profiling around the call.
fn resume_strand(
    strand: &mut Strand,
    clock: &mut Clock,
    queue: &RunQueue,
    control: &Control,
    active: &mut Option<StrandId>,
) {
    let wall_start = clock.wall_now();
    *active = Some(strand.id());
    let mut cx = StrandCx {
        id: strand.id(),
        clock: &mut *clock,
        queue,
        control,
    };
    strand.resume(&mut cx);
    drop(cx);
    *active = None;
    let wall_end = clock.wall_now();
    strand.record(wall_start, wall_end);
    tracing::trace!(strand = %strand.id(), signal = %strand.state().kind(), "resumed");
}
