//! Lifecycle scenarios: suspension, failure, halts, wakes, horizons.

mod common;

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

use common::*;
use strandloom::{
    Fault, Scheduler, SchedulerConfig, SignalKind, StrandCx, Time, YieldSignal,
};

// ============================================================================
// Suspension
// ============================================================================

#[test]
fn suspended_strand_without_wake_is_not_a_failure() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    let id = sched.on_loop(scripted(
        &trace,
        vec![YieldSignal::Resume, YieldSignal::Suspend],
    ));

    assert!(sched.run(), "an unwoken suspend must not fail the run");
    assert_eq!(trace.borrow().len(), 2, "resumed exactly twice");
    assert_eq!(sched.state(id), Some(SignalKind::Suspend));
    assert!(!sched.done());
}

#[test]
fn strand_wakes_another_mid_run() {
    let trace = shared_trace();
    let mut sched = test_virtual();

    let sleeper = sched.on_loop(scripted(&trace, vec![YieldSignal::Suspend]));

    let t = Rc::clone(&trace);
    sched.after(Duration::from_millis(5), move |cx: &mut StrandCx<'_>| {
        t.borrow_mut().push(Visit {
            strand: cx.strand(),
            at: cx.now(),
        });
        cx.wake(sleeper);
        YieldSignal::Finished
    });

    assert!(sched.run());

    let visits = trace.borrow();
    assert_eq!(visits.len(), 3);
    assert_eq!(visits[0].strand, sleeper);
    assert_eq!(visits[0].at, Time::ZERO);
    // The waker runs at 5ms; the sleeper is re-enqueued at that instant.
    assert_eq!(visits[2].strand, sleeper);
    assert_eq!(visits[2].at, Time::from_millis(5));
}

#[test]
fn external_wake_between_runs() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    let id = sched.on_loop(scripted(&trace, vec![YieldSignal::Suspend]));

    assert!(sched.run());
    assert_eq!(trace.borrow().len(), 1);
    assert_eq!(sched.state(id), Some(SignalKind::Suspend));

    sched.wake(id).expect("suspended strand is wakeable");
    assert!(sched.run());
    assert_eq!(trace.borrow().len(), 2);
    assert_eq!(sched.state(id), Some(SignalKind::Finished));
}

// ============================================================================
// Failure propagation
// ============================================================================

#[test]
fn exception_surfaces_the_fault() {
    let mut sched = test_virtual();
    sched.on_loop(|_cx: &mut StrandCx<'_>| YieldSignal::Exception(Fault::new("boom")));

    assert!(!sched.run());
    assert_eq!(sched.fault().map(Fault::description), Some("boom"));
}

#[test]
fn first_failure_wins() {
    let trace = shared_trace();
    let mut sched = test_virtual();

    // A raises at virtual time 0; B, queued for a later time, would also
    // raise — but must never get the chance.
    sched.on_loop(|_cx: &mut StrandCx<'_>| YieldSignal::Exception(Fault::new("first")));
    let b = sched.at_time(Time::from_millis(10), {
        let t = Rc::clone(&trace);
        move |cx: &mut StrandCx<'_>| {
            t.borrow_mut().push(Visit {
                strand: cx.strand(),
                at: cx.now(),
            });
            YieldSignal::Exception(Fault::new("second"))
        }
    });

    assert!(!sched.run());
    assert_eq!(sched.fault().map(Fault::description), Some("first"));
    assert!(trace.borrow().is_empty(), "strand B must never be resumed");
    assert_eq!(sched.state(b), Some(SignalKind::ResumeAt));
}

#[test]
fn fault_payload_is_preserved_opaquely() {
    #[derive(Debug, PartialEq)]
    struct Diagnostic {
        code: u32,
    }

    let mut sched = test_virtual();
    sched.on_loop(|_cx: &mut StrandCx<'_>| {
        YieldSignal::Exception(Fault::with_payload("sensor offline", Diagnostic { code: 17 }))
    });

    assert!(!sched.run());
    let fault = sched.fault().expect("fault captured");
    assert_eq!(fault.description(), "sensor offline");
    assert_eq!(fault.downcast_payload::<Diagnostic>(), Some(&Diagnostic { code: 17 }));
}

// ============================================================================
// Cooperative and unconditional halts
// ============================================================================

#[test]
fn shutdown_halts_without_failure() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    sched.on_loop(scripted(&trace, vec![YieldSignal::Resume, YieldSignal::Shutdown]));
    let late = sched.at_time(Time::from_secs(1), scripted(&trace, vec![]));

    assert!(sched.run(), "shutdown is not a failure");
    assert!(sched.done());
    assert_eq!(sched.state(late), Some(SignalKind::ResumeAt), "late strand never ran");
}

#[test]
fn terminate_halts_before_later_work() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    sched.on_loop(|_cx: &mut StrandCx<'_>| YieldSignal::Terminate);
    let peer = sched.on_loop(scripted(&trace, vec![]));

    assert!(sched.run(), "terminate is not a failure");
    assert!(sched.done());
    // The peer was due at the same instant but registered later; the
    // immediate halt wins.
    assert_eq!(sched.state(peer), Some(SignalKind::Resume));
    assert!(trace.borrow().is_empty());
}

#[test]
fn control_stop_before_run_skips_the_loop_phase() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    sched.on_loop(scripted(&trace, vec![YieldSignal::Resume]));

    let control = sched.control();
    control.stop();

    assert!(sched.run(), "a requested stop is not a failure");
    assert!(trace.borrow().is_empty(), "loop phase never starts");
    assert!(sched.done());
}

#[test]
fn stop_from_inside_a_strand_is_observed_next_iteration() {
    let visits = Rc::new(Cell::new(0u32));
    let mut sched = test_virtual();
    let v = Rc::clone(&visits);
    sched.on_loop(move |cx: &mut StrandCx<'_>| {
        v.set(v.get() + 1);
        cx.stop();
        YieldSignal::Resume
    });

    assert!(sched.run());
    assert_eq!(visits.get(), 1, "in-flight resumption completes, then the loop exits");
    assert!(sched.done());
}

// ============================================================================
// Profiles
// ============================================================================

#[test]
fn profiles_are_idempotent_after_run() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    sched.on_loop(repeating(&trace, YieldSignal::Resume, 2));
    sched.on_loop(scripted(&trace, vec![]));

    assert!(sched.run());

    let first = sched.profiles();
    let second = sched.profiles();
    assert_eq!(first, second, "nothing mutates profiles after the loop halts");
    assert_eq!(first[0].calls, 3);
    assert_eq!(first[1].calls, 1);
}

#[test]
fn pacer_bounds_batch_work() {
    use strandloom::strand::YieldEvery;

    let mut sched = test_virtual();
    let mut pacer = YieldEvery::new(4);
    let mut processed = 0u32;
    sched.on_loop(move |_cx: &mut StrandCx<'_>| loop {
        if processed == 10 {
            return YieldSignal::Finished;
        }
        processed += 1;
        if pacer.due() {
            return YieldSignal::Resume;
        }
    });

    assert!(sched.run());
    // Items 1-4, 5-8, then 9-10 and the finish: three resumptions.
    assert_eq!(sched.profiles()[0].calls, 3);
}

// ============================================================================
// Virtual horizon
// ============================================================================

#[test]
fn horizon_cuts_off_cleanly() {
    let trace = shared_trace();
    let mut sched = test_virtual_until(Time::from_millis(35));
    sched.on_loop(repeating(
        &trace,
        YieldSignal::ResumeAfter(Duration::from_millis(10)),
        10,
    ));

    assert!(sched.run(), "reaching the horizon is a clean completion");
    assert!(sched.done());
    // Due at 0, 10, 20, 30; the 40ms event lies past the horizon.
    assert_eq!(trace.borrow().len(), 4);
}

#[test]
fn virtual_start_offsets_the_clock() {
    let trace = shared_trace();
    let mut sched = strandloom::Scheduler::new(
        SchedulerConfig::virtual_time().start(Time::from_secs(100)),
    );
    sched.on_loop(scripted(&trace, vec![YieldSignal::ResumeAfter(Duration::from_secs(1))]));

    assert!(sched.run());
    let visits = trace.borrow();
    assert_eq!(visits[0].at, Time::from_secs(100));
    assert_eq!(visits[1].at, Time::from_secs(101));
}

// ============================================================================
// Fast-forward
// ============================================================================

#[test]
fn fast_forward_jumps_when_nothing_is_due_sooner() {
    let reached = Rc::new(Cell::new(Time::ZERO));
    let mut sched = test_virtual();
    let r = Rc::clone(&reached);
    sched.on_loop(move |cx: &mut StrandCx<'_>| {
        assert!(cx.fast_forward(Time::from_millis(20)));
        r.set(cx.now());
        YieldSignal::Finished
    });

    assert!(sched.run());
    assert_eq!(reached.get(), Time::from_millis(20));
}

#[test]
fn fast_forward_defers_to_earlier_work() {
    let mut sched = test_virtual();
    sched.on_loop(|cx: &mut StrandCx<'_>| {
        assert!(
            !cx.fast_forward(Time::from_millis(50)),
            "a strand due at 10ms must run first"
        );
        YieldSignal::Finished
    });
    let trace = shared_trace();
    sched.at_time(Time::from_millis(10), scripted(&trace, vec![]));

    assert!(sched.run());
    assert_eq!(trace.borrow().len(), 1);
}

// ============================================================================
// Mixed real/virtual scheduling
// ============================================================================

#[test]
fn virtual_run_honors_real_timers() {
    let trace = shared_trace();
    let mut sched = test_virtual();

    // One strand needs 20ms of genuine wall time; another burns through
    // hours of virtual time instantly.
    let real = sched.on_loop(scripted(
        &trace,
        vec![YieldSignal::ResumeAfterReal(Duration::from_millis(20))],
    ));
    sched.on_loop(repeating(
        &trace,
        YieldSignal::ResumeAfter(Duration::from_secs(3600)),
        3,
    ));

    let started = Instant::now();
    assert!(sched.run());
    let elapsed = started.elapsed();

    assert!(
        elapsed >= Duration::from_millis(20),
        "real deadline serviced after only {elapsed:?}"
    );
    assert!(elapsed < Duration::from_secs(5), "virtual waits must not sleep");
    assert_eq!(sched.state(real), Some(SignalKind::Finished));
    assert_eq!(
        trace.borrow().iter().filter(|v| v.strand == real).count(),
        2
    );
}

// ============================================================================
// Reflective identity
// ============================================================================

#[test]
fn strand_sees_its_own_identity() {
    let mut sched = test_virtual();
    let seen = Rc::new(Cell::new(None));
    let s = Rc::clone(&seen);
    let id = sched.on_loop(move |cx: &mut StrandCx<'_>| {
        s.set(Some(cx.strand()));
        YieldSignal::Finished
    });

    assert!(sched.active().is_none());
    assert!(sched.run());
    assert_eq!(seen.get(), Some(id));
    assert!(sched.active().is_none(), "active cleared after resume");
}

// ============================================================================
// Registration sugar
// ============================================================================

#[test]
fn at_time_and_after_seed_first_due_times() {
    let trace = shared_trace();
    let mut sched = test_virtual();
    let timed = sched.at_time(Time::from_millis(8), scripted(&trace, vec![]));
    let delayed = sched.after(Duration::from_millis(3), scripted(&trace, vec![]));

    assert!(sched.run());
    let visits = trace.borrow();
    assert_eq!(visits[0], Visit { strand: delayed, at: Time::from_millis(3) });
    assert_eq!(visits[1], Visit { strand: timed, at: Time::from_millis(8) });
}

#[test]
fn explicit_initial_signal_seeds_scheduling() {
    let trace = shared_trace();
    let mut sched = Scheduler::virtual_time();
    let id = sched.on_loop_with(
        YieldSignal::ResumeAt(Time::from_millis(42)),
        scripted(&trace, vec![]),
    );

    assert!(sched.run());
    assert_eq!(*trace.borrow(), [Visit { strand: id, at: Time::from_millis(42) }]);
}
