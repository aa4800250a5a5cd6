//! Resumption context and cooperative control.
//!
//! Every effect a strand can have on its scheduler flows through the
//! [`StrandCx`] passed into `resume` — identity, clock readings, virtual
//! fast-forward, and deferred stop/wake requests. There is no ambient
//! scheduler state a continuation could reach instead.
//!
//! [`Control`] is the out-of-resume face of the same requests: a cheap
//! clonable handle whose `stop` and `wake` calls are drained by the
//! driver at the top of each loop iteration. The core is single-threaded
//! by design, so the handle is reference-counted, not synchronized.

use std::cell::RefCell;
use std::rc::Rc;

use crate::clock::{Clock, ClockMode};
use crate::sched::queue::RunQueue;
use crate::types::{StrandId, Time};

#[derive(Debug, Default)]
struct ControlState {
    stop: bool,
    wakes: Vec<StrandId>,
}

/// Clonable handle for cooperative stop and wake requests.
#[derive(Debug, Clone, Default)]
pub struct Control {
    inner: Rc<RefCell<ControlState>>,
}

impl Control {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Requests a cooperative stop, observed at the top of the next loop
    /// iteration; an in-flight resumption always completes first.
    pub fn stop(&self) {
        self.inner.borrow_mut().stop = true;
    }

    /// Requests that a suspended strand be re-enqueued. Invalid targets
    /// are dropped (with a warning) when the request is drained.
    pub fn wake(&self, id: StrandId) {
        self.inner.borrow_mut().wakes.push(id);
    }

    pub(crate) fn stop_requested(&self) -> bool {
        self.inner.borrow().stop
    }

    pub(crate) fn take_wakes(&self) -> Vec<StrandId> {
        std::mem::take(&mut self.inner.borrow_mut().wakes)
    }

    pub(crate) fn reset(&self) {
        let mut state = self.inner.borrow_mut();
        state.stop = false;
        state.wakes.clear();
    }
}

/// The capability context passed to a continuation for one resumption.
pub struct StrandCx<'a> {
    pub(crate) id: StrandId,
    pub(crate) clock: &'a mut Clock,
    pub(crate) queue: &'a RunQueue,
    pub(crate) control: &'a Control,
}

impl StrandCx<'_> {
    /// The identity of the strand currently executing.
    #[must_use]
    pub fn strand(&self) -> StrandId {
        self.id
    }

    /// Current time on the active clock.
    #[must_use]
    pub fn now(&self) -> Time {
        self.clock.now()
    }

    /// Current wall-clock time, regardless of discipline.
    #[must_use]
    pub fn wall_now(&self) -> Time {
        self.clock.wall_now()
    }

    /// The scheduler's timing discipline.
    #[must_use]
    pub fn mode(&self) -> ClockMode {
        self.clock.mode()
    }

    /// Requests a cooperative stop of the whole run.
    pub fn stop(&self) {
        self.control.stop();
    }

    /// Requests that a suspended strand be re-enqueued.
    pub fn wake(&self, id: StrandId) {
        self.control.wake(id);
    }

    /// Tries to jump the active clock forward to `tp` without suspending.
    ///
    /// Under the real discipline this is trivially true — wall time needs
    /// no help reaching `tp`. Under the virtual discipline the jump
    /// succeeds only when no queued strand is due before `tp`; otherwise
    /// the caller must yield and let the earlier strand run first.
    pub fn fast_forward(&mut self, tp: Time) -> bool {
        match self.clock.mode() {
            ClockMode::RealTime => true,
            ClockMode::Virtual => {
                if tp <= self.clock.now() {
                    return true;
                }
                if self.queue.next_due().is_none_or(|due| tp < due) {
                    self.clock.set_now(tp);
                    true
                } else {
                    false
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn control_handles_share_state() {
        let control = Control::new();
        let other = control.clone();

        other.stop();
        other.wake(StrandId::new_for_test(2));

        assert!(control.stop_requested());
        assert_eq!(control.take_wakes(), vec![StrandId::new_for_test(2)]);
        assert!(control.take_wakes().is_empty(), "wakes drained once");
    }

    #[test]
    fn reset_clears_requests() {
        let control = Control::new();
        control.stop();
        control.wake(StrandId::new_for_test(0));
        control.reset();
        assert!(!control.stop_requested());
        assert!(control.take_wakes().is_empty());
    }

    #[test]
    fn fast_forward_respects_earlier_work() {
        let mut clock = Clock::virtual_at(Time::ZERO);
        let mut queue = RunQueue::new();
        queue.push(Time::from_millis(50), 0);

        let control = Control::new();
        let mut cx = StrandCx {
            id: StrandId::new_for_test(9),
            clock: &mut clock,
            queue: &queue,
            control: &control,
        };

        assert!(cx.fast_forward(Time::from_millis(10)), "nothing due sooner");
        assert_eq!(cx.now(), Time::from_millis(10));

        assert!(!cx.fast_forward(Time::from_millis(60)), "slot 0 is due first");
        assert_eq!(cx.now(), Time::from_millis(10));

        // Already-reached targets are always fine.
        assert!(cx.fast_forward(Time::from_millis(5)));
        assert_eq!(cx.strand(), StrandId::new_for_test(9));
    }
}
