//! Real-time discipline.
//!
//! The wall clock is the active clock, so honoring a future due time
//! means actually suspending the driver thread until it arrives. Under
//! this discipline `ResumeAfterReal` is indistinguishable from
//! `ResumeAfter`; both measure wall-clock elapsed time.

use crate::sched::scheduler::Scheduler;

impl Scheduler {
    pub(crate) fn run_real(&mut self) {
        loop {
            self.drain_control();
            if self.done {
                break;
            }
            let Some(entry) = self.queue.pop() else {
                break;
            };

            let now = self.clock.now();
            if entry.due > now {
                std::thread::sleep(entry.due.since(now));
            }

            if self.step(entry.slot) {
                break;
            }
        }
    }
}
