//! Virtual-time discipline.
//!
//! The virtual clock advances only by jumping straight to the next due
//! entry's timestamp, so simulated years cost nothing. Strands that
//! reported `ResumeAfterReal` live in a secondary queue ordered by wall
//! due time; an already-due real entry is always serviced before the
//! virtual queue advances, so a fast-forwarding simulation can never
//! starve a real deadline. When only not-yet-due real entries remain the
//! driver sleeps out the gap — the one blocking point in an otherwise
//! virtual run, and unavoidable: a virtual clock cannot wait for the
//! real world.

use crate::sched::scheduler::Scheduler;

impl Scheduler {
    pub(crate) fn run_virtual(&mut self) {
        let horizon = self.config.end;
        loop {
            self.drain_control();
            if self.done {
                break;
            }
            if self.queue.is_empty() && self.real_queue.is_empty() {
                break;
            }

            let wall = self.clock.wall_now();
            if let Some(due) = self.real_queue.next_due() {
                if due <= wall {
                    let entry = self.real_queue.pop().expect("peeked entry vanished");
                    if self.step(entry.slot) {
                        break;
                    }
                    continue;
                }
            }

            if let Some(due) = self.queue.next_due() {
                if due > horizon {
                    tracing::debug!(next = %due, horizon = %horizon, "virtual horizon reached");
                    self.done = true;
                    break;
                }
                let entry = self.queue.pop().expect("peeked entry vanished");
                if entry.due > self.clock.now() {
                    self.clock.set_now(entry.due);
                }
                if self.step(entry.slot) {
                    break;
                }
                continue;
            }

            // Only real-time work remains and none of it is due yet.
            let due = self.real_queue.next_due().expect("both queues empty");
            std::thread::sleep(due.since(wall));
        }
    }
}
