//! Low-resolution cached wall clock.
//!
//! Reading the system clock on every scheduling decision costs a syscall
//! (or at least a vDSO trip) on the hot path. [`LowResClock`] trades a
//! bounded staleness — at most roughly one refresh period — for reads
//! that are a single atomic load: a background updater refreshes the
//! cached reading every `resolution`, aligned down to a resolution
//! multiple so consecutive reads step in even increments.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::types::Time;

#[derive(Debug)]
struct Shared {
    now_nanos: AtomicU64,
    done: AtomicBool,
}

/// A coarse wall clock refreshed by a dedicated background thread.
///
/// Dropping the clock stops and joins the updater.
#[derive(Debug)]
pub struct LowResClock {
    shared: Arc<Shared>,
    resolution: Duration,
    updater: Option<JoinHandle<()>>,
}

impl LowResClock {
    /// Starts the background updater with the given refresh period.
    ///
    /// # Panics
    ///
    /// Panics if `resolution` is zero or the updater thread cannot be
    /// spawned.
    #[must_use]
    pub fn start(resolution: Duration) -> Self {
        assert!(!resolution.is_zero(), "clock resolution must be non-zero");

        let shared = Arc::new(Shared {
            now_nanos: AtomicU64::new(0),
            done: AtomicBool::new(false),
        });
        let worker = Arc::clone(&shared);
        let res_nanos = u64::try_from(resolution.as_nanos()).unwrap_or(u64::MAX);
        let origin = Instant::now();

        let updater = std::thread::Builder::new()
            .name("strandloom-lowres".to_string())
            .spawn(move || {
                while !worker.done.load(Ordering::Acquire) {
                    std::thread::sleep(resolution);
                    let elapsed = origin.elapsed().as_nanos() as u64;
                    let aligned = elapsed - elapsed % res_nanos;
                    worker.now_nanos.store(aligned, Ordering::Release);
                }
            })
            .expect("failed to spawn low-res clock updater");

        Self {
            shared,
            resolution,
            updater: Some(updater),
        }
    }

    /// The cached wall reading; stale by at most about one resolution.
    #[must_use]
    pub fn now(&self) -> Time {
        Time::from_nanos(self.shared.now_nanos.load(Ordering::Acquire))
    }

    /// The refresh period.
    #[must_use]
    pub const fn resolution(&self) -> Duration {
        self.resolution
    }
}

impl Drop for LowResClock {
    fn drop(&mut self) {
        self.shared.done.store(true, Ordering::Release);
        if let Some(handle) = self.updater.take() {
            let _ = handle.join();
        }
    }
}
