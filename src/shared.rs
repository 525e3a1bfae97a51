//! Run flags shared between threads.
//!
//! Read and written by:
//! - Command handler (arms a run, resets flags)
//! - Search controller (loop guards)
//! - Subject watcher (detection interrupt)
//! - Supervisor (kill switch clears `searching` and `blocking`)
//! - Cooperative waits (exit when `blocking` is cleared)

use std::sync::atomic::{AtomicBool, Ordering};

/// Shared flags coordinating a search run.
#[derive(Debug, Default)]
pub struct RunFlags {
    /// A search run is active and should keep going
    searching: AtomicBool,
    /// The watcher saw the target, or a perimeter walk finished
    subject_found: AtomicBool,
    /// A caller is inside a cooperative wait
    blocking: AtomicBool,
    /// The daemon is shutting down
    shutdown: AtomicBool,
}

impl RunFlags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm flags for a new run: searching, nothing found yet.
    pub fn begin_run(&self) {
        self.subject_found.store(false, Ordering::Release);
        self.searching.store(true, Ordering::Release);
    }

    pub fn is_searching(&self) -> bool {
        self.searching.load(Ordering::Acquire)
    }

    pub fn set_searching(&self, value: bool) {
        self.searching.store(value, Ordering::Release);
    }

    pub fn is_subject_found(&self) -> bool {
        self.subject_found.load(Ordering::Acquire)
    }

    pub fn set_subject_found(&self, value: bool) {
        self.subject_found.store(value, Ordering::Release);
    }

    pub fn is_blocking(&self) -> bool {
        self.blocking.load(Ordering::Acquire)
    }

    pub fn set_blocking(&self, value: bool) {
        self.blocking.store(value, Ordering::Release);
    }

    /// Clear `searching` and `blocking` so loops and waits unwind.
    pub fn interrupt(&self) {
        self.searching.store(false, Ordering::Release);
        self.blocking.store(false, Ordering::Release);
    }

    pub fn signal_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.interrupt();
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }
}
