//! Task registry and kill switch.
//!
//! Every motion task and search run is spawned through the [`Supervisor`]
//! so that a single call can cancel, join and stop all of them.

use crate::config::SupervisorConfig;
use crate::error::Result;
use crate::hardware::DriveTrain;
use crate::shared::RunFlags;
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Cooperative cancellation flag handed to every supervised task.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// A registered background task.
struct TaskHandle {
    id: u64,
    name: String,
    token: CancelToken,
    thread: JoinHandle<()>,
}

/// Result of a kill switch invocation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct KillReport {
    /// Tasks that were cancelled and finished (or are the caller itself)
    pub stopped: usize,
    /// Tasks that did not finish within the join timeout
    pub detached: usize,
}

/// Owns every in-flight task and the drivetrain stop of last resort.
pub struct Supervisor {
    registry: Mutex<Vec<TaskHandle>>,
    next_id: AtomicU64,
    flags: Arc<RunFlags>,
    drivetrain: Arc<dyn DriveTrain>,
    join_timeout: Duration,
}

/// How often a bounded join checks whether the task has exited
const JOIN_POLL: Duration = Duration::from_millis(5);

impl Supervisor {
    pub fn new(
        flags: Arc<RunFlags>,
        drivetrain: Arc<dyn DriveTrain>,
        config: &SupervisorConfig,
    ) -> Self {
        Self {
            registry: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            flags,
            drivetrain,
            join_timeout: Duration::from_millis(config.join_timeout_ms),
        }
    }

    /// Spawn a named, cancellable task and register it.
    pub fn spawn<F>(&self, name: &str, body: F) -> Result<CancelToken>
    where
        F: FnOnce(CancelToken) + Send + 'static,
    {
        let token = CancelToken::new();
        let task_token = token.clone();
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        let mut registry = self.registry.lock();
        Self::reap(&mut registry);

        let thread = thread::Builder::new()
            .name(format!("{}-{}", name, id))
            .spawn(move || body(task_token))?;

        tracing::debug!("Spawned task {} ({})", id, name);
        registry.push(TaskHandle {
            id,
            name: name.to_string(),
            token: token.clone(),
            thread,
        });
        Ok(token)
    }

    /// Number of registered tasks that have not finished yet.
    pub fn active_count(&self) -> usize {
        self.registry
            .lock()
            .iter()
            .filter(|task| !task.thread.is_finished())
            .count()
    }

    /// Stop everything: interrupt waits, cancel and join every task, stop the wheels.
    ///
    /// Safe to call from any thread, including a supervised task, and safe to
    /// call with nothing registered. The drivetrain is always told to stop.
    pub fn kill_switch(&self) -> KillReport {
        self.flags.interrupt();

        // Cancel while holding the lock so a task spawned after the drain
        // sees its parent run already cancelled.
        let tasks: Vec<TaskHandle> = {
            let mut registry = self.registry.lock();
            for task in registry.iter() {
                task.token.cancel();
            }
            std::mem::take(&mut *registry)
        };

        let mut report = KillReport::default();
        let current = thread::current().id();

        for task in tasks {
            if task.thread.thread().id() == current {
                // The caller unwinds on its own once it sees the token
                report.stopped += 1;
                continue;
            }
            if self.join_bounded(task) {
                report.stopped += 1;
            } else {
                report.detached += 1;
            }
        }

        self.stop_drivetrain();

        tracing::info!(
            "Kill switch: {} tasks stopped, {} detached",
            report.stopped,
            report.detached
        );
        report
    }

    /// Command the wheels to stop, logging a failure instead of returning it.
    pub fn stop_drivetrain(&self) {
        if let Err(e) = self.drivetrain.stop() {
            tracing::error!("Failed to stop drivetrain: {}", e);
        }
    }

    /// How long a cancelled task is given to exit.
    pub fn join_timeout(&self) -> Duration {
        self.join_timeout
    }

    /// Join a cancelled task, giving up after the configured timeout.
    fn join_bounded(&self, task: TaskHandle) -> bool {
        let deadline = Instant::now() + self.join_timeout;
        while !task.thread.is_finished() {
            if Instant::now() >= deadline {
                tracing::warn!(
                    "Task {} ({}) did not stop within {:?}, detaching",
                    task.id,
                    task.name,
                    self.join_timeout
                );
                return false;
            }
            thread::sleep(JOIN_POLL);
        }
        if task.thread.join().is_err() {
            tracing::warn!("Task {} ({}) panicked", task.id, task.name);
        }
        true
    }

    /// Drop handles of tasks that already exited.
    fn reap(registry: &mut Vec<TaskHandle>) {
        let mut i = 0;
        while i < registry.len() {
            if registry[i].thread.is_finished() {
                let task = registry.swap_remove(i);
                if task.thread.join().is_err() {
                    tracing::warn!("Task {} ({}) panicked", task.id, task.name);
                }
            } else {
                i += 1;
            }
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        for task in self.registry.get_mut().iter() {
            task.token.cancel();
        }
    }
}
