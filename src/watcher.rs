//! Subject watcher: polls the color sensor while a search runs.
//!
//! On a target match the watcher wins over whatever the search is doing:
//! it flags the detection, stops the run through the kill switch and
//! announces the find.

use crate::config::KhojConfig;
use crate::error::Result;
use crate::hardware::{Announcer, ColorCode, ColorSensor};
use crate::shared::RunFlags;
use crate::supervisor::Supervisor;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Message spoken when the subject is detected
pub const FOUND_MESSAGE: &str = "I have found the subject";

/// Consecutive sensor failures between repeated error logs
const ERROR_LOG_EVERY: u32 = 50;

pub struct SubjectWatcher {
    color: Arc<dyn ColorSensor>,
    announcer: Arc<dyn Announcer>,
    supervisor: Arc<Supervisor>,
    flags: Arc<RunFlags>,
    target: ColorCode,
    poll: Duration,
}

impl SubjectWatcher {
    pub fn new(
        color: Arc<dyn ColorSensor>,
        announcer: Arc<dyn Announcer>,
        supervisor: Arc<Supervisor>,
        flags: Arc<RunFlags>,
        config: &KhojConfig,
    ) -> Self {
        Self {
            color,
            announcer,
            supervisor,
            flags,
            target: config.robot.target_color,
            poll: Duration::from_millis(config.search.watcher_poll_ms),
        }
    }

    /// Start polling on a dedicated thread.
    ///
    /// The handle yields `true` if this watcher detected the subject.
    pub fn spawn(self) -> Result<JoinHandle<bool>> {
        let handle = thread::Builder::new()
            .name("subject-watcher".into())
            .spawn(move || self.run())?;
        Ok(handle)
    }

    /// Poll until detection, the end of the run, or shutdown.
    pub fn run(&self) -> bool {
        tracing::info!("Subject watcher started (target: {})", self.target);
        let mut consecutive_errors = 0u32;

        loop {
            if self.flags.should_shutdown() {
                tracing::info!("Subject watcher shutting down");
                return false;
            }
            if self.flags.is_subject_found() || !self.flags.is_searching() {
                tracing::debug!("Subject watcher exiting, run is over");
                return false;
            }

            match self.color.color() {
                Ok(color) if color == self.target => {
                    self.on_detection();
                    return true;
                }
                Ok(_) => consecutive_errors = 0,
                Err(e) => {
                    if consecutive_errors % ERROR_LOG_EVERY == 0 {
                        tracing::error!(
                            "Color sensor read failed ({} in a row): {}",
                            consecutive_errors + 1,
                            e
                        );
                    }
                    consecutive_errors += 1;
                }
            }

            thread::sleep(self.poll);
        }
    }

    fn on_detection(&self) {
        tracing::info!("Subject detected");
        self.flags.set_subject_found(true);
        self.flags.set_searching(false);

        let report = self.supervisor.kill_switch();
        tracing::debug!("Detection stopped {} tasks", report.stopped);

        if let Err(e) = self.announcer.announce(FOUND_MESSAGE) {
            tracing::warn!("Failed to announce detection: {}", e);
        }
    }
}
