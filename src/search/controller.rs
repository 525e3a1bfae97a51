//! Search controller: owns the run state machine and launches runs.
//!
//! `Idle → PerimeterWalking | IntelliSearching → Idle`. A run executes as a
//! supervised task so the kill switch can cancel and join it like any motion.

use super::state::{ControllerState, SearchSummary};
use super::{intellisearch, perimeter};
use crate::config::KhojConfig;
use crate::error::{KhojError, Result};
use crate::grid::{GridGeometry, Topology};
use crate::ledger::InstructionLedger;
use crate::motion::{MotionExecutor, MotionStatus, MotionTicket, WaitOutcome};
use crate::planning::NavigationPlanner;
use crate::shared::RunFlags;
use crate::supervisor::{CancelToken, Supervisor};
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Search strategy to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchMode {
    PerimeterWalk,
    IntelliSearch,
}

impl SearchMode {
    fn state(self) -> ControllerState {
        match self {
            SearchMode::PerimeterWalk => ControllerState::PerimeterWalking,
            SearchMode::IntelliSearch => ControllerState::IntelliSearching,
        }
    }
}

/// Everything a run needs, shared with the run's task.
pub struct SearchContext {
    pub executor: Arc<MotionExecutor>,
    pub flags: Arc<RunFlags>,
    pub geometry: Arc<RwLock<GridGeometry>>,
    pub ledger: Arc<InstructionLedger>,
    pub planner: NavigationPlanner,
    pub config: KhojConfig,
}

impl SearchContext {
    pub fn new(
        executor: Arc<MotionExecutor>,
        flags: Arc<RunFlags>,
        geometry: Arc<RwLock<GridGeometry>>,
        ledger: Arc<InstructionLedger>,
        config: &KhojConfig,
    ) -> Self {
        Self {
            executor,
            flags,
            geometry,
            ledger,
            planner: NavigationPlanner::new(Topology::standard(), config.search.turn_penalty),
            config: config.clone(),
        }
    }

    /// Wait for a motion issued by a run.
    ///
    /// A motion that overran its bound has been cancelled and stopped by the
    /// time this returns. An error means the motion failed.
    pub fn await_motion(
        &self,
        ticket: &MotionTicket,
        token: &CancelToken,
        units: Option<f32>,
    ) -> Result<MotionEnd> {
        // The kill switch may have drained the registry just before this
        // motion was registered
        if token.is_cancelled() || !self.flags.is_searching() {
            ticket.cancel();
        }

        let outcome = match units {
            Some(units) => self.executor.wait_units(ticket, units),
            None => self.executor.wait(ticket),
        };

        match outcome {
            WaitOutcome::Interrupted => {
                ticket.cancel();
                Ok(MotionEnd::Stopped)
            }
            WaitOutcome::Completed | WaitOutcome::TimedOut => match ticket.status() {
                MotionStatus::Completed => Ok(MotionEnd::Completed),
                MotionStatus::Failed(message) => Err(KhojError::Driver(message)),
                MotionStatus::Cancelled | MotionStatus::Running => {
                    if outcome == WaitOutcome::TimedOut
                        && self.flags.is_searching()
                        && !token.is_cancelled()
                    {
                        tracing::warn!("{:?} cut short after timeout", ticket.kind());
                        Ok(MotionEnd::CutShort)
                    } else {
                        Ok(MotionEnd::Stopped)
                    }
                }
            },
        }
    }
}

/// How a run's motion ended, as far as the run is concerned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionEnd {
    /// The motion ran to completion
    Completed,
    /// The motion overran its bound and was stopped; the run may go on
    CutShort,
    /// The run was stopped
    Stopped,
}

/// Launches and tracks search runs; one run at a time.
pub struct SearchController {
    context: Arc<SearchContext>,
    supervisor: Arc<Supervisor>,
    state: Arc<AtomicU8>,
    last_summary: Arc<Mutex<Option<SearchSummary>>>,
}

impl SearchController {
    pub fn new(context: SearchContext, supervisor: Arc<Supervisor>) -> Self {
        Self {
            context: Arc::new(context),
            supervisor,
            state: Arc::new(AtomicU8::new(ControllerState::Idle as u8)),
            last_summary: Arc::new(Mutex::new(None)),
        }
    }

    pub fn state(&self) -> ControllerState {
        ControllerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_running(&self) -> bool {
        self.state() != ControllerState::Idle
    }

    /// Summary of the most recently finished run.
    pub fn last_summary(&self) -> Option<SearchSummary> {
        self.last_summary.lock().clone()
    }

    /// Arm the run flags and start `mode` in the background.
    ///
    /// Fails with [`KhojError::Busy`] while another run is active.
    pub fn start(&self, mode: SearchMode) -> Result<()> {
        let target = mode.state();
        if let Err(current) = self.state.compare_exchange(
            ControllerState::Idle as u8,
            target as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            let current = ControllerState::from_u8(current);
            tracing::warn!("Rejecting {:?}: already {}", mode, current);
            return Err(KhojError::Busy(format!("already {}", current)));
        }

        self.context.flags.begin_run();
        *self.last_summary.lock() = None;

        let context = self.context.clone();
        let supervisor = self.supervisor.clone();
        let state = self.state.clone();
        let last_summary = self.last_summary.clone();

        let spawned = self.supervisor.spawn("search", move |token| {
            let result = match mode {
                SearchMode::PerimeterWalk => perimeter::walk(&context, &token),
                SearchMode::IntelliSearch => intellisearch::run(&context, &token),
            };
            match result {
                Ok(summary) => *last_summary.lock() = Some(summary),
                Err(e) => {
                    tracing::error!("{:?} aborted: {}", mode, e);
                    context.flags.set_searching(false);
                    supervisor.stop_drivetrain();
                }
            }
            state.store(ControllerState::Idle as u8, Ordering::Release);
        });

        if let Err(e) = spawned {
            self.context.flags.set_searching(false);
            self.state
                .store(ControllerState::Idle as u8, Ordering::Release);
            return Err(e);
        }
        tracing::info!("Started {:?}", mode);
        Ok(())
    }
}
