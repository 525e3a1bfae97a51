//! Command handler wiring the search robot together.
//!
//! Each accepted command produces exactly one [`ReportEvent`] on the report
//! channel. Move and turn report once their motion has finished; search
//! commands report as soon as the run is launched.

use crate::command::{
    Command, ReportEvent, ReportName, parse_cardinal, parse_move_direction, parse_turn_direction,
};
use crate::config::KhojConfig;
use crate::error::{KhojError, Result};
use crate::grid::{GridGeometry, quadrant_label};
use crate::hardware::RobotHardware;
use crate::ledger::{InstructionLedger, params};
use crate::motion::{MotionExecutor, MotionStatus, MotionTicket, WaitOutcome};
use crate::search::{ControllerState, SearchContext, SearchController, SearchMode, SearchSummary};
use crate::shared::RunFlags;
use crate::supervisor::{KillReport, Supervisor};
use crate::watcher::SubjectWatcher;
use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};
use serde_json::{Map, json};
use std::sync::Arc;
use std::thread::JoinHandle;

/// The search robot: hardware, run state and command dispatch.
pub struct Robot {
    config: KhojConfig,
    hardware: RobotHardware,
    flags: Arc<RunFlags>,
    supervisor: Arc<Supervisor>,
    executor: Arc<MotionExecutor>,
    geometry: Arc<RwLock<GridGeometry>>,
    ledger: Arc<InstructionLedger>,
    controller: SearchController,
    watcher: Mutex<Option<JoinHandle<bool>>>,
    reports: Sender<ReportEvent>,
}

impl Robot {
    pub fn new(config: KhojConfig, hardware: RobotHardware, reports: Sender<ReportEvent>) -> Self {
        let flags = Arc::new(RunFlags::new());
        let supervisor = Arc::new(Supervisor::new(
            flags.clone(),
            hardware.drivetrain.clone(),
            &config.supervisor,
        ));
        let executor = Arc::new(MotionExecutor::new(
            hardware.drivetrain.clone(),
            hardware.gyro.clone(),
            supervisor.clone(),
            flags.clone(),
            &config,
        ));
        let geometry = Arc::new(RwLock::new(GridGeometry::new(&config.grid, &config.robot)));
        let ledger = Arc::new(InstructionLedger::new());

        let context = SearchContext::new(
            executor.clone(),
            flags.clone(),
            geometry.clone(),
            ledger.clone(),
            &config,
        );
        let controller = SearchController::new(context, supervisor.clone());

        Self {
            config,
            hardware,
            flags,
            supervisor,
            executor,
            geometry,
            ledger,
            controller,
            watcher: Mutex::new(None),
            reports,
        }
    }

    /// Execute one command and emit its report.
    pub fn handle(&self, command: Command) -> ReportEvent {
        let name = command.report_name();
        tracing::info!("Handling {}", command.kind());

        let result = match &command {
            Command::Launch => self.launch(),
            Command::Move {
                direction,
                rotations,
            } => self.move_robot(direction.as_deref(), *rotations),
            Command::Turn { direction, degrees } => self.turn_robot(direction.as_deref(), *degrees),
            Command::StartSearch => self.start_run(SearchMode::IntelliSearch),
            Command::WalkPerimeter => self.start_run(SearchMode::PerimeterWalk),
            Command::SetGrid {
                width,
                height,
                position,
                cardinal,
            } => Ok(self.set_grid(*width, *height, *position, cardinal.as_deref())),
            Command::Pause => {
                self.ledger.record("pause", Map::new());
                Ok("pause robot".to_string())
            }
            Command::KillSwitch | Command::StopCancel | Command::Expired => {
                Ok(self.stop_everything(command.kind()))
            }
        };

        let event = match result {
            Ok(report) => ReportEvent::ok(name, report),
            Err(e) => {
                tracing::warn!("{} failed: {}", command.kind(), e);
                ReportEvent::failed(name, e.to_string())
            }
        };
        self.emit(event.clone());
        event
    }

    /// Parse and execute one JSON command line.
    ///
    /// Unparseable input is not a command and produces no report.
    pub fn handle_json(&self, line: &str) -> Result<ReportEvent> {
        let command = Command::from_json(line)?;
        Ok(self.handle(command))
    }

    /// Stop all motion and make every loop exit.
    pub fn shutdown(&self) -> KillReport {
        self.flags.signal_shutdown();
        let report = self.supervisor.kill_switch();
        self.retire_watcher();
        report
    }

    pub fn config(&self) -> &KhojConfig {
        &self.config
    }

    pub fn flags(&self) -> &Arc<RunFlags> {
        &self.flags
    }

    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    pub fn ledger(&self) -> &Arc<InstructionLedger> {
        &self.ledger
    }

    /// Current grid geometry.
    pub fn geometry(&self) -> GridGeometry {
        self.geometry.read().clone()
    }

    pub fn search_state(&self) -> ControllerState {
        self.controller.state()
    }

    pub fn last_summary(&self) -> Option<SearchSummary> {
        self.controller.last_summary()
    }

    fn emit(&self, event: ReportEvent) {
        if self.reports.send(event).is_err() {
            tracing::debug!("Report channel closed");
        }
    }

    fn launch(&self) -> Result<String> {
        self.ledger.record("launch", Map::new());
        let geometry = self.geometry.read();
        let node = geometry.start_node();
        Ok(format!(
            "Robot ready at the {} of a {} by {} foot grid, facing {}",
            quadrant_label(node),
            geometry.width_ft,
            geometry.height_ft,
            geometry.heading.name()
        ))
    }

    fn move_robot(&self, direction: Option<&str>, rotations: Option<f32>) -> Result<String> {
        self.ensure_idle()?;
        let direction = parse_move_direction(direction)?;
        let rotations = rotations.unwrap_or(self.config.robot.default_move_rotations);
        if !rotations.is_finite() || rotations <= 0.0 {
            return Err(KhojError::InvalidCommand(format!(
                "Rotations must be positive, got {}",
                rotations
            )));
        }
        let speed = self.config.robot.drive_speed * direction.speed_sign();

        let id = self.ledger.begin(
            "move",
            params([
                ("direction", json!(direction.to_string())),
                ("rotations", json!(rotations)),
                ("speed", json!(speed)),
            ]),
        );
        let ticket = self.executor.drive(rotations, speed, true);
        let result = ticket.and_then(|ticket| self.finish_motion(&ticket));
        self.ledger.finish(id);
        result?;

        Ok(format!("Moved {} {} rotations", direction, rotations))
    }

    fn turn_robot(&self, direction: Option<&str>, degrees: Option<f32>) -> Result<String> {
        self.ensure_idle()?;
        let direction = parse_turn_direction(direction, self.config.turn.default_direction)?;
        let degrees = degrees.unwrap_or(self.config.turn.default_angle).abs();
        if !degrees.is_finite() {
            return Err(KhojError::InvalidCommand("Turn angle must be finite".to_string()));
        }

        let id = self.ledger.begin(
            "turn",
            params([
                ("direction", json!(direction)),
                ("degrees", json!(degrees)),
            ]),
        );
        let ticket = self.executor.turn(direction.sign() * degrees);
        let result = ticket.and_then(|ticket| self.finish_motion(&ticket));
        self.ledger.finish(id);
        result?;

        Ok(format!("Turned {} {} degrees", direction, degrees))
    }

    /// Wait for a command motion and turn its end state into a result.
    fn finish_motion(&self, ticket: &MotionTicket) -> Result<()> {
        match self.executor.wait(ticket) {
            WaitOutcome::Completed => match ticket.status() {
                MotionStatus::Completed => Ok(()),
                MotionStatus::Failed(message) => Err(KhojError::Driver(message)),
                MotionStatus::Cancelled | MotionStatus::Running => {
                    Err(KhojError::Driver("Motion was cancelled".to_string()))
                }
            },
            WaitOutcome::Interrupted => {
                ticket.cancel();
                Err(KhojError::Driver("Motion was interrupted".to_string()))
            }
            WaitOutcome::TimedOut => Err(KhojError::Driver(
                "Motion did not finish in time".to_string(),
            )),
        }
    }

    /// Manual motion would corrupt the dead-reckoned pose of a running search.
    fn ensure_idle(&self) -> Result<()> {
        if self.controller.is_running() {
            return Err(KhojError::Busy(format!(
                "robot is {}",
                self.controller.state()
            )));
        }
        Ok(())
    }

    fn start_run(&self, mode: SearchMode) -> Result<String> {
        self.ensure_idle()?;
        self.retire_watcher();

        let kind = match mode {
            SearchMode::PerimeterWalk => "start_walk_perimeter",
            SearchMode::IntelliSearch => "start_search",
        };
        self.ledger.record(kind, Map::new());
        self.controller.start(mode)?;

        let watcher = SubjectWatcher::new(
            self.hardware.color.clone(),
            self.hardware.announcer.clone(),
            self.supervisor.clone(),
            self.flags.clone(),
            &self.config,
        );
        match watcher.spawn() {
            Ok(handle) => *self.watcher.lock() = Some(handle),
            Err(e) => {
                tracing::error!("Failed to start subject watcher: {}", e);
                self.supervisor.kill_switch();
                return Err(e);
            }
        }

        Ok(match mode {
            SearchMode::PerimeterWalk => "Walking the perimeter".to_string(),
            SearchMode::IntelliSearch => "Starting search".to_string(),
        })
    }

    /// Join the previous run's watcher. Only called while no run is active.
    fn retire_watcher(&self) {
        let Some(handle) = self.watcher.lock().take() else {
            return;
        };
        if !handle.is_finished() {
            self.flags.set_searching(false);
        }
        if handle.join().is_err() {
            tracing::warn!("Subject watcher panicked");
        }
    }

    fn set_grid(
        &self,
        width: Option<f32>,
        height: Option<f32>,
        position: Option<i64>,
        cardinal: Option<&str>,
    ) -> String {
        let mut notes = Vec::new();
        let mut changes = Map::new();
        let mut geometry = self.geometry.write();

        if let Some(width) = width {
            match geometry.set_width(width) {
                Ok(()) => {
                    changes.insert("width".into(), json!(width));
                    notes.push(format!("width {} feet", width));
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    notes.push(format!("width {} rejected", width));
                }
            }
        }

        if let Some(height) = height {
            match geometry.set_height(height) {
                Ok(()) => {
                    changes.insert("height".into(), json!(height));
                    notes.push(format!("height {} feet", height));
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    notes.push(format!("height {} rejected", height));
                }
            }
        }

        // An explicit number wins over a cardinal phrase
        let position = match (position, cardinal) {
            (Some(position), _) => Some(position),
            (None, Some(phrase)) => match parse_cardinal(phrase) {
                Some(position) => Some(i64::from(position)),
                None => {
                    tracing::warn!("Unknown grid position '{}'", phrase);
                    notes.push(format!("position '{}' not recognized", phrase));
                    None
                }
            },
            (None, None) => None,
        };

        if let Some(position) = position {
            match geometry.set_position(position) {
                Ok(heading) => {
                    changes.insert("position".into(), json!(position));
                    changes.insert("heading".into(), json!(heading));
                    notes.push(format!("position {} facing {}", position, heading.name()));
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    notes.push(format!("position {} out of range, keeping previous", position));
                }
            }
        }
        drop(geometry);

        self.ledger.record("set_grid", changes);
        if notes.is_empty() {
            "set grid: nothing to change".to_string()
        } else {
            format!("set grid: {}", notes.join(", "))
        }
    }

    fn stop_everything(&self, kind: &str) -> String {
        let id = self.ledger.begin(kind, Map::new());
        let report = self.supervisor.kill_switch();
        self.ledger.annotate(id, "stopped", json!(report.stopped));
        self.ledger.annotate(id, "detached", json!(report.detached));
        self.ledger.finish(id);

        if report.detached > 0 {
            format!(
                "Stopped {} tasks, {} did not respond",
                report.stopped, report.detached
            )
        } else {
            format!("Stopped {} tasks", report.stopped)
        }
    }
}

impl Drop for Robot {
    fn drop(&mut self) {
        if !self.flags.should_shutdown() {
            self.shutdown();
        }
    }
}
