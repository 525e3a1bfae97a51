//! KhojNav daemon
//!
//! Reads JSON commands from stdin, one per line, and writes report events as
//! JSON lines to stdout. Runs against the simulated robot.
//!
//! ## Threads
//!
//! - **Main**: waits for end of input or Ctrl-C, then shuts down
//! - **Stdin reader**: parses commands; kill switch, stop and expiry run here immediately
//! - **Command worker**: executes everything else in order (moves block it)
//! - **Reporter**: prints report events
//! - Search runs, motion tasks and the subject watcher are spawned on demand

use khoj_nav::{Command, KhojConfig, KhojError, ReportEvent, Result, Robot, RobotHardware};
use khoj_nav::{SimulatedRobot, search::ControllerState};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{error, info, warn};

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("khoj_nav=info".parse().unwrap()),
        )
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();

    let config = if args.len() > 1 && !args[1].starts_with("--") {
        let config_path = Path::new(&args[1]);
        info!("Loading configuration from {:?}", config_path);
        KhojConfig::load(config_path)?
    } else if Path::new("khoj.toml").exists() {
        info!("Loading configuration from khoj.toml");
        KhojConfig::load(Path::new("khoj.toml"))?
    } else {
        info!("Using default configuration");
        KhojConfig::default()
    };

    let ledger_path: Option<PathBuf> = args
        .iter()
        .position(|a| a == "--ledger")
        .and_then(|i| args.get(i + 1))
        .map(PathBuf::from);

    info!("KhojNav v{}", env!("CARGO_PKG_VERSION"));
    info!(
        "Grid {}x{} ft, start node {}, target color {}",
        config.grid.width_ft,
        config.grid.height_ft,
        config.grid.starting_position,
        config.robot.target_color
    );

    let sim = Arc::new(SimulatedRobot::from_config(&config));
    let hardware = RobotHardware::simulated(sim);

    let (report_tx, report_rx) = crossbeam_channel::unbounded();
    let robot = Arc::new(Robot::new(config, hardware, report_tx));

    // Ctrl-C behaves like the kill switch, then ends the daemon
    {
        let robot = Arc::clone(&robot);
        ctrlc::set_handler(move || {
            warn!("Interrupted, stopping robot");
            robot.shutdown();
        })
        .map_err(|e| KhojError::Config(format!("Failed to install signal handler: {}", e)))?;
    }

    let reporter = {
        let robot = Arc::clone(&robot);
        thread::Builder::new()
            .name("reporter".into())
            .spawn(move || print_reports(report_rx, &robot))?
    };

    let (command_tx, command_rx) = crossbeam_channel::unbounded::<Command>();
    let worker = {
        let robot = Arc::clone(&robot);
        thread::Builder::new()
            .name("command-worker".into())
            .spawn(move || {
                for command in command_rx {
                    robot.handle(command);
                }
            })?
    };

    let reader = {
        let robot = Arc::clone(&robot);
        thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || read_commands(&robot, command_tx))?
    };

    // Main thread: wait for end of input or shutdown
    let check_interval = Duration::from_millis(100);
    while !reader.is_finished() && !robot.flags().should_shutdown() {
        thread::sleep(check_interval);
    }

    if robot.flags().should_shutdown() {
        // The reader may be parked on stdin; it is left behind
        info!("Shutdown requested");
    } else {
        if reader.join().is_err() {
            error!("Stdin reader panicked");
        }
        if worker.join().is_err() {
            error!("Command worker panicked");
        }

        // Let a running search finish
        while robot.search_state() != ControllerState::Idle && !robot.flags().should_shutdown() {
            thread::sleep(check_interval);
        }
    }

    if let Some(summary) = robot.last_summary() {
        info!(
            "Last run: {} after {} hops ({})",
            summary.outcome, summary.hops, summary.route
        );
    }

    robot.shutdown();

    if let Some(path) = ledger_path {
        std::fs::write(&path, robot.ledger().to_json()?)?;
        info!("Instruction ledger written to {:?}", path);
    }

    if reporter.join().is_err() {
        error!("Reporter thread panicked");
    }

    info!("KhojNav finished");
    Ok(())
}

/// Read JSON commands until EOF.
///
/// Interrupts run right here so they never queue behind a blocking move or turn.
fn read_commands(robot: &Robot, commands: Sender<Command>) {
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                error!("Failed to read stdin: {}", e);
                break;
            }
        };
        if robot.flags().should_shutdown() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match Command::from_json(line) {
            Ok(command) if command.is_interrupt() => {
                robot.handle(command);
            }
            Ok(command) => {
                if commands.send(command).is_err() {
                    error!("Command worker exited");
                    break;
                }
            }
            Err(e) => warn!("Ignoring input: {}", e),
        }
    }
}

/// Print report events as JSON lines until shutdown and the queue is drained.
fn print_reports(reports: Receiver<ReportEvent>, robot: &Robot) {
    loop {
        match reports.recv_timeout(Duration::from_millis(100)) {
            Ok(event) => match serde_json::to_string(&event) {
                Ok(line) => println!("{}", line),
                Err(e) => error!("Failed to encode report: {}", e),
            },
            Err(RecvTimeoutError::Timeout) => {
                if robot.flags().should_shutdown() && reports.is_empty() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}
