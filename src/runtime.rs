// 20 Hz teleop control loop
// Samples the keyboard once per tick and re-issues the drive command. A tick
// with no key stops the vehicle, so releasing every key halts it within one
// tick. Quit stops once and ends the loop; any error ends it too, and in both
// cases the drive unit is stopped and released exactly once.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info};

use crate::command::{Action, Command, Key, action_for};
use crate::config::{DEFAULT_SPEED, MIN_ADJUSTED_SPEED, SPEED_STEP, TICK_INTERVAL, WIRING};
use crate::input::{InputError, InputSource, TerminalInput};
use crate::motor::{
    DriveUnit, Drivetrain, MAX_POWER_LEVEL, MotorError, SignalOutput, SimulatedSignals,
    SysfsSignals,
};

#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    #[error("Motor error: {0}")]
    Motor(#[from] MotorError),

    #[error("Input error: {0}")]
    Input(#[from] InputError),
}

/// Hardware backend driving the motor board
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Backend {
    /// Log signals instead of driving pins
    Simulated,
    /// Linux sysfs GPIO + PWM
    Sysfs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Running,
    Terminating,
}

/// What the loop did, logged at exit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopReport {
    pub ticks: u64,
    commands: HashMap<Command, u64>,
}

impl LoopReport {
    fn record(&mut self, command: Command) {
        self.ticks += 1;
        *self.commands.entry(command).or_default() += 1;
    }

    /// Number of ticks that resolved to `command`
    pub fn count(&self, command: Command) -> u64 {
        self.commands.get(&command).copied().unwrap_or(0)
    }
}

/// Control loop state machine, one `step` per tick
pub struct Runtime {
    state: LoopState,
    last_command: Command,
    report: LoopReport,
}

impl Runtime {
    pub fn new() -> Self {
        Self {
            state: LoopState::Running,
            last_command: Command::Stop,
            report: LoopReport::default(),
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn report(&self) -> &LoopReport {
        &self.report
    }

    pub fn into_report(self) -> LoopReport {
        self.report
    }

    /// Process the key sampled this tick
    ///
    /// Once terminating, further steps do nothing and touch no drive.
    pub fn step<D: Drivetrain>(
        &mut self,
        drive: &mut D,
        key: Option<Key>,
    ) -> Result<LoopState, MotorError> {
        if self.state == LoopState::Terminating {
            return Ok(self.state);
        }

        let action = action_for(key);
        if matches!(action, Action::SpeedUp | Action::SpeedDown) {
            let speed = adjusted_speed(drive.configured_speed(), action);
            drive.set_speed(speed)?;
        }

        let command = action.command();
        drive.execute(command)?;
        self.report.record(command);

        if command != self.last_command {
            debug!("Command: {:?}", command);
            self.last_command = command;
        }
        if action == Action::Quit {
            info!("Quit requested, motors stopped");
            self.state = LoopState::Terminating;
        }
        Ok(self.state)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

/// Speed after a speed key, clamped to [MIN_ADJUSTED_SPEED, MAX_POWER_LEVEL]
///
/// Speed-down never raises a speed that already sits below the floor.
pub fn adjusted_speed(current: u8, action: Action) -> u8 {
    match action {
        Action::SpeedUp => current.saturating_add(SPEED_STEP).min(MAX_POWER_LEVEL),
        Action::SpeedDown if current > MIN_ADJUSTED_SPEED => {
            current.saturating_sub(SPEED_STEP).max(MIN_ADJUSTED_SPEED)
        }
        _ => current,
    }
}

/// Tick until quit or the first error
///
/// Input is polled without blocking; the tick wait is the only suspension point.
pub async fn control_loop<D: Drivetrain, I: InputSource>(
    drive: &mut D,
    input: &mut I,
    period: Duration,
) -> Result<LoopReport, RuntimeError> {
    let mut runtime = Runtime::new();
    let mut tick = interval(period);
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Control loop started: {}ms tick", period.as_millis());

    loop {
        tick.tick().await;

        let key = input.poll_event()?;
        if runtime.step(drive, key)? == LoopState::Terminating {
            break;
        }
    }

    Ok(runtime.into_report())
}

/// Run the control loop, then stop and release the drive whatever the outcome
pub async fn supervise<S: SignalOutput, I: InputSource>(
    drive: &mut DriveUnit<S>,
    input: &mut I,
    period: Duration,
) -> Result<LoopReport, RuntimeError> {
    let outcome = control_loop(drive, input, period).await;
    if let Err(e) = &outcome {
        error!("Control loop terminated: {}", e);
    }

    let released = drive.shutdown();
    let report = outcome?;
    released?;

    info!(
        "Ran {} ticks: forward={} backward={} left={} right={} stop={}",
        report.ticks,
        report.count(Command::Forward),
        report.count(Command::Backward),
        report.count(Command::Left),
        report.count(Command::Right),
        report.count(Command::Stop)
    );
    Ok(report)
}

/// Bring up the hardware and keyboard, then drive until quit
pub async fn run(backend: Backend) -> Result<LoopReport, RuntimeError> {
    let signals: Box<dyn SignalOutput> = match backend {
        Backend::Simulated => Box::new(SimulatedSignals::without_history()),
        Backend::Sysfs => Box::new(SysfsSignals::system()),
    };
    let mut drive = DriveUnit::new(signals, WIRING, DEFAULT_SPEED)?;

    info!("Controls: arrows=drive, PageUp/PageDown or +/-=speed, q=quit");
    let mut input = TerminalInput::new()?;
    let result = supervise(&mut drive, &mut input, TICK_INTERVAL).await;
    drop(input);

    result
}
