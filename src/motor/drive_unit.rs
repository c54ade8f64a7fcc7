// Drive unit for a two-motor differential base
//
// Owns both motor channels, the shared speed, and the hardware collaborator.
// It is the only place polarity is set in combination, so the two channels
// always encode one of Forward / Backward / Left / Right / Stop.

use tracing::{debug, info, warn};

use super::driver::{ChannelPins, Direction, MAX_POWER_LEVEL, MotorChannel, MotorError};
use super::signals::{Level, PinId, SignalOutput};
use crate::command::Command;

/// Pins of the whole drive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DriveWiring {
    pub left: ChannelPins,
    pub right: ChannelPins,
    pub standby: PinId,
}

/// Drive operations the control loop depends on
pub trait Drivetrain {
    fn execute(&mut self, command: Command) -> Result<(), MotorError>;

    fn configured_speed(&self) -> u8;

    fn set_speed(&mut self, value: u8) -> Result<(), MotorError>;
}

/// Two motor channels driven as one unit
pub struct DriveUnit<S: SignalOutput> {
    signals: S,
    left: MotorChannel,
    right: MotorChannel,
    standby: PinId,
    configured_speed: u8,
    last_command: Command,
    // A signal failed part way through a command; hardware state is unknown
    faulted: bool,
    released: bool,
}

impl<S: SignalOutput> DriveUnit<S> {
    /// Initialize the hardware and bring the drive up stopped with standby enabled
    ///
    /// If initialization fails the hardware is released again before returning.
    pub fn new(signals: S, wiring: DriveWiring, speed: u8) -> Result<Self, MotorError> {
        if speed > MAX_POWER_LEVEL {
            return Err(MotorError::InvalidSpeed { value: speed });
        }

        let mut unit = Self {
            signals,
            left: MotorChannel::new("left", wiring.left),
            right: MotorChannel::new("right", wiring.right),
            standby: wiring.standby,
            configured_speed: speed,
            last_command: Command::Stop,
            faulted: false,
            released: false,
        };
        unit.start()?;
        Ok(unit)
    }

    fn start(&mut self) -> Result<(), MotorError> {
        info!(
            "Initializing drive unit (standby pin {}, speed {})",
            self.standby, self.configured_speed
        );
        let result = self.start_signals();
        if result.is_err() {
            self.faulted = true;
        }
        result
    }

    fn start_signals(&mut self) -> Result<(), MotorError> {
        self.signals.init()?;
        self.emit(Direction::Idle, Direction::Idle, 0)?;
        self.signals.set_digital_output(self.standby, Level::High)?;
        Ok(())
    }

    pub fn forward(&mut self) -> Result<(), MotorError> {
        self.execute(Command::Forward)
    }

    pub fn backward(&mut self) -> Result<(), MotorError> {
        self.execute(Command::Backward)
    }

    /// Pivot left: left wheel reverses, right wheel advances
    pub fn left(&mut self) -> Result<(), MotorError> {
        self.execute(Command::Left)
    }

    /// Pivot right: mirror of `left`
    pub fn right(&mut self) -> Result<(), MotorError> {
        self.execute(Command::Right)
    }

    /// Zero both power levels. Directions and polarity pins stay as last commanded.
    pub fn stop(&mut self) -> Result<(), MotorError> {
        self.execute(Command::Stop)
    }

    /// Apply one command to both channels before returning
    ///
    /// Each call fully replaces the previous drive state; only the configured
    /// speed carries over between commands.
    pub fn execute(&mut self, command: Command) -> Result<(), MotorError> {
        if self.released {
            return Err(MotorError::ShutDown);
        }

        let result = match command.directions() {
            Some((left, right)) => self.emit(left, right, self.configured_speed),
            None => self.cut_power(),
        };

        match result {
            Ok(()) => {
                if command != self.last_command {
                    debug!("Drive: {:?} -> {:?}", self.last_command, command);
                }
                self.last_command = command;
                Ok(())
            }
            Err(e) => {
                self.faulted = true;
                Err(e)
            }
        }
    }

    fn emit(&mut self, left: Direction, right: Direction, power: u8) -> Result<(), MotorError> {
        self.left.set_state(&mut self.signals, left, power)?;
        self.right.set_state(&mut self.signals, right, power)
    }

    // Power to 0 on both channels without rewriting polarity. Both channels are
    // attempted even if the first fails.
    fn cut_power(&mut self) -> Result<(), MotorError> {
        let left = self.left.cut_power(&mut self.signals);
        let right = self.right.cut_power(&mut self.signals);
        left.and(right)
    }

    /// Change the speed used by subsequent commands
    ///
    /// A channel already in motion keeps its power level until the next command.
    pub fn set_speed(&mut self, value: u8) -> Result<(), MotorError> {
        if value > MAX_POWER_LEVEL {
            return Err(MotorError::InvalidSpeed { value });
        }
        if value != self.configured_speed {
            info!("Speed: {} -> {}", self.configured_speed, value);
        }
        self.configured_speed = value;
        Ok(())
    }

    pub fn configured_speed(&self) -> u8 {
        self.configured_speed
    }

    pub fn left_channel(&self) -> &MotorChannel {
        &self.left
    }

    pub fn right_channel(&self) -> &MotorChannel {
        &self.right
    }

    pub fn last_command(&self) -> Command {
        self.last_command
    }

    pub fn signals(&self) -> &S {
        &self.signals
    }

    /// Both channels are known to be at power 0
    pub fn is_stopped(&self) -> bool {
        !self.faulted && self.left.power_level() == 0 && self.right.power_level() == 0
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Stop if not already stopped, drop standby, and clean up the hardware
    ///
    /// Runs at most once; later calls return `Ok(())` without touching the
    /// hardware. Every step is attempted even if an earlier one fails, and the
    /// first failure is returned.
    pub fn shutdown(&mut self) -> Result<(), MotorError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        let mut first_error: Option<MotorError> = None;

        if !self.is_stopped() {
            info!("Stopping motors before release");
            if let Err(e) = self.cut_power() {
                warn!("Failed to stop motors: {}", e);
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.signals.set_digital_output(self.standby, Level::Low) {
            warn!("Failed to disable standby pin {}: {}", self.standby, e);
            first_error.get_or_insert(e.into());
        }

        if let Err(e) = self.signals.cleanup() {
            warn!("Hardware cleanup failed: {}", e);
            first_error.get_or_insert(e.into());
        }

        info!("Drive unit released");
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl<S: SignalOutput> Drivetrain for DriveUnit<S> {
    fn execute(&mut self, command: Command) -> Result<(), MotorError> {
        DriveUnit::execute(self, command)
    }

    fn configured_speed(&self) -> u8 {
        self.configured_speed
    }

    fn set_speed(&mut self, value: u8) -> Result<(), MotorError> {
        DriveUnit::set_speed(self, value)
    }
}

impl<S: SignalOutput> Drop for DriveUnit<S> {
    fn drop(&mut self) {
        // Covers early returns and panics between construction and shutdown
        if let Err(e) = self.shutdown() {
            warn!("Failed to release drive unit on drop: {}", e);
        }
    }
}
