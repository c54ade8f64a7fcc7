// Single motor channel on an H-bridge driver
//
// Translates a direction + power level into the two polarity inputs and the
// power (PWM) signal of one motor. Nothing outside this file knows which
// polarity pair means forward.

use tracing::trace;

use super::signals::{ChannelId, Level, PinId, SignalError, SignalOutput};

/// Highest power level / speed accepted anywhere in the drive
pub const MAX_POWER_LEVEL: u8 = 100;

/// Commanded rotation direction of one motor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    Forward,
    Backward,
    #[default]
    Idle,
}

impl Direction {
    /// Polarity pair (in1, in2) for this direction. Idle drives both LOW.
    pub fn polarity(self) -> (Level, Level) {
        match self {
            Direction::Forward => (Level::High, Level::Low),
            Direction::Backward => (Level::Low, Level::High),
            Direction::Idle => (Level::Low, Level::Low),
        }
    }
}

/// Wiring of one motor channel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelPins {
    pub in1: PinId,
    pub in2: PinId,
    pub pwm: ChannelId,
}

/// Error types for the motor drive
#[derive(Debug, thiserror::Error)]
pub enum MotorError {
    #[error("Invalid power level {value} (expected 0-100)")]
    InvalidPowerLevel { value: u8 },

    #[error("Invalid speed {value} (expected 0-100)")]
    InvalidSpeed { value: u8 },

    #[error("Drive unit already shut down")]
    ShutDown,

    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),
}

/// Snapshot of a channel's commanded state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelState {
    pub direction: Direction,
    pub power_level: u8,
}

impl ChannelState {
    pub fn new(direction: Direction, power_level: u8) -> Self {
        Self {
            direction,
            power_level,
        }
    }
}

/// One motor channel: wiring plus the last state successfully emitted
#[derive(Debug)]
pub struct MotorChannel {
    name: &'static str,
    pins: ChannelPins,
    state: ChannelState,
}

impl MotorChannel {
    /// New channel in `Idle` at power 0. Nothing is emitted until `set_state`.
    pub fn new(name: &'static str, pins: ChannelPins) -> Self {
        Self {
            name,
            pins,
            state: ChannelState::default(),
        }
    }

    /// Emit both polarity signals and the power signal for this channel
    ///
    /// `Idle` always emits power 0, whatever `power_level` says.
    pub fn set_state<S: SignalOutput + ?Sized>(
        &mut self,
        out: &mut S,
        direction: Direction,
        power_level: u8,
    ) -> Result<(), MotorError> {
        if power_level > MAX_POWER_LEVEL {
            return Err(MotorError::InvalidPowerLevel { value: power_level });
        }
        let power_level = match direction {
            Direction::Idle => 0,
            _ => power_level,
        };

        let (a, b) = direction.polarity();
        out.set_digital_output(self.pins.in1, a)?;
        out.set_digital_output(self.pins.in2, b)?;
        out.set_power_signal(self.pins.pwm, power_level)?;

        trace!("{} motor: {:?} at {}", self.name, direction, power_level);
        self.state = ChannelState::new(direction, power_level);
        Ok(())
    }

    /// Drive only the power signal to 0; polarity and direction stay as they are
    pub fn cut_power<S: SignalOutput + ?Sized>(&mut self, out: &mut S) -> Result<(), MotorError> {
        out.set_power_signal(self.pins.pwm, 0)?;
        trace!("{} motor: power cut", self.name);
        self.state.power_level = 0;
        Ok(())
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    pub fn direction(&self) -> Direction {
        self.state.direction
    }

    pub fn power_level(&self) -> u8 {
        self.state.power_level
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motor::sim::{SignalEvent, SimulatedSignals};

    const PINS: ChannelPins = ChannelPins {
        in1: 27,
        in2: 17,
        pwm: 0,
    };

    #[test]
    fn test_polarity_table() {
        assert_eq!(Direction::Forward.polarity(), (Level::High, Level::Low));
        assert_eq!(Direction::Backward.polarity(), (Level::Low, Level::High));
        assert_eq!(Direction::Idle.polarity(), (Level::Low, Level::Low));
    }

    #[test]
    fn test_every_valid_state_emits_table_polarity() {
        for direction in [Direction::Forward, Direction::Backward, Direction::Idle] {
            for power in 0..=MAX_POWER_LEVEL {
                let mut board = SimulatedSignals::new();
                let mut channel = MotorChannel::new("left", PINS);
                channel.set_state(&mut board, direction, power).unwrap();

                let (a, b) = direction.polarity();
                let expected_power = if direction == Direction::Idle { 0 } else { power };
                assert_eq!(board.pin_level(PINS.in1), Some(a));
                assert_eq!(board.pin_level(PINS.in2), Some(b));
                assert_eq!(board.power(PINS.pwm), Some(expected_power));
                assert_eq!(channel.state(), ChannelState::new(direction, expected_power));
            }
        }
    }

    #[test]
    fn test_out_of_range_power_rejected() {
        for power in [101u8, 150, 255] {
            let mut board = SimulatedSignals::new();
            let mut channel = MotorChannel::new("left", PINS);
            let err = channel
                .set_state(&mut board, Direction::Forward, power)
                .unwrap_err();
            assert!(
                matches!(err, MotorError::InvalidPowerLevel { value } if value == power),
                "got {:?}",
                err
            );
            // Rejected before touching the hardware
            assert!(board.events().is_empty());
            assert_eq!(channel.state(), ChannelState::default());
        }
    }

    #[test]
    fn test_power_emitted_after_polarity() {
        let mut board = SimulatedSignals::new();
        let mut channel = MotorChannel::new("right", PINS);
        channel.set_state(&mut board, Direction::Backward, 40).unwrap();
        assert_eq!(
            board.events().last(),
            Some(&SignalEvent::Power {
                channel: 0,
                duty: 40
            })
        );
    }

    #[test]
    fn test_state_unchanged_when_signal_fails() {
        let mut board = SimulatedSignals::failing_after(2);
        let mut channel = MotorChannel::new("left", PINS);
        let err = channel
            .set_state(&mut board, Direction::Forward, 70)
            .unwrap_err();
        assert!(matches!(err, MotorError::Signal(_)));
        assert_eq!(channel.state(), ChannelState::default());
    }

    #[test]
    fn test_cut_power_touches_only_power_signal() {
        let mut board = SimulatedSignals::new();
        let mut channel = MotorChannel::new("left", PINS);
        channel.set_state(&mut board, Direction::Backward, 60).unwrap();
        let emitted = board.events().len();

        channel.cut_power(&mut board).unwrap();

        assert_eq!(
            &board.events()[emitted..],
            &[SignalEvent::Power {
                channel: 0,
                duty: 0
            }]
        );
        assert_eq!(channel.state(), ChannelState::new(Direction::Backward, 0));
        assert_eq!(board.pin_level(PINS.in2), Some(Level::High));
    }

    #[test]
    fn test_repeated_state_is_idempotent() {
        let mut board = SimulatedSignals::new();
        let mut channel = MotorChannel::new("left", PINS);
        channel.set_state(&mut board, Direction::Forward, 55).unwrap();
        let first = (channel.state(), board.pin_level(27), board.power(0));
        channel.set_state(&mut board, Direction::Forward, 55).unwrap();
        let second = (channel.state(), board.pin_level(27), board.power(0));
        assert_eq!(first, second);
    }
}
