// Simulated motor board: logs and records every signal instead of driving pins

use std::collections::HashMap;

use tracing::{debug, info};

use super::signals::{ChannelId, Level, PinId, SignalError, SignalOutput};

/// One signal as seen by the simulated board
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    Init,
    Digital { pin: PinId, level: Level },
    Power { channel: ChannelId, duty: u8 },
    Cleanup,
}

/// In-memory board used by `--backend simulated` and by the tests
///
/// Pin levels and duty cycles are always tracked, the event history only when
/// created with `new` or `failing_after`. With `failing_after(n)` the board
/// accepts `n` pin/power signals and then rejects every further one, like a
/// driver that dropped off the bus.
#[derive(Debug, Default)]
pub struct SimulatedSignals {
    events: Vec<SignalEvent>,
    pins: HashMap<PinId, Level>,
    power: HashMap<ChannelId, u8>,
    fail_after: Option<usize>,
    accepted: usize,
    record: bool,
}

impl SimulatedSignals {
    pub fn new() -> Self {
        Self {
            record: true,
            ..Self::default()
        }
    }

    /// Board for long interactive sessions: logs signals, keeps no history
    pub fn without_history() -> Self {
        Self::default()
    }

    pub fn failing_after(signals: usize) -> Self {
        Self {
            fail_after: Some(signals),
            ..Self::new()
        }
    }

    fn push(&mut self, event: SignalEvent) {
        if self.record {
            self.events.push(event);
        }
    }

    /// Every event in emission order
    pub fn events(&self) -> &[SignalEvent] {
        &self.events
    }

    /// Current level of a pin, `None` if never driven
    pub fn pin_level(&self, pin: PinId) -> Option<Level> {
        self.pins.get(&pin).copied()
    }

    /// Current duty cycle of a power channel, `None` if never driven
    pub fn power(&self, channel: ChannelId) -> Option<u8> {
        self.power.get(&channel).copied()
    }

    pub fn count(&self, event: SignalEvent) -> usize {
        self.events.iter().filter(|&&e| e == event).count()
    }

    fn accept(&mut self) -> Result<(), SignalError> {
        if let Some(limit) = self.fail_after {
            if self.accepted >= limit {
                return Err(SignalError::Rejected {
                    reason: format!("simulated board offline after {} signals", limit),
                });
            }
        }
        self.accepted += 1;
        Ok(())
    }
}

impl SignalOutput for SimulatedSignals {
    fn init(&mut self) -> Result<(), SignalError> {
        info!("Simulated motor board ready");
        self.push(SignalEvent::Init);
        Ok(())
    }

    fn set_digital_output(&mut self, pin: PinId, level: Level) -> Result<(), SignalError> {
        self.accept()?;
        debug!("pin {} -> {:?}", pin, level);
        self.pins.insert(pin, level);
        self.push(SignalEvent::Digital { pin, level });
        Ok(())
    }

    fn set_power_signal(&mut self, channel: ChannelId, duty: u8) -> Result<(), SignalError> {
        self.accept()?;
        debug!("pwm {} -> {}%", channel, duty);
        self.power.insert(channel, duty);
        self.push(SignalEvent::Power { channel, duty });
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), SignalError> {
        for level in self.pins.values_mut() {
            *level = Level::Low;
        }
        for duty in self.power.values_mut() {
            *duty = 0;
        }
        self.push(SignalEvent::Cleanup);
        info!("Simulated motor board released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_signals_in_order() {
        let mut board = SimulatedSignals::new();
        board.init().unwrap();
        board.set_digital_output(27, Level::High).unwrap();
        board.set_power_signal(0, 70).unwrap();

        assert_eq!(
            board.events(),
            &[
                SignalEvent::Init,
                SignalEvent::Digital {
                    pin: 27,
                    level: Level::High
                },
                SignalEvent::Power {
                    channel: 0,
                    duty: 70
                },
            ]
        );
        assert_eq!(board.pin_level(27), Some(Level::High));
        assert_eq!(board.power(0), Some(70));
        assert_eq!(board.pin_level(17), None);
    }

    #[test]
    fn test_fails_after_limit() {
        let mut board = SimulatedSignals::failing_after(1);
        board.set_digital_output(27, Level::High).unwrap();
        let err = board.set_power_signal(0, 50).unwrap_err();
        assert!(matches!(err, SignalError::Rejected { .. }));
        // Stays offline
        assert!(board.set_digital_output(27, Level::Low).is_err());
        assert_eq!(board.pin_level(27), Some(Level::High));
    }

    #[test]
    fn test_without_history_still_tracks_levels() {
        let mut board = SimulatedSignals::without_history();
        board.set_digital_output(24, Level::High).unwrap();
        board.set_power_signal(1, 30).unwrap();
        assert!(board.events().is_empty());
        assert_eq!(board.pin_level(24), Some(Level::High));
        assert_eq!(board.power(1), Some(30));
    }

    #[test]
    fn test_cleanup_zeroes_everything() {
        let mut board = SimulatedSignals::new();
        board.set_digital_output(25, Level::High).unwrap();
        board.set_power_signal(1, 90).unwrap();
        board.cleanup().unwrap();

        assert_eq!(board.pin_level(25), Some(Level::Low));
        assert_eq!(board.power(1), Some(0));
        assert_eq!(board.count(SignalEvent::Cleanup), 1);
    }
}
