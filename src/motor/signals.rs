// Hardware signaling collaborator
//
// The drive unit never touches GPIO or PWM directly; it emits polarity levels
// and duty cycles through a `SignalOutput`, which may be real hardware, a
// simulation, or a recorder.

use std::path::PathBuf;

/// Digital output pin number (BCM numbering on the reference wiring)
pub type PinId = u32;

/// Power (PWM) channel number
pub type ChannelId = u32;

/// Logic level of a digital output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn is_high(self) -> bool {
        self == Level::High
    }
}

/// Errors reported by a hardware collaborator
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Hardware unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Signal rejected: {reason}")]
    Rejected { reason: String },
}

/// Output side of the motor driver board
///
/// Lifecycle: `init` once before the first signal, `cleanup` once at the end.
/// Implementations must leave every output LOW and every power channel at 0
/// after `cleanup`, even if some individual writes fail.
pub trait SignalOutput {
    /// Prepare the hardware for output
    fn init(&mut self) -> Result<(), SignalError>;

    /// Drive a digital pin HIGH or LOW
    fn set_digital_output(&mut self, pin: PinId, level: Level) -> Result<(), SignalError>;

    /// Set a power channel's duty cycle in percent (0-100)
    fn set_power_signal(&mut self, channel: ChannelId, duty: u8) -> Result<(), SignalError>;

    /// Zero all outputs and release the hardware
    fn cleanup(&mut self) -> Result<(), SignalError>;
}

impl<T: SignalOutput + ?Sized> SignalOutput for Box<T> {
    fn init(&mut self) -> Result<(), SignalError> {
        (**self).init()
    }

    fn set_digital_output(&mut self, pin: PinId, level: Level) -> Result<(), SignalError> {
        (**self).set_digital_output(pin, level)
    }

    fn set_power_signal(&mut self, channel: ChannelId, duty: u8) -> Result<(), SignalError> {
        (**self).set_power_signal(channel, duty)
    }

    fn cleanup(&mut self) -> Result<(), SignalError> {
        (**self).cleanup()
    }
}

impl<T: SignalOutput + ?Sized> SignalOutput for &mut T {
    fn init(&mut self) -> Result<(), SignalError> {
        (**self).init()
    }

    fn set_digital_output(&mut self, pin: PinId, level: Level) -> Result<(), SignalError> {
        (**self).set_digital_output(pin, level)
    }

    fn set_power_signal(&mut self, channel: ChannelId, duty: u8) -> Result<(), SignalError> {
        (**self).set_power_signal(channel, duty)
    }

    fn cleanup(&mut self) -> Result<(), SignalError> {
        (**self).cleanup()
    }
}
