// Motor control for a two-motor differential base
//
// Provides:
// - Single-channel H-bridge driver (direction + power level)
// - Drive unit combining both channels into named movement patterns
// - Hardware signaling collaborator trait with simulated and sysfs backends

mod drive_unit;
mod driver;
pub mod signals;
pub mod sim;
pub mod sysfs;

pub use drive_unit::{DriveUnit, DriveWiring, Drivetrain};
pub use driver::{ChannelPins, ChannelState, Direction, MAX_POWER_LEVEL, MotorChannel, MotorError};
pub use signals::{ChannelId, Level, PinId, SignalError, SignalOutput};
pub use sim::{SignalEvent, SimulatedSignals};
pub use sysfs::SysfsSignals;
