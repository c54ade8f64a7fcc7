// Tick cadence, speed limits, and pin wiring
use std::time::Duration;

use crate::motor::{ChannelId, ChannelPins, DriveWiring, PinId};

// Control loop cadence. Also the upper bound on time-to-stop after key release.
pub const TICK_INTERVAL: Duration = Duration::from_millis(50);

// Power level applied to both channels at startup (0-100)
pub const DEFAULT_SPEED: u8 = 70;

// Speed adjustment keys move the configured speed by this much
pub const SPEED_STEP: u8 = 10;

// Speed-down key never goes below this
pub const MIN_ADJUSTED_SPEED: u8 = 10;

// PWM carrier frequency for both power channels
pub const PWM_FREQUENCY_HZ: u32 = 1000;

// BCM pin numbers of the dual H-bridge wiring
pub const AIN1: PinId = 27;
pub const AIN2: PinId = 17;
pub const BIN1: PinId = 24;
pub const BIN2: PinId = 22;
pub const STBY: PinId = 25;

// PWMA (GPIO18) and PWMB (GPIO23) are exposed as pwm0 / pwm1 of the pwm chip
pub const PWMA: ChannelId = 0;
pub const PWMB: ChannelId = 1;
pub const PWM_CHIP: u32 = 0;

pub const GPIO_SYSFS_ROOT: &str = "/sys/class/gpio";
pub const PWM_SYSFS_ROOT: &str = "/sys/class/pwm";

// Motor A is the left side of the vehicle, motor B the right
pub const WIRING: DriveWiring = DriveWiring {
    left: ChannelPins {
        in1: AIN1,
        in2: AIN2,
        pwm: PWMA,
    },
    right: ChannelPins {
        in1: BIN1,
        in2: BIN2,
        pwm: PWMB,
    },
    standby: STBY,
};

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use crate::motor::MAX_POWER_LEVEL;

    #[test]
    fn test_wiring_uses_each_pin_once() {
        let pins = [
            WIRING.left.in1,
            WIRING.left.in2,
            WIRING.right.in1,
            WIRING.right.in2,
            WIRING.standby,
        ];
        let unique: HashSet<_> = pins.iter().collect();
        assert_eq!(unique.len(), pins.len());
        assert_ne!(WIRING.left.pwm, WIRING.right.pwm);
    }

    #[test]
    fn test_speed_defaults_in_range() {
        assert!(DEFAULT_SPEED <= MAX_POWER_LEVEL);
        assert!(MIN_ADJUSTED_SPEED <= DEFAULT_SPEED);
        assert!(PWM_FREQUENCY_HZ > 0);
    }
}
