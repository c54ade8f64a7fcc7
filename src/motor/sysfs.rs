// Linux sysfs backend
//
// Polarity and standby lines go through /sys/class/gpio, power channels
// through /sys/class/pwm/pwmchipN. Pins and channels are exported lazily on
// first use and unexported again in `cleanup`.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::driver::MAX_POWER_LEVEL;
use super::signals::{ChannelId, Level, PinId, SignalError, SignalOutput};
use crate::config::{GPIO_SYSFS_ROOT, PWM_CHIP, PWM_FREQUENCY_HZ, PWM_SYSFS_ROOT};

const NANOS_PER_SECOND: u64 = 1_000_000_000;

pub struct SysfsSignals {
    gpio_root: PathBuf,
    pwm_chip: PathBuf,
    period_ns: u64,
    pins: Vec<PinId>,
    channels: Vec<ChannelId>,
}

impl SysfsSignals {
    pub fn new(gpio_root: impl Into<PathBuf>, pwm_chip: impl Into<PathBuf>, frequency_hz: u32) -> Self {
        Self {
            gpio_root: gpio_root.into(),
            pwm_chip: pwm_chip.into(),
            period_ns: NANOS_PER_SECOND / u64::from(frequency_hz.max(1)),
            pins: Vec::new(),
            channels: Vec::new(),
        }
    }

    /// The board's own sysfs tree with the default pwm chip and frequency
    pub fn system() -> Self {
        let chip = Path::new(PWM_SYSFS_ROOT).join(format!("pwmchip{}", PWM_CHIP));
        Self::new(GPIO_SYSFS_ROOT, chip, PWM_FREQUENCY_HZ)
    }

    pub fn period_ns(&self) -> u64 {
        self.period_ns
    }

    fn write(path: &Path, value: &str) -> Result<(), SignalError> {
        fs::write(path, value).map_err(|source| SignalError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    fn pin_dir(&self, pin: PinId) -> PathBuf {
        self.gpio_root.join(format!("gpio{}", pin))
    }

    fn channel_dir(&self, channel: ChannelId) -> PathBuf {
        self.pwm_chip.join(format!("pwm{}", channel))
    }

    fn ensure_pin(&mut self, pin: PinId) -> Result<PathBuf, SignalError> {
        let dir = self.pin_dir(pin);
        if !self.pins.contains(&pin) {
            if !dir.exists() {
                Self::write(&self.gpio_root.join("export"), &pin.to_string())?;
            }
            Self::write(&dir.join("direction"), "out")?;
            debug!("Exported gpio{}", pin);
            self.pins.push(pin);
        }
        Ok(dir)
    }

    fn ensure_channel(&mut self, channel: ChannelId) -> Result<PathBuf, SignalError> {
        let dir = self.channel_dir(channel);
        if !self.channels.contains(&channel) {
            if !dir.exists() {
                Self::write(&self.pwm_chip.join("export"), &channel.to_string())?;
            }
            // Duty must never exceed the period, so zero it before setting the period
            Self::write(&dir.join("duty_cycle"), "0")?;
            Self::write(&dir.join("period"), &self.period_ns.to_string())?;
            Self::write(&dir.join("enable"), "1")?;
            debug!("Exported pwm{} ({} ns period)", channel, self.period_ns);
            self.channels.push(channel);
        }
        Ok(dir)
    }

    fn release_channel(&self, channel: ChannelId) -> Result<(), SignalError> {
        let dir = self.channel_dir(channel);
        Self::write(&dir.join("duty_cycle"), "0")?;
        Self::write(&dir.join("enable"), "0")?;
        Self::write(&self.pwm_chip.join("unexport"), &channel.to_string())
    }

    fn release_pin(&self, pin: PinId) -> Result<(), SignalError> {
        Self::write(&self.pin_dir(pin).join("value"), "0")?;
        Self::write(&self.gpio_root.join("unexport"), &pin.to_string())
    }
}

impl SignalOutput for SysfsSignals {
    fn init(&mut self) -> Result<(), SignalError> {
        for root in [&self.gpio_root, &self.pwm_chip] {
            if !root.is_dir() {
                return Err(SignalError::Unavailable {
                    reason: format!("{} not found", root.display()),
                });
            }
        }
        info!(
            "Using sysfs gpio at {} and pwm at {}",
            self.gpio_root.display(),
            self.pwm_chip.display()
        );
        Ok(())
    }

    fn set_digital_output(&mut self, pin: PinId, level: Level) -> Result<(), SignalError> {
        let dir = self.ensure_pin(pin)?;
        let value = if level.is_high() { "1" } else { "0" };
        Self::write(&dir.join("value"), value)
    }

    fn set_power_signal(&mut self, channel: ChannelId, duty: u8) -> Result<(), SignalError> {
        if duty > MAX_POWER_LEVEL {
            return Err(SignalError::Rejected {
                reason: format!("duty cycle {}% on pwm{}", duty, channel),
            });
        }
        let dir = self.ensure_channel(channel)?;
        let duty_ns = self.period_ns * u64::from(duty) / 100;
        Self::write(&dir.join("duty_cycle"), &duty_ns.to_string())
    }

    fn cleanup(&mut self) -> Result<(), SignalError> {
        let mut first_error = None;

        // Power first, so no motor is driven while its polarity lines drop
        for channel in std::mem::take(&mut self.channels) {
            if let Err(e) = self.release_channel(channel) {
                warn!("Failed to release pwm{}: {}", channel, e);
                first_error.get_or_insert(e);
            }
        }
        for pin in std::mem::take(&mut self.pins) {
            if let Err(e) = self.release_pin(pin) {
                warn!("Failed to release gpio{}: {}", pin, e);
                first_error.get_or_insert(e);
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
