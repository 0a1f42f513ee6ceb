use std::collections::HashMap;

use rppal::gpio::{Gpio, OutputPin};
use tracing::info;

use super::{HardwareError, HardwareIo, Level};

/// Raspberry Pi GPIO via rppal.
pub struct RpiPins {
    pins: HashMap<u8, OutputPin>,
}

impl RpiPins {
    /// Claims each `(pin, level)` as an output, driven to that level.
    pub fn new(pins: &[(u8, Level)]) -> Result<Self, HardwareError> {
        let gpio = Gpio::new()?;
        let mut claimed = HashMap::new();
        for &(pin, initial) in pins {
            info!("GPIO{}: initializing as output", pin);
            let pin_handle = gpio.get(pin)?;
            let output = match initial {
                Level::Low => pin_handle.into_output_low(),
                Level::High => pin_handle.into_output_high(),
            };
            claimed.insert(pin, output);
        }
        Ok(Self { pins: claimed })
    }
}

fn to_rppal(level: Level) -> rppal::gpio::Level {
    match level {
        Level::Low => rppal::gpio::Level::Low,
        Level::High => rppal::gpio::Level::High,
    }
}

impl HardwareIo for RpiPins {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), HardwareError> {
        let output = self
            .pins
            .get_mut(&pin)
            .ok_or(HardwareError::UnknownPin(pin))?;
        output.write(to_rppal(level));
        Ok(())
    }

    fn read_output(&self, pin: u8) -> Result<Level, HardwareError> {
        let output = self.pins.get(&pin).ok_or(HardwareError::UnknownPin(pin))?;
        Ok(if output.is_set_high() {
            Level::High
        } else {
            Level::Low
        })
    }
}
