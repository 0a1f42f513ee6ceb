//! GPIO access for the relay and the status indicator.

use std::ops::Not;

use thiserror::Error;

mod sim;
pub use sim::SimulatedPins;

#[cfg(feature = "rpi")]
mod rpi;
#[cfg(feature = "rpi")]
pub use rpi::RpiPins;

/// Electrical level of an output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Not for Level {
    type Output = Level;

    fn not(self) -> Level {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

#[derive(Debug, Error)]
pub enum HardwareError {
    #[error("pin {0} is not configured as an output")]
    UnknownPin(u8),

    #[cfg(feature = "rpi")]
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),
}

/// Output-only pin driver. `read_output` returns the level last driven.
pub trait HardwareIo {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), HardwareError>;
    fn read_output(&self, pin: u8) -> Result<Level, HardwareError>;
}

/// A pin number plus the level that counts as "active" for its wiring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinAssignment {
    pub pin: u8,
    pub active_level: Level,
}

impl PinAssignment {
    pub fn new(pin: u8, active_low: bool) -> Self {
        let active_level = if active_low { Level::Low } else { Level::High };
        Self { pin, active_level }
    }

    pub fn level_for(&self, active: bool) -> Level {
        if active {
            self.active_level
        } else {
            !self.active_level
        }
    }

    pub fn is_active(&self, level: Level) -> bool {
        level == self.active_level
    }

    /// `(pin, inactive level)`, for claiming the pin without a glitch.
    pub fn idle(&self) -> (u8, Level) {
        (self.pin, self.level_for(false))
    }
}
