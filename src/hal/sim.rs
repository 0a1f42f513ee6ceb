use std::collections::HashMap;

use tracing::{debug, info};

use super::{HardwareError, HardwareIo, Level};

/// In-memory pins for hosts without GPIO. Every level change is logged.
#[derive(Debug, Default)]
pub struct SimulatedPins {
    levels: HashMap<u8, Level>,
}

impl SimulatedPins {
    /// Registers each `(pin, level)` as an output starting at that level.
    pub fn new(pins: &[(u8, Level)]) -> Self {
        Self {
            levels: pins.iter().copied().collect(),
        }
    }
}

impl HardwareIo for SimulatedPins {
    fn set_output(&mut self, pin: u8, level: Level) -> Result<(), HardwareError> {
        let current = self
            .levels
            .get_mut(&pin)
            .ok_or(HardwareError::UnknownPin(pin))?;
        if *current != level {
            info!("GPIO{} -> {:?}", pin, level);
            *current = level;
        } else {
            debug!("GPIO{} already {:?}", pin, level);
        }
        Ok(())
    }

    fn read_output(&self, pin: u8) -> Result<Level, HardwareError> {
        self.levels
            .get(&pin)
            .copied()
            .ok_or(HardwareError::UnknownPin(pin))
    }
}
