//! The relay controller core: state, command handling, periodic reporting
//! and the connection supervisor that drives them.

pub mod dispatcher;
pub mod reporter;
pub mod supervisor;

pub use dispatcher::{Command, Effect, Report};
pub use reporter::StateReporter;
pub use supervisor::{ConnectionStatus, RestartReason, Supervisor, TickOutcome};

/// Topic the controller publishes its status on.
pub const STATUS_TOPIC: &str = "vmc_board/status";
/// Topic the controller takes commands from.
pub const ACTION_TOPIC: &str = "vmc_board/action";

pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Desired relay and reporting state. The two flags are independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceState {
    pub relay_enabled: bool,
    pub reporting_enabled: bool,
}

/// Relay status as published on [`STATUS_TOPIC`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayStatus {
    On,
    Off,
}

impl RelayStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RelayStatus::On => "on",
            RelayStatus::Off => "off",
        }
    }
}
