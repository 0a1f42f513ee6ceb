//! The cooperative main loop.
//!
//! Each [`Supervisor::tick`] services, in order: the update agent, the
//! connection state machine, the broker session, and the report cadence.
//! Connects block the tick; broker retries are a timed state instead of a
//! sleep, so the update agent and the cadence keep running between
//! attempts.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::reporter::{REPORT_PERIOD, StateReporter};
use super::{
    ACTION_TOPIC, Command, DeviceState, FIRMWARE_VERSION, RelayStatus, Report, STATUS_TOPIC,
};
use crate::hal::{HardwareIo, PinAssignment};
use crate::link::{LinkCredentials, NetworkLink};
use crate::mqtt::{BrokerConnection, BrokerTransport, InboundMessage};
use crate::ota::{UpdateAgent, UpdateEvent};

pub const BROKER_RETRY_DELAY: Duration = Duration::from_secs(5);
pub const LINK_FAILURE_RESTART_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Disconnected,
    LinkOnly,
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Disconnected,
    /// Link up, broker not. `retry_at` holds off the next attempt.
    LinkOnly {
        retry_at: Option<Instant>,
    },
    Connected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartReason {
    LinkFailure,
    UpdateApplied,
}

impl RestartReason {
    /// How long the host should wait before restarting.
    pub fn delay(self) -> Duration {
        match self {
            RestartReason::LinkFailure => LINK_FAILURE_RESTART_DELAY,
            RestartReason::UpdateApplied => Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Continue,
    RestartRequested(RestartReason),
}

pub struct Supervisor<L, T, H, U> {
    link: L,
    broker: BrokerConnection<T>,
    hardware: H,
    updates: U,
    relay: PinAssignment,
    indicator: PinAssignment,
    credentials: LinkCredentials,
    hostname: String,
    state: DeviceState,
    phase: Phase,
    reporter: StateReporter,
}

impl<L, T, H, U> Supervisor<L, T, H, U>
where
    L: NetworkLink,
    T: BrokerTransport,
    H: HardwareIo,
    U: UpdateAgent,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        link: L,
        broker: BrokerConnection<T>,
        hardware: H,
        updates: U,
        relay: PinAssignment,
        indicator: PinAssignment,
        credentials: LinkCredentials,
        hostname: String,
    ) -> Self {
        Self {
            link,
            broker,
            hardware,
            updates,
            relay,
            indicator,
            credentials,
            hostname,
            state: DeviceState::default(),
            phase: Phase::Disconnected,
            reporter: StateReporter::new(REPORT_PERIOD, Instant::now()),
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn status(&self) -> ConnectionStatus {
        match self.phase {
            Phase::Disconnected => ConnectionStatus::Disconnected,
            Phase::LinkOnly { .. } => ConnectionStatus::LinkOnly,
            Phase::Connected => ConnectionStatus::Connected,
        }
    }

    #[cfg(test)]
    fn hardware(&self) -> &H {
        &self.hardware
    }

    /// Fail-safe outputs, link up, update agent listening.
    pub async fn boot(&mut self) -> TickOutcome {
        self.drive_relay(false);
        self.drive_indicator(false);

        if let Err(reason) = self.bring_up_link().await {
            return TickOutcome::RestartRequested(reason);
        }
        self.link.set_hostname(&self.hostname);
        self.updates.begin();
        self.phase = Phase::LinkOnly { retry_at: None };
        TickOutcome::Continue
    }

    pub async fn tick(&mut self) -> TickOutcome {
        if let Some(reason) = self.service_updates() {
            return TickOutcome::RestartRequested(reason);
        }
        if let Err(reason) = self.ensure_connected().await {
            return TickOutcome::RestartRequested(reason);
        }
        if self.phase == Phase::Connected {
            for message in self.broker.service().await {
                self.handle_message(&message);
            }
        }
        self.report_if_due();
        TickOutcome::Continue
    }

    fn service_updates(&mut self) -> Option<RestartReason> {
        let event = self.updates.service()?;
        match event {
            UpdateEvent::Started => info!("Update started"),
            UpdateEvent::Progress { .. } => {
                info!("Update progress: {}%", event.percent().unwrap_or_default())
            }
            UpdateEvent::Failed(e) => error!("Update error: {}", e),
            UpdateEvent::Completed => {
                info!("Update applied, restart required");
                return Some(RestartReason::UpdateApplied);
            }
        }
        None
    }

    async fn bring_up_link(&mut self) -> Result<(), RestartReason> {
        match self.link.connect(&self.credentials).await {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(
                    "Connection to {} failed: {}. Rebooting...",
                    self.credentials.ssid, e
                );
                self.drive_indicator(false);
                Err(RestartReason::LinkFailure)
            }
        }
    }

    async fn ensure_connected(&mut self) -> Result<(), RestartReason> {
        if self.phase == Phase::Connected {
            if self.broker.is_connected() {
                return Ok(());
            }
            warn!("MQTT session lost, reconnecting");
            self.drive_indicator(false);
            self.phase = Phase::Disconnected;
        }

        if self.phase == Phase::Disconnected {
            if !self.link.is_connected() {
                self.bring_up_link().await?;
            }
            self.phase = Phase::LinkOnly { retry_at: None };
        }

        if let Phase::LinkOnly { retry_at } = self.phase {
            if retry_at.is_some_and(|at| Instant::now() < at) {
                return Ok(());
            }
            self.connect_broker().await?;
        }
        Ok(())
    }

    async fn connect_broker(&mut self) -> Result<(), RestartReason> {
        if !self.link.is_connected() {
            warn!("Link down before MQTT connect");
            self.bring_up_link().await?;
        }

        let connected = match self.broker.connect().await {
            Ok(()) => self.broker.subscribe(ACTION_TOPIC).await,
            Err(e) => Err(e),
        };

        match connected {
            Ok(()) => {
                self.drive_indicator(true);
                self.phase = Phase::Connected;
                self.publish(Report::CurrentStatus);
            }
            Err(e) => {
                warn!("MQTT {}. Retrying in {:?}", e, BROKER_RETRY_DELAY);
                self.drive_indicator(false);
                if !self.link.is_connected() {
                    self.bring_up_link().await?;
                }
                self.phase = Phase::LinkOnly {
                    retry_at: Some(Instant::now() + BROKER_RETRY_DELAY),
                };
            }
        }
        Ok(())
    }

    fn handle_message(&mut self, message: &InboundMessage) {
        let Some(command) = Command::parse(&message.topic, &message.payload) else {
            debug!(
                "Ignoring {} on {}",
                String::from_utf8_lossy(&message.payload),
                message.topic
            );
            return;
        };
        debug!("Command {:?}", command);

        let effect = command.apply(&mut self.state);
        if let Some(active) = effect.relay {
            self.drive_relay(active);
        }
        if let Some(report) = effect.report {
            self.publish(report);
        }
    }

    fn report_if_due(&mut self) {
        let Some(step) = self.reporter.poll(Instant::now(), &self.state) else {
            return;
        };
        if step.reassert_relay {
            self.drive_relay(true);
        }
        if step.publish {
            self.publish(Report::CurrentStatus);
        }
    }

    fn relay_status(&self) -> Option<RelayStatus> {
        match self.hardware.read_output(self.relay.pin) {
            Ok(level) if self.relay.is_active(level) => Some(RelayStatus::On),
            Ok(_) => Some(RelayStatus::Off),
            Err(e) => {
                warn!("Cannot read relay pin: {}", e);
                None
            }
        }
    }

    fn publish(&mut self, report: Report) {
        let payload = match report {
            Report::CurrentStatus => match self.relay_status() {
                Some(status) => status.as_str(),
                None => return,
            },
            Report::Status(status) => status.as_str(),
            Report::Version => FIRMWARE_VERSION,
        };
        self.broker.publish(STATUS_TOPIC, payload);
    }

    fn drive_relay(&mut self, active: bool) {
        let level = self.relay.level_for(active);
        if let Err(e) = self.hardware.set_output(self.relay.pin, level) {
            warn!("Cannot drive relay: {}", e);
        }
    }

    fn drive_indicator(&mut self, connected: bool) {
        let level = self.indicator.level_for(connected);
        if let Err(e) = self.hardware.set_output(self.indicator.pin, level) {
            warn!("Cannot drive indicator: {}", e);
        }
    }

    #[cfg(test)]
    fn transport(&self) -> &T {
        self.broker.transport()
    }
}
