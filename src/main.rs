use std::time::Duration;

use tokio::signal::unix::{SignalKind, signal};
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use relay_mqtt::config::Config;
use relay_mqtt::device::{FIRMWARE_VERSION, RestartReason, Supervisor, TickOutcome};
use relay_mqtt::hal::{HardwareIo, Level};
use relay_mqtt::link::{NetworkLink, SysfsLink};
use relay_mqtt::mqtt::{BrokerConnection, BrokerTransport, RumqttTransport};
use relay_mqtt::ota::{MarkerFileAgent, UpdateAgent};

/// Exit status asking the service manager to start us again.
const RESTART_EXIT_CODE: i32 = 3;

#[cfg(feature = "rpi")]
fn open_pins(pins: &[(u8, Level)]) -> Result<relay_mqtt::hal::RpiPins, String> {
    relay_mqtt::hal::RpiPins::new(pins).map_err(|e| e.to_string())
}

#[cfg(not(feature = "rpi"))]
fn open_pins(pins: &[(u8, Level)]) -> Result<relay_mqtt::hal::SimulatedPins, String> {
    Ok(relay_mqtt::hal::SimulatedPins::new(pins))
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    info!(
        "Booting relay-mqtt {} (mqtt={}:{}, relay=GPIO{}, indicator=GPIO{}, link={})",
        FIRMWARE_VERSION,
        config.mqtt.broker_host,
        config.mqtt.broker_port,
        config.pins.relay.pin,
        config.pins.indicator.pin,
        config.link.interface.as_deref().unwrap_or("none"),
    );

    let pins = match open_pins(&config.pins.idle_levels()) {
        Ok(p) => p,
        Err(e) => {
            error!("GPIO error: {}", e);
            std::process::exit(1);
        }
    };

    let supervisor = Supervisor::new(
        SysfsLink::new(config.link.interface.clone(), config.link.connect_timeout),
        BrokerConnection::new(RumqttTransport::new(config.mqtt.keep_alive), &config.mqtt),
        pins,
        MarkerFileAgent::new(config.update_marker.clone()),
        config.pins.relay,
        config.pins.indicator,
        config.link.credentials.clone(),
        config.link.hostname.clone(),
    );

    match run(supervisor, config.tick_interval).await {
        Some(reason) => {
            let delay = reason.delay();
            warn!("Restart requested ({:?}), exiting in {:?}", reason, delay);
            tokio::time::sleep(delay).await;
            std::process::exit(RESTART_EXIT_CODE);
        }
        None => info!("relay-mqtt stopped"),
    }
}

/// Ticks until a restart is requested (`Some`) or a signal arrives (`None`).
async fn run<L, T, H, U>(
    mut supervisor: Supervisor<L, T, H, U>,
    tick_interval: Duration,
) -> Option<RestartReason>
where
    L: NetworkLink,
    T: BrokerTransport,
    H: HardwareIo,
    U: UpdateAgent,
{
    if let TickOutcome::RestartRequested(reason) = supervisor.boot().await {
        return Some(reason);
    }

    let mut sigterm = match signal(SignalKind::terminate()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to register SIGTERM handler: {}", e);
            std::process::exit(1);
        }
    };

    let mut ticker = tokio::time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let TickOutcome::RestartRequested(reason) = supervisor.tick().await {
                    return Some(reason);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT, shutting down");
                return None;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM, shutting down");
                return None;
            }
        }
    }
}
