use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::hal::{Level, PinAssignment};
use crate::link::LinkCredentials;

#[derive(Debug, Clone)]
pub struct Config {
    pub mqtt: MqttConfig,
    pub link: LinkConfig,
    pub pins: PinConfig,
    pub update_marker: PathBuf,
    pub tick_interval: Duration,
}

#[derive(Debug, Clone)]
pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub client_id_prefix: String,
    pub keep_alive: Duration,
}

#[derive(Debug, Clone)]
pub struct LinkConfig {
    pub credentials: LinkCredentials,
    pub hostname: String,
    /// `None` disables link supervision (always considered up).
    pub interface: Option<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct PinConfig {
    pub relay: PinAssignment,
    pub indicator: PinAssignment,
}

impl PinConfig {
    /// Levels to claim the pins at: relay released, indicator dark.
    pub fn idle_levels(&self) -> [(u8, Level); 2] {
        [self.relay.idle(), self.indicator.idle()]
    }
}

// Credentials live in their own file, kept out of version control.
#[derive(Deserialize)]
struct Secrets {
    wifi_ssid: String,
    wifi_password: String,
    #[serde(default)]
    mqtt_username: Option<String>,
    #[serde(default)]
    mqtt_password: Option<String>,
}

fn env_required(key: &str) -> Result<String, String> {
    env::var(key)
        .map_err(|_| format!("{key} environment variable is required"))
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.is_empty())
}

fn env_or_default<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> Result<Self, String> {
        let secrets_file = env_or_default("SECRETS_FILE", "secrets.json".to_string());
        let secrets = load_secrets(Path::new(&secrets_file))?;

        let interface = env_or_default("LINK_INTERFACE", "wlan0".to_string());
        let wired = interface.eq_ignore_ascii_case("none");
        let interface = (!wired).then_some(interface);

        let config = Self {
            mqtt: MqttConfig {
                broker_host: env_required("MQTT_BROKER_HOST")?,
                broker_port: env_or_default("MQTT_BROKER_PORT", 1883),
                username: env_optional("MQTT_USERNAME").or(secrets.mqtt_username),
                password: env_optional("MQTT_PASSWORD").or(secrets.mqtt_password),
                client_id_prefix: env_or_default("MQTT_CLIENT_ID_PREFIX", "relay-mqtt".to_string()),
                keep_alive: Duration::from_secs(env_or_default("MQTT_KEEP_ALIVE_SECS", 15)),
            },
            link: LinkConfig {
                credentials: LinkCredentials {
                    ssid: secrets.wifi_ssid,
                    password: secrets.wifi_password,
                },
                hostname: env_or_default("DEVICE_HOSTNAME", "vmc-board".to_string()),
                interface,
                connect_timeout: Duration::from_secs(env_or_default(
                    "LINK_CONNECT_TIMEOUT_SECS",
                    20,
                )),
            },
            pins: PinConfig {
                relay: PinAssignment::new(
                    env_or_default("RELAY_PIN", 0),
                    env_flag("RELAY_ACTIVE_LOW", true),
                ),
                indicator: PinAssignment::new(
                    env_or_default("INDICATOR_PIN", 2),
                    env_flag("INDICATOR_ACTIVE_LOW", true),
                ),
            },
            update_marker: PathBuf::from(env_or_default(
                "UPDATE_MARKER_FILE",
                "update.ready".to_string(),
            )),
            tick_interval: Duration::from_millis(env_or_default("TICK_INTERVAL_MS", 50)),
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), String> {
        if self.mqtt.broker_host.is_empty() {
            return Err("MQTT_BROKER_HOST must not be empty".into());
        }
        if self.mqtt.keep_alive < Duration::from_secs(5) {
            return Err("MQTT_KEEP_ALIVE_SECS must be >= 5".into());
        }
        if self.mqtt.username.is_some() != self.mqtt.password.is_some() {
            return Err("MQTT username and password must be set together".into());
        }
        if self.link.credentials.ssid.is_empty() {
            return Err("wifi_ssid must not be empty".into());
        }
        if self.pins.relay.pin == self.pins.indicator.pin {
            return Err("RELAY_PIN and INDICATOR_PIN must differ".into());
        }
        if self.tick_interval.is_zero() {
            return Err("TICK_INTERVAL_MS must be > 0".into());
        }
        Ok(())
    }
}

fn load_secrets(path: &Path) -> Result<Secrets, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
    parse_secrets(&content)
        .map_err(|e| format!("Failed to parse {}: {e}", path.display()))
}

fn parse_secrets(content: &str) -> Result<Secrets, serde_json::Error> {
    serde_json::from_str(content)
}
