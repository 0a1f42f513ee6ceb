use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info};

use super::{LinkCredentials, LinkError, NetworkLink};

const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Link state read from `/sys/class/net/<iface>/operstate`.
///
/// With no interface configured the link is always reported up, which is
/// what a wired development host wants.
pub struct SysfsLink {
    interface: Option<String>,
    sysfs_root: PathBuf,
    connect_timeout: Duration,
    hostname: Option<String>,
}

impl SysfsLink {
    pub fn new(interface: Option<String>, connect_timeout: Duration) -> Self {
        Self {
            interface,
            sysfs_root: PathBuf::from("/sys/class/net"),
            connect_timeout,
            hostname: None,
        }
    }

    #[cfg(test)]
    fn with_root(mut self, root: PathBuf) -> Self {
        self.sysfs_root = root;
        self
    }

    #[cfg(test)]
    fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    fn operstate(&self, interface: &str) -> std::io::Result<String> {
        let path = self.sysfs_root.join(interface).join("operstate");
        Ok(std::fs::read_to_string(path)?.trim().to_string())
    }

    fn interface_up(&self, interface: &str) -> Result<bool, LinkError> {
        match self.operstate(interface) {
            Ok(state) => Ok(state == "up"),
            // Interface not present yet (driver still loading).
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(source) => Err(LinkError::Io {
                interface: interface.to_string(),
                source,
            }),
        }
    }
}

impl NetworkLink for SysfsLink {
    async fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), LinkError> {
        let Some(interface) = self.interface.clone() else {
            return Ok(());
        };

        info!(
            "Waiting for {} to associate with {} (timeout {:?})",
            interface, credentials.ssid, self.connect_timeout
        );
        let deadline = Instant::now() + self.connect_timeout;
        loop {
            if self.interface_up(&interface)? {
                info!(
                    "Connected to the network ({}) via {}",
                    credentials.ssid, interface
                );
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(LinkError::Timeout {
                    interface,
                    ssid: credentials.ssid.clone(),
                    timeout_secs: self.connect_timeout.as_secs(),
                });
            }
            debug!("{} not up yet", interface);
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    fn is_connected(&self) -> bool {
        match &self.interface {
            Some(interface) => self.interface_up(interface).unwrap_or(false),
            None => true,
        }
    }

    fn set_hostname(&mut self, name: &str) {
        info!("Hostname: {}", name);
        self.hostname = Some(name.to_string());
    }
}
