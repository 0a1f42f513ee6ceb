//! Network link collaborator. Association itself is done by the host's
//! network stack; the controller only asks for it and watches the result.

use thiserror::Error;

mod sysfs;
pub use sysfs::SysfsLink;

#[derive(Debug, Clone)]
pub struct LinkCredentials {
    pub ssid: String,
    pub password: String,
}

#[derive(Debug, Error)]
pub enum LinkError {
    #[error("link {interface} did not come up for {ssid} within {timeout_secs}s")]
    Timeout {
        interface: String,
        ssid: String,
        timeout_secs: u64,
    },

    #[error("cannot read link state of {interface}: {source}")]
    Io {
        interface: String,
        #[source]
        source: std::io::Error,
    },
}

/// A link that must be up before the broker can be reached.
///
/// A failed `connect` is unrecoverable in-process: the caller restarts the
/// device instead of retrying.
#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    async fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), LinkError>;
    fn is_connected(&self) -> bool;
    fn set_hostname(&mut self, name: &str);
}
