//! Broker session: the transport seam and the session lifecycle on top of it.

use thiserror::Error;

pub mod client;
pub mod connection;

pub use client::RumqttTransport;
pub use connection::BrokerConnection;

/// A message received on a subscribed topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Session state codes, numbered the way Arduino MQTT clients report them
/// so field logs stay comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerStatus {
    ConnectionTimeout,
    ConnectionLost,
    ConnectFailed,
    Disconnected,
    Connected,
    BadProtocol,
    BadClientId,
    Unavailable,
    BadCredentials,
    Unauthorized,
}

impl BrokerStatus {
    pub fn code(self) -> i32 {
        match self {
            BrokerStatus::ConnectionTimeout => -4,
            BrokerStatus::ConnectionLost => -3,
            BrokerStatus::ConnectFailed => -2,
            BrokerStatus::Disconnected => -1,
            BrokerStatus::Connected => 0,
            BrokerStatus::BadProtocol => 1,
            BrokerStatus::BadClientId => 2,
            BrokerStatus::Unavailable => 3,
            BrokerStatus::BadCredentials => 4,
            BrokerStatus::Unauthorized => 5,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConnectError {
    #[error("connect as {client_id} failed with state {code}")]
    Refused {
        client_id: String,
        code: i32,
    },

    #[error("subscribe to {topic} failed with state {code}")]
    Subscribe {
        topic: String,
        code: i32,
    },
}

impl ConnectError {
    pub fn code(&self) -> i32 {
        match self {
            ConnectError::Refused { code, .. } | ConnectError::Subscribe { code, .. } => *code,
        }
    }
}

/// Low-level client for a single broker endpoint.
///
/// Inbound messages are handed back from `service`, which must be called on
/// every loop iteration while connected; it also keeps the session alive.
#[allow(async_fn_in_trait)]
pub trait BrokerTransport {
    fn set_endpoint(&mut self, host: &str, port: u16);
    fn set_credentials(&mut self, username: &str, password: &str);
    async fn connect(&mut self, client_id: &str) -> bool;
    fn is_connected(&self) -> bool;
    async fn subscribe(&mut self, topic: &str) -> bool;
    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool;
    async fn service(&mut self) -> Vec<InboundMessage>;
    fn last_error_code(&self) -> i32;
}
