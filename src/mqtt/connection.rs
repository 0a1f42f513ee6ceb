use tracing::{debug, info};

use super::{BrokerTransport, ConnectError, InboundMessage};
use crate::config::MqttConfig;

/// One broker session at a time, with a fresh client id per attempt so the
/// broker never sees two live sessions under the same id.
pub struct BrokerConnection<T> {
    transport: T,
    client_id_prefix: String,
}

impl<T: BrokerTransport> BrokerConnection<T> {
    pub fn new(mut transport: T, config: &MqttConfig) -> Self {
        transport.set_endpoint(&config.broker_host, config.broker_port);
        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            transport.set_credentials(user, pass);
        }
        Self {
            transport,
            client_id_prefix: config.client_id_prefix.clone(),
        }
    }

    fn fresh_client_id(&self) -> String {
        format!("{}-{:x}", self.client_id_prefix, rand::random::<u16>())
    }

    pub async fn connect(&mut self) -> Result<(), ConnectError> {
        let client_id = self.fresh_client_id();
        info!("Connecting to MQTT as {}", client_id);
        if self.transport.connect(&client_id).await {
            info!("MQTT client connected");
            Ok(())
        } else {
            Err(ConnectError::Refused {
                client_id,
                code: self.transport.last_error_code(),
            })
        }
    }

    pub async fn subscribe(&mut self, topic: &str) -> Result<(), ConnectError> {
        if self.transport.subscribe(topic).await {
            debug!("Subscribed to {}", topic);
            Ok(())
        } else {
            Err(ConnectError::Subscribe {
                topic: topic.to_string(),
                code: self.transport.last_error_code(),
            })
        }
    }

    /// Fire-and-forget. Dropped, not queued, while disconnected.
    pub fn publish(&mut self, topic: &str, payload: &str) {
        if !self.transport.is_connected() {
            debug!("Not connected, dropping {} <- {}", topic, payload);
            return;
        }
        debug!("Publishing {}: {}", topic, payload);
        if !self.transport.publish(topic, payload.as_bytes()) {
            debug!("Publish to {} was not accepted", topic);
        }
    }

    pub async fn service(&mut self) -> Vec<InboundMessage> {
        self.transport.service().await
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    #[cfg(test)]
    pub(crate) fn transport(&self) -> &T {
        &self.transport
    }
}
