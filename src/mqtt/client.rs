use std::time::Duration;

use rumqttc::{
    AsyncClient, ConnectReturnCode, ConnectionError, Event, EventLoop, Incoming, MqttOptions, QoS,
};
use tracing::{debug, warn};

use super::{BrokerStatus, BrokerTransport, InboundMessage};

/// Upper bound on events handled per `service` call so a chatty broker
/// cannot starve the rest of the tick.
const MAX_EVENTS_PER_SERVICE: usize = 32;

/// How long `service` waits for the next ready event before yielding.
const SERVICE_WINDOW: Duration = Duration::from_millis(5);

struct Session {
    client: AsyncClient,
    eventloop: EventLoop,
    /// Publishes that arrived while waiting for a SUBACK.
    pending: Vec<InboundMessage>,
}

/// rumqttc-backed transport. The event loop is only polled from inside
/// `connect`, `subscribe` and `service`, on the caller's task.
pub struct RumqttTransport {
    host: String,
    port: u16,
    credentials: Option<(String, String)>,
    keep_alive: Duration,
    session: Option<Session>,
    status: BrokerStatus,
}

impl RumqttTransport {
    pub fn new(keep_alive: Duration) -> Self {
        Self {
            host: String::new(),
            port: 1883,
            credentials: None,
            keep_alive,
            session: None,
            status: BrokerStatus::Disconnected,
        }
    }

    fn options(&self, client_id: &str) -> MqttOptions {
        let mut mqttopts = MqttOptions::new(client_id, &self.host, self.port);
        mqttopts.set_keep_alive(self.keep_alive);
        mqttopts.set_clean_session(true);
        if let Some((user, pass)) = &self.credentials {
            mqttopts.set_credentials(user, pass);
        }
        mqttopts
    }

    fn drop_session(&mut self, status: BrokerStatus) {
        self.session = None;
        self.status = status;
    }
}

fn refused_status(code: ConnectReturnCode) -> BrokerStatus {
    match code {
        ConnectReturnCode::Success => BrokerStatus::Connected,
        ConnectReturnCode::RefusedProtocolVersion => BrokerStatus::BadProtocol,
        ConnectReturnCode::BadClientId => BrokerStatus::BadClientId,
        ConnectReturnCode::ServiceUnavailable => BrokerStatus::Unavailable,
        ConnectReturnCode::BadUserNamePassword => BrokerStatus::BadCredentials,
        ConnectReturnCode::NotAuthorized => BrokerStatus::Unauthorized,
    }
}

fn error_status(error: &ConnectionError) -> BrokerStatus {
    match error {
        ConnectionError::ConnectionRefused(code) => refused_status(*code),
        ConnectionError::NetworkTimeout => BrokerStatus::ConnectionTimeout,
        _ => BrokerStatus::ConnectFailed,
    }
}

impl BrokerTransport for RumqttTransport {
    fn set_endpoint(&mut self, host: &str, port: u16) {
        self.host = host.to_string();
        self.port = port;
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        self.credentials = Some((username.to_string(), password.to_string()));
    }

    async fn connect(&mut self, client_id: &str) -> bool {
        self.session = None;
        let (client, mut eventloop) = AsyncClient::new(self.options(client_id), 10);

        // First poll opens the socket and waits for CONNACK.
        let outcome = tokio::time::timeout(self.keep_alive, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::ConnAck(ack))) => return Ok(ack.code),
                    Ok(_) => continue,
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        let status = match outcome {
            Err(_) => BrokerStatus::ConnectionTimeout,
            Ok(Ok(code)) => refused_status(code),
            Ok(Err(e)) => {
                warn!("MQTT connection error: {}", e);
                error_status(&e)
            }
        };

        self.status = status;
        if status != BrokerStatus::Connected {
            return false;
        }
        self.session = Some(Session {
            client,
            eventloop,
            pending: Vec::new(),
        });
        true
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn subscribe(&mut self, topic: &str) -> bool {
        let keep_alive = self.keep_alive;
        let Some(session) = self.session.as_mut() else {
            return false;
        };
        if let Err(e) = session.client.subscribe(topic, QoS::AtMostOnce).await {
            warn!("Failed to subscribe to {}: {}", topic, e);
            self.drop_session(BrokerStatus::ConnectionLost);
            return false;
        }

        let outcome = tokio::time::timeout(keep_alive, async {
            loop {
                match session.eventloop.poll().await {
                    Ok(Event::Incoming(Incoming::SubAck(_))) => return Ok(()),
                    Ok(Event::Incoming(Incoming::Publish(publish))) => session
                        .pending
                        .push(InboundMessage::new(publish.topic, publish.payload.to_vec())),
                    Ok(_) => continue,
                    Err(e) => return Err(e),
                }
            }
        })
        .await;

        match outcome {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                warn!("MQTT connection error while subscribing: {}", e);
                self.drop_session(BrokerStatus::ConnectionLost);
                false
            }
            Err(_) => {
                warn!("No SUBACK for {} within {:?}", topic, keep_alive);
                self.drop_session(BrokerStatus::ConnectionTimeout);
                false
            }
        }
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        let Some(session) = self.session.as_ref() else {
            return false;
        };
        match session
            .client
            .try_publish(topic, QoS::AtMostOnce, false, payload.to_vec())
        {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to publish {}: {}", topic, e);
                false
            }
        }
    }

    async fn service(&mut self) -> Vec<InboundMessage> {
        let Some(session) = self.session.as_mut() else {
            return Vec::new();
        };
        let mut messages = std::mem::take(&mut session.pending);

        for _ in 0..MAX_EVENTS_PER_SERVICE {
            let next = tokio::time::timeout(SERVICE_WINDOW, session.eventloop.poll());
            let Ok(event) = next.await else {
                break;
            };
            match event {
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    messages.push(InboundMessage::new(publish.topic, publish.payload.to_vec()));
                }
                Ok(Event::Incoming(Incoming::Disconnect)) => {
                    warn!("Broker closed the session");
                    self.drop_session(BrokerStatus::ConnectionLost);
                    break;
                }
                Ok(event) => debug!("MQTT event: {:?}", event),
                Err(e) => {
                    warn!("MQTT connection error: {}", e);
                    self.drop_session(BrokerStatus::ConnectionLost);
                    break;
                }
            }
        }
        messages
    }

    fn last_error_code(&self) -> i32 {
        self.status.code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_map_to_status_codes() {
        assert_eq!(refused_status(ConnectReturnCode::Success).code(), 0);
        let bad_login = refused_status(ConnectReturnCode::BadUserNamePassword);
        assert_eq!(bad_login.code(), 4);
        assert_eq!(refused_status(ConnectReturnCode::NotAuthorized).code(), 5);
        assert_eq!(
            error_status(&ConnectionError::ConnectionRefused(
                ConnectReturnCode::BadClientId
            ))
            .code(),
            2
        );
        assert_eq!(error_status(&ConnectionError::NetworkTimeout).code(), -4);
    }

    #[tokio::test]
    async fn idle_transport_is_disconnected() {
        let mut transport = RumqttTransport::new(Duration::from_secs(15));
        transport.set_endpoint("127.0.0.1", 1883);
        assert!(!transport.is_connected());
        assert!(!transport.publish("vmc_board/status", b"on"));
        assert!(transport.service().await.is_empty());
        assert_eq!(transport.last_error_code(), -1);
    }
}
