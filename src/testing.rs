//! Scripted collaborators for unit tests.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

use crate::config::MqttConfig;
use crate::link::{LinkCredentials, LinkError, NetworkLink};
use crate::mqtt::{BrokerStatus, BrokerTransport, InboundMessage};
use crate::ota::{UpdateAgent, UpdateEvent};

pub fn mqtt_config() -> MqttConfig {
    MqttConfig {
        broker_host: "broker.local".into(),
        broker_port: 1883,
        username: Some("relay".into()),
        password: Some("hunter2".into()),
        client_id_prefix: "relay-mqtt".into(),
        keep_alive: Duration::from_secs(15),
    }
}

#[derive(Debug, Default)]
pub struct LinkState {
    pub up: bool,
    pub fail_connect: bool,
    pub connects: usize,
    pub hostname: Option<String>,
}

pub struct FakeLink {
    state: Rc<RefCell<LinkState>>,
}

impl FakeLink {
    pub fn up() -> Self {
        Self {
            state: Rc::new(RefCell::new(LinkState {
                up: true,
                ..LinkState::default()
            })),
        }
    }

    pub fn failing() -> Self {
        Self {
            state: Rc::new(RefCell::new(LinkState {
                fail_connect: true,
                ..LinkState::default()
            })),
        }
    }

    pub fn state(&self) -> Rc<RefCell<LinkState>> {
        Rc::clone(&self.state)
    }
}

impl NetworkLink for FakeLink {
    async fn connect(&mut self, credentials: &LinkCredentials) -> Result<(), LinkError> {
        let mut state = self.state.borrow_mut();
        state.connects += 1;
        if state.fail_connect {
            return Err(LinkError::Timeout {
                interface: "wlan0".into(),
                ssid: credentials.ssid.clone(),
                timeout_secs: 20,
            });
        }
        state.up = true;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.state.borrow().up
    }

    fn set_hostname(&mut self, name: &str) {
        self.state.borrow_mut().hostname = Some(name.to_string());
    }
}

#[derive(Debug)]
pub struct TransportScript {
    pub endpoint: Option<(String, u16)>,
    pub credentials: Option<(String, String)>,
    /// Results handed out by successive `connect` calls; empty means refuse.
    pub connect_results: VecDeque<bool>,
    pub subscribe_ok: bool,
    pub connected: bool,
    pub client_ids: Vec<String>,
    pub subscriptions: Vec<String>,
    pub published: Vec<(String, String)>,
    pub inbox: VecDeque<InboundMessage>,
    pub error_code: i32,
}

impl Default for TransportScript {
    fn default() -> Self {
        Self {
            endpoint: None,
            credentials: None,
            connect_results: VecDeque::new(),
            subscribe_ok: true,
            connected: false,
            client_ids: Vec::new(),
            subscriptions: Vec::new(),
            published: Vec::new(),
            inbox: VecDeque::new(),
            error_code: BrokerStatus::Disconnected.code(),
        }
    }
}

#[derive(Default)]
pub struct FakeTransport {
    script: Rc<RefCell<TransportScript>>,
}

impl FakeTransport {
    pub fn script(&self) -> Rc<RefCell<TransportScript>> {
        Rc::clone(&self.script)
    }
}

impl BrokerTransport for FakeTransport {
    fn set_endpoint(&mut self, host: &str, port: u16) {
        self.script.borrow_mut().endpoint = Some((host.to_string(), port));
    }

    fn set_credentials(&mut self, username: &str, password: &str) {
        self.script.borrow_mut().credentials = Some((username.to_string(), password.to_string()));
    }

    async fn connect(&mut self, client_id: &str) -> bool {
        let mut script = self.script.borrow_mut();
        script.client_ids.push(client_id.to_string());
        let ok = script.connect_results.pop_front().unwrap_or(false);
        script.connected = ok;
        script.error_code = if ok {
            BrokerStatus::Connected.code()
        } else {
            BrokerStatus::ConnectFailed.code()
        };
        ok
    }

    fn is_connected(&self) -> bool {
        self.script.borrow().connected
    }

    async fn subscribe(&mut self, topic: &str) -> bool {
        let mut script = self.script.borrow_mut();
        if script.subscribe_ok {
            script.subscriptions.push(topic.to_string());
        }
        script.subscribe_ok
    }

    fn publish(&mut self, topic: &str, payload: &[u8]) -> bool {
        self.script.borrow_mut().published.push((
            topic.to_string(),
            String::from_utf8_lossy(payload).into_owned(),
        ));
        true
    }

    async fn service(&mut self) -> Vec<InboundMessage> {
        self.script.borrow_mut().inbox.drain(..).collect()
    }

    fn last_error_code(&self) -> i32 {
        self.script.borrow().error_code
    }
}

#[derive(Default)]
pub struct FakeAgent {
    events: Rc<RefCell<VecDeque<UpdateEvent>>>,
    pub begun: bool,
}

impl FakeAgent {
    pub fn events(&self) -> Rc<RefCell<VecDeque<UpdateEvent>>> {
        Rc::clone(&self.events)
    }
}

impl UpdateAgent for FakeAgent {
    fn begin(&mut self) {
        self.begun = true;
    }

    fn service(&mut self) -> Option<UpdateEvent> {
        self.events.borrow_mut().pop_front()
    }
}
