//! MQTT-controlled relay: one output pin, one indicator pin, a command topic
//! and a status topic.
//!
//! The connection-and-command logic lives in [`device`]; everything it talks
//! to (GPIO, network link, broker transport, update agent) sits behind the
//! traits in [`hal`], [`link`], [`mqtt`] and [`ota`].

pub mod config;
pub mod device;
pub mod hal;
pub mod link;
pub mod mqtt;
pub mod ota;

#[cfg(test)]
mod testing;
