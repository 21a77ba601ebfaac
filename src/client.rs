//! MQTT transport
//!
//! Connects to the broker with `rumqttc`, feeds received messages to the
//! bridge actor and exposes the client to the core as a
//! [`BusGateway`](mqtt_gpio_bridge_core::BusGateway).

/// Connection bootstrap and the event loop
pub mod bridge_client;
pub mod config;
/// Transport error types
pub mod error;
pub mod gateway;
pub mod status;

pub use bridge_client::BridgeClient;
pub use config::{ClientSettings, MqttClientConfig};
pub use error::{BridgeError, ConnectionEstablishmentError};
pub use gateway::MqttGateway;
pub use status::BridgeStatus;
