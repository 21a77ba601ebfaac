//! # MQTT GPIO bridge core
//!
//! Maps hardware lines to MQTT topics. A JSON configuration received on the
//! bus declares which lines to expose and how; the bridge keeps one binding
//! per line, writes `out` lines when commands arrive, reads `in` lines on
//! demand and publishes changes of `watch` lines.
//!
//! ## Features
//!
//! - **Runtime reconfiguration**: a new configuration tears down the previous
//!   bindings (subscriptions, watches, hardware handles) before installing
//!   its own
//! - **Single writer**: one actor task owns the registry; inbound messages
//!   and line events reach it over channels
//! - **Pluggable edges**: the bus ([`BusGateway`]) and the hardware
//!   ([`LineDriver`]) are traits, with in-memory implementations for tests
//!   and hosts without GPIO
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use mqtt_gpio_bridge_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = MemoryGateway::new();
//!     let driver = SimulatedDriver::new();
//!     let (controller, handler) = BridgeActor::spawn(
//!         Arc::new(gateway.clone()),
//!         Arc::new(driver.clone()),
//!         TopicScheme::new("onoff"),
//!         BridgeSettings::default(),
//!     );
//!
//!     let config = r#"{ "pins": [{ "gpio": 17, "direction": "out", "topic": "relay" }] }"#;
//!     handler
//!         .dispatch_incoming_message("cmnd/onoff/configure".into(), Bytes::from(config))
//!         .await?;
//!     handler
//!         .dispatch_incoming_message("cmnd/onoff/relay".into(), Bytes::from("on"))
//!         .await?;
//!     handler.settle().await?;
//!
//!     assert_eq!(gateway.published_to("tele/onoff/relay"), vec!["1"]);
//!     controller.shutdown().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Topics
//!
//! See [`topic`] for the full naming scheme. With application topic `onoff`
//! and a binding named `relay`, commands arrive on `cmnd/onoff/relay`, values
//! are published on `tele/onoff/relay` and failures on
//! `tele/onoff/error/relay`.

#![warn(missing_docs)]

pub mod bridge;
pub mod config;
pub mod gateway;
pub mod line;
pub mod registry;
/// Outbound value and failure payloads
pub mod report;
pub mod router;
pub mod topic;

#[cfg(test)]
mod test_support;

// === Core Public API ===
pub use bridge::{
	BridgeActor, BridgeController, BridgeHandler, BridgeSettings, CommandError,
};
pub use config::{
	BridgeConfig, ConfigError, ConfigRequest, ConfigurationProcessor,
	ProcessorState,
};
pub use gateway::{BusGateway, GatewayError, MemoryGateway, PublishOptions};
pub use line::{
	Direction, Edge, HardwareError, LineDriver, LineHandle, LineId,
	LineOptions, LineSpec, LineValue, SimulatedDriver, SysfsDriver,
};
pub use registry::{Binding, BindingKey, SubscriptionRegistry};
pub use report::{FailureReport, Operation};
pub use router::MessageRouter;
pub use topic::{BindingTopics, TopicError, TopicScheme};

/// Prelude module for convenient imports
///
/// ```rust
/// use mqtt_gpio_bridge_core::prelude::*;
/// ```
pub mod prelude {
	pub use crate::{
		BridgeActor, BridgeController, BridgeHandler, BridgeSettings,
		BusGateway, Direction, GatewayError, LineDriver, LineSpec, LineValue,
		MemoryGateway, PublishOptions, SimulatedDriver, SysfsDriver,
		TopicScheme,
	};
}
