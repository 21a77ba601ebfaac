//! Bus gateway capability
//!
//! The core publishes and subscribes through [`BusGateway`]; it never talks to
//! a broker directly. The application crate implements it over MQTT,
//! [`MemoryGateway`] records traffic in memory.

/// In-memory gateway for tests and examples
pub mod memory;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub use memory::{MemoryGateway, Published};

/// Delivery options for one publish.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishOptions {
	/// Ask the broker to keep the message for late subscribers
	pub retain: bool,
}

impl PublishOptions {
	/// Options for a retained message
	pub const fn retained() -> Self {
		Self { retain: true }
	}
}

/// Errors reported by a gateway
#[derive(Debug, Error)]
pub enum GatewayError {
	/// The connection behind the gateway is gone
	#[error("Bus gateway is closed")]
	Closed,

	/// The transport refused the request
	#[error("Bus request failed: {0}")]
	Transport(String),
}

/// Publish/subscribe transport as seen by the core.
#[async_trait]
pub trait BusGateway: Send + Sync {
	/// Publish `payload` on `topic`.
	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), GatewayError>;

	/// Start receiving messages on `topic`.
	async fn subscribe(&self, topic: &str) -> Result<(), GatewayError>;

	/// Stop receiving messages on `topic`.
	async fn unsubscribe(&self, topic: &str) -> Result<(), GatewayError>;
}
