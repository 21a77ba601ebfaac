//! Bridge availability published on the status topic

use std::fmt;

use rumqttc::{LastWill, QoS};

/// Availability of the bridge, retained on `tele/<app>/status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
	/// Connected and accepting configurations
	Online,
	/// Disconnected, published by the broker as the last will
	Offline,
}

impl BridgeStatus {
	/// Payload text
	pub fn as_str(self) -> &'static str {
		match self {
			| BridgeStatus::Online => "Online",
			| BridgeStatus::Offline => "Offline",
		}
	}

	/// Retained last will publishing this status on `topic`.
	pub fn last_will(self, topic: impl Into<String>, qos: QoS) -> LastWill {
		LastWill::new(topic, self.as_str(), qos, true)
	}
}

impl fmt::Display for BridgeStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}
