//! Configuration for MQTT client initialization

use std::time::Duration;

use mqtt_gpio_bridge_core::{BridgeSettings, TopicScheme};
use rumqttc::{MqttOptions, OptionError, QoS};
use uuid::Uuid;

use super::status::BridgeStatus;
use crate::settings::Settings;


const CLIENT_ID_PREFIX: &str = "mqtt-gpio-bridge";

/// Client-level performance and behavior settings
#[derive(Debug, Clone)]
pub struct ClientSettings {
	/// Capacity of the event loop request channel
	pub event_loop_capacity: usize,
	/// How long to wait for the first `ConnAck`
	pub connection_timeout_millis: u64,
	/// Keep-alive interval sent to the broker
	pub keep_alive: Duration,
	/// QoS of subscriptions and publishes
	pub qos: QoS,
	/// Channel sizes of the bridge actor
	pub bridge: BridgeSettings,
}

impl Default for ClientSettings {
	fn default() -> Self {
		Self {
			event_loop_capacity: 100,
			connection_timeout_millis: 5000,
			keep_alive: Duration::from_secs(10),
			qos: QoS::AtLeastOnce,
			bridge: BridgeSettings::default(),
		}
	}
}

/// Everything needed to connect the bridge
#[derive(Debug, Clone)]
pub struct MqttClientConfig {
	/// Underlying MQTT connection options (from rumqttc)
	pub connection: MqttOptions,
	/// Client-level performance and behavior settings
	pub settings: ClientSettings,
	/// Topic naming of this bridge instance
	pub scheme: TopicScheme,
}

impl MqttClientConfig {
	/// Parse configuration from an MQTT URL.
	///
	/// Supports: tcp://, mqtt://, ssl://, mqtts://, ws://, wss://. A random
	/// `client_id` is added unless the URL carries one.
	pub fn from_url(url: &str, scheme: TopicScheme) -> Result<Self, OptionError> {
		let settings = ClientSettings::default();
		let mut connection = MqttOptions::parse_url(with_client_id(url))?;
		connection.set_keep_alive(settings.keep_alive);
		Ok(Self {
			connection,
			settings,
			scheme,
		})
	}

	/// Configuration for resolved `settings`: credentials and the
	/// `Offline` last will are set.
	pub fn from_settings(settings: &Settings) -> Result<Self, OptionError> {
		let mut config =
			Self::from_url(&settings.url, TopicScheme::new(settings.topic.as_str()))?;
		if let Some(username) = &settings.username {
			let password = settings.password.clone().unwrap_or_default();
			config.connection.set_credentials(username, password);
		}
		config.with_status_last_will();
		Ok(config)
	}

	/// Have the broker publish a retained `Offline` when the connection is
	/// lost.
	pub fn with_status_last_will(&mut self) -> &mut Self {
		let will = BridgeStatus::Offline
			.last_will(self.scheme.status_topic().as_str(), self.settings.qos);
		self.connection.set_last_will(will);
		self
	}
}

/// Append a generated `client_id` to `url` unless it already has one.
pub fn with_client_id(url: &str) -> String {
	if url.contains("client_id=") {
		return url.to_string();
	}
	let uuid = Uuid::new_v4().to_string();
	let client_id = format!("{CLIENT_ID_PREFIX}_{}", &uuid[.. 8]);
	if url.contains('?') {
		format!("{url}&client_id={client_id}")
	} else {
		format!("{url}?client_id={client_id}")
	}
}
