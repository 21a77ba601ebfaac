use rumqttc::{ClientError, OptionError};

use crate::settings::SettingsError;

/// Failures before the first successful `ConnAck`
#[derive(Debug, thiserror::Error)]
pub enum ConnectionEstablishmentError {
	/// The broker could not be reached
	#[error("Network connection failed: {0}")]
	Network(#[from] rumqttc::ConnectionError),

	/// The broker answered the connect with an error code
	#[error("Broker rejected connection: {code:?}")]
	BrokerRejected {
		/// Return code of the `ConnAck`
		code: rumqttc::ConnectReturnCode,
	},

	/// No `ConnAck` arrived in time
	#[error("Connection establishment timed out after {timeout_millis}ms")]
	Timeout {
		/// Configured connection timeout
		timeout_millis: u64,
	},
}

/// Errors that stop the bridge
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
	/// A request could not be handed to the MQTT event loop
	#[error("Client operation failed: {0}")]
	ClientOperation(#[from] ClientError),

	/// The broker URL could not be turned into connection options
	#[error("Configuration error: {0}")]
	Configuration(#[from] OptionError),

	/// Invalid configuration parameter values
	#[error("Invalid configuration value: {0}")]
	ConfigurationValue(String),

	/// Settings could not be resolved
	#[error("Settings error: {0}")]
	Settings(#[from] SettingsError),

	/// Connection establishment failed
	#[error("Failed to establish connection: {0}")]
	ConnectionEstablishment(#[from] ConnectionEstablishmentError),
}
