//! # MQTT GPIO bridge
//!
//! Connects the bridge core to an MQTT broker and to the host's GPIO lines.
//!
//! ```text
//! mqtt-gpio-bridge -c mqtt://localhost:1883 -t onoff -l 1
//! mosquitto_pub -t cmnd/onoff/configure \
//!     -m '{"pins":[{"gpio":17,"direction":"out","topic":"relay"}]}'
//! mosquitto_pub -t cmnd/onoff/relay -m on
//! ```

#![warn(missing_docs)]

/// Command-line arguments
pub mod cli;
pub mod client;
pub mod connection;
/// Tracing subscriber setup
pub mod logging;
pub mod settings;

use std::sync::Arc;

use mqtt_gpio_bridge_core::{LineDriver, SimulatedDriver, SysfsDriver};
use tracing::{info, warn};

pub use cli::Cli;
pub use client::{BridgeClient, BridgeError, ClientSettings, MqttClientConfig};
pub use connection::BridgeConnection;
pub use settings::{Settings, SettingsError};

/// Line driver for `settings`: simulated lines when asked for, sysfs
/// otherwise.
pub fn select_driver(settings: &Settings) -> Arc<dyn LineDriver> {
	if settings.simulate {
		info!("Using simulated gpio lines");
		return Arc::new(SimulatedDriver::new());
	}
	let driver = SysfsDriver::new();
	if !driver.is_accessible() {
		warn!("Gpio access unavailable on this host, lines will not be driven");
	}
	Arc::new(driver)
}

/// Run the bridge until SIGINT/SIGTERM or until the broker connection is
/// given up.
pub async fn run(settings: Settings) -> Result<(), BridgeError> {
	let config = MqttClientConfig::from_settings(&settings)?;
	let driver = select_driver(&settings);

	info!(url = %settings.url, topic = %settings.topic, "Connecting to MQTT broker");
	let mut connection = BridgeClient::connect(config, driver).await?;

	tokio::select! {
		_ = shutdown_signal() => info!("Shutting down"),
		_ = connection.terminated() => warn!("MQTT event loop stopped, shutting down"),
	}
	connection.shutdown().await
}

async fn shutdown_signal() {
	let ctrl_c = async {
		if let Err(err) = tokio::signal::ctrl_c().await {
			warn!(error = %err, "Failed to listen for ctrl-c");
			std::future::pending::<()>().await;
		}
	};

	#[cfg(unix)]
	let terminate = async {
		use tokio::signal::unix::{SignalKind, signal};
		match signal(SignalKind::terminate()) {
			| Ok(mut sigterm) => {
				sigterm.recv().await;
			}
			| Err(err) => {
				warn!(error = %err, "Failed to listen for SIGTERM");
				std::future::pending::<()>().await;
			}
		}
	};
	#[cfg(not(unix))]
	let terminate = std::future::pending::<()>();

	tokio::select! {
		_ = ctrl_c => {}
		_ = terminate => {}
	}
}
