//! Bridge connection lifecycle

use arcstr::ArcStr;
use mqtt_gpio_bridge_core::BridgeController;
use rumqttc::AsyncClient;
use tokio::task::JoinHandle;
use tracing::{error, warn};

use crate::client::bridge_client::publish_status;
use crate::client::{BridgeStatus, MqttGateway};

/// Handle of a running bridge
///
/// Keep it alive for the session and call [`shutdown`](Self::shutdown)
/// before dropping it.
pub struct BridgeConnection {
	client: AsyncClient,
	gateway: MqttGateway,
	status_topic: ArcStr,
	bridge_controller: Option<BridgeController>,
	event_loop_handle: Option<JoinHandle<()>>,
}

impl BridgeConnection {
	pub(crate) fn new(
		client: AsyncClient,
		gateway: MqttGateway,
		status_topic: ArcStr,
		bridge_controller: BridgeController,
		event_loop_handle: JoinHandle<()>,
	) -> Self {
		Self {
			client,
			gateway,
			status_topic,
			bridge_controller: Some(bridge_controller),
			event_loop_handle: Some(event_loop_handle),
		}
	}

	/// Resolves when the event loop stops on its own (broker disconnect or
	/// too many errors). Pending forever once it has been awaited.
	pub async fn terminated(&mut self) {
		let Some(handle) = self.event_loop_handle.as_mut() else {
			return std::future::pending().await;
		};
		if let Err(e) = handle.await {
			warn!(error = %e, "Event loop task failed");
		}
		self.event_loop_handle = None;
	}

	/// Gracefully shut the bridge down by:
	/// 1. Stopping the bridge actor (every line is released, every topic
	///    unsubscribed)
	/// 2. Publishing `Offline` on the status topic
	/// 3. Sending the MQTT Disconnect packet and waiting for the event loop
	pub async fn shutdown(mut self) -> Result<(), crate::BridgeError> {
		if let Some(controller) = self.bridge_controller.take() {
			if let Err(e) = controller.shutdown().await {
				warn!(error = %e, "Failed to shut down bridge actor");
			}
		} else {
			warn!("No bridge controller available for shutdown");
		}

		publish_status(&self.gateway, &self.status_topic, BridgeStatus::Offline)
			.await;

		if let Err(e) = self.client.disconnect().await {
			warn!(error = %e, "Failed to disconnect MQTT client");
		}

		if let Some(handle) = self.event_loop_handle.take() {
			if let Err(e) = handle.await {
				warn!(error = %e, "Event loop task failed");
			}
		}

		Ok(())
	}
}

impl Drop for BridgeConnection {
	fn drop(&mut self) {
		if self.bridge_controller.is_some() || self.event_loop_handle.is_some()
		{
			error!(
				"BridgeConnection dropped without calling shutdown(). Please \
				 call shutdown() and await its completion before dropping."
			);
		}
	}
}
