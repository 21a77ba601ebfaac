use std::sync::Arc;
use std::time::Duration;

use arcstr::ArcStr;
use bytes::Bytes;
use mqtt_gpio_bridge_core::{BridgeActor, BridgeHandler, BusGateway, LineDriver, PublishOptions};
use rumqttc::Packet::{self, Disconnect, Publish};
use rumqttc::{AsyncClient, ConnAck, ConnectReturnCode, EventLoop};
use rumqttc::{Event::Incoming, Event::Outgoing};
use tokio::time;
use tracing::{debug, error, info, warn};

use super::config::MqttClientConfig;
use super::error::{BridgeError, ConnectionEstablishmentError};
use super::gateway::MqttGateway;
use super::status::BridgeStatus;
use crate::connection::BridgeConnection;

/// Connects the bridge actor to an MQTT broker.
pub struct BridgeClient;

impl BridgeClient {
	/// Connect, start the bridge actor and announce `Online`.
	///
	/// Returns the connection handle; keep it for the session and call
	/// `shutdown()` when done.
	pub async fn connect(
		config: MqttClientConfig,
		driver: Arc<dyn LineDriver>,
	) -> Result<BridgeConnection, BridgeError> {
		if config.settings.event_loop_capacity == 0 {
			return Err(BridgeError::ConfigurationValue(
				"event_loop_capacity must be greater than 0".to_string(),
			));
		}
		let (client, new_event_loop) = AsyncClient::new(
			config.connection,
			config.settings.event_loop_capacity,
		);

		let timeout_millis = config.settings.connection_timeout_millis;
		let connection_timeout = Duration::from_millis(timeout_millis);
		let connected_event_loop = tokio::time::timeout(
			connection_timeout,
			Self::establish_connection(new_event_loop),
		)
		.await
		.map_err(|_| ConnectionEstablishmentError::Timeout { timeout_millis })??;
		info!("MQTT connected");

		let gateway = MqttGateway::new(client.clone(), config.settings.qos);
		let (controller, handler) = BridgeActor::spawn(
			Arc::new(gateway.clone()),
			driver,
			config.scheme.clone(),
			config.settings.bridge.clone(),
		);

		// The event loop terminates when it sees a Disconnect packet
		let handler_clone = handler.clone();
		let event_loop_handle = tokio::spawn(async move {
			Self::run(connected_event_loop, handler_clone).await;
		});

		let status_topic = config.scheme.status_topic();
		publish_status(&gateway, &status_topic, BridgeStatus::Online).await;

		Ok(BridgeConnection::new(
			client,
			gateway,
			status_topic,
			controller,
			event_loop_handle,
		))
	}

	async fn establish_connection(
		mut event_loop: EventLoop,
	) -> Result<EventLoop, ConnectionEstablishmentError> {
		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck { code, .. }))) => {
					if code == ConnectReturnCode::Success {
						debug!("MQTT connection established successfully");
						return Ok(event_loop);
					}
					debug!(code = ?code, "MQTT connection rejected by broker");
					return Err(ConnectionEstablishmentError::BrokerRejected {
						code,
					});
				}
				| Ok(notification) => {
					debug!(notification = ?notification, "Bootstrap phase notification");
				}
				| Err(connection_err) => {
					debug!(error = %connection_err, "MQTT connection error during bootstrap phase");
					return Err(ConnectionEstablishmentError::Network(
						connection_err,
					));
				}
			}
		}
	}

	/// Forward received messages to the bridge until a Disconnect packet is
	/// seen in either direction.
	async fn run(mut event_loop: EventLoop, bridge: BridgeHandler) {
		let mut error_count = 0;
		const MAX_CONSECUTIVE_ERRORS: u32 = 10;
		const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
		const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

		loop {
			match event_loop.poll().await {
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present: false,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					info!(
						"MQTT reconnected without session, resubscribing to \
						 all topics"
					);
					match bridge.resubscribe_all().await {
						| Ok(count) => debug!(topics = count, "Resubscribed"),
						| Err(err) => {
							error!(error = %err, "Failed to resubscribe to topics");
						}
					}
				}
				| Ok(Incoming(Packet::ConnAck(ConnAck {
					session_present: true,
					code: ConnectReturnCode::Success,
				}))) => {
					error_count = 0;
					info!(
						"MQTT reconnected with session preserved, \
						 subscriptions maintained by broker"
					);
				}
				| Ok(Incoming(Publish(p))) => {
					error_count = 0;
					debug!(topic = %p.topic, payload_size = p.payload.len(), "Received MQTT message");
					if let Err(err) = bridge
						.dispatch_incoming_message(p.topic, p.payload)
						.await
					{
						error!(error = %err, "Failed to hand message to the bridge");
					}
				}
				| Ok(Incoming(Disconnect)) => {
					info!("Received MQTT Disconnect packet from server");
					break;
				}
				| Ok(Outgoing(rumqttc::Outgoing::Disconnect)) => {
					info!("Sent MQTT Disconnect packet to server");
					break;
				}
				| Ok(notification) => {
					error_count = 0;
					debug!(notification = ?notification, "Received MQTT notification");
				}
				| Err(err) => {
					error_count += 1;
					error!(error_count = error_count, error = %err, "MQTT event loop error");

					if error_count >= MAX_CONSECUTIVE_ERRORS {
						error!(
							error_count = error_count,
							max_errors = MAX_CONSECUTIVE_ERRORS,
							"Too many consecutive errors, terminating event \
							 loop"
						);
						break;
					}

					let delay = INITIAL_RETRY_DELAY
						* 2_u32.pow((error_count - 1).min(10));
					let delay = delay.min(MAX_RETRY_DELAY);

					warn!(delay = ?delay, error_count = error_count, "Retrying MQTT connection");
					time::sleep(delay).await;
				}
			}
		}
		info!("MQTT event loop terminated");
	}
}

/// Publish `status` retained on `topic`. Failures are only logged.
pub(crate) async fn publish_status(
	gateway: &dyn BusGateway,
	topic: &ArcStr,
	status: BridgeStatus,
) {
	let payload = Bytes::from_static(status.as_str().as_bytes());
	match gateway
		.publish(topic, payload, PublishOptions::retained())
		.await
	{
		| Ok(()) => info!(topic = %topic, status = %status, "Published bridge status"),
		| Err(err) => {
			error!(topic = %topic, status = %status, error = %err, "Failed to publish bridge status");
		}
	}
}
