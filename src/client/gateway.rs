//! [`BusGateway`] over a `rumqttc` client

use async_trait::async_trait;
use bytes::Bytes;
use mqtt_gpio_bridge_core::{BusGateway, GatewayError, PublishOptions};
use rumqttc::{AsyncClient, ClientError, QoS};
use tracing::warn;

#[cfg(test)]
mod gateway_tests;

/// Publishes and subscribes through the MQTT event loop.
///
/// Publishes never wait for room in the request queue. The bridge actor
/// publishes while the event loop may be blocked handing it a message, so
/// a full queue drops the publish and reports it as a transport error.
#[derive(Clone, Debug)]
pub struct MqttGateway {
	client: AsyncClient,
	qos: QoS,
}

impl MqttGateway {
	/// Gateway using `qos` for every request.
	pub fn new(client: AsyncClient, qos: QoS) -> Self {
		Self { client, qos }
	}
}

fn transport_error(err: ClientError) -> GatewayError {
	GatewayError::Transport(err.to_string())
}

#[async_trait]
impl BusGateway for MqttGateway {
	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), GatewayError> {
		self.client
			.try_publish(topic, self.qos, options.retain, payload.to_vec())
			.inspect_err(|err| {
				warn!(topic = %topic, error = %err, "MQTT request queue full, dropping publish");
			})
			.map_err(transport_error)
	}

	async fn subscribe(&self, topic: &str) -> Result<(), GatewayError> {
		self.client
			.subscribe(topic, self.qos)
			.await
			.map_err(transport_error)
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), GatewayError> {
		self.client.unsubscribe(topic).await.map_err(transport_error)
	}
}
