use std::time::Duration;

use bytes::Bytes;
use mqtt_gpio_bridge_core::{BusGateway, GatewayError, PublishOptions};
use rumqttc::{AsyncClient, MqttOptions, QoS};

use super::MqttGateway;

#[tokio::test]
async fn test_publish_does_not_wait_for_a_stalled_event_loop() {
	let options = MqttOptions::new("gateway-test", "localhost", 1883);
	// The event loop is never polled, so the request queue never drains
	let (client, _event_loop) = AsyncClient::new(options, 1);
	let gateway = MqttGateway::new(client, QoS::AtLeastOnce);

	gateway
		.publish("tele/home/relay", Bytes::from("1"), PublishOptions::default())
		.await
		.unwrap();

	let second = tokio::time::timeout(
		Duration::from_millis(500),
		gateway.publish(
			"tele/home/relay",
			Bytes::from("0"),
			PublishOptions::default(),
		),
	)
	.await
	.expect("publish blocked on a full request queue");
	assert!(matches!(second, Err(GatewayError::Transport(_))));
}
