use crate::line::{Direction, LineSpec, LineValue, SimOperation, SimulatedDriver};
use crate::report::FailureReport;
use crate::test_support::Harness;

#[tokio::test]
async fn test_upsert_out_line_subscribes_command_topic() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(17, Direction::Out).with_topic("relay"))
		.await;

	let binding = h.registry.get(17).unwrap();
	assert_eq!(binding.name(), "relay");
	assert_eq!(binding.topics().subscribe, "cmnd/home/relay");
	assert_eq!(binding.topics().publish, "tele/home/relay");
	assert_eq!(binding.topics().error, "tele/home/error/relay");
	assert!(binding.is_subscribed());
	assert!(!binding.is_watching());
	assert!(binding.handle().is_some());
	assert_eq!(h.gateway.subscribe_calls(), vec!["cmnd/home/relay"]);
	assert_eq!(h.driver.open_handles(17), 1);
	assert_eq!(h.registry.count(), 1);
}

#[tokio::test]
async fn test_upsert_watch_line_installs_watch() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(4, Direction::Watch)).await;

	let binding = h.registry.get(4).unwrap();
	assert!(binding.is_watching());
	assert!(binding.is_subscribed());
	assert_eq!(binding.topics().subscribe, "cmnd/home/watch/4");
	assert!(h.driver.is_watching(4));
	assert_eq!(h.driver.direction(4), Some(Direction::Watch));
}

#[tokio::test]
async fn test_upsert_in_line_has_no_watch() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(5, Direction::In)).await;

	let binding = h.registry.get(5).unwrap();
	assert!(!binding.is_watching());
	assert!(binding.is_subscribed());
	assert!(!h.driver.is_watching(5));
}

#[tokio::test]
async fn test_upsert_same_line_recycles_binding() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(17, Direction::Out).with_topic("relay"))
		.await;
	let first = h.registry.get(17).unwrap().key();

	h.upsert(LineSpec::new(17, Direction::Watch).with_topic("button"))
		.await;

	let binding = h.registry.get(17).unwrap();
	assert_ne!(binding.key(), first);
	assert!(!h.registry.is_live(first));
	assert!(h.registry.is_live(binding.key()));
	assert_eq!(binding.topics().subscribe, "cmnd/home/button");
	assert_eq!(binding.topics().publish, "tele/home/button");
	assert!(binding.is_watching());
	assert_eq!(h.registry.count(), 1);
	assert_eq!(h.gateway.unsubscribe_calls(), vec!["cmnd/home/relay"]);
	assert_eq!(
		h.gateway.subscriptions().into_iter().collect::<Vec<_>>(),
		vec!["cmnd/home/button"]
	);
	// old handle released before the new one was opened
	assert_eq!(h.driver.open_handles(17), 1);
	assert!(h.driver.is_watching(17));
	assert_eq!(h.registry.find("cmnd/home/relay").count(), 0);
	assert_eq!(h.registry.find("cmnd/home/button").count(), 1);
}

#[tokio::test]
async fn test_never_two_bindings_for_one_line() {
	let mut h = Harness::new();
	for direction in [Direction::Out, Direction::In, Direction::Watch, Direction::Out] {
		h.upsert(LineSpec::new(9, direction)).await;
		assert_eq!(h.registry.count(), 1);
		assert_eq!(h.driver.open_handles(9), 1);
		assert_eq!(h.registry.iter().filter(|b| b.line() == 9).count(), 1);
	}
}

#[tokio::test]
async fn test_clear_tears_everything_down() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(17, Direction::Out)).await;
	h.upsert(LineSpec::new(4, Direction::Watch)).await;
	h.upsert(LineSpec::new(5, Direction::In)).await;

	h.registry.clear().await;

	assert_eq!(h.registry.count(), 0);
	assert!(h.registry.is_empty());
	assert!(h.gateway.subscriptions().is_empty());
	for line in [17, 4, 5] {
		assert_eq!(h.driver.open_handles(line), 0);
		assert!(!h.driver.is_watching(line));
	}
	assert_eq!(h.gateway.unsubscribe_calls().len(), 3);

	// second clear is a no-op
	h.registry.clear().await;
	assert_eq!(h.gateway.unsubscribe_calls().len(), 3);
}

#[tokio::test]
async fn test_clear_on_empty_registry_is_noop() {
	let mut h = Harness::new();
	h.registry.clear().await;
	assert!(h.gateway.unsubscribe_calls().is_empty());
	assert!(!h.registry.remove(3).await);
}

#[tokio::test]
async fn test_shared_topic_unsubscribed_with_last_binding() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(1, Direction::Out).with_topic("lights"))
		.await;
	h.upsert(LineSpec::new(2, Direction::Out).with_topic("lights"))
		.await;

	assert_eq!(h.gateway.subscribe_calls(), vec!["cmnd/home/lights"]);
	assert_eq!(h.registry.find("cmnd/home/lights").count(), 2);

	assert!(h.registry.remove(1).await);
	assert!(h.gateway.unsubscribe_calls().is_empty());
	assert!(h.registry.get(2).unwrap().is_subscribed());

	assert!(h.registry.remove(2).await);
	assert_eq!(h.gateway.unsubscribe_calls(), vec!["cmnd/home/lights"]);
}

#[tokio::test]
async fn test_inaccessible_host_binds_without_handle() {
	let mut h = Harness::with_driver(SimulatedDriver::inaccessible());
	h.upsert(LineSpec::new(4, Direction::Watch)).await;

	let binding = h.registry.get(4).unwrap();
	assert!(binding.handle().is_none());
	assert!(binding.is_subscribed());
	assert!(!binding.is_watching());
	assert!(h.gateway.published().is_empty());
}

#[tokio::test]
async fn test_open_failure_publishes_configure_error() {
	let mut h = Harness::new();
	h.driver.fail_next(8, SimOperation::Open);
	h.upsert(LineSpec::new(8, Direction::Out)).await;

	let binding = h.registry.get(8).unwrap();
	assert!(binding.handle().is_none());
	assert!(binding.is_subscribed());

	let message = h.gateway.last_published_to("tele/home/error/out/8").unwrap();
	let report: FailureReport = serde_json::from_slice(&message.payload).unwrap();
	assert_eq!(report.gpio, 8);
	assert_eq!(report.description, "gpio 8 configure failed");
	assert!(report.error.contains("simulated"));
}

#[tokio::test]
async fn test_watch_failure_leaves_binding_unwatched() {
	let mut h = Harness::new();
	h.driver.fail_next(4, SimOperation::Watch);
	h.upsert(LineSpec::new(4, Direction::Watch)).await;

	let binding = h.registry.get(4).unwrap();
	assert!(!binding.is_watching());
	assert!(binding.handle().is_some());
	let published = h.gateway.published_to("tele/home/error/watch/4");
	assert_eq!(published.len(), 1);
	assert!(published[0].contains("gpio 4 watch failed"));
}

#[tokio::test]
async fn test_events_from_released_watch_are_not_delivered() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(4, Direction::Watch)).await;
	assert!(h.driver.emit(4, LineValue::High));
	h.registry.clear().await;
	assert!(!h.driver.emit(4, LineValue::Low));
	assert_eq!(h.drain_events().len(), 1);
}

#[tokio::test]
async fn test_resubscribe_all() {
	let mut h = Harness::new();
	h.upsert(LineSpec::new(1, Direction::Out)).await;
	h.upsert(LineSpec::new(2, Direction::In)).await;

	assert_eq!(h.registry.resubscribe_all().await, 2);
	assert_eq!(h.gateway.subscribe_calls().len(), 4);
}
