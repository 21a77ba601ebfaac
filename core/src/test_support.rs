//! Fixtures shared by the unit tests.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::config::ConfigurationProcessor;
use crate::gateway::MemoryGateway;
use crate::line::{LineSpec, SimulatedDriver, WatchEvent};
use crate::registry::SubscriptionRegistry;
use crate::router::MessageRouter;
use crate::topic::TopicScheme;

pub(crate) struct Harness {
	pub registry: SubscriptionRegistry,
	pub gateway: MemoryGateway,
	pub driver: SimulatedDriver,
	pub events: mpsc::Receiver<WatchEvent>,
	pub scheme: TopicScheme,
}

impl Harness {
	pub fn new() -> Self {
		Self::with_driver(SimulatedDriver::new())
	}

	pub fn with_driver(driver: SimulatedDriver) -> Self {
		let gateway = MemoryGateway::new();
		let (watch_tx, events) = mpsc::channel(64);
		let registry = SubscriptionRegistry::new(
			Arc::new(gateway.clone()),
			Arc::new(driver.clone()),
			watch_tx,
		);
		Self {
			registry,
			gateway,
			driver,
			events,
			scheme: TopicScheme::new("home"),
		}
	}

	/// Upsert `spec` with topics derived under the app topic.
	pub async fn upsert(&mut self, spec: LineSpec) {
		let topics = self.scheme.binding_topics(None, &spec.topic_name());
		self.registry.upsert(spec, topics).await;
	}

	/// Processor publishing through this harness' gateway.
	pub fn processor(&self) -> ConfigurationProcessor {
		ConfigurationProcessor::new(
			Arc::new(self.gateway.clone()),
			self.scheme.clone(),
		)
	}

	/// Router publishing through this harness' gateway.
	pub fn router(&self) -> MessageRouter {
		MessageRouter::new(Arc::new(self.gateway.clone()))
	}

	/// Pull every watch event delivered so far.
	pub fn drain_events(&mut self) -> Vec<WatchEvent> {
		let mut events = Vec::new();
		while let Ok(event) = self.events.try_recv() {
			events.push(event);
		}
		events
	}
}
