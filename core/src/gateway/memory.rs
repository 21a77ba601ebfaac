use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bytes::Bytes;

use super::{BusGateway, GatewayError, PublishOptions};

/// One recorded publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
	/// Destination topic
	pub topic: String,
	/// Raw payload
	pub payload: Bytes,
	/// Retain flag
	pub retain: bool,
}

impl Published {
	/// Payload as text (lossy)
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.payload).into_owned()
	}
}

#[derive(Debug, Default)]
struct MemoryState {
	published: Vec<Published>,
	subscriptions: BTreeSet<String>,
	subscribe_calls: Vec<String>,
	unsubscribe_calls: Vec<String>,
	fail_publish: bool,
}

/// Gateway that keeps everything in memory. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MemoryGateway {
	state: Arc<Mutex<MemoryState>>,
}

impl MemoryGateway {
	/// Empty gateway.
	pub fn new() -> Self {
		Self::default()
	}

	fn state(&self) -> MutexGuard<'_, MemoryState> {
		self.state.lock().unwrap_or_else(PoisonError::into_inner)
	}

	/// Make every publish fail until switched back.
	pub fn set_fail_publish(&self, fail: bool) {
		self.state().fail_publish = fail;
	}

	/// All publishes, oldest first.
	pub fn published(&self) -> Vec<Published> {
		self.state().published.clone()
	}

	/// Text payloads published on `topic`, oldest first.
	pub fn published_to(&self, topic: &str) -> Vec<String> {
		self.state()
			.published
			.iter()
			.filter(|message| message.topic == topic)
			.map(Published::text)
			.collect()
	}

	/// Most recent publish on `topic`.
	pub fn last_published_to(&self, topic: &str) -> Option<Published> {
		self.state()
			.published
			.iter()
			.rev()
			.find(|message| message.topic == topic)
			.cloned()
	}

	/// Forget recorded publishes.
	pub fn clear_published(&self) {
		self.state().published.clear();
	}

	/// Topics currently subscribed.
	pub fn subscriptions(&self) -> BTreeSet<String> {
		self.state().subscriptions.clone()
	}

	/// Every subscribe request, oldest first.
	pub fn subscribe_calls(&self) -> Vec<String> {
		self.state().subscribe_calls.clone()
	}

	/// Every unsubscribe request, oldest first.
	pub fn unsubscribe_calls(&self) -> Vec<String> {
		self.state().unsubscribe_calls.clone()
	}
}

#[async_trait]
impl BusGateway for MemoryGateway {
	async fn publish(
		&self,
		topic: &str,
		payload: Bytes,
		options: PublishOptions,
	) -> Result<(), GatewayError> {
		let mut state = self.state();
		if state.fail_publish {
			return Err(GatewayError::Transport(format!(
				"publish to {topic} refused"
			)));
		}
		state.published.push(Published {
			topic: topic.to_string(),
			payload,
			retain: options.retain,
		});
		Ok(())
	}

	async fn subscribe(&self, topic: &str) -> Result<(), GatewayError> {
		let mut state = self.state();
		state.subscribe_calls.push(topic.to_string());
		state.subscriptions.insert(topic.to_string());
		Ok(())
	}

	async fn unsubscribe(&self, topic: &str) -> Result<(), GatewayError> {
		let mut state = self.state();
		state.unsubscribe_calls.push(topic.to_string());
		state.subscriptions.remove(topic);
		Ok(())
	}
}
