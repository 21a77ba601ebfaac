//! Registry of live bindings, indexed by line and by subscribe topic

use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use arcstr::ArcStr;
use smallvec::SmallVec;
use tracing::{debug, error, info, warn};

use super::binding::{Binding, BindingKey};
use crate::gateway::BusGateway;
use crate::line::{
	Direction, LineDriver, LineId, LineSpec, SharedLineHandle, WatchSender,
};
use crate::report::{FailureReport, Operation, publish_failure};
use crate::topic::BindingTopics;

type LineList = SmallVec<[LineId; 1]>;

/// Keyed store of active bindings, at most one per physical line.
///
/// Lines are the primary key; a secondary index maps each subscribe topic to
/// the lines bound to it. Reconfiguring a line always recycles it: the old
/// binding is fully torn down (unsubscribed, unwatched, drained, released)
/// before the new one opens the line again, so applying the same
/// configuration twice converges to the same state.
pub struct SubscriptionRegistry {
	bindings: BTreeMap<LineId, Binding>,
	topic_index: HashMap<ArcStr, LineList>,
	gateway: Arc<dyn BusGateway>,
	driver: Arc<dyn LineDriver>,
	watch_tx: WatchSender,
	next_generation: u64,
}

impl SubscriptionRegistry {
	/// Empty registry. Watched lines deliver their events to `watch_tx`.
	pub fn new(
		gateway: Arc<dyn BusGateway>,
		driver: Arc<dyn LineDriver>,
		watch_tx: WatchSender,
	) -> Self {
		Self {
			bindings: BTreeMap::new(),
			topic_index: HashMap::new(),
			gateway,
			driver,
			watch_tx,
			next_generation: 0,
		}
	}

	/// Number of bindings
	pub fn count(&self) -> usize {
		self.bindings.len()
	}

	/// Whether no line is bound
	pub fn is_empty(&self) -> bool {
		self.bindings.is_empty()
	}

	/// Binding of `line`
	pub fn get(&self, line: LineId) -> Option<&Binding> {
		self.bindings.get(&line)
	}

	pub(crate) fn get_mut(&mut self, line: LineId) -> Option<&mut Binding> {
		self.bindings.get_mut(&line)
	}

	/// Binding identified by `key`, if that incarnation still exists.
	pub(crate) fn live_mut(&mut self, key: BindingKey) -> Option<&mut Binding> {
		self.bindings
			.get_mut(&key.line())
			.filter(|binding| binding.key == key)
	}

	/// Whether the incarnation `key` is still installed
	pub fn is_live(&self, key: BindingKey) -> bool {
		self.bindings
			.get(&key.line())
			.is_some_and(|binding| binding.key == key)
	}

	/// All bindings ordered by line
	pub fn iter(&self) -> impl Iterator<Item = &Binding> {
		self.bindings.values()
	}

	/// Bindings whose subscribe topic is `topic`
	pub fn find<'a>(
		&'a self,
		topic: &str,
	) -> impl Iterator<Item = &'a Binding> + 'a {
		self.find_lines(topic)
			.into_iter()
			.filter_map(|line| self.bindings.get(&line))
	}

	/// Lines whose subscribe topic is `topic`
	pub fn find_lines(&self, topic: &str) -> LineList {
		self.topic_index.get(topic).cloned().unwrap_or_default()
	}

	/// Install a binding for `spec`, tearing down any previous binding of
	/// the same line first.
	///
	/// Subscribes to the binding's subscribe topic and, for `watch` lines,
	/// installs the change watch. Hardware failures are published to the
	/// binding's error topic and leave the binding in place without the
	/// failed capability.
	pub async fn upsert(
		&mut self,
		spec: LineSpec,
		topics: BindingTopics,
	) -> &Binding {
		let line = spec.line;
		if self.remove(line).await {
			debug!(gpio = line, "Recycled previous binding");
		}

		self.next_generation = self.next_generation.wrapping_add(1);
		let key = BindingKey::new(line, self.next_generation);
		let handle = self.open_handle(&spec, &topics).await;
		let mut binding = Binding::new(key, &spec, topics, handle);

		self.subscribe(&mut binding).await;
		if spec.direction == Direction::Watch {
			self.watch(&mut binding).await;
		}

		match self.bindings.entry(line) {
			| Entry::Vacant(slot) => slot.insert(binding),
			| Entry::Occupied(slot) => {
				let slot = slot.into_mut();
				*slot = binding;
				slot
			}
		}
	}

	/// Tear down the binding of `line`. Returns whether one existed.
	pub async fn remove(&mut self, line: LineId) -> bool {
		let Some(binding) = self.bindings.remove(&line) else {
			return false;
		};
		self.teardown(binding).await;
		true
	}

	/// Tear down every binding. No-op on an empty registry.
	pub async fn clear(&mut self) {
		if self.bindings.is_empty() {
			return;
		}
		info!(count = self.bindings.len(), "Clearing previous gpio configurations");
		let lines: Vec<LineId> = self.bindings.keys().copied().collect();
		for line in lines {
			self.remove(line).await;
		}
	}

	/// Wait until every queued read and write has completed.
	pub async fn settle(&mut self) {
		for binding in self.bindings.values_mut() {
			binding.settle().await;
		}
	}

	/// Subscribe again to every subscribed topic, after the broker lost the
	/// session. Returns the number of topics re-subscribed.
	pub async fn resubscribe_all(&self) -> usize {
		let mut count = 0;
		for (topic, lines) in &self.topic_index {
			let subscribed = lines.iter().any(|line| {
				self.bindings.get(line).is_some_and(Binding::is_subscribed)
			});
			if !subscribed {
				continue;
			}
			match self.gateway.subscribe(topic).await {
				| Ok(()) => count += 1,
				| Err(err) => {
					error!(topic = %topic, error = %err, "Failed to resubscribe");
				}
			}
		}
		count
	}

	async fn open_handle(
		&self,
		spec: &LineSpec,
		topics: &BindingTopics,
	) -> Option<SharedLineHandle> {
		if !self.driver.is_accessible() {
			debug!(gpio = spec.line, "Gpio access unavailable, binding without hardware");
			return None;
		}
		match self.driver.open(spec).await {
			| Ok(handle) => Some(handle),
			| Err(err) => {
				let report =
					FailureReport::new(spec.line, Operation::Configure, &err);
				publish_failure(&*self.gateway, &topics.error, report).await;
				None
			}
		}
	}

	async fn subscribe(&mut self, binding: &mut Binding) {
		let topic = binding.topics.subscribe.clone();
		let lines = self.topic_index.entry(topic.clone()).or_default();
		let already_subscribed = lines.iter().any(|line| {
			self.bindings.get(line).is_some_and(Binding::is_subscribed)
		});
		lines.push(binding.line());

		if already_subscribed {
			binding.subscribed = true;
		} else {
			match self.gateway.subscribe(&topic).await {
				| Ok(()) => binding.subscribed = true,
				| Err(err) => {
					error!(gpio = binding.line(), topic = %topic, error = %err, "Failed to subscribe");
				}
			}
		}
		if binding.subscribed && binding.direction == Direction::Out {
			info!(gpio = binding.line(), topic = %topic, "Ready to write to gpio");
		}
	}

	async fn watch(&self, binding: &mut Binding) {
		let Some(handle) = binding.handle.clone() else {
			return;
		};
		match handle.watch(binding.key, self.watch_tx.clone()) {
			| Ok(()) => {
				binding.watching = true;
				info!(
					gpio = binding.line(),
					topic = %binding.topics.publish,
					edge = %binding.edge,
					"Watching gpio"
				);
			}
			| Err(err) => {
				let report =
					FailureReport::new(binding.line(), Operation::Watch, &err);
				publish_failure(&*self.gateway, &binding.topics.error, report)
					.await;
			}
		}
	}

	async fn teardown(&mut self, mut binding: Binding) {
		let topic = binding.topics.subscribe.clone();
		let topic_now_empty = match self.topic_index.get_mut(&topic) {
			| Some(lines) => {
				lines.retain(|line| *line != binding.line());
				lines.is_empty()
			}
			| None => true,
		};
		if topic_now_empty {
			self.topic_index.remove(&topic);
		}

		if binding.subscribed {
			if topic_now_empty {
				if let Err(err) = self.gateway.unsubscribe(&topic).await {
					error!(topic = %topic, error = %err, "Failed to unsubscribe");
				}
			}
			binding.subscribed = false;
		}

		if binding.watching {
			if let Some(handle) = &binding.handle {
				handle.unwatch();
			}
			binding.watching = false;
		}

		binding.settle().await;

		if let Some(handle) = binding.handle.take() {
			if let Err(err) = handle.release().await {
				warn!(binding = %binding.key, error = %err, "Failed to release gpio");
			}
		}
		debug!(binding = %binding.key, "Binding torn down");
	}
}
