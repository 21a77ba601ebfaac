use std::fmt;

use arcstr::ArcStr;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::line::{Direction, Edge, LineId, LineSpec, LineValue, SharedLineHandle};
use crate::topic::BindingTopics;

/// Identifies one incarnation of a binding.
///
/// Reconfiguring a line creates a new generation, so events produced for a
/// torn-down binding can be recognised and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BindingKey {
	line: LineId,
	generation: u64,
}

impl BindingKey {
	/// Key for `generation` of `line`.
	pub fn new(line: LineId, generation: u64) -> Self {
		Self { line, generation }
	}

	/// Physical line
	pub fn line(self) -> LineId {
		self.line
	}

	/// Incarnation counter
	pub fn generation(self) -> u64 {
		self.generation
	}
}

impl fmt::Display for BindingKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "gpio{}#{}", self.line, self.generation)
	}
}

/// Runtime association of a line with its topics and direction.
#[derive(Debug)]
pub struct Binding {
	pub(super) key: BindingKey,
	pub(super) name: ArcStr,
	pub(super) topics: BindingTopics,
	pub(super) direction: Direction,
	pub(super) edge: Edge,
	pub(super) handle: Option<SharedLineHandle>,
	pub(super) last_value: Option<LineValue>,
	pub(super) subscribed: bool,
	pub(super) watching: bool,
	/// Latest read/write task. Each task awaits its predecessor, so
	/// awaiting this one drains the whole chain.
	pub(super) in_flight: Option<JoinHandle<()>>,
}

impl Binding {
	pub(super) fn new(
		key: BindingKey,
		spec: &LineSpec,
		topics: BindingTopics,
		handle: Option<SharedLineHandle>,
	) -> Self {
		Self {
			key,
			name: ArcStr::from(spec.topic_name()),
			topics,
			direction: spec.direction,
			edge: spec.effective_edge(),
			handle,
			last_value: None,
			subscribed: false,
			watching: false,
			in_flight: None,
		}
	}

	/// Incarnation key
	pub fn key(&self) -> BindingKey {
		self.key
	}

	/// Physical line
	pub fn line(&self) -> LineId {
		self.key.line
	}

	/// Logical topic name
	pub fn name(&self) -> &ArcStr {
		&self.name
	}

	/// Derived topics
	pub fn topics(&self) -> &BindingTopics {
		&self.topics
	}

	/// Exposure mode
	pub fn direction(&self) -> Direction {
		self.direction
	}

	/// Edge the line was configured with
	pub fn edge(&self) -> Edge {
		self.edge
	}

	/// Hardware handle, absent when the host has no GPIO access or the
	/// line could not be opened
	pub fn handle(&self) -> Option<&SharedLineHandle> {
		self.handle.as_ref()
	}

	/// Last value reported by the watch
	pub fn last_value(&self) -> Option<LineValue> {
		self.last_value
	}

	/// Whether the subscribe topic is subscribed on the bus
	pub fn is_subscribed(&self) -> bool {
		self.subscribed
	}

	/// Whether the handle has an active watch
	pub fn is_watching(&self) -> bool {
		self.watching
	}

	/// Record a watched value. Returns `false` when it repeats the last one.
	pub(crate) fn observe(&mut self, value: LineValue) -> bool {
		if self.last_value == Some(value) {
			return false;
		}
		self.last_value = Some(value);
		true
	}

	/// Hand over the current in-flight task so a new one can await it.
	pub(crate) fn take_in_flight(&mut self) -> Option<JoinHandle<()>> {
		self.in_flight.take()
	}

	/// Track the newest read/write task.
	pub(crate) fn track(&mut self, task: JoinHandle<()>) {
		self.in_flight = Some(task);
	}

	/// Wait for every queued read/write to finish.
	pub async fn settle(&mut self) {
		if let Some(task) = self.in_flight.take() {
			if let Err(err) = task.await {
				warn!(binding = %self.key, error = %err, "Gpio operation task failed");
			}
		}
	}
}
