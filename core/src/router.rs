//! Inbound message dispatch and outbound watch events

use std::sync::Arc;

use arcstr::ArcStr;
use tracing::{debug, warn};

use crate::gateway::BusGateway;
use crate::line::{Direction, LineValue, SharedLineHandle, WatchEvent};
use crate::registry::{Binding, SubscriptionRegistry};
use crate::report::{FailureReport, Operation, publish_failure, publish_value};


/// Turns bus messages into line operations and line events into bus
/// messages.
///
/// Reads and writes run on their own tasks so a slow line never stalls the
/// caller. The tasks of one binding are chained: each waits for the previous
/// one, so commands reach the line in arrival order.
#[derive(Clone)]
pub struct MessageRouter {
	gateway: Arc<dyn BusGateway>,
}

enum LineCommand {
	Read,
	Write(LineValue),
}

impl MessageRouter {
	/// Router publishing through `gateway`.
	pub fn new(gateway: Arc<dyn BusGateway>) -> Self {
		Self { gateway }
	}

	/// Dispatch a message received on `topic` to every binding subscribed to
	/// it. Returns the number of operations started.
	///
	/// `in`/`watch` bindings ignore the payload and read the line; `out`
	/// bindings write the coerced payload and acknowledge the written value.
	pub fn route(
		&self,
		registry: &mut SubscriptionRegistry,
		topic: &str,
		payload: &[u8],
	) -> usize {
		let lines = registry.find_lines(topic);
		if lines.is_empty() {
			debug!(topic = %topic, "No gpio bound to topic");
			return 0;
		}

		let mut started = 0;
		for line in lines {
			let Some(binding) = registry.get_mut(line) else {
				continue;
			};
			let command = match binding.direction() {
				| Direction::In | Direction::Watch => LineCommand::Read,
				| Direction::Out => {
					LineCommand::Write(LineValue::from_payload(payload))
				}
			};
			if self.spawn(binding, command) {
				started += 1;
			}
		}
		started
	}

	fn spawn(&self, binding: &mut Binding, command: LineCommand) -> bool {
		let Some(handle) = binding.handle().cloned() else {
			debug!(
				gpio = binding.line(),
				direction = %binding.direction(),
				"Gpio access unavailable, skipping operation"
			);
			return false;
		};

		let previous = binding.take_in_flight();
		let gateway = Arc::clone(&self.gateway);
		let publish = binding.topics().publish.clone();
		let error = binding.topics().error.clone();
		let task = tokio::spawn(async move {
			if let Some(previous) = previous {
				if let Err(err) = previous.await {
					warn!(gpio = handle.line(), error = %err, "Previous gpio operation task failed");
				}
			}
			run_command(&*gateway, handle, command, publish, error).await;
		});
		binding.track(task);
		true
	}

	/// Publish a watched line's change.
	///
	/// Events from a binding that has since been torn down, or that is no
	/// longer watching, are dropped. A value equal to the last one reported is
	/// suppressed.
	pub async fn on_watch_event(
		&self,
		registry: &mut SubscriptionRegistry,
		event: WatchEvent,
	) {
		let Some(binding) = registry.live_mut(event.key) else {
			debug!(binding = %event.key, "Dropping event from stale binding");
			return;
		};
		if !binding.is_watching() {
			debug!(binding = %event.key, "Dropping event from unwatched binding");
			return;
		}

		match event.result {
			| Ok(value) => {
				if !binding.observe(value) {
					debug!(gpio = binding.line(), value = value.label(), "Suppressing repeated value");
					return;
				}
				publish_value(
					&*self.gateway,
					&binding.topics().publish,
					binding.line(),
					value,
				)
				.await;
			}
			| Err(err) => {
				let report =
					FailureReport::new(binding.line(), Operation::Watch, &err);
				publish_failure(&*self.gateway, &binding.topics().error, report)
					.await;
			}
		}
	}
}

async fn run_command(
	gateway: &dyn BusGateway,
	handle: SharedLineHandle,
	command: LineCommand,
	publish: ArcStr,
	error: ArcStr,
) {
	let line = handle.line();
	let (operation, result) = match command {
		| LineCommand::Read => (Operation::Read, handle.read().await),
		| LineCommand::Write(value) => {
			debug!(gpio = line, value = value.label(), "Writing gpio");
			(Operation::Write, handle.write(value).await.map(|()| value))
		}
	};
	match result {
		| Ok(value) => publish_value(gateway, &publish, line, value).await,
		| Err(err) => {
			let report = FailureReport::new(line, operation, &err);
			publish_failure(gateway, &error, report).await;
		}
	}
}
