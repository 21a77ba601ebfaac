//! Outbound line values and failure reports

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::gateway::{BusGateway, PublishOptions};
use crate::line::{HardwareError, LineId, LineValue};

/// Line operation named in a failure report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
	/// Opening and configuring the line
	Configure,
	/// Read-on-demand
	Read,
	/// Driven write
	Write,
	/// Change notifications
	Watch,
}

impl Operation {
	/// Lowercase name
	pub fn as_str(self) -> &'static str {
		match self {
			| Operation::Configure => "configure",
			| Operation::Read => "read",
			| Operation::Write => "write",
			| Operation::Watch => "watch",
		}
	}
}

impl fmt::Display for Operation {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Payload published on a binding's error topic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReport {
	/// Line that failed
	pub gpio: LineId,
	/// Operation that failed
	pub operation: Operation,
	/// Underlying failure
	pub error: String,
	/// e.g. `gpio 17 write failed`
	pub description: String,
}

impl FailureReport {
	/// Report for `operation` on `line` failing with `err`.
	pub fn new(line: LineId, operation: Operation, err: &HardwareError) -> Self {
		Self {
			gpio: line,
			operation,
			error: err.to_string(),
			description: format!("gpio {line} {operation} failed"),
		}
	}
}

/// Publish `value` as `"0"`/`"1"`. Failures are logged, never returned.
pub(crate) async fn publish_value(
	gateway: &dyn BusGateway,
	topic: &str,
	line: LineId,
	value: LineValue,
) {
	debug!(gpio = line, topic = %topic, value = value.label(), "Publishing gpio value");
	let payload = Bytes::from_static(value.as_payload().as_bytes());
	if let Err(err) = gateway
		.publish(topic, payload, PublishOptions::default())
		.await
	{
		error!(gpio = line, topic = %topic, error = %err, "Failed to publish gpio value");
	}
}

/// Publish a failure report. A failure to publish it is only logged.
pub(crate) async fn publish_failure(
	gateway: &dyn BusGateway,
	topic: &str,
	report: FailureReport,
) {
	error!(
		gpio = report.gpio,
		operation = %report.operation,
		error = %report.error,
		"Gpio operation failed"
	);
	let payload = match serde_json::to_vec(&report) {
		| Ok(payload) => Bytes::from(payload),
		| Err(err) => {
			error!(gpio = report.gpio, error = %err, "Failed to encode failure report");
			return;
		}
	};
	if let Err(err) = gateway
		.publish(topic, payload, PublishOptions::default())
		.await
	{
		error!(
			gpio = report.gpio,
			topic = %topic,
			error = %err,
			"Failed to publish failure report"
		);
	}
}
