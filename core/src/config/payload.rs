use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ConfigError;
use crate::line::{Direction, Edge, LineSpec};
use crate::topic::{TopicScheme, validate_topic};

/// Full configuration: every line the bridge should expose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeConfig {
	/// Replaces the app topic in binding topics
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic_prefix: Option<String>,
	/// Lines, applied in order
	pub pins: Vec<LineSpec>,
}

impl BridgeConfig {
	/// Check the whole configuration. Nothing is applied if this fails.
	pub fn validate(&self) -> Result<(), ConfigError> {
		if let Some(prefix) = &self.topic_prefix {
			validate_topic(prefix).map_err(ConfigError::InvalidPrefix)?;
		}
		if self.pins.is_empty() {
			return Err(ConfigError::EmptyPins);
		}
		self.pins.iter().try_for_each(validate_spec)
	}

	/// Check that no pin's topics collide with the bridge's own topics
	/// under `scheme`.
	pub fn check_reserved(&self, scheme: &TopicScheme) -> Result<(), ConfigError> {
		self.pins.iter().try_for_each(|spec| {
			check_reserved(scheme, self.topic_prefix.as_deref(), spec)
		})
	}
}

/// Check one pin entry.
pub fn validate_spec(spec: &LineSpec) -> Result<(), ConfigError> {
	match (spec.direction, spec.edge) {
		| (Direction::Out, Some(edge)) if edge != Edge::None => {
			return Err(ConfigError::EdgeOnOutput {
				line: spec.line,
				edge,
			});
		}
		| (Direction::Watch, Some(Edge::None)) => {
			return Err(ConfigError::WatchWithoutEdge { line: spec.line });
		}
		| _ => {}
	}
	validate_topic(&spec.topic_name()).map_err(|source| {
		ConfigError::InvalidTopic {
			line: spec.line,
			source,
		}
	})
}

/// Reject a pin whose subscribe, publish or error topic is one the bridge
/// uses itself. A binding on the configuration topic would unsubscribe it
/// when torn down.
pub fn check_reserved(
	scheme: &TopicScheme,
	prefix: Option<&str>,
	spec: &LineSpec,
) -> Result<(), ConfigError> {
	let topics = scheme.binding_topics(prefix, &spec.topic_name());
	match topics.iter().find(|topic| scheme.is_reserved(topic)) {
		| Some(topic) => Err(ConfigError::ReservedTopic {
			line: spec.line,
			topic: topic.to_string(),
		}),
		| None => Ok(()),
	}
}

/// A decoded payload from the configuration topic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigRequest {
	/// Replace the whole configuration
	Full(BridgeConfig),
	/// Reconfigure one line, leaving the others alone
	Single(LineSpec),
}

impl ConfigRequest {
	/// Decode and validate a payload.
	///
	/// An object with `pins` is a full configuration; an object with `gpio`
	/// and `direction` (and no `pins`) is a single pin.
	pub fn parse(payload: &[u8]) -> Result<Self, ConfigError> {
		let value: Value = serde_json::from_slice(payload)?;
		let Value::Object(object) = &value else {
			return Err(ConfigError::UnrecognizedShape);
		};
		if object.contains_key("pins") {
			let config: BridgeConfig = serde_json::from_value(value)?;
			config.validate()?;
			Ok(ConfigRequest::Full(config))
		} else if object.contains_key("gpio") && object.contains_key("direction")
		{
			let spec: LineSpec = serde_json::from_value(value)?;
			validate_spec(&spec)?;
			Ok(ConfigRequest::Single(spec))
		} else {
			Err(ConfigError::UnrecognizedShape)
		}
	}
}
