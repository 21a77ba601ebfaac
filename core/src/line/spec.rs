//! Line specifications as they arrive in a configuration payload.

use std::fmt;
use std::ops::Not;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Physical line identifier (the kernel GPIO number).
pub type LineId = u32;

/// How a line is exposed on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	/// Electrical input, sampled on demand.
	In,
	/// Electrical output, driven by inbound messages.
	Out,
	/// Electrical input with change notifications.
	Watch,
}

impl Direction {
	/// Name used in payloads and default topic names.
	pub fn as_str(self) -> &'static str {
		match self {
			| Direction::In => "in",
			| Direction::Out => "out",
			| Direction::Watch => "watch",
		}
	}

	/// `in` and `watch` are both electrical inputs.
	pub fn is_input(self) -> bool {
		!matches!(self, Direction::Out)
	}
}

impl fmt::Display for Direction {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Edge that raises a change notification on an input line.
#[derive(
	Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Edge {
	/// No interrupts.
	#[default]
	None,
	/// Low to high transitions.
	Rising,
	/// High to low transitions.
	Falling,
	/// Any transition.
	Both,
}

impl Edge {
	/// Name as written to the kernel `edge` attribute.
	pub fn as_str(self) -> &'static str {
		match self {
			| Edge::None => "none",
			| Edge::Rising => "rising",
			| Edge::Falling => "falling",
			| Edge::Both => "both",
		}
	}

	/// Whether a transition from `previous` to `current` fires this edge.
	pub fn fires(self, previous: LineValue, current: LineValue) -> bool {
		match self {
			| Edge::None => false,
			| Edge::Rising => {
				previous == LineValue::Low && current == LineValue::High
			}
			| Edge::Falling => {
				previous == LineValue::High && current == LineValue::Low
			}
			| Edge::Both => previous != current,
		}
	}
}

impl fmt::Display for Edge {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Driver options passed through to the line.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LineOptions {
	/// Invert the logical value relative to the electrical level.
	pub active_low: bool,
	/// Milliseconds a new level must be stable before it is reported.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub debounce_timeout: Option<u64>,
	/// Rewrite the direction even when the line already has it.
	pub reconfigure_direction: bool,
}

impl LineOptions {
	/// Debounce window, if any.
	pub fn debounce(&self) -> Option<Duration> {
		self.debounce_timeout
			.filter(|millis| *millis > 0)
			.map(Duration::from_millis)
	}
}

/// Logical level of a line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum LineValue {
	/// Logical 0.
	#[default]
	Low,
	/// Logical 1.
	High,
}

impl LineValue {
	/// Coerce an inbound payload: `1`, `on` and `true` (any case) are HIGH,
	/// everything else is LOW.
	pub fn from_payload(payload: &[u8]) -> Self {
		let Ok(text) = std::str::from_utf8(payload) else {
			return LineValue::Low;
		};
		let token = text.trim();
		if token == "1"
			|| token.eq_ignore_ascii_case("on")
			|| token.eq_ignore_ascii_case("true")
		{
			LineValue::High
		} else {
			LineValue::Low
		}
	}

	/// Parse the strict `0`/`1` form a driver reports.
	pub fn from_digit(text: &str) -> Option<Self> {
		match text.trim() {
			| "0" => Some(LineValue::Low),
			| "1" => Some(LineValue::High),
			| _ => None,
		}
	}

	/// Outbound payload: `"0"` or `"1"`.
	pub fn as_payload(self) -> &'static str {
		match self {
			| LineValue::Low => "0",
			| LineValue::High => "1",
		}
	}

	/// Human readable label used in logs.
	pub fn label(self) -> &'static str {
		match self {
			| LineValue::Low => "OFF",
			| LineValue::High => "ON",
		}
	}
}

impl From<bool> for LineValue {
	fn from(high: bool) -> Self {
		if high { LineValue::High } else { LineValue::Low }
	}
}

impl Not for LineValue {
	type Output = LineValue;

	fn not(self) -> Self::Output {
		match self {
			| LineValue::Low => LineValue::High,
			| LineValue::High => LineValue::Low,
		}
	}
}

impl fmt::Display for LineValue {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_payload())
	}
}

/// One pin entry of a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineSpec {
	/// Physical line.
	#[serde(rename = "gpio")]
	pub line: LineId,
	/// Exposure mode.
	pub direction: Direction,
	/// Interrupt edge, only meaningful for inputs.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub edge: Option<Edge>,
	/// Driver options.
	#[serde(default)]
	pub options: LineOptions,
	/// Logical topic name; derived from direction and line when absent.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub topic: Option<String>,
}

impl LineSpec {
	/// Creates a spec with default edge, options and topic.
	pub fn new(line: LineId, direction: Direction) -> Self {
		Self {
			line,
			direction,
			edge: None,
			options: LineOptions::default(),
			topic: None,
		}
	}

	/// Sets the interrupt edge.
	pub fn with_edge(mut self, edge: Edge) -> Self {
		self.edge = Some(edge);
		self
	}

	/// Sets the logical topic name.
	pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
		self.topic = Some(topic.into());
		self
	}

	/// Sets the driver options.
	pub fn with_options(mut self, options: LineOptions) -> Self {
		self.options = options;
		self
	}

	/// Edge the driver is configured with. A `watch` line without an
	/// explicit edge reports every transition.
	pub fn effective_edge(&self) -> Edge {
		match (self.direction, self.edge) {
			| (Direction::Out, _) => Edge::None,
			| (_, Some(edge)) => edge,
			| (Direction::Watch, None) => Edge::Both,
			| (Direction::In, None) => Edge::None,
		}
	}

	/// Logical topic name, `<direction>/<gpio>` unless set explicitly.
	pub fn topic_name(&self) -> String {
		match &self.topic {
			| Some(topic) => topic.clone(),
			| None => format!("{}/{}", self.direction, self.line),
		}
	}
}
