use thiserror::Error;

use crate::line::{Edge, LineId};
use crate::topic::TopicError;

/// Reasons a configuration payload is rejected as a whole
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Payload is not JSON or does not match the expected shape
	#[error("Configuration is not valid: {0}")]
	Json(#[from] serde_json::Error),

	/// Payload is neither a `pins` configuration nor a single pin
	#[error(
		"Configuration must be an object with a `pins` list, or a single pin \
		 with `gpio` and `direction`"
	)]
	UnrecognizedShape,

	/// `pins` is present but empty
	#[error("Configuration contains no pins")]
	EmptyPins,

	/// An edge was requested on an output line
	#[error("gpio {line}: edge '{edge}' is only valid for 'in' or 'watch' lines")]
	EdgeOnOutput {
		/// Offending line
		line: LineId,
		/// Requested edge
		edge: Edge,
	},

	/// A watched line with edge `none` would never report a change
	#[error("gpio {line}: a 'watch' line needs an edge other than 'none'")]
	WatchWithoutEdge {
		/// Offending line
		line: LineId,
	},

	/// A topic name or prefix cannot be used
	#[error("gpio {line}: invalid topic: {source}")]
	InvalidTopic {
		/// Offending line
		line: LineId,
		/// Why the derived topic was rejected
		#[source]
		source: TopicError,
	},

	/// A binding topic would shadow one of the bridge's own topics
	#[error("gpio {line}: topic '{topic}' is reserved by the bridge")]
	ReservedTopic {
		/// Offending line
		line: LineId,
		/// The colliding topic
		topic: String,
	},

	/// The topic prefix cannot be used
	#[error("Invalid topic prefix: {0}")]
	InvalidPrefix(#[source] TopicError),
}
