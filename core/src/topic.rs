//! Topic naming
//!
//! Every name the bridge publishes or subscribes to is derived here from the
//! application topic (or a configuration's `topicPrefix`) and a binding's
//! logical name:
//!
//! | purpose             | topic                          |
//! |---------------------|--------------------------------|
//! | line value / ack    | `tele/<prefix>/<name>`         |
//! | commands to a line  | `cmnd/<prefix>/<name>`         |
//! | line failures       | `tele/<prefix>/error/<name>`   |
//! | configuration       | `cmnd/<app>/configure`         |
//! | configuration done  | `tele/<app>/configured`        |
//! | bridge status       | `tele/<app>/status`            |

use arcstr::ArcStr;
use thiserror::Error;


/// Topic limits from the MQTT specification
pub mod limits {
	/// Maximum length of a topic name in bytes
	pub const MAX_TOPIC_LENGTH: usize = 65535;
}

/// Errors for topic names that cannot be published to
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TopicError {
	/// Topic or topic segment is empty
	#[error("Topic is empty")]
	Empty,

	/// Topic exceeds the MQTT length limit
	#[error("Topic is {length} bytes long, limit is {}", limits::MAX_TOPIC_LENGTH)]
	TooLong {
		/// Length in bytes
		length: usize,
	},

	/// Topic contains a wildcard or a null byte
	#[error("Topic '{topic}' contains illegal character {character:?}")]
	IllegalCharacter {
		/// Rejected topic
		topic: String,
		/// First illegal character found
		character: char,
	},
}

/// Check that `topic` is a concrete, publishable MQTT topic name.
pub fn validate_topic(topic: &str) -> Result<(), TopicError> {
	if topic.is_empty() {
		return Err(TopicError::Empty);
	}
	if topic.len() > limits::MAX_TOPIC_LENGTH {
		return Err(TopicError::TooLong {
			length: topic.len(),
		});
	}
	if let Some(character) =
		topic.chars().find(|c| matches!(c, '\0' | '#' | '+'))
	{
		return Err(TopicError::IllegalCharacter {
			topic: topic.to_string(),
			character,
		});
	}
	Ok(())
}

/// Topics owned by one binding. Fixed for the binding's lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BindingTopics {
	/// Values and acknowledgements are published here
	pub publish: ArcStr,
	/// Read requests and write commands arrive here
	pub subscribe: ArcStr,
	/// Failure reports are published here
	pub error: ArcStr,
}

impl BindingTopics {
	/// Subscribe, publish and error topics
	pub fn iter(&self) -> impl Iterator<Item = &ArcStr> {
		[&self.subscribe, &self.publish, &self.error].into_iter()
	}
}

/// Derives topic names for one bridge instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicScheme {
	app: ArcStr,
}

impl TopicScheme {
	/// Scheme for application topic `app` (`onoff` by default).
	pub fn new(app: impl Into<ArcStr>) -> Self {
		Self { app: app.into() }
	}

	/// Application topic
	pub fn app(&self) -> &ArcStr {
		&self.app
	}

	/// Where configurations are received
	pub fn config_topic(&self) -> ArcStr {
		ArcStr::from(format!("cmnd/{}/configure", self.app))
	}

	/// Where the completion notice is published (retained)
	pub fn configured_topic(&self) -> ArcStr {
		ArcStr::from(format!("tele/{}/configured", self.app))
	}

	/// Where `Online`/`Offline` is published (retained)
	pub fn status_topic(&self) -> ArcStr {
		ArcStr::from(format!("tele/{}/status", self.app))
	}

	/// Whether `topic` is one of the bridge's own topics.
	pub fn is_reserved(&self, topic: &str) -> bool {
		[self.config_topic(), self.configured_topic(), self.status_topic()]
			.iter()
			.any(|reserved| reserved.as_str() == topic)
	}

	/// Topics of a binding named `name`, under `prefix` or the app topic.
	pub fn binding_topics(
		&self,
		prefix: Option<&str>,
		name: &str,
	) -> BindingTopics {
		let prefix = prefix.unwrap_or(self.app.as_str());
		BindingTopics {
			publish: ArcStr::from(format!("tele/{prefix}/{name}")),
			subscribe: ArcStr::from(format!("cmnd/{prefix}/{name}")),
			error: ArcStr::from(format!("tele/{prefix}/error/{name}")),
		}
	}
}

impl Default for TopicScheme {
	fn default() -> Self {
		Self::new(arcstr::literal!("onoff"))
	}
}
