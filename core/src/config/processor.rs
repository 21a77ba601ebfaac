//! Applies validated configurations to the registry

use std::collections::HashSet;
use std::sync::Arc;

use arcstr::ArcStr;
use bytes::Bytes;
use serde_json::json;
use tracing::{debug, error, info, warn};

use super::error::ConfigError;
use super::payload::{
	BridgeConfig, ConfigRequest, check_reserved, validate_spec,
};
use crate::gateway::{BusGateway, PublishOptions};
use crate::line::LineSpec;
use crate::registry::SubscriptionRegistry;
use crate::topic::TopicScheme;

/// Where the processor is in handling a configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProcessorState {
	/// Waiting for a configuration
	#[default]
	Idle,
	/// Checking a payload; the registry is untouched
	Validating,
	/// Tearing down and installing bindings
	Reconciling,
}

/// Applies configurations to a [`SubscriptionRegistry`].
pub struct ConfigurationProcessor {
	gateway: Arc<dyn BusGateway>,
	scheme: TopicScheme,
	prefix: Option<ArcStr>,
	state: ProcessorState,
}

impl ConfigurationProcessor {
	/// Processor publishing its completion notices through `gateway`.
	pub fn new(gateway: Arc<dyn BusGateway>, scheme: TopicScheme) -> Self {
		Self {
			gateway,
			scheme,
			prefix: None,
			state: ProcessorState::Idle,
		}
	}

	/// Current state
	pub fn state(&self) -> ProcessorState {
		self.state
	}

	/// Prefix of the last full configuration, if it set one
	pub fn prefix(&self) -> Option<&ArcStr> {
		self.prefix.as_ref()
	}

	fn transition(&mut self, state: ProcessorState) {
		debug!(from = ?self.state, to = ?state, "Configuration processor state");
		self.state = state;
	}

	/// Decode a payload from the configuration topic and apply it.
	/// Returns the number of bindings afterwards.
	pub async fn handle_payload(
		&mut self,
		registry: &mut SubscriptionRegistry,
		payload: &[u8],
	) -> Result<usize, ConfigError> {
		self.transition(ProcessorState::Validating);
		let request = ConfigRequest::parse(payload);
		self.transition(ProcessorState::Idle);
		match request? {
			| ConfigRequest::Full(config) => self.apply(registry, config).await,
			| ConfigRequest::Single(spec) => {
				self.apply_one(registry, spec).await
			}
		}
	}

	/// Replace the registry contents with `config`.
	///
	/// The whole configuration is validated first; if it is rejected the
	/// registry is left exactly as it was.
	pub async fn apply(
		&mut self,
		registry: &mut SubscriptionRegistry,
		config: BridgeConfig,
	) -> Result<usize, ConfigError> {
		self.transition(ProcessorState::Validating);
		if let Err(err) = config
			.validate()
			.and_then(|()| config.check_reserved(&self.scheme))
		{
			self.transition(ProcessorState::Idle);
			return Err(err);
		}

		self.transition(ProcessorState::Reconciling);
		registry.clear().await;
		self.prefix = config.topic_prefix.map(ArcStr::from);

		let mut seen = HashSet::new();
		for spec in config.pins {
			if !seen.insert(spec.line) {
				warn!(
					gpio = spec.line,
					direction = %spec.direction,
					"Duplicate configuration for gpio, replacing the earlier entry"
				);
			}
			let topics = self
				.scheme
				.binding_topics(self.prefix.as_deref(), &spec.topic_name());
			registry.upsert(spec, topics).await;
		}

		let count = registry.count();
		self.publish_completion(count).await;
		self.transition(ProcessorState::Idle);
		Ok(count)
	}

	/// Reconfigure one line without touching the others. Uses the prefix
	/// of the last full configuration.
	pub async fn apply_one(
		&mut self,
		registry: &mut SubscriptionRegistry,
		spec: LineSpec,
	) -> Result<usize, ConfigError> {
		self.transition(ProcessorState::Validating);
		if let Err(err) = validate_spec(&spec).and_then(|()| {
			check_reserved(&self.scheme, self.prefix.as_deref(), &spec)
		}) {
			self.transition(ProcessorState::Idle);
			return Err(err);
		}

		self.transition(ProcessorState::Reconciling);
		if registry.get(spec.line).is_some() {
			info!(gpio = spec.line, direction = %spec.direction, "Reconfiguring gpio");
		}
		let topics = self
			.scheme
			.binding_topics(self.prefix.as_deref(), &spec.topic_name());
		registry.upsert(spec, topics).await;

		let count = registry.count();
		self.publish_completion(count).await;
		self.transition(ProcessorState::Idle);
		Ok(count)
	}

	async fn publish_completion(&self, count: usize) {
		info!(pins = count, "Configuration completed");
		let topic = self.scheme.configured_topic();
		let payload = Bytes::from(json!({ "pins": count }).to_string());
		if let Err(err) = self
			.gateway
			.publish(&topic, payload, PublishOptions::retained())
			.await
		{
			error!(topic = %topic, error = %err, "Failed to publish configuration notice");
		}
	}
}
