//! Coordinating task of the bridge
//!
//! The [`BridgeActor`] owns the subscription registry and is the only task
//! that mutates it. Inbound bus messages and line watch events reach it over
//! channels; the transport talks to it through a [`BridgeHandler`] and stops
//! it through the [`BridgeController`].

/// Errors of the handler/controller pair
pub mod error;
/// The actor task and its handles
pub mod actor;


pub use actor::{BridgeActor, BridgeController, BridgeHandler};
pub use error::CommandError;

/// Channel sizes of the bridge actor.
#[derive(Debug, Clone)]
pub struct BridgeSettings {
	/// Capacity of the inbound message channel. The transport waits when it
	/// is full, so messages are never dropped or reordered.
	pub command_channel_capacity: usize,
	/// Capacity of the channel watched lines report on
	pub watch_channel_capacity: usize,
}

impl Default for BridgeSettings {
	fn default() -> Self {
		Self {
			command_channel_capacity: 100,
			watch_channel_capacity: 100,
		}
	}
}
