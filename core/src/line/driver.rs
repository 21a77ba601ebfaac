//! Capability traits the core uses to reach hardware.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::error::HardwareError;
use super::spec::{LineId, LineSpec, LineValue};
use crate::registry::BindingKey;

/// Value change (or failure) reported by a watched line.
#[derive(Debug)]
pub struct WatchEvent {
	/// Binding incarnation that installed the watch.
	pub key: BindingKey,
	/// New logical value, or the failure that ended sampling.
	pub result: Result<LineValue, HardwareError>,
}

/// Channel on which watched lines deliver their events.
pub type WatchSender = mpsc::Sender<WatchEvent>;

/// Shared handle so reads and writes can run on their own tasks.
pub type SharedLineHandle = Arc<dyn LineHandle>;

/// One configured physical line.
///
/// Configuration (direction, edge, options) happens when the handle is
/// opened by a [`LineDriver`]. Every method may be called from any task.
#[async_trait]
pub trait LineHandle: Send + Sync + Debug {
	/// Physical line this handle drives.
	fn line(&self) -> LineId;

	/// Sample the current logical value.
	async fn read(&self) -> Result<LineValue, HardwareError>;

	/// Drive the line to `value`.
	async fn write(&self, value: LineValue) -> Result<(), HardwareError>;

	/// Start delivering change events tagged with `key` to `events`.
	///
	/// Installing a second watch replaces the first.
	fn watch(
		&self,
		key: BindingKey,
		events: WatchSender,
	) -> Result<(), HardwareError>;

	/// Stop delivering change events. No-op when not watching.
	fn unwatch(&self);

	/// Give the line back to the system. The handle is unusable afterwards.
	async fn release(&self) -> Result<(), HardwareError>;
}

/// Opens line handles.
#[async_trait]
pub trait LineDriver: Send + Sync {
	/// Whether real hardware access is possible on this host. When `false`
	/// no handle is ever opened and line operations are skipped.
	fn is_accessible(&self) -> bool;

	/// Export and configure the line described by `spec`.
	async fn open(
		&self,
		spec: &LineSpec,
	) -> Result<SharedLineHandle, HardwareError>;
}
