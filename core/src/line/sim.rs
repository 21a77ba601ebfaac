//! In-process line driver with scriptable levels and failures.
//!
//! Levels set through [`SimulatedDriver::set_level`] are electrical; handles
//! report logical values (inverted for `activeLow` lines), just like the
//! sysfs driver does.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tracing::debug;

use super::driver::{
	LineDriver, LineHandle, SharedLineHandle, WatchEvent, WatchSender,
};
use super::error::HardwareError;
use super::spec::{Direction, Edge, LineId, LineSpec, LineValue};
use crate::registry::BindingKey;

/// Operations a test can make fail once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimOperation {
	/// `LineDriver::open`
	Open,
	/// `LineHandle::read`
	Read,
	/// `LineHandle::write`
	Write,
	/// `LineHandle::watch`
	Watch,
}

#[derive(Debug, Default)]
struct SimLine {
	level: LineValue,
	direction: Option<Direction>,
	edge: Edge,
	active_low: bool,
	open_handles: usize,
	watcher: Option<(BindingKey, WatchSender)>,
	writes: Vec<LineValue>,
	reads: usize,
	failures: HashSet<SimOperation>,
}

impl SimLine {
	fn logical(&self) -> LineValue {
		if self.active_low { !self.level } else { self.level }
	}

	fn take_failure(
		&mut self,
		line: LineId,
		operation: SimOperation,
	) -> Result<(), HardwareError> {
		if self.failures.remove(&operation) {
			let source = std::io::Error::other(format!(
				"simulated {operation:?} failure"
			));
			return Err(HardwareError::io(line, source));
		}
		Ok(())
	}
}

type SimLines = Arc<Mutex<HashMap<LineId, SimLine>>>;

fn lock(lines: &SimLines) -> MutexGuard<'_, HashMap<LineId, SimLine>> {
	lines.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Line driver backed by memory.
#[derive(Debug, Clone)]
pub struct SimulatedDriver {
	lines: SimLines,
	accessible: bool,
}

impl Default for SimulatedDriver {
	fn default() -> Self {
		Self {
			lines: SimLines::default(),
			accessible: true,
		}
	}
}

impl SimulatedDriver {
	/// Creates a driver with every line low.
	pub fn new() -> Self {
		Self::default()
	}

	/// Driver that behaves like a host without GPIO access.
	pub fn inaccessible() -> Self {
		Self {
			accessible: false,
			..Self::default()
		}
	}

	/// Make the next `operation` on `line` fail.
	pub fn fail_next(&self, line: LineId, operation: SimOperation) {
		lock(&self.lines)
			.entry(line)
			.or_default()
			.failures
			.insert(operation);
	}

	/// Change the electrical level. A watch sees the change when the
	/// configured edge fires. Returns whether an event was delivered.
	pub fn set_level(&self, line: LineId, level: LineValue) -> bool {
		let mut lines = lock(&self.lines);
		let state = lines.entry(line).or_default();
		let previous = state.logical();
		state.level = level;
		let current = state.logical();
		if state.edge.fires(previous, current) {
			deliver(state, Ok(current))
		} else {
			false
		}
	}

	/// Deliver a change event with `value` whether or not the level moved,
	/// as a noisy input would. Returns whether an event was delivered.
	pub fn emit(&self, line: LineId, value: LineValue) -> bool {
		let mut lines = lock(&self.lines);
		let state = lines.entry(line).or_default();
		state.level = if state.active_low { !value } else { value };
		deliver(state, Ok(value))
	}

	/// Deliver a watch failure to the current watcher.
	pub fn emit_failure(&self, line: LineId, message: &str) -> bool {
		let mut lines = lock(&self.lines);
		let state = lines.entry(line).or_default();
		let source = std::io::Error::other(message.to_string());
		deliver(state, Err(HardwareError::io(line, source)))
	}

	/// Current logical value.
	pub fn level(&self, line: LineId) -> LineValue {
		lock(&self.lines)
			.get(&line)
			.map(SimLine::logical)
			.unwrap_or_default()
	}

	/// Every value written to `line`, oldest first.
	pub fn writes(&self, line: LineId) -> Vec<LineValue> {
		lock(&self.lines)
			.get(&line)
			.map(|state| state.writes.clone())
			.unwrap_or_default()
	}

	/// Number of reads performed on `line`.
	pub fn reads(&self, line: LineId) -> usize {
		lock(&self.lines).get(&line).map_or(0, |state| state.reads)
	}

	/// Handles currently open (opened and not yet released) on `line`.
	pub fn open_handles(&self, line: LineId) -> usize {
		lock(&self.lines)
			.get(&line)
			.map_or(0, |state| state.open_handles)
	}

	/// Whether a watch is installed on `line`.
	pub fn is_watching(&self, line: LineId) -> bool {
		lock(&self.lines)
			.get(&line)
			.is_some_and(|state| state.watcher.is_some())
	}

	/// Direction the line was last configured with.
	pub fn direction(&self, line: LineId) -> Option<Direction> {
		lock(&self.lines).get(&line).and_then(|state| state.direction)
	}
}

fn deliver(
	state: &mut SimLine,
	result: Result<LineValue, HardwareError>,
) -> bool {
	let Some((key, events)) = &state.watcher else {
		return false;
	};
	match events.try_send(WatchEvent { key: *key, result }) {
		| Ok(()) => true,
		| Err(err) => {
			debug!(binding = %key, error = %err, "Simulated watch event not delivered");
			false
		}
	}
}

#[async_trait]
impl LineDriver for SimulatedDriver {
	fn is_accessible(&self) -> bool {
		self.accessible
	}

	async fn open(
		&self,
		spec: &LineSpec,
	) -> Result<SharedLineHandle, HardwareError> {
		if !self.accessible {
			return Err(HardwareError::Unavailable { line: spec.line });
		}
		let mut lines = lock(&self.lines);
		let state = lines.entry(spec.line).or_default();
		state.take_failure(spec.line, SimOperation::Open)?;
		state.direction = Some(spec.direction);
		state.edge = spec.effective_edge();
		state.active_low = spec.options.active_low;
		state.open_handles += 1;
		Ok(Arc::new(SimulatedLine {
			line: spec.line,
			writable: !spec.direction.is_input(),
			lines: Arc::clone(&self.lines),
			released: AtomicBool::new(false),
		}))
	}
}

/// Handle returned by [`SimulatedDriver`].
#[derive(Debug)]
pub struct SimulatedLine {
	line: LineId,
	writable: bool,
	lines: SimLines,
	released: AtomicBool,
}

impl SimulatedLine {
	fn ensure_open(&self) -> Result<(), HardwareError> {
		if self.released.load(Ordering::Acquire) {
			return Err(HardwareError::Released { line: self.line });
		}
		Ok(())
	}
}

#[async_trait]
impl LineHandle for SimulatedLine {
	fn line(&self) -> LineId {
		self.line
	}

	async fn read(&self) -> Result<LineValue, HardwareError> {
		self.ensure_open()?;
		let mut lines = lock(&self.lines);
		let state = lines.entry(self.line).or_default();
		state.take_failure(self.line, SimOperation::Read)?;
		state.reads += 1;
		Ok(state.logical())
	}

	async fn write(&self, value: LineValue) -> Result<(), HardwareError> {
		self.ensure_open()?;
		if !self.writable {
			return Err(HardwareError::NotWritable { line: self.line });
		}
		let mut lines = lock(&self.lines);
		let state = lines.entry(self.line).or_default();
		state.take_failure(self.line, SimOperation::Write)?;
		state.level = if state.active_low { !value } else { value };
		state.writes.push(value);
		Ok(())
	}

	fn watch(
		&self,
		key: BindingKey,
		events: WatchSender,
	) -> Result<(), HardwareError> {
		self.ensure_open()?;
		let mut lines = lock(&self.lines);
		let state = lines.entry(self.line).or_default();
		state.take_failure(self.line, SimOperation::Watch)?;
		state.watcher = Some((key, events));
		Ok(())
	}

	fn unwatch(&self) {
		if let Some(state) = lock(&self.lines).get_mut(&self.line) {
			state.watcher = None;
		}
	}

	async fn release(&self) -> Result<(), HardwareError> {
		if self.released.swap(true, Ordering::AcqRel) {
			return Err(HardwareError::Released { line: self.line });
		}
		if let Some(state) = lock(&self.lines).get_mut(&self.line) {
			state.watcher = None;
			state.open_handles = state.open_handles.saturating_sub(1);
		}
		Ok(())
	}
}
