//! Linux sysfs GPIO driver (`/sys/class/gpio`).
//!
//! Lines are exported on open and unexported on release. Change
//! notifications are produced by a sampling task that compares successive
//! reads of the `value` attribute against the configured edge.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, warn};

use super::driver::{
	LineDriver, LineHandle, SharedLineHandle, WatchEvent, WatchSender,
};
use super::error::HardwareError;
use super::spec::{Edge, LineId, LineSpec, LineValue};
use crate::registry::BindingKey;

/// Default sysfs mount point.
pub const SYSFS_GPIO_ROOT: &str = "/sys/class/gpio";

const EXPORT_ATTEMPTS: u32 = 100;
const EXPORT_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Driver for the legacy sysfs GPIO interface.
#[derive(Debug, Clone)]
pub struct SysfsDriver {
	root: PathBuf,
	poll_interval: Duration,
}

impl Default for SysfsDriver {
	fn default() -> Self {
		Self {
			root: PathBuf::from(SYSFS_GPIO_ROOT),
			poll_interval: Duration::from_millis(5),
		}
	}
}

impl SysfsDriver {
	/// Driver rooted at `/sys/class/gpio`.
	pub fn new() -> Self {
		Self::default()
	}

	/// Driver rooted somewhere else (a test fixture, a chroot).
	pub fn with_root(root: impl Into<PathBuf>) -> Self {
		Self {
			root: root.into(),
			..Self::default()
		}
	}

	/// Sampling cadence of watched lines.
	pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
		self.poll_interval = poll_interval;
		self
	}

	async fn export(&self, line: LineId, dir: &Path) -> Result<bool, HardwareError> {
		if dir.exists() {
			return Ok(false);
		}
		tokio::fs::write(self.root.join("export"), line.to_string())
			.await
			.map_err(|err| HardwareError::io(line, err))?;

		// udev may still be fixing permissions on the new attributes
		let direction = dir.join("direction");
		for _ in 0 .. EXPORT_ATTEMPTS {
			if tokio::fs::metadata(&direction).await.is_ok() {
				return Ok(true);
			}
			time::sleep(EXPORT_RETRY_DELAY).await;
		}
		Err(HardwareError::Unavailable { line })
	}
}

async fn write_attr(
	line: LineId,
	path: &Path,
	value: &str,
) -> Result<(), HardwareError> {
	tokio::fs::write(path, value)
		.await
		.map_err(|err| HardwareError::io(line, err))
}

async fn read_value(line: LineId, path: &Path) -> Result<LineValue, HardwareError> {
	let text = tokio::fs::read_to_string(path)
		.await
		.map_err(|err| HardwareError::io(line, err))?;
	LineValue::from_digit(&text).ok_or_else(|| HardwareError::InvalidValue {
		line,
		value: text.trim().to_string(),
	})
}

#[async_trait]
impl LineDriver for SysfsDriver {
	fn is_accessible(&self) -> bool {
		self.root.join("export").exists()
	}

	async fn open(
		&self,
		spec: &LineSpec,
	) -> Result<SharedLineHandle, HardwareError> {
		let line = spec.line;
		let dir = self.root.join(format!("gpio{line}"));
		let exported = self.export(line, &dir).await?;

		let edge = match configure(spec, &dir, exported).await {
			| Ok(edge) => edge,
			| Err(err) => {
				// A line we exported ourselves must not outlive the failed open
				if exported {
					if let Err(unexport_err) = write_attr(
						line,
						&self.root.join("unexport"),
						&line.to_string(),
					)
					.await
					{
						warn!(gpio = line, error = %unexport_err, "Failed to unexport gpio after open failure");
					}
				}
				return Err(err);
			}
		};

		debug!(gpio = line, direction = %spec.direction, edge = %edge, "Configured sysfs gpio");
		Ok(std::sync::Arc::new(SysfsLine {
			line,
			root: self.root.clone(),
			value_path: dir.join("value"),
			edge,
			debounce: spec.options.debounce(),
			writable: !spec.direction.is_input(),
			poll_interval: self.poll_interval,
			sampler: Mutex::new(None),
			released: AtomicBool::new(false),
		}))
	}
}

/// Write direction, edge and polarity of an exported line.
async fn configure(
	spec: &LineSpec,
	dir: &Path,
	exported: bool,
) -> Result<Edge, HardwareError> {
	let line = spec.line;
	let wanted = if spec.direction.is_input() { "in" } else { "out" };
	let current = tokio::fs::read_to_string(dir.join("direction"))
		.await
		.map(|text| text.trim().to_string())
		.unwrap_or_default();
	if exported || spec.options.reconfigure_direction || current != wanted {
		write_attr(line, &dir.join("direction"), wanted).await?;
	}

	let edge = spec.effective_edge();
	if spec.direction.is_input() {
		match tokio::fs::write(dir.join("edge"), edge.as_str()).await {
			| Ok(()) => {}
			// Lines without interrupt support have no edge attribute
			| Err(err) if err.kind() == ErrorKind::NotFound && edge == Edge::None => {}
			| Err(err) => return Err(HardwareError::io(line, err)),
		}
	}

	let active_low = if spec.options.active_low { "1" } else { "0" };
	write_attr(line, &dir.join("active_low"), active_low).await?;
	Ok(edge)
}

/// Handle returned by [`SysfsDriver`].
#[derive(Debug)]
pub struct SysfsLine {
	line: LineId,
	root: PathBuf,
	value_path: PathBuf,
	edge: Edge,
	debounce: Option<Duration>,
	writable: bool,
	poll_interval: Duration,
	sampler: Mutex<Option<JoinHandle<()>>>,
	released: AtomicBool,
}

impl SysfsLine {
	fn ensure_open(&self) -> Result<(), HardwareError> {
		if self.released.load(Ordering::Acquire) {
			return Err(HardwareError::Released { line: self.line });
		}
		Ok(())
	}

	fn replace_sampler(&self, sampler: Option<JoinHandle<()>>) {
		let previous = std::mem::replace(
			&mut *self.sampler.lock().unwrap_or_else(PoisonError::into_inner),
			sampler,
		);
		if let Some(previous) = previous {
			previous.abort();
		}
	}
}

#[async_trait]
impl LineHandle for SysfsLine {
	fn line(&self) -> LineId {
		self.line
	}

	async fn read(&self) -> Result<LineValue, HardwareError> {
		self.ensure_open()?;
		read_value(self.line, &self.value_path).await
	}

	async fn write(&self, value: LineValue) -> Result<(), HardwareError> {
		self.ensure_open()?;
		if !self.writable {
			return Err(HardwareError::NotWritable { line: self.line });
		}
		write_attr(self.line, &self.value_path, value.as_payload()).await
	}

	fn watch(
		&self,
		key: BindingKey,
		events: WatchSender,
	) -> Result<(), HardwareError> {
		self.ensure_open()?;
		let sampler = Sampler {
			line: self.line,
			path: self.value_path.clone(),
			edge: self.edge,
			debounce: self.debounce,
			interval: self.poll_interval,
			key,
			events,
		};
		self.replace_sampler(Some(tokio::spawn(sampler.run())));
		Ok(())
	}

	fn unwatch(&self) {
		self.replace_sampler(None);
	}

	async fn release(&self) -> Result<(), HardwareError> {
		if self.released.swap(true, Ordering::AcqRel) {
			return Err(HardwareError::Released { line: self.line });
		}
		self.replace_sampler(None);
		write_attr(self.line, &self.root.join("unexport"), &self.line.to_string())
			.await
	}
}

struct Sampler {
	line: LineId,
	path: PathBuf,
	edge: Edge,
	debounce: Option<Duration>,
	interval: Duration,
	key: BindingKey,
	events: WatchSender,
}

impl Sampler {
	async fn run(self) {
		let mut previous = match read_value(self.line, &self.path).await {
			| Ok(value) => value,
			| Err(err) => {
				let _ = self.events.send(WatchEvent { key: self.key, result: Err(err) }).await;
				return;
			}
		};
		let mut ticker = time::interval(self.interval);
		ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
		loop {
			ticker.tick().await;
			let current = match self.sample().await {
				| Ok(Some(value)) => value,
				| Ok(None) => continue,
				| Err(err) => {
					warn!(gpio = self.line, error = %err, "Stopping gpio sampler");
					let _ = self.events.send(WatchEvent { key: self.key, result: Err(err) }).await;
					return;
				}
			};
			if current == previous {
				continue;
			}
			let fired = self.edge.fires(previous, current);
			previous = current;
			if fired {
				let event = WatchEvent { key: self.key, result: Ok(current) };
				if self.events.send(event).await.is_err() {
					debug!(gpio = self.line, "Watch receiver closed, stopping sampler");
					return;
				}
			}
		}
	}

	/// Read the line, requiring the level to hold for the debounce window.
	/// `None` means the line is still bouncing.
	async fn sample(&self) -> Result<Option<LineValue>, HardwareError> {
		let first = read_value(self.line, &self.path).await?;
		let Some(window) = self.debounce else {
			return Ok(Some(first));
		};
		time::sleep(window).await;
		let second = read_value(self.line, &self.path).await?;
		Ok((first == second).then_some(second))
	}
}
