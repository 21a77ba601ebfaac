//! Hardware line abstraction
//!
//! A [`LineDriver`] opens [`LineHandle`]s for physical lines. Two drivers
//! ship with the crate: [`SysfsDriver`] for Linux hosts and
//! [`SimulatedDriver`] for hosts without GPIO and for tests.

pub mod driver;
/// Hardware failures
pub mod error;
pub mod sim;
pub mod spec;
pub mod sysfs;

#[cfg(test)]
mod spec_tests;
#[cfg(test)]
mod sysfs_tests;

pub use driver::{
	LineDriver, LineHandle, SharedLineHandle, WatchEvent, WatchSender,
};
pub use error::HardwareError;
pub use sim::{SimOperation, SimulatedDriver, SimulatedLine};
pub use spec::{Direction, Edge, LineId, LineOptions, LineSpec, LineValue};
pub use sysfs::{SYSFS_GPIO_ROOT, SysfsDriver, SysfsLine};
