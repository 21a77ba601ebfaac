use thiserror::Error;

use super::spec::LineId;

/// Failures of a single hardware operation on a line.
#[derive(Debug, Error)]
pub enum HardwareError {
	/// The underlying device file could not be read or written
	#[error("I/O error on gpio {line}: {source}")]
	Io {
		/// Line being accessed
		line: LineId,
		/// Underlying I/O failure
		#[source]
		source: std::io::Error,
	},

	/// The line never showed up after export
	#[error("gpio {line} is not available on this host")]
	Unavailable {
		/// Line being accessed
		line: LineId,
	},

	/// The handle was used after `release`
	#[error("gpio {line} has already been released")]
	Released {
		/// Line being accessed
		line: LineId,
	},

	/// The driver reported something other than `0` or `1`
	#[error("gpio {line} reported unexpected value '{value}'")]
	InvalidValue {
		/// Line being read
		line: LineId,
		/// Contents of the value attribute, trimmed
		value: String,
	},

	/// A write was attempted on an input line
	#[error("gpio {line} is not configured as an output")]
	NotWritable {
		/// Line being accessed
		line: LineId,
	},
}

impl HardwareError {
	/// Creates a new Io error
	pub fn io(line: LineId, source: std::io::Error) -> Self {
		Self::Io { line, source }
	}

	/// Line the failure refers to
	pub fn line(&self) -> LineId {
		match self {
			| HardwareError::Io { line, .. }
			| HardwareError::Unavailable { line }
			| HardwareError::Released { line }
			| HardwareError::InvalidValue { line, .. }
			| HardwareError::NotWritable { line } => *line,
		}
	}
}
