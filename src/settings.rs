//! Runtime settings
//!
//! Each value is taken from the first source that provides it:
//!
//! 1. command-line flag
//! 2. environment variable (`MQTT_URL`, `MQTT_USERNAME`, `MQTT_PASSWORD`,
//!    `ONOFF_TOPIC`, `MQTT_ONOFF_LOG`)
//! 3. settings file (`.mqtt-onoff.json` unless `--settings` names another)
//! 4. default

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use mqtt_gpio_bridge_core::TopicError;
use mqtt_gpio_bridge_core::topic::validate_topic;
use serde::Deserialize;
use thiserror::Error;

use crate::cli::Cli;


/// Settings file looked up in the working directory
pub const SETTINGS_FILE: &str = ".mqtt-onoff.json";
/// Broker used when nothing else is configured
pub const DEFAULT_URL: &str = "mqtt://localhost:1883";
/// Application topic used when nothing else is configured
pub const DEFAULT_TOPIC: &str = "onoff";

/// Environment variable names
pub mod env {
	/// Broker URL
	pub const URL: &str = "MQTT_URL";
	/// Broker username
	pub const USERNAME: &str = "MQTT_USERNAME";
	/// Broker password
	pub const PASSWORD: &str = "MQTT_PASSWORD";
	/// Application topic
	pub const TOPIC: &str = "ONOFF_TOPIC";
	/// Log level
	pub const LOG: &str = "MQTT_ONOFF_LOG";
}

/// Settings problems that stop start-up
#[derive(Debug, Error)]
pub enum SettingsError {
	/// The settings file exists but cannot be read, or a file named on the
	/// command line is missing
	#[error("Cannot read settings file {}: {source}", path.display())]
	Read {
		/// Settings file
		path: PathBuf,
		/// Underlying I/O failure
		#[source]
		source: std::io::Error,
	},

	/// The settings file is not valid JSON
	#[error("Settings file {} is not valid: {source}", path.display())]
	Parse {
		/// Settings file
		path: PathBuf,
		/// Parser failure
		#[source]
		source: serde_json::Error,
	},

	/// The resolved application topic cannot be used
	#[error("Invalid application topic: {0}")]
	InvalidTopic(#[from] TopicError),
}

/// `log` in the settings file: a level, or `true`/`false`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FileLogLevel {
	/// Numeric verbosity
	Level(u8),
	/// `true` means info, `false` means warnings only
	Enabled(bool),
}

impl FileLogLevel {
	fn level(self) -> u8 {
		match self {
			| FileLogLevel::Level(level) => level,
			| FileLogLevel::Enabled(enabled) => u8::from(enabled),
		}
	}
}

/// Contents of the settings file. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FileSettings {
	/// Broker URL
	pub url: Option<String>,
	/// Broker username
	pub username: Option<String>,
	/// Broker password
	pub password: Option<String>,
	/// Application topic
	pub topic: Option<String>,
	/// Verbosity
	pub log: Option<FileLogLevel>,
}

impl FileSettings {
	/// Read the settings file at `path`.
	///
	/// A missing file yields empty settings unless `required` is set; a file
	/// that exists but cannot be parsed is always an error.
	pub fn load(path: &Path, required: bool) -> Result<Self, SettingsError> {
		let text = match std::fs::read_to_string(path) {
			| Ok(text) => text,
			| Err(err) if err.kind() == ErrorKind::NotFound && !required => {
				return Ok(Self::default());
			}
			| Err(source) => {
				return Err(SettingsError::Read {
					path: path.to_path_buf(),
					source,
				});
			}
		};
		serde_json::from_str(&text).map_err(|source| SettingsError::Parse {
			path: path.to_path_buf(),
			source,
		})
	}
}

/// Resolved settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
	/// Broker URL
	pub url: String,
	/// Broker username
	pub username: Option<String>,
	/// Broker password, only sent with a username
	pub password: Option<String>,
	/// Application topic
	pub topic: String,
	/// Verbosity, see [`crate::logging::level_directive`]
	pub log: u8,
	/// Use simulated lines
	pub simulate: bool,
}

impl Default for Settings {
	fn default() -> Self {
		Self {
			url: DEFAULT_URL.to_string(),
			username: None,
			password: None,
			topic: DEFAULT_TOPIC.to_string(),
			log: 0,
			simulate: false,
		}
	}
}

impl Settings {
	/// Resolve from the command line, the process environment and the
	/// settings file.
	pub fn resolve(cli: &Cli) -> Result<Self, SettingsError> {
		let (path, required) = match &cli.settings {
			| Some(path) => (path.clone(), true),
			| None => (PathBuf::from(SETTINGS_FILE), false),
		};
		let file = FileSettings::load(&path, required)?;
		Self::merge(cli, |key| std::env::var(key).ok(), file)
	}

	/// Combine the sources. `lookup` reads one environment variable; empty
	/// values count as unset.
	pub fn merge(
		cli: &Cli,
		lookup: impl Fn(&str) -> Option<String>,
		file: FileSettings,
	) -> Result<Self, SettingsError> {
		let from_env = |key: &str| non_empty(lookup(key));
		let defaults = Self::default();

		let url = non_empty(cli.url.clone())
			.or_else(|| from_env(env::URL))
			.or(non_empty(file.url))
			.unwrap_or(defaults.url);
		let username = non_empty(cli.username.clone())
			.or_else(|| from_env(env::USERNAME))
			.or(non_empty(file.username));
		let password = non_empty(cli.password.clone())
			.or_else(|| from_env(env::PASSWORD))
			.or(non_empty(file.password));
		let topic = non_empty(cli.topic.clone())
			.or_else(|| from_env(env::TOPIC))
			.or(non_empty(file.topic))
			.unwrap_or(defaults.topic);
		let log = cli
			.log
			.or_else(|| from_env(env::LOG).map(|value| parse_log_level(&value)))
			.or(file.log.map(FileLogLevel::level))
			.unwrap_or(defaults.log);

		validate_topic(&topic)?;

		Ok(Self {
			url,
			username,
			password,
			topic,
			log,
			simulate: cli.simulate,
		})
	}
}

fn non_empty(value: Option<String>) -> Option<String> {
	value.filter(|value| !value.trim().is_empty())
}

/// Numeric levels are taken as is, `false`/`off` mean 0 and any other value
/// turns info logging on.
fn parse_log_level(value: &str) -> u8 {
	let value = value.trim();
	if let Ok(level) = value.parse::<u8>() {
		return level;
	}
	if value.eq_ignore_ascii_case("false") || value.eq_ignore_ascii_case("off") {
		0
	} else {
		1
	}
}
