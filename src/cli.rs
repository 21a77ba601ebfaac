use std::path::PathBuf;

use clap::Parser;

/// Expose GPIO lines as MQTT topics, configured at runtime over MQTT.
///
/// Values left out fall back to MQTT_URL, MQTT_USERNAME, MQTT_PASSWORD,
/// ONOFF_TOPIC and MQTT_ONOFF_LOG, then to the settings file.
#[derive(Parser, Debug, Default, Clone)]
#[command(name = "mqtt-gpio-bridge")]
#[command(version, about, long_about = None)]
#[command(after_help = "Example: mqtt-gpio-bridge -c mqtt://localhost:1883")]
pub struct Cli {
	/// MQTT connect URL
	#[arg(short = 'c', long, value_name = "URL")]
	pub url: Option<String>,

	/// MQTT broker username
	#[arg(short, long)]
	pub username: Option<String>,

	/// MQTT broker password
	#[arg(short, long)]
	pub password: Option<String>,

	/// Application topic
	#[arg(short, long)]
	pub topic: Option<String>,

	/// Log level: 0=warnings, 1=info, 2=debug
	#[arg(short, long, value_name = "LEVEL")]
	pub log: Option<u8>,

	/// Settings file [default: .mqtt-onoff.json]
	#[arg(long, value_name = "FILE")]
	pub settings: Option<PathBuf>,

	/// Drive simulated lines instead of /sys/class/gpio
	#[arg(long)]
	pub simulate: bool,
}
