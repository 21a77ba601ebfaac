use std::process::ExitCode;

use clap::Parser;
use mqtt_gpio_bridge::{Cli, Settings, logging};

#[tokio::main]
async fn main() -> ExitCode {
	dotenv::dotenv().ok();
	let cli = Cli::parse();

	let settings = match Settings::resolve(&cli) {
		| Ok(settings) => settings,
		| Err(err) => {
			eprintln!("mqtt-gpio-bridge: {err}");
			return ExitCode::FAILURE;
		}
	};
	logging::setup(settings.log);

	match mqtt_gpio_bridge::run(settings).await {
		| Ok(()) => ExitCode::SUCCESS,
		| Err(err) => {
			tracing::error!(error = %err, "Bridge stopped");
			ExitCode::FAILURE
		}
	}
}
