use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter directive for a `--log` level.
pub fn level_directive(level: u8) -> &'static str {
	match level {
		| 0 => "warn",
		| 1 => "info",
		| _ => "debug",
	}
}

/// Install the global subscriber.
///
/// `RUST_LOG` wins when set; otherwise `level` selects the verbosity.
pub fn setup(level: u8) {
	let filter = if std::env::var("RUST_LOG").is_ok() {
		EnvFilter::try_from_default_env()
			.unwrap_or_else(|_| level_directive(level).into())
	} else {
		EnvFilter::new(level_directive(level))
	};

	tracing_subscriber::registry()
		.with(filter)
		.with(
			tracing_subscriber::fmt::layer()
				.with_target(true)
				.with_thread_ids(false)
				.with_thread_names(false)
				.with_file(false)
				.with_line_number(false)
				.compact(),
		)
		.init();
}
