use std::{process::ExitCode, time::Duration};

use clap::Parser;

use crate::{cli::Cli, service::Services};

/// Parses CLI flags, loads `crypto.json`, wires up the `Services`
/// container, and runs until a shutdown signal arrives.
pub fn run() -> ExitCode {
	let cli = Cli::parse();

	tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.init();

	let config_contents = match std::fs::read_to_string(&cli.config) {
		Ok(contents) => contents,
		Err(err) => {
			tracing::error!(path = %cli.config.display(), %err, "failed to read config file");
			return ExitCode::FAILURE;
		}
	};

	let config = match evoting_wire::load_config_str(&config_contents) {
		Ok(config) => config,
		Err(err) => {
			tracing::error!(%err, "failed to load crypto config");
			return ExitCode::FAILURE;
		}
	};

	let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
		Ok(runtime) => runtime,
		Err(err) => {
			tracing::error!(%err, "failed to start async runtime");
			return ExitCode::FAILURE;
		}
	};

	runtime.block_on(async move {
		let services = Services::from_config(config, cli.options);
		services.spawn_talliers(Duration::from_secs(cli.tally_interval_secs));

		tracing::info!(
			bind = %cli.bind,
			tally_interval_secs = cli.tally_interval_secs,
			"voting node ready (HTTP listener not implemented - see Services)"
		);

		match tokio::signal::ctrl_c().await {
			Ok(()) => tracing::info!("received shutdown signal, exiting"),
			Err(err) => tracing::warn!(%err, "failed to listen for shutdown signal"),
		}
	});

	ExitCode::SUCCESS
}
