use std::path::PathBuf;

use clap::Parser;

/// Command-line flags for the voting node.
#[derive(Debug, Parser)]
#[command(name = "evoting-node", about = "Runs the IdP/Registrar/Counter dispatch and the background tallier")]
pub struct Cli {
	/// Path to the `crypto.json` config file.
	#[arg(long, value_name = "PATH", default_value = "crypto.json")]
	pub config: PathBuf,

	/// Seconds between background tallier ticks.
	#[arg(long, value_name = "SECONDS", default_value_t = 60)]
	pub tally_interval_secs: u64,

	/// Option count applied to every voting loaded from `config`. Stands
	/// in for the `voting_options` table, which this workspace does not
	/// persist (see the `Services` container's doc comment).
	#[arg(long, value_name = "N", default_value_t = 2)]
	pub options: usize,

	/// Address the (not implemented) HTTP listener would bind to; parsed
	/// and logged for parity with the original deployment's flags, never
	/// acted on.
	#[arg(long, value_name = "ADDR", default_value = "0.0.0.0:8080")]
	pub bind: String,
}
