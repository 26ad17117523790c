//! Voting node CLI binary.

mod cli;
mod command;
mod service;

use std::process::ExitCode;

fn main() -> ExitCode {
	command::run()
}
