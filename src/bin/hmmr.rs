// Copyright 2021 The Hmmr Developers
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Main for building the hmmr binary, which extends the header accumulator
//! chunk by chunk and checks externally computed chunk results.

#[macro_use]
extern crate log;

use hmmr_chain as chain;
use hmmr_config as config;
use hmmr_util as util;

use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::process::exit;

mod cmd;

fn main() {
	let exit_code = real_main();
	exit(exit_code);
}

fn build_cli<'a, 'b>() -> App<'a, 'b> {
	App::new("hmmr")
		.version(env!("CARGO_PKG_VERSION"))
		.about("Merkle Mountain Range accumulator over Ethereum block headers.")
		.setting(AppSettings::SubcommandRequiredElseHelp)
		.arg(
			Arg::with_name("config")
				.short("c")
				.long("config")
				.value_name("FILE")
				.help("Configuration file to use instead of hmmr.toml")
				.takes_value(true)
				.global(true),
		)
		.subcommand(
			SubCommand::with_name("run")
				.about("Extend the accumulator over a block range, newest block first")
				.arg(
					Arg::with_name("from")
						.long("from")
						.value_name("HIGH")
						.help("Newest block to accumulate")
						.takes_value(true)
						.required(true),
				)
				.arg(
					Arg::with_name("to")
						.long("to")
						.value_name("LOW")
						.help("Oldest block to accumulate")
						.takes_value(true)
						.required(true),
				)
				.arg(
					Arg::with_name("batch_size")
						.short("b")
						.long("batch-size")
						.value_name("N")
						.help("Headers per chunk, upper bound when sizing dynamically")
						.takes_value(true),
				)
				.arg(
					Arg::with_name("dynamic")
						.short("d")
						.long("dynamic")
						.help("Shrink chunks to fit the Keccak budget"),
				)
				.arg(
					Arg::with_name("headers")
						.long("headers")
						.value_name("FILE")
						.help("JSON array of eth_getBlockByNumber headers")
						.takes_value(true),
				)
				.arg(
					Arg::with_name("state")
						.long("state")
						.value_name("FILE")
						.help("Chunk state to start from")
						.takes_value(true),
				)
				.arg(
					Arg::with_name("verify_dir")
						.long("verify-dir")
						.value_name("DIR")
						.help("Directory of external chunk outputs to check against")
						.takes_value(true),
				),
		)
		.subcommand(
			SubCommand::with_name("check")
				.about("Check a chunk output computed elsewhere against the expected one")
				.arg(
					Arg::with_name("expected")
						.help("Expected chunk output record")
						.required(true)
						.index(1),
				)
				.arg(
					Arg::with_name("actual")
						.help("Chunk output record to check")
						.required(true)
						.index(2),
				),
		)
		.subcommand(
			SubCommand::with_name("config")
				.about("Generate a configuration hmmr.toml file in the current directory"),
		)
		.subcommand(
			SubCommand::with_name("state")
				.about("Print the last committed chunk state of the output directory"),
		)
}

fn real_main() -> i32 {
	let args = build_cli().get_matches();

	if let ("config", _) = args.subcommand() {
		return cmd::config_command(config::CONFIG_FILE_NAME);
	}

	let global_config = match config::initial_setup(args.value_of("config")) {
		Ok(c) => c,
		Err(e) => {
			eprintln!("Error loading hmmr configuration: {}", e);
			return 1;
		}
	};
	util::init_logger(global_config.logging_config());
	if let Some(ref path) = global_config.config_file_path {
		info!("Using configuration file at {}", path.display());
	}

	let planner_config = global_config.planner_config();
	match args.subcommand() {
		("run", Some(run_args)) => cmd::run_command(planner_config, run_args),
		("check", Some(check_args)) => cmd::check_command(check_args),
		("state", _) => cmd::state_command(&planner_config),
		_ => {
			eprintln!("Unknown command, use 'hmmr help' for a list of all commands");
			1
		}
	}
}

/// Parses a numeric argument, reporting the bad value.
pub fn parse_u64(args: &ArgMatches<'_>, name: &str) -> Result<Option<u64>, String> {
	match args.value_of(name) {
		None => Ok(None),
		Some(v) => v
			.parse::<u64>()
			.map(Some)
			.map_err(|e| format!("invalid {} {}: {}", name, v, e)),
	}
}
