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

/// Chunk output and state inspection commands
use clap::ArgMatches;

use crate::chain::store::{self, ChunkStore};
use crate::chain::{self, ChunkOutput, PlannerConfig};

/// Checks an externally computed chunk output against the expected one.
pub fn check_command(args: &ArgMatches<'_>) -> i32 {
	let expected_path = args.value_of("expected").unwrap_or_default();
	let actual_path = args.value_of("actual").unwrap_or_default();
	let load = |path: &str| -> Result<ChunkOutput, String> {
		store::load_json(path).map_err(|e| format!("{}: {}", path, e.kind()))
	};
	let (expected, actual) = match (load(expected_path), load(actual_path)) {
		(Ok(expected), Ok(actual)) => (expected, actual),
		(Err(e), _) | (_, Err(e)) => {
			eprintln!("Error: {}", e);
			return 1;
		}
	};
	match chain::check(&expected, &actual) {
		Ok(()) => {
			println!(
				"chunk {} to {} is consistent",
				expected.from_block_number_high, expected.to_block_number_low
			);
			0
		}
		Err(e) => {
			eprintln!("{}", e.kind());
			1
		}
	}
}

/// Prints the last committed chunk state of the configured output directory.
pub fn state_command(config: &PlannerConfig) -> i32 {
	let res = ChunkStore::new(&config.output_dir).and_then(|store| store.read_state());
	match res {
		Ok(Some(state)) => match serde_json::to_string_pretty(&state) {
			Ok(json) => {
				println!("{}", json);
				0
			}
			Err(e) => {
				eprintln!("Error: {}", e);
				1
			}
		},
		Ok(None) => {
			println!("no chunk committed yet in {}", config.output_dir);
			0
		}
		Err(e) => {
			eprintln!("Error: {}", e.kind());
			1
		}
	}
}
