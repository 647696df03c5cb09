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

/// Accumulator extension command
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use clap::ArgMatches;

use crate::chain::store::{self, ChunkStore};
use crate::chain::{BatchedSource, ChunkPlanner, ChunkState, Error, JsonFileSource, PlannerConfig};
use crate::parse_u64;

/// Runs the chunk planner over the requested range with the configuration
/// overridden by the command line arguments.
pub fn run_command(planner_config: PlannerConfig, args: &ArgMatches<'_>) -> i32 {
	match run(planner_config, args) {
		Ok(()) => 0,
		Err(e) => {
			error!("run failed: {}", e);
			eprintln!("Error: {}", e);
			1
		}
	}
}

fn chain_err(e: Error) -> String {
	e.kind().to_string()
}

fn run(mut config: PlannerConfig, args: &ArgMatches<'_>) -> Result<(), String> {
	let from = parse_u64(args, "from")?.ok_or("--from is required")?;
	let to = parse_u64(args, "to")?.ok_or("--to is required")?;
	if let Some(batch_size) = parse_u64(args, "batch_size")? {
		config.batch_size = batch_size;
	}
	if args.is_present("dynamic") {
		config.dynamic_batch_size = true;
	}
	if let Some(path) = args.value_of("headers") {
		config.headers_path = Some(path.to_owned());
	}
	if let Some(path) = args.value_of("state") {
		config.initial_state_path = Some(path.to_owned());
	}
	if let Some(dir) = args.value_of("verify_dir") {
		config.verify_dir = Some(dir.to_owned());
	}

	let headers_path = config
		.headers_path
		.clone()
		.ok_or("no header source, set headers_path or pass --headers")?;
	let source = JsonFileSource::open(&headers_path).map_err(chain_err)?;
	info!("{} headers available from {}", source.len(), headers_path);
	let source = BatchedSource::new(
		source,
		config.source_batch_size,
		Duration::from_millis(config.source_delay_ms),
	);

	let store = ChunkStore::new(&config.output_dir).map_err(chain_err)?;
	let state = match config.initial_state_path {
		Some(ref path) => store::load_json(path).map_err(chain_err)?,
		None => match store.read_state().map_err(chain_err)? {
			Some(state) => {
				info!("resuming from saved state at mmr size {}", state.size);
				state
			}
			None => ChunkState::genesis().map_err(chain_err)?,
		},
	};

	let mut planner = ChunkPlanner::new(config, Arc::new(source), state)
		.map_err(chain_err)?
		.with_store(store);

	let stop = planner.stop_handle();
	ctrlc::set_handler(move || {
		stop.store(true, Ordering::SeqCst);
	})
	.map_err(|e| format!("cannot set the SIGINT (Ctrl+C) handler: {}", e))?;

	let outputs = planner.run(from, to).map_err(chain_err)?;
	match outputs.last() {
		Some(last) => println!(
			"{} chunks committed, blocks {} to {}, mmr size {}",
			outputs.len(),
			from,
			last.to_block_number_low,
			last.new_mmr_len
		),
		None => println!("nothing committed"),
	}
	Ok(())
}
