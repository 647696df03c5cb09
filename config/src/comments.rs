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

//! Comments for configuration + injection into output .toml
use std::collections::HashMap;

/// maps entries to Comments that should precede them
fn comments() -> HashMap<String, String> {
	let mut retval = HashMap::new();
	retval.insert(
		"[planner]".to_string(),
		"
# Generated Configuration File for hmmr
#
# When running the hmmr executable without specifying a configuration
# file, it will look for this file in two places, in the following
# order:
#
# -The working directory
# -[user home]/.hmmr
#

#########################################
### CHUNK PLANNER CONFIGURATION       ###
#########################################
"
		.to_string(),
	);

	retval.insert(
		"chain_type".to_string(),
		"
#The chain the headers come from, which defines the header layout
#expected at each block number. Can be:
#Mainnet - Ethereum mainnet (legacy, London and Shanghai layouts)
#Sepolia - Sepolia testnet (London and Shanghai layouts)
#AutomatedTesting - no layout schedule enforced
"
		.to_string(),
	);

	retval.insert(
		"output_dir".to_string(),
		"
#directory chunk input and output records and the running state
#are written to
"
		.to_string(),
	);

	retval.insert(
		"headers_path".to_string(),
		"
#JSON file holding an array of eth_getBlockByNumber header objects,
#the source headers are read from
"
		.to_string(),
	);

	retval.insert(
		"initial_state_path".to_string(),
		"
#chunk state file to start from, the genesis state if not set and
#no state was saved in output_dir
"
		.to_string(),
	);

	retval.insert(
		"verify_dir".to_string(),
		"
#directory of externally computed *_output.json records each committed
#chunk is checked against
"
		.to_string(),
	);

	retval.insert(
		"batch_size".to_string(),
		"
#number of headers per chunk, the upper bound when sizing dynamically
"
		.to_string(),
	);

	retval.insert(
		"dynamic_batch_size".to_string(),
		"
#whether to shrink each chunk until its simulated keccak cost fits
#keccak_budget
"
		.to_string(),
	);

	retval.insert(
		"keccak_budget".to_string(),
		"
#maximum number of keccak permutations a single chunk may cost
"
		.to_string(),
	);

	retval.insert(
		"source_batch_size".to_string(),
		"
#maximum number of headers fetched in a single source request
"
		.to_string(),
	);

	retval.insert(
		"source_delay_ms".to_string(),
		"
#pause between two source requests, in milliseconds
"
		.to_string(),
	);

	retval.insert(
		"[logging]".to_string(),
		"
#########################################
### LOGGING CONFIGURATION             ###
#########################################
"
		.to_string(),
	);

	retval.insert(
		"log_to_stdout".to_string(),
		"
#whether to log to stdout
"
		.to_string(),
	);

	retval.insert(
		"stdout_log_level".to_string(),
		"
#log level for stdout: Error, Warning, Info, Debug, Trace
"
		.to_string(),
	);

	retval.insert(
		"log_to_file".to_string(),
		"
#whether to log to a file
"
		.to_string(),
	);

	retval.insert(
		"file_log_level".to_string(),
		"
#log level for file: Error, Warning, Info, Debug, Trace
"
		.to_string(),
	);

	retval.insert(
		"log_file_path".to_string(),
		"
#log file path
"
		.to_string(),
	);

	retval.insert(
		"log_file_append".to_string(),
		"
#whether to append to the log file (true), or replace it on every run (false)
"
		.to_string(),
	);

	retval.insert(
		"log_max_size".to_string(),
		"
#maximum log file size in bytes before performing log rotation
#comment it to disable log rotation
"
		.to_string(),
	);

	retval.insert(
		"log_max_files".to_string(),
		"
#maximum count of the log files to rotate over
"
		.to_string(),
	);

	retval
}

fn get_key(line: &str) -> String {
	if line.contains('[') && line.contains(']') {
		line.trim().to_owned()
	} else if line.contains('=') {
		line.split('=').next().unwrap_or("").trim().to_owned()
	} else {
		"NOT_FOUND".to_owned()
	}
}

/// Precedes every known key of a serialized config with its comment.
pub fn insert_comments(orig: String) -> String {
	let comments = comments();
	let mut ret_val = String::new();
	for line in orig.lines() {
		if let Some(comment) = comments.get(&get_key(line)) {
			ret_val.push_str(comment);
		}
		ret_val.push_str(line);
		ret_val.push('\n');
	}
	ret_val
}
