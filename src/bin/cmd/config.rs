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

/// hmmr configuration file output command
use crate::config::GlobalConfig;
use std::env;

/// Create a config file in the current directory, chunk records and logs
/// going to the same directory.
pub fn config_command(file_name: &str) -> i32 {
	let current_dir = match env::current_dir() {
		Ok(d) => d,
		Err(e) => {
			eprintln!("Error creating config file: {}", e);
			return 1;
		}
	};
	let config_file_name = current_dir.join(file_name);
	if config_file_name.exists() {
		eprintln!(
			"{} already exists in the current directory. Please remove it first",
			file_name
		);
		return 1;
	}

	let mut default_config = GlobalConfig::for_dir(&current_dir);
	if let Err(e) = default_config.write_to_file(&config_file_name.to_string_lossy()) {
		eprintln!("Error creating config file: {}", e);
		return 1;
	}
	println!(
		"{} file configured and created in current directory",
		file_name
	);
	0
}
