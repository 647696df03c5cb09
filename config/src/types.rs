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

//! Public types for config modules

use std::io;
use std::path::{Path, PathBuf};

use crate::chain::PlannerConfig;
use crate::util::LoggingConfig;

/// Why the configuration could not be loaded or written.
#[derive(Debug, Fail)]
pub enum ConfigError {
	/// The file is not valid TOML for the config sections
	#[fail(display = "Cannot parse configuration file {}: {}", _0, _1)]
	ParseError(String, String),
	/// Reading or writing the file, or creating its directory
	#[fail(display = "Cannot access {}: {}", _0, _1)]
	FileIOError(String, String),
	/// An explicitly requested file does not exist
	#[fail(display = "Configuration file not found: {}", _0)]
	FileNotFoundError(String),
	/// Config values could not be turned into TOML
	#[fail(display = "Cannot serialize configuration: {}", _0)]
	SerializationError(String),
}

impl ConfigError {
	/// Wraps an IO error with the path it happened on.
	pub fn io<P: AsRef<Path>>(path: P) -> impl FnOnce(io::Error) -> ConfigError {
		let path = path.as_ref().to_string_lossy().into_owned();
		move |e| ConfigError::FileIOError(path, e.to_string())
	}
}

/// The configuration file as loaded, along with where it was read from.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct GlobalConfig {
	/// Keep track of the file we've read
	pub config_file_path: Option<PathBuf>,
	/// Global member config
	pub members: Option<ConfigMembers>,
}

/// Sections of the configuration file, the only part that is serialized.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfigMembers {
	/// Chunk planner config
	#[serde(default)]
	pub planner: PlannerConfig,
	/// Logging config
	pub logging: Option<LoggingConfig>,
}
