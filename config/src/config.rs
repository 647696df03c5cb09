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

//! Configuration file management

use std::env;
use std::fs::{self, File};
use std::io::prelude::*;
use std::path::{Path, PathBuf};

use crate::chain::PlannerConfig;
use crate::comments::insert_comments;
use crate::types::{ConfigError, ConfigMembers, GlobalConfig};
use crate::util::LoggingConfig;

/// The default file name to use when trying to derive
/// the config file location
pub const CONFIG_FILE_NAME: &str = "hmmr.toml";
/// Directory under the user home holding the default config
pub const HMMR_HOME: &str = ".hmmr";
const CHUNKS_DIR: &str = "chunks";
const LOG_FILE_NAME: &str = "hmmr.log";

/// The hmmr home, `~/.hmmr`, relative to the working directory when no
/// home directory can be found.
pub fn get_hmmr_path() -> PathBuf {
	let mut path = dirs::home_dir().unwrap_or_else(PathBuf::new);
	path.push(HMMR_HOME);
	path
}

/// Handles setup and detection of paths: an explicit config file if
/// provided, then `hmmr.toml` in the working directory, then
/// `~/.hmmr/hmmr.toml`, written out with defaults if it doesn't exist.
pub fn initial_setup(config_file_path: Option<&str>) -> Result<GlobalConfig, ConfigError> {
	if let Some(p) = config_file_path {
		return GlobalConfig::new(p);
	}

	let local_path = env::current_dir()
		.map_err(ConfigError::io("working directory"))?
		.join(CONFIG_FILE_NAME);
	if local_path.exists() {
		return GlobalConfig::new(&local_path.to_string_lossy());
	}

	let hmmr_path = get_hmmr_path();
	if !hmmr_path.exists() {
		fs::create_dir_all(&hmmr_path).map_err(ConfigError::io(&hmmr_path))?;
	}
	let config_path = hmmr_path.join(CONFIG_FILE_NAME);
	if !config_path.exists() {
		let mut default_config = GlobalConfig::for_dir(&hmmr_path);
		default_config.write_to_file(&config_path.to_string_lossy())?;
	}
	GlobalConfig::new(&config_path.to_string_lossy())
}

// explodes if the file exists but something's wrong with it
fn read_config(path: &Path) -> Result<ConfigMembers, ConfigError> {
	let mut contents = String::new();
	File::open(path)
		.and_then(|mut file| file.read_to_string(&mut contents))
		.map_err(ConfigError::io(path))?;
	toml::from_str::<ConfigMembers>(&contents)
		.map_err(|e| ConfigError::ParseError(path.to_string_lossy().into_owned(), e.to_string()))
}

/// Returns the defaults, as strewn throughout the code
impl Default for ConfigMembers {
	fn default() -> ConfigMembers {
		ConfigMembers {
			planner: PlannerConfig::default(),
			logging: Some(LoggingConfig::default()),
		}
	}
}

impl Default for GlobalConfig {
	fn default() -> GlobalConfig {
		GlobalConfig {
			config_file_path: None,
			members: Some(ConfigMembers::default()),
		}
	}
}

impl GlobalConfig {
	/// Defaults with chunk records and the log file kept under `dir`
	pub fn for_dir(dir: &Path) -> GlobalConfig {
		let mut planner = PlannerConfig::default();
		planner.output_dir = dir.join(CHUNKS_DIR).to_string_lossy().into_owned();
		let mut logging = LoggingConfig::default();
		logging.log_file_path = dir.join(LOG_FILE_NAME).to_string_lossy().into_owned();
		GlobalConfig {
			config_file_path: None,
			members: Some(ConfigMembers {
				planner,
				logging: Some(logging),
			}),
		}
	}

	/// Requires the path to a config file
	pub fn new(file_path: &str) -> Result<GlobalConfig, ConfigError> {
		let config_file = PathBuf::from(file_path);
		if !config_file.exists() {
			return Err(ConfigError::FileNotFoundError(file_path.to_owned()));
		}

		let members = read_config(&config_file)?;
		Ok(GlobalConfig {
			config_file_path: Some(config_file),
			members: Some(members),
		})
	}

	/// Planner section, defaults if there's none
	pub fn planner_config(&self) -> PlannerConfig {
		self.members
			.as_ref()
			.map(|m| m.planner.clone())
			.unwrap_or_default()
	}

	/// Logging section, if any
	pub fn logging_config(&self) -> Option<LoggingConfig> {
		self.members.as_ref().and_then(|m| m.logging.clone())
	}

	/// Serialize config
	pub fn ser_config(&mut self) -> Result<String, ConfigError> {
		let members = self.members.get_or_insert_with(ConfigMembers::default);
		toml::to_string(members).map_err(|e| ConfigError::SerializationError(format!("{}", e)))
	}

	/// Write configuration to a file
	pub fn write_to_file(&mut self, name: &str) -> Result<(), ConfigError> {
		let conf_out = self.ser_config()?;
		let conf_out = insert_comments(conf_out);
		let mut file = File::create(name).map_err(ConfigError::io(name))?;
		file.write_all(conf_out.as_bytes())
			.map_err(ConfigError::io(name))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn dir_defaults() {
		let config = GlobalConfig::for_dir(Path::new("/tmp/hmmr_home"));
		let planner = config.planner_config();
		assert_eq!(planner.output_dir, "/tmp/hmmr_home/chunks");
		assert_eq!(planner.batch_size, PlannerConfig::default().batch_size);
		let logging = config.logging_config().unwrap();
		assert_eq!(logging.log_file_path, "/tmp/hmmr_home/hmmr.log");

		let empty = GlobalConfig {
			config_file_path: None,
			members: None,
		};
		assert_eq!(empty.planner_config(), PlannerConfig::default());
		assert_eq!(empty.logging_config(), None);
	}
}
