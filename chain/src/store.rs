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

//! Persisted chunk records: `{name}_input.json`, `{name}_output.json` and the
//! last committed chunk state, all JSON.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, ErrorKind};
use crate::types::{ChunkInput, ChunkOutput, ChunkState};

/// File name of the last committed state inside the store directory
pub const STATE_FILE: &str = "state.json";

/// Name of the records of the chunk covering `low..=high`.
pub fn chunk_name(high: u64, low: u64) -> String {
	format!("chunk_{}_{}", high, low)
}

/// Reads a JSON record.
pub fn load_json<T: DeserializeOwned, P: AsRef<Path>>(path: P) -> Result<T, Error> {
	let path = path.as_ref();
	let file = File::open(path)
		.map_err(|e| ErrorKind::Io(format!("cannot open {}: {}", path.display(), e)))?;
	Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Writes a JSON record, going through a temporary file so a reader never
/// sees a partial record.
pub fn save_json<T: Serialize, P: AsRef<Path>>(path: P, value: &T) -> Result<(), Error> {
	let path = path.as_ref();
	let tmp_path = path.with_extension("json.tmp");
	{
		let mut writer = BufWriter::new(File::create(&tmp_path)?);
		serde_json::to_writer_pretty(&mut writer, value)?;
		writer.write_all(b"\n")?;
		writer.flush()?;
	}
	fs::rename(&tmp_path, path)?;
	Ok(())
}

/// Directory holding the records of successive chunks.
#[derive(Debug, Clone)]
pub struct ChunkStore {
	root: PathBuf,
}

impl ChunkStore {
	/// Opens the store, creating the directory if needed.
	pub fn new<P: AsRef<Path>>(root: P) -> Result<ChunkStore, Error> {
		let root = root.as_ref().to_path_buf();
		fs::create_dir_all(&root)?;
		Ok(ChunkStore { root })
	}

	/// Path of the input record of a chunk
	pub fn input_path(&self, name: &str) -> PathBuf {
		self.root.join(format!("{}_input.json", name))
	}

	/// Path of the output record of a chunk
	pub fn output_path(&self, name: &str) -> PathBuf {
		self.root.join(format!("{}_output.json", name))
	}

	/// Path of the last committed state
	pub fn state_path(&self) -> PathBuf {
		self.root.join(STATE_FILE)
	}

	/// Saves the input record of a chunk.
	pub fn write_input(&self, name: &str, input: &ChunkInput) -> Result<PathBuf, Error> {
		let path = self.input_path(name);
		save_json(&path, input)?;
		debug!("wrote {}", path.display());
		Ok(path)
	}

	/// Saves the expected output record of a chunk.
	pub fn write_output(&self, name: &str, output: &ChunkOutput) -> Result<PathBuf, Error> {
		let path = self.output_path(name);
		save_json(&path, output)?;
		debug!("wrote {}", path.display());
		Ok(path)
	}

	/// Saves the running state.
	pub fn write_state(&self, state: &ChunkState) -> Result<(), Error> {
		save_json(self.state_path(), state)
	}

	/// Loads an input record
	pub fn read_input(&self, name: &str) -> Result<ChunkInput, Error> {
		load_json(self.input_path(name))
	}

	/// Loads an output record
	pub fn read_output(&self, name: &str) -> Result<ChunkOutput, Error> {
		load_json(self.output_path(name))
	}

	/// Loads the last committed state, if one was saved.
	pub fn read_state(&self) -> Result<Option<ChunkState>, Error> {
		let path = self.state_path();
		if !path.exists() {
			return Ok(None);
		}
		load_json(path).map(Some)
	}
}
