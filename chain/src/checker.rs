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

//! Validates a chunk result computed elsewhere against the expected one.

use crate::error::{Error, ErrorKind};
use crate::types::ChunkOutput;

/// Compares two chunk output records field by field, in their stable order,
/// and reports the first field that differs.
pub fn check(expected: &ChunkOutput, actual: &ChunkOutput) -> Result<(), Error> {
	for ((name, want), (_, got)) in expected.fields().into_iter().zip(actual.fields()) {
		if want != got {
			warn!("chunk output mismatch on {}: expected {}, got {}", name, want, got);
			return Err(ErrorKind::ConsistencyMismatch(name.to_owned()).into());
		}
	}
	debug!(
		"chunk {} to {} consistent",
		expected.from_block_number_high, expected.to_block_number_low
	);
	Ok(())
}
