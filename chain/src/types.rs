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

//! Base types that the chunk planner and its records depend on.

use std::fmt;

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::core::core::hash::{Hash, HashAlgorithm, KeccakHasher, PoseidonHasher};
use crate::core::core::pmmr::MMR;
use crate::core::global::{
	self, ChainTypes, DEFAULT_BATCH_SIZE, DEFAULT_KECCAK_BUDGET, DEFAULT_SOURCE_BATCH_SIZE,
};
use crate::error::{Error, ErrorKind};
use crate::util;

/// A 128 bit half of a digest, serialized as a `0x` prefixed hex string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Hex128(pub u128);

impl fmt::Display for Hex128 {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{:#x}", self.0)
	}
}

impl Serialize for Hex128 {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Hex128 {
	fn deserialize<D>(deserializer: D) -> Result<Hex128, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		u128::from_str_radix(util::strip_hex_prefix(&s), 16)
			.map(Hex128)
			.map_err(de::Error::custom)
	}
}

/// Splits a digest into its serialized `(low, high)` halves.
pub fn halves(h: &Hash) -> (Hex128, Hex128) {
	let (low, high) = h.split_128();
	(Hex128(low), Hex128(high))
}

/// Peak digests of both MMRs, left to right.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkPeaks {
	/// Poseidon MMR peaks
	pub poseidon: Vec<Hash>,
	/// Keccak MMR peaks
	pub keccak: Vec<Hash>,
}

/// Roots of both MMRs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkRoots {
	/// Poseidon MMR root
	pub poseidon: Hash,
	/// Keccak MMR root
	pub keccak: Hash,
}

/// Accumulator state carried from one chunk to the next. Both MMRs always
/// have the same size.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkState {
	/// Peaks of both MMRs
	pub peaks: ChunkPeaks,
	/// Number of nodes in each MMR
	pub size: u64,
	/// Roots of both MMRs
	pub root: ChunkRoots,
}

impl ChunkState {
	/// The state every accumulator starts from: a single leaf per algorithm,
	/// the header digest of the genesis seed.
	pub fn genesis() -> Result<ChunkState, Error> {
		let poseidon_leaf = PoseidonHasher::new().hash_header(global::GENESIS_SEED)?;
		let keccak_leaf = KeccakHasher::new().hash_header(global::GENESIS_SEED)?;

		let mut poseidon = MMR::new(PoseidonHasher::new());
		let mut keccak = MMR::new(KeccakHasher::new());
		poseidon.add(poseidon_leaf)?;
		keccak.add(keccak_leaf)?;
		ChunkState::from_mmrs(&poseidon, &keccak)
	}

	/// Snapshot of a pair of MMRs extended in lock-step.
	pub fn from_mmrs(
		poseidon: &MMR<PoseidonHasher>,
		keccak: &MMR<KeccakHasher>,
	) -> Result<ChunkState, Error> {
		if poseidon.size() != keccak.size() {
			return Err(ErrorKind::Other(format!(
				"mmr sizes diverged, poseidon {} keccak {}",
				poseidon.size(),
				keccak.size()
			))
			.into());
		}
		Ok(ChunkState {
			peaks: ChunkPeaks {
				poseidon: poseidon.peaks()?,
				keccak: keccak.peaks()?,
			},
			size: poseidon.size(),
			root: ChunkRoots {
				poseidon: poseidon.root()?,
				keccak: keccak.root()?,
			},
		})
	}

	/// Rebuilds both MMRs from the peaks, ready to be extended.
	pub fn to_mmrs(&self) -> Result<(MMR<PoseidonHasher>, MMR<KeccakHasher>), Error> {
		let poseidon = MMR::from_peaks(PoseidonHasher::new(), self.size, &self.peaks.poseidon)?;
		let keccak = MMR::from_peaks(KeccakHasher::new(), self.size, &self.peaks.keccak)?;
		Ok((poseidon, keccak))
	}

	/// Checks the peaks fit the size and bag into the recorded roots, for
	/// states loaded from disk.
	pub fn validate(&self) -> Result<(), Error> {
		let poseidon_digests = self.peaks.poseidon.iter().chain(Some(&self.root.poseidon));
		for digest in poseidon_digests {
			if !digest.is_field_element() {
				return Err(ErrorKind::InputRange(format!(
					"poseidon digest {} is not a field element",
					digest
				))
				.into());
			}
		}
		let (poseidon, keccak) = self.to_mmrs()?;
		if poseidon.root()? != self.root.poseidon || keccak.root()? != self.root.keccak {
			return Err(ErrorKind::InputRange(format!(
				"chunk state roots don't match its peaks at size {}",
				self.size
			))
			.into());
		}
		Ok(())
	}
}

/// Everything the proving backend needs to recompute a chunk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkInput {
	/// Newest block of the chunk
	pub from_block_number_high: u64,
	/// Oldest block of the chunk
	pub to_block_number_low: u64,
	/// MMR size before the chunk
	pub mmr_last_len: u64,
	/// Poseidon root before the chunk
	pub mmr_last_root_poseidon: Hash,
	/// Keccak root before the chunk, low half
	pub mmr_last_root_keccak_low: Hex128,
	/// Keccak root before the chunk, high half
	pub mmr_last_root_keccak_high: Hex128,
	/// Poseidon peaks before the chunk
	pub poseidon_mmr_last_peaks: Vec<Hash>,
	/// Keccak peaks before the chunk, as `[low, high]` pairs
	pub keccak_mmr_last_peaks: Vec<[Hex128; 2]>,
	/// Parent hash of block `high + 1` read as a little-endian integer, low half
	pub block_n_plus_one_parent_hash_little_low: Hex128,
	/// Parent hash of block `high + 1` read as a little-endian integer, high half
	pub block_n_plus_one_parent_hash_little_high: Hex128,
	/// RLP of each header, newest first, as little-endian 64 bit limbs
	pub block_headers_array: Vec<Vec<u64>>,
	/// RLP length of each header in bytes
	pub bytes_len_array: Vec<usize>,
}

/// What a correct computation of a chunk produces. Field order is the order
/// the consistency checker compares in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkOutput {
	/// Newest block of the chunk
	pub from_block_number_high: u64,
	/// Oldest block of the chunk
	pub to_block_number_low: u64,
	/// Parent hash of block `high + 1`, i.e. hash of block `high`, low half
	pub block_n_plus_one_parent_hash_low: Hex128,
	/// Parent hash of block `high + 1`, high half
	pub block_n_plus_one_parent_hash_high: Hex128,
	/// Parent hash of block `low`, low half
	pub block_n_minus_r_plus_one_parent_hash_low: Hex128,
	/// Parent hash of block `low`, high half
	pub block_n_minus_r_plus_one_parent_hash_high: Hex128,
	/// Poseidon root before the chunk
	pub mmr_last_root_poseidon: Hash,
	/// Keccak root before the chunk, low half
	pub mmr_last_root_keccak_low: Hex128,
	/// Keccak root before the chunk, high half
	pub mmr_last_root_keccak_high: Hex128,
	/// MMR size before the chunk
	pub mmr_last_len: u64,
	/// Poseidon root after the chunk
	pub new_mmr_root_poseidon: Hash,
	/// Keccak root after the chunk, low half
	pub new_mmr_root_keccak_low: Hex128,
	/// Keccak root after the chunk, high half
	pub new_mmr_root_keccak_high: Hex128,
	/// MMR size after the chunk
	pub new_mmr_len: u64,
}

impl ChunkOutput {
	/// Named fields in their stable order, values rendered as they are
	/// serialized.
	pub fn fields(&self) -> Vec<(&'static str, String)> {
		vec![
			(
				"from_block_number_high",
				self.from_block_number_high.to_string(),
			),
			("to_block_number_low", self.to_block_number_low.to_string()),
			(
				"block_n_plus_one_parent_hash_low",
				self.block_n_plus_one_parent_hash_low.to_string(),
			),
			(
				"block_n_plus_one_parent_hash_high",
				self.block_n_plus_one_parent_hash_high.to_string(),
			),
			(
				"block_n_minus_r_plus_one_parent_hash_low",
				self.block_n_minus_r_plus_one_parent_hash_low.to_string(),
			),
			(
				"block_n_minus_r_plus_one_parent_hash_high",
				self.block_n_minus_r_plus_one_parent_hash_high.to_string(),
			),
			(
				"mmr_last_root_poseidon",
				self.mmr_last_root_poseidon.to_string(),
			),
			(
				"mmr_last_root_keccak_low",
				self.mmr_last_root_keccak_low.to_string(),
			),
			(
				"mmr_last_root_keccak_high",
				self.mmr_last_root_keccak_high.to_string(),
			),
			("mmr_last_len", self.mmr_last_len.to_string()),
			(
				"new_mmr_root_poseidon",
				self.new_mmr_root_poseidon.to_string(),
			),
			(
				"new_mmr_root_keccak_low",
				self.new_mmr_root_keccak_low.to_string(),
			),
			(
				"new_mmr_root_keccak_high",
				self.new_mmr_root_keccak_high.to_string(),
			),
			("new_mmr_len", self.new_mmr_len.to_string()),
		]
	}
}

/// Where the planner is within the current chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlannerStatus {
	/// Waiting for a chunk
	Idle,
	/// Pulling headers from the source
	Fetching,
	/// Computing leaf digests
	Hashing,
	/// Appending leaves to the MMRs
	Extending,
	/// Last chunk committed
	Committed,
	/// Last chunk failed, running state untouched
	Failed,
}

impl fmt::Display for PlannerStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		fmt::Debug::fmt(self, f)
	}
}

/// Chunk planner configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlannerConfig {
	/// Chain the headers come from, selects the fork schedule
	#[serde(default)]
	pub chain_type: ChainTypes,

	/// Directory chunk input and output records are written to
	pub output_dir: String,

	/// JSON file holding an array of headers in `eth_getBlockByNumber` form
	#[serde(default)]
	pub headers_path: Option<String>,

	/// Chunk state to start from instead of genesis
	#[serde(default)]
	pub initial_state_path: Option<String>,

	/// Directory holding externally computed `*_output.json` records to
	/// check each committed chunk against
	#[serde(default)]
	pub verify_dir: Option<String>,

	/// Headers per chunk, upper bound when sizing dynamically
	pub batch_size: u64,

	/// Shrink chunks to fit the Keccak budget
	#[serde(default)]
	pub dynamic_batch_size: bool,

	/// Keccak operations a chunk may cost
	pub keccak_budget: u64,

	/// Max headers per source request
	pub source_batch_size: u64,

	/// Pause between two source requests, in milliseconds
	#[serde(default)]
	pub source_delay_ms: u64,
}

impl Default for PlannerConfig {
	fn default() -> PlannerConfig {
		PlannerConfig {
			chain_type: ChainTypes::default(),
			output_dir: "chunks".to_owned(),
			headers_path: None,
			initial_state_path: None,
			verify_dir: None,
			batch_size: DEFAULT_BATCH_SIZE,
			dynamic_batch_size: false,
			keccak_budget: DEFAULT_KECCAK_BUDGET,
			source_batch_size: DEFAULT_SOURCE_BATCH_SIZE,
			source_delay_ms: 0,
		}
	}
}
