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

//! The chunk planner walks a block range from the newest block down, one
//! chunk at a time. For each chunk it fetches the headers plus the boundary
//! header above the chunk, hashes every header under both algorithms,
//! extends both MMRs from the running state and commits the new state along
//! with the records a proving backend needs to reproduce the chunk.

use std::cmp;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, ScopedJoinHandle};

use crate::checker;
use crate::core::core::hash::{
	Hash, HashAlgorithm, KeccakHasher, MockHasher, PoseidonHasher, ZERO_HASH,
};
use crate::core::core::header::BlockHeader;
use crate::core::core::pmmr::{self, MMR};
use crate::core::ser::{to_limbs, Endianness};
use crate::error::{Error, ErrorKind};
use crate::source::{check_complete, HeaderSource};
use crate::store::{self, ChunkStore};
use crate::types::{
	halves, ChunkInput, ChunkOutput, ChunkState, PlannerConfig, PlannerStatus,
};

/// Number of Keccak operations the proving backend spends on a chunk: one
/// per absorbed block of each header, plus every parent and bagging hash of
/// the MMR extension, counted by running the extension with `MockHasher`.
pub fn simulate_keccak_ops(mmr_size: u64, header_lens: &[usize]) -> Result<u64, Error> {
	let header_ops: u64 = header_lens
		.iter()
		.map(|len| MockHasher::keccak_ops(*len))
		.sum();

	let mock = MockHasher::new();
	let dummy_peaks = vec![ZERO_HASH; pmmr::peaks(mmr_size).len()];
	let mut mmr = MMR::from_peaks(mock.clone(), mmr_size, &dummy_peaks)?;
	for _ in header_lens {
		mmr.add(ZERO_HASH)?;
	}
	mmr.root()?;

	Ok(header_ops + mock.count())
}

fn hash_all<H: HashAlgorithm>(hasher: H, encoded: &[Vec<u8>]) -> Result<Vec<Hash>, Error> {
	encoded
		.iter()
		.map(|bytes| hasher.hash_header(bytes).map_err(Error::from))
		.collect()
}

fn extend<H: HashAlgorithm>(mut mmr: MMR<H>, leaves: &[Hash]) -> Result<MMR<H>, Error> {
	for leaf in leaves {
		mmr.add(*leaf)?;
	}
	Ok(mmr)
}

fn join<T>(handle: ScopedJoinHandle<'_, Result<T, Error>>) -> Result<T, Error> {
	handle
		.join()
		.map_err(|_| ErrorKind::Other("worker thread panicked".to_owned()))?
}

/// Leaf digests of the encoded headers, Poseidon and Keccak, each pass on
/// its own thread. Both vectors align index for index with the input.
pub fn hash_headers(encoded: &[Vec<u8>]) -> Result<(Vec<Hash>, Vec<Hash>), Error> {
	thread::scope(|s| -> Result<_, Error> {
		let poseidon = thread::Builder::new()
			.name("poseidon_hasher".to_string())
			.spawn_scoped(s, || hash_all(PoseidonHasher::new(), encoded))?;
		let keccak = thread::Builder::new()
			.name("keccak_hasher".to_string())
			.spawn_scoped(s, || hash_all(KeccakHasher::new(), encoded))?;
		Ok((join(poseidon)?, join(keccak)?))
	})
}

/// Appends the leaves (in order) to both MMRs rebuilt from the state, each
/// MMR on its own thread, and returns the resulting state.
pub fn extend_state(
	state: &ChunkState,
	poseidon_leaves: &[Hash],
	keccak_leaves: &[Hash],
) -> Result<ChunkState, Error> {
	let (poseidon_mmr, keccak_mmr) = state.to_mmrs()?;
	let (poseidon_mmr, keccak_mmr) = thread::scope(|s| -> Result<_, Error> {
		let poseidon = thread::Builder::new()
			.name("poseidon_mmr".to_string())
			.spawn_scoped(s, move || extend(poseidon_mmr, poseidon_leaves))?;
		let keccak = thread::Builder::new()
			.name("keccak_mmr".to_string())
			.spawn_scoped(s, move || extend(keccak_mmr, keccak_leaves))?;
		Ok((join(poseidon)?, join(keccak)?))
	})?;
	ChunkState::from_mmrs(&poseidon_mmr, &keccak_mmr)
}

/// Drives the accumulator over successive chunks. The running state only
/// changes when a chunk commits.
pub struct ChunkPlanner {
	config: PlannerConfig,
	source: Arc<dyn HeaderSource>,
	store: Option<ChunkStore>,
	state: ChunkState,
	status: PlannerStatus,
	stop: Arc<AtomicBool>,
}

impl ChunkPlanner {
	/// Planner starting from the provided state, which is checked for
	/// consistency first.
	pub fn new(
		config: PlannerConfig,
		source: Arc<dyn HeaderSource>,
		state: ChunkState,
	) -> Result<ChunkPlanner, Error> {
		if config.batch_size == 0 {
			return Err(ErrorKind::InputRange("batch size must be positive".to_owned()).into());
		}
		state.validate()?;
		Ok(ChunkPlanner {
			config,
			source,
			store: None,
			state,
			status: PlannerStatus::Idle,
			stop: Arc::new(AtomicBool::new(false)),
		})
	}

	/// Persist chunk records and the running state in the provided store.
	pub fn with_store(mut self, store: ChunkStore) -> ChunkPlanner {
		self.store = Some(store);
		self
	}

	/// Last committed state
	pub fn state(&self) -> &ChunkState {
		&self.state
	}

	/// Where the planner is within the current chunk
	pub fn status(&self) -> PlannerStatus {
		self.status
	}

	/// The planner configuration
	pub fn config(&self) -> &PlannerConfig {
		&self.config
	}

	/// Flag that, once raised, stops `run` before its next chunk. The chunk
	/// in progress still commits.
	pub fn stop_handle(&self) -> Arc<AtomicBool> {
		self.stop.clone()
	}

	fn set_status(&mut self, status: PlannerStatus) {
		debug!("planner: {} -> {}", self.status, status);
		self.status = status;
	}

	fn guard<T>(&mut self, res: Result<T, Error>) -> Result<T, Error> {
		if let Err(ref e) = res {
			error!("planner: chunk failed: {}", e.kind());
			self.set_status(PlannerStatus::Failed);
		}
		res
	}

	/// Fetches the headers of a chunk plus the boundary header `high + 1`,
	/// ascending, checking none is missing.
	pub fn fetch_range(&mut self, high: u64, low: u64) -> Result<Vec<BlockHeader>, Error> {
		if high < low {
			return Err(ErrorKind::InputRange(format!("high {} below low {}", high, low)).into());
		}
		let boundary = high
			.checked_add(1)
			.ok_or_else(|| ErrorKind::InputRange(format!("no block above {}", high)))?;
		self.set_status(PlannerStatus::Fetching);
		let headers = self.source.fetch_headers(boundary, low)?;
		check_complete(&headers, boundary, low)?;
		Ok(headers)
	}

	/// Largest number of headers, taken newest first from the candidates,
	/// whose chunk stays within the Keccak budget. `header_lens` are the
	/// encoded lengths of the candidate headers, newest first, their count
	/// being the optimistic starting size.
	pub fn compute_dynamic_batch_size(&self, header_lens: &[usize]) -> Result<u64, Error> {
		if header_lens.is_empty() {
			return Err(ErrorKind::InputRange("no candidate headers".to_owned()).into());
		}
		let budget = self.config.keccak_budget;
		let mut size = header_lens.len();
		loop {
			let ops = simulate_keccak_ops(self.state.size, &header_lens[..size])?;
			if ops <= budget {
				debug!(
					"dynamic batch: {} headers for {} keccak ops (budget {})",
					size, ops, budget
				);
				return Ok(size as u64);
			}
			if size == 1 {
				return Err(ErrorKind::BudgetExceeded(ops).into());
			}
			size -= 1;
		}
	}

	/// Processes the chunk `low..=high` from the current state and commits.
	pub fn process_chunk(&mut self, high: u64, low: u64) -> Result<ChunkOutput, Error> {
		let res = self
			.fetch_range(high, low)
			.and_then(|headers| self.apply(high, low, headers));
		self.guard(res)
	}

	/// Processes chunks from `from_high` down to `to_low`, fixed or dynamic
	/// size per the configuration, and returns the committed outputs. Stops
	/// at the first failure, leaving the last committed state in place, or
	/// early when the stop flag is raised.
	pub fn run(&mut self, from_high: u64, to_low: u64) -> Result<Vec<ChunkOutput>, Error> {
		if from_high < to_low {
			return Err(ErrorKind::InputRange(format!(
				"from {} below to {}",
				from_high, to_low
			))
			.into());
		}
		info!(
			"planner: processing blocks {} down to {} from mmr size {}",
			from_high, to_low, self.state.size
		);

		let mut outputs = vec![];
		let mut high = from_high;
		loop {
			if self.stop.load(Ordering::SeqCst) {
				warn!("planner: stopped before block {}", high);
				self.set_status(PlannerStatus::Idle);
				break;
			}
			let res = self.next_chunk(high, to_low);
			let output = self.guard(res)?;
			let low = output.to_block_number_low;
			outputs.push(output);
			if low == to_low {
				break;
			}
			high = low - 1;
		}
		info!(
			"planner: {} chunks committed, mmr size {}",
			outputs.len(),
			self.state.size
		);
		Ok(outputs)
	}

	fn next_chunk(&mut self, high: u64, to_low: u64) -> Result<ChunkOutput, Error> {
		let optimistic = cmp::min(self.config.batch_size, high - to_low + 1);
		let mut low = high - optimistic + 1;
		let mut headers = self.fetch_range(high, low)?;

		if self.config.dynamic_batch_size {
			// candidates newest first, boundary header excluded
			let lens: Vec<usize> = headers[..headers.len() - 1]
				.iter()
				.rev()
				.map(|h| h.canonicalize().len())
				.collect();
			let size = self.compute_dynamic_batch_size(&lens)?;
			headers.drain(..(optimistic - size) as usize);
			low = high - size + 1;
		}
		self.apply(high, low, headers)
	}

	fn check_headers(&self, headers: &[BlockHeader]) -> Result<(), Error> {
		for header in headers {
			if let Some(kind) = self.config.chain_type.header_kind_at(header.number) {
				if kind != header.kind() {
					return Err(ErrorKind::InvalidChain(format!(
						"block {} is a {} header, {} expected",
						header.number,
						header.kind(),
						kind
					))
					.into());
				}
			}
		}
		Ok(())
	}

	// headers are low..=high+1 ascending
	fn apply(&mut self, high: u64, low: u64, headers: Vec<BlockHeader>) -> Result<ChunkOutput, Error> {
		self.check_headers(&headers)?;
		let name = store::chunk_name(high, low);

		let boundary = &headers[headers.len() - 1];
		let oldest = &headers[0];
		let in_range: Vec<&BlockHeader> = headers[..headers.len() - 1].iter().rev().collect();
		let encoded: Vec<Vec<u8>> = in_range.iter().map(|h| h.canonicalize()).collect();

		let input = self.build_input(high, low, boundary, &encoded);
		if let Some(ref store) = self.store {
			store.write_input(&name, &input)?;
		}

		self.set_status(PlannerStatus::Hashing);
		let (poseidon_leaves, keccak_leaves) = hash_headers(&encoded)?;

		// keccak leaves are block hashes, each must be the parent hash of the
		// block above it
		let parents = headers[1..].iter().rev().map(|h| h.parent_hash);
		for ((header, leaf), parent_hash) in in_range.iter().zip(&keccak_leaves).zip(parents) {
			if *leaf != parent_hash {
				return Err(ErrorKind::InvalidChain(format!(
					"block {} hashes to {} but block {} has parent {}",
					header.number,
					leaf,
					header.number + 1,
					parent_hash
				))
				.into());
			}
		}

		self.set_status(PlannerStatus::Extending);
		let new_state = extend_state(&self.state, &poseidon_leaves, &keccak_leaves)?;

		let (n_plus_one_low, n_plus_one_high) = halves(&boundary.parent_hash);
		let (r_low, r_high) = halves(&oldest.parent_hash);
		let (last_keccak_low, last_keccak_high) = halves(&self.state.root.keccak);
		let (new_keccak_low, new_keccak_high) = halves(&new_state.root.keccak);
		let output = ChunkOutput {
			from_block_number_high: high,
			to_block_number_low: low,
			block_n_plus_one_parent_hash_low: n_plus_one_low,
			block_n_plus_one_parent_hash_high: n_plus_one_high,
			block_n_minus_r_plus_one_parent_hash_low: r_low,
			block_n_minus_r_plus_one_parent_hash_high: r_high,
			mmr_last_root_poseidon: self.state.root.poseidon,
			mmr_last_root_keccak_low: last_keccak_low,
			mmr_last_root_keccak_high: last_keccak_high,
			mmr_last_len: self.state.size,
			new_mmr_root_poseidon: new_state.root.poseidon,
			new_mmr_root_keccak_low: new_keccak_low,
			new_mmr_root_keccak_high: new_keccak_high,
			new_mmr_len: new_state.size,
		};

		// an external mismatch must fail the chunk before anything is committed
		self.verify(&name, &output)?;

		// commit
		if let Some(ref store) = self.store {
			store.write_output(&name, &output)?;
			store.write_state(&new_state)?;
		}
		self.state = new_state;
		self.set_status(PlannerStatus::Committed);
		info!(
			"planner: committed {}, mmr size {} -> {}",
			name, output.mmr_last_len, output.new_mmr_len
		);
		Ok(output)
	}

	fn build_input(
		&self,
		high: u64,
		low: u64,
		boundary: &BlockHeader,
		encoded: &[Vec<u8>],
	) -> ChunkInput {
		let (last_keccak_low, last_keccak_high) = halves(&self.state.root.keccak);
		let (little_low, little_high) = halves(&boundary.parent_hash.reversed());
		ChunkInput {
			from_block_number_high: high,
			to_block_number_low: low,
			mmr_last_len: self.state.size,
			mmr_last_root_poseidon: self.state.root.poseidon,
			mmr_last_root_keccak_low: last_keccak_low,
			mmr_last_root_keccak_high: last_keccak_high,
			poseidon_mmr_last_peaks: self.state.peaks.poseidon.clone(),
			keccak_mmr_last_peaks: self
				.state
				.peaks
				.keccak
				.iter()
				.map(|p| {
					let (low, high) = halves(p);
					[low, high]
				})
				.collect(),
			block_n_plus_one_parent_hash_little_low: little_low,
			block_n_plus_one_parent_hash_little_high: little_high,
			block_headers_array: encoded
				.iter()
				.map(|bytes| to_limbs(bytes, Endianness::Little))
				.collect(),
			bytes_len_array: encoded.iter().map(|bytes| bytes.len()).collect(),
		}
	}

	// checks a chunk output against an externally computed one, if one was
	// dropped in the verification directory
	fn verify(&self, name: &str, output: &ChunkOutput) -> Result<(), Error> {
		let dir = match self.config.verify_dir {
			Some(ref dir) => dir,
			None => return Ok(()),
		};
		let path = Path::new(dir).join(format!("{}_output.json", name));
		if !path.exists() {
			warn!("planner: no external output to verify {} against", name);
			return Ok(());
		}
		let actual: ChunkOutput = store::load_json(&path)?;
		checker::check(output, &actual)
	}
}
