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

#[macro_use]
extern crate pretty_assertions;

mod chain_test_helper;

use self::chain::types::{halves, Hex128};
use self::chain::{
	ChunkPlanner, ChunkState, ChunkStore, ErrorKind, MemorySource, PlannerStatus,
};
use self::chain_test_helper::{linked_chain, planner, test_config};
use self::core::core::hash::{HashAlgorithm, KeccakHasher, PoseidonHasher};
use self::core::core::pmmr::{self, MMR};
use self::core::global::ChainTypes;
use self::core::ser::{to_limbs, Endianness};
use hmmr_chain as chain;
use hmmr_core as core;
use hmmr_util as util;
use std::sync::atomic::Ordering;
use std::sync::Arc;

#[test]
fn end_to_end_chunk() {
	util::init_test_logger();
	let mut planner = planner(test_config(3), 101, 104);
	let genesis = planner.state().clone();
	assert_eq!(planner.status(), PlannerStatus::Idle);

	let output = planner.process_chunk(103, 101).unwrap();
	assert_eq!(planner.status(), PlannerStatus::Committed);
	assert_eq!(output.from_block_number_high, 103);
	assert_eq!(output.to_block_number_low, 101);
	assert_eq!(output.mmr_last_len, 1);
	// genesis leaf plus three headers
	assert_eq!(output.new_mmr_len, 7);
	assert_eq!(pmmr::n_leaves(output.new_mmr_len), 4);

	// same extension done by hand, newest header first
	let headers = linked_chain(101, 104);
	let mut poseidon =
		MMR::from_peaks(PoseidonHasher::new(), 1, &genesis.peaks.poseidon).unwrap();
	let mut keccak = MMR::from_peaks(KeccakHasher::new(), 1, &genesis.peaks.keccak).unwrap();
	for h in headers[..3].iter().rev() {
		let bytes = h.canonicalize();
		poseidon
			.add(PoseidonHasher::new().hash_header(&bytes).unwrap())
			.unwrap();
		keccak.add(KeccakHasher::new().hash_header(&bytes).unwrap()).unwrap();
	}
	let state = planner.state();
	assert_eq!(state.size, 7);
	assert_eq!(state.root.poseidon, poseidon.root().unwrap());
	assert_eq!(state.root.keccak, keccak.root().unwrap());
	assert_eq!(state.peaks.poseidon, poseidon.peaks().unwrap());
	assert_eq!(state.peaks.keccak, keccak.peaks().unwrap());
	assert_eq!(output.new_mmr_root_poseidon, state.root.poseidon);
	let (low, high) = halves(&state.root.keccak);
	assert_eq!(output.new_mmr_root_keccak_low, low);
	assert_eq!(output.new_mmr_root_keccak_high, high);

	// prior state carried over
	assert_eq!(output.mmr_last_root_poseidon, genesis.root.poseidon);
	let (low, high) = genesis.root.keccak.split_128();
	assert_eq!(output.mmr_last_root_keccak_low, Hex128(low));
	assert_eq!(output.mmr_last_root_keccak_high, Hex128(high));

	// boundary hashes: parent of 104 is the hash of 103, and parent of 101
	assert_eq!(headers[3].parent_hash, headers[2].hash());
	let (low, high) = headers[2].hash().split_128();
	assert_eq!(output.block_n_plus_one_parent_hash_low, Hex128(low));
	assert_eq!(output.block_n_plus_one_parent_hash_high, Hex128(high));
	let (low, high) = headers[0].parent_hash.split_128();
	assert_eq!(output.block_n_minus_r_plus_one_parent_hash_low, Hex128(low));
	assert_eq!(output.block_n_minus_r_plus_one_parent_hash_high, Hex128(high));

	// consistency against the expectation, then with one field mutated
	let expected = output.clone();
	chain::check(&expected, &output).unwrap();
	let mut mutated = output.clone();
	mutated.new_mmr_root_keccak_high = Hex128(mutated.new_mmr_root_keccak_high.0 ^ 1);
	match chain::check(&expected, &mutated) {
		Err(e) => assert_eq!(
			e.kind(),
			ErrorKind::ConsistencyMismatch("new_mmr_root_keccak_high".to_owned())
		),
		Ok(_) => panic!("mutated output passed the check"),
	}
	let mut mutated = output.clone();
	mutated.mmr_last_len = 2;
	match chain::check(&expected, &mutated) {
		Err(e) => assert_eq!(
			e.kind(),
			ErrorKind::ConsistencyMismatch("mmr_last_len".to_owned())
		),
		Ok(_) => panic!("mutated output passed the check"),
	}
}

#[test]
fn chunked_equals_single_chunk() {
	util::init_test_logger();
	let mut chunked = planner(test_config(3), 101, 111);
	let outputs = chunked.run(110, 101).unwrap();
	let ranges: Vec<(u64, u64)> = outputs
		.iter()
		.map(|o| (o.from_block_number_high, o.to_block_number_low))
		.collect();
	assert_eq!(ranges, vec![(110, 108), (107, 105), (104, 102), (101, 101)]);
	for pair in outputs.windows(2) {
		assert_eq!(pair[0].new_mmr_len, pair[1].mmr_last_len);
		assert_eq!(pair[0].new_mmr_root_poseidon, pair[1].mmr_last_root_poseidon);
	}

	let mut single = planner(test_config(10), 101, 111);
	let outputs = single.run(110, 101).unwrap();
	assert_eq!(outputs.len(), 1);
	assert_eq!(chunked.state(), single.state());
	assert_eq!(pmmr::n_leaves(single.state().size), 11);
}

#[test]
fn resume_from_saved_state() {
	util::init_test_logger();
	let dir = tempfile::tempdir().unwrap();
	let store = ChunkStore::new(dir.path()).unwrap();

	let mut first = planner(test_config(4), 101, 109).with_store(store.clone());
	first.run(108, 105).unwrap();
	let saved = store.read_state().unwrap().unwrap();
	assert_eq!(&saved, first.state());

	let source = MemorySource::new(linked_chain(101, 109));
	let mut second = ChunkPlanner::new(test_config(4), Arc::new(source), saved).unwrap();
	second.run(104, 101).unwrap();

	let mut whole = planner(test_config(8), 101, 109);
	whole.run(108, 101).unwrap();
	assert_eq!(second.state(), whole.state());
}

#[test]
fn chunk_records() {
	util::init_test_logger();
	let dir = tempfile::tempdir().unwrap();
	let store = ChunkStore::new(dir.path()).unwrap();
	let mut planner = planner(test_config(3), 101, 104).with_store(store.clone());
	let genesis = planner.state().clone();
	let output = planner.process_chunk(103, 101).unwrap();

	let headers = linked_chain(101, 104);
	let input = store.read_input("chunk_103_101").unwrap();
	assert_eq!(input.from_block_number_high, 103);
	assert_eq!(input.to_block_number_low, 101);
	assert_eq!(input.mmr_last_len, 1);
	assert_eq!(input.poseidon_mmr_last_peaks, genesis.peaks.poseidon);
	let (low, high) = halves(&genesis.peaks.keccak[0]);
	assert_eq!(input.keccak_mmr_last_peaks, vec![[low, high]]);

	let newest_first: Vec<Vec<u8>> = headers[..3].iter().rev().map(|h| h.canonicalize()).collect();
	assert_eq!(
		input.bytes_len_array,
		newest_first.iter().map(|b| b.len()).collect::<Vec<_>>()
	);
	assert_eq!(
		input.block_headers_array[0],
		to_limbs(&newest_first[0], Endianness::Little)
	);
	assert_eq!(input.block_headers_array.len(), 3);

	let (low, high) = halves(&headers[3].parent_hash.reversed());
	assert_eq!(input.block_n_plus_one_parent_hash_little_low, low);
	assert_eq!(input.block_n_plus_one_parent_hash_little_high, high);

	assert_eq!(store.read_output("chunk_103_101").unwrap(), output);
	assert_eq!(store.read_state().unwrap().as_ref(), Some(planner.state()));
}

#[test]
fn failed_chunk_keeps_state() {
	util::init_test_logger();

	// boundary header 104 missing
	let source = MemorySource::new(linked_chain(101, 103));
	let genesis = ChunkState::genesis().unwrap();
	let mut planner = ChunkPlanner::new(test_config(3), Arc::new(source), genesis.clone()).unwrap();
	match planner.process_chunk(103, 101) {
		Err(e) => assert_eq!(
			e.kind(),
			ErrorKind::SourceIncomplete {
				expected: 4,
				actual: 3
			}
		),
		Ok(_) => panic!("chunk without boundary header committed"),
	}
	assert_eq!(planner.status(), PlannerStatus::Failed);
	assert_eq!(planner.state(), &genesis);

	// broken link between 101 and 102
	let mut headers = linked_chain(101, 104);
	headers[1].parent_hash = headers[1].state_root;
	let source = MemorySource::new(headers);
	let mut planner = ChunkPlanner::new(test_config(3), Arc::new(source), genesis.clone()).unwrap();
	match planner.process_chunk(103, 101) {
		Err(e) => match e.kind() {
			ErrorKind::InvalidChain(_) => {}
			k => panic!("unexpected error {:?}", k),
		},
		Ok(_) => panic!("unlinked chunk committed"),
	}
	assert_eq!(planner.status(), PlannerStatus::Failed);
	assert_eq!(planner.state(), &genesis);

	// London headers where mainnet expects legacy ones
	let mut config = test_config(3);
	config.chain_type = ChainTypes::Mainnet;
	let source = MemorySource::new(linked_chain(101, 104));
	let mut planner = ChunkPlanner::new(config, Arc::new(source), genesis.clone()).unwrap();
	match planner.process_chunk(103, 101) {
		Err(e) => match e.kind() {
			ErrorKind::InvalidChain(_) => {}
			k => panic!("unexpected error {:?}", k),
		},
		Ok(_) => panic!("misplaced layout committed"),
	}
	assert_eq!(planner.state(), &genesis);
}

#[test]
fn invalid_ranges() {
	util::init_test_logger();
	let mut planner = planner(test_config(3), 101, 104);
	match planner.process_chunk(101, 103) {
		Err(e) => match e.kind() {
			ErrorKind::InputRange(_) => {}
			k => panic!("unexpected error {:?}", k),
		},
		Ok(_) => panic!("inverted range committed"),
	}
	assert!(planner.run(101, 103).is_err());
	assert_eq!(planner.state().size, 1);

	let source = MemorySource::new(linked_chain(101, 104));
	let res = ChunkPlanner::new(test_config(0), Arc::new(source), ChunkState::genesis().unwrap());
	match res {
		Err(e) => match e.kind() {
			ErrorKind::InputRange(_) => {}
			k => panic!("unexpected error {:?}", k),
		},
		Ok(_) => panic!("zero batch size accepted"),
	}
}

#[test]
fn verify_against_external_outputs() {
	util::init_test_logger();
	let expected_dir = tempfile::tempdir().unwrap();
	let store = ChunkStore::new(expected_dir.path()).unwrap();
	let mut reference = planner(test_config(2), 101, 105).with_store(store.clone());
	reference.run(104, 101).unwrap();

	let mut config = test_config(2);
	config.verify_dir = Some(expected_dir.path().to_string_lossy().into_owned());
	let mut verified = planner(config.clone(), 101, 105);
	verified.run(104, 101).unwrap();

	// tamper with the second chunk's record
	let mut output = store.read_output("chunk_102_101").unwrap();
	output.new_mmr_len += 1;
	store.write_output("chunk_102_101", &output).unwrap();

	let out_dir = tempfile::tempdir().unwrap();
	let out_store = ChunkStore::new(out_dir.path()).unwrap();
	let mut verified = planner(config, 101, 105).with_store(out_store.clone());
	match verified.run(104, 101) {
		Err(e) => assert_eq!(
			e.kind(),
			ErrorKind::ConsistencyMismatch("new_mmr_len".to_owned())
		),
		Ok(_) => panic!("tampered record verified"),
	}
	assert_eq!(verified.status(), PlannerStatus::Failed);

	// the rejected chunk is not committed, in memory or on disk
	let mut first_only = planner(test_config(2), 101, 105);
	first_only.process_chunk(104, 103).unwrap();
	assert_eq!(verified.state(), first_only.state());
	assert_eq!(out_store.read_state().unwrap().as_ref(), Some(first_only.state()));
	assert!(out_store.read_output("chunk_104_103").is_ok());
	assert!(!out_store.output_path("chunk_102_101").exists());
}

#[test]
fn boundary_above_last_block() {
	util::init_test_logger();
	let mut planner = planner(test_config(2), 101, 104);
	match planner.fetch_range(u64::MAX, u64::MAX - 1) {
		Err(e) => match e.kind() {
			ErrorKind::InputRange(_) => {}
			k => panic!("unexpected error {:?}", k),
		},
		Ok(_) => panic!("fetched past the last block number"),
	}
	assert_eq!(planner.state(), &ChunkState::genesis().unwrap());
}

#[test]
fn stop_before_next_chunk() {
	util::init_test_logger();
	let mut planner = planner(test_config(2), 101, 105);
	planner.stop_handle().store(true, Ordering::SeqCst);
	let outputs = planner.run(104, 101).unwrap();
	assert!(outputs.is_empty());
	assert_eq!(planner.status(), PlannerStatus::Idle);
	assert_eq!(planner.state(), &ChunkState::genesis().unwrap());

	planner.stop_handle().store(false, Ordering::SeqCst);
	assert_eq!(planner.run(104, 101).unwrap().len(), 2);
}
