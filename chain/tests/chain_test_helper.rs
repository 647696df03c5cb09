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

#![allow(dead_code)]

use self::chain::{ChunkPlanner, ChunkState, MemorySource, PlannerConfig};
use self::core::core::hash::Hash;
use self::core::core::header::{BlockHeader, HeaderVersion, BLOOM_LEN};
use self::core::global::ChainTypes;
use hmmr_chain as chain;
use hmmr_core as core;
use std::sync::Arc;

/// A London header whose fields derive from the block number, parent hash
/// left for the caller to link.
pub fn header(number: u64) -> BlockHeader {
	let mut bloom = vec![0; BLOOM_LEN];
	bloom[(number % BLOOM_LEN as u64) as usize] = 0x80;
	BlockHeader {
		parent_hash: Hash::default(),
		uncles_hash: Hash::from_u64(1),
		coinbase: [(number % 251) as u8; 20],
		state_root: Hash::from_u64(number * 3),
		transactions_root: Hash::from_u64(number * 5),
		receipts_root: Hash::from_u64(number * 7),
		logs_bloom: bloom,
		difficulty: 0,
		number,
		gas_limit: 30_000_000,
		gas_used: 21_000 * (number % 100),
		timestamp: 1_650_000_000 + 12 * number,
		// extra data of varying length, so encoded sizes differ
		extra_data: vec![0x5a; (number % 33) as usize],
		mix_hash: Hash::from_u64(number * 11),
		nonce: [0; 8],
		version: HeaderVersion::London {
			base_fee_per_gas: 1_000_000_000 + number as u128,
		},
	}
}

/// Headers `low..=high` ascending, each one's parent hash set to the hash
/// of the previous one.
pub fn linked_chain(low: u64, high: u64) -> Vec<BlockHeader> {
	let mut parent = Hash::from_u64(0xabcd_0000 + low);
	let mut headers = vec![];
	for number in low..=high {
		let mut h = header(number);
		h.parent_hash = parent;
		parent = h.hash();
		headers.push(h);
	}
	headers
}

/// Config over a synthetic chain, no fork schedule and nothing persisted.
pub fn test_config(batch_size: u64) -> PlannerConfig {
	PlannerConfig {
		chain_type: ChainTypes::AutomatedTesting,
		batch_size,
		..PlannerConfig::default()
	}
}

/// Planner from genesis over the linked chain `low..=high`.
pub fn planner(config: PlannerConfig, low: u64, high: u64) -> ChunkPlanner {
	let source = MemorySource::new(linked_chain(low, high));
	ChunkPlanner::new(config, Arc::new(source), ChunkState::genesis().unwrap()).unwrap()
}
