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

//! Common test functions

#![allow(dead_code)]

use hmmr_core::core::hash::Hash;
use hmmr_core::core::header::{BlockHeader, HeaderKind, HeaderVersion, BLOOM_LEN};
use hmmr_util as util;

/// The mainnet genesis header, hash
/// 0xd4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3
pub fn mainnet_genesis() -> BlockHeader {
	let h = |s: &str| Hash::from_hex(s).unwrap();
	let mut nonce = [0; 8];
	nonce[7] = 0x42;
	BlockHeader {
		parent_hash: Hash::default(),
		uncles_hash: h("0x1dcc4de8dec75d7aab85b567b6ccd41ad312451b948a7413f0a142fd40d49347"),
		coinbase: [0; 20],
		state_root: h("0xd7f8974fb5ac78d9ac099b9ad5018bedc2ce0a72dad1827a1709da30580f0544"),
		transactions_root: h("0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"),
		receipts_root: h("0x56e81f171bcc55a6ff8345e692c0f86e5b48e01b996cadc001622fb5e363b421"),
		logs_bloom: vec![0; BLOOM_LEN],
		difficulty: 0x4_0000_0000,
		number: 0,
		gas_limit: 5000,
		gas_used: 0,
		timestamp: 0,
		extra_data: util::from_hex(
			"0x11bbe8db4e347b4e8c937c1c8370e4b5ed33adb3db69cbdb7a38e1e50b1b82fa",
		)
		.unwrap(),
		mix_hash: Hash::default(),
		nonce,
		version: HeaderVersion::Legacy,
	}
}

/// A deterministic header of the requested layout, with every field
/// derived from the block number.
pub fn sample_header(number: u64, kind: HeaderKind) -> BlockHeader {
	let mut bloom = vec![0; BLOOM_LEN];
	bloom[(number % BLOOM_LEN as u64) as usize] = 0xff;
	let version = match kind {
		HeaderKind::Legacy => HeaderVersion::Legacy,
		HeaderKind::London => HeaderVersion::London {
			base_fee_per_gas: 7 + number as u128,
		},
		HeaderKind::Shanghai => HeaderVersion::Shanghai {
			base_fee_per_gas: 7 + number as u128,
			withdrawals_root: Hash::from_u64(number * 31),
		},
	};
	BlockHeader {
		parent_hash: Hash::from_u64(number.wrapping_sub(1)),
		uncles_hash: Hash::from_u64(1),
		coinbase: [number as u8; 20],
		state_root: Hash::from_u64(number * 3),
		transactions_root: Hash::from_u64(number * 5),
		receipts_root: Hash::from_u64(number * 7),
		logs_bloom: bloom,
		difficulty: 0,
		number,
		gas_limit: 30_000_000,
		gas_used: 1_000 * number,
		timestamp: 1_681_338_455 + 12 * number,
		extra_data: b"hmmr test".to_vec(),
		mix_hash: Hash::from_u64(number * 11),
		nonce: [0; 8],
		version,
	}
}
