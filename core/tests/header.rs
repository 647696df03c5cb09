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

mod common;

use crate::common::{mainnet_genesis, sample_header};
use hmmr_core::core::hash::{HashAlgorithm, KeccakHasher, MockHasher, PoseidonHasher};
use hmmr_core::core::header::{BlockHeader, HeaderKind, RpcHeader};
use hmmr_core::global::{ChainTypes, GENESIS_SEED};
use hmmr_core::ser::{self, from_limbs, to_limbs, Endianness};

#[test]
fn mainnet_genesis_hash() {
	let genesis = mainnet_genesis();
	assert_eq!(genesis.kind(), HeaderKind::Legacy);
	assert_eq!(
		genesis.hash().to_hex(),
		"d4e56740f876aef8c010b86a40d5f56745a118d0906a34e69aec8c0db1cb8fa3"
	);
	// 15 fields, long list header
	let bytes = genesis.canonicalize();
	assert_eq!(bytes[0], 0xf9);
	assert_eq!(bytes.len(), 535);
}

#[test]
fn canonical_roundtrip_each_layout() {
	for kind in &[HeaderKind::Legacy, HeaderKind::London, HeaderKind::Shanghai] {
		let header = sample_header(17_034_871, *kind);
		let bytes = header.canonicalize();
		let decoded = BlockHeader::from_rlp(&bytes).unwrap();
		assert_eq!(decoded, header);
		assert_eq!(decoded.kind(), *kind);
		assert_eq!(decoded.canonicalize(), bytes);

		for e in &[Endianness::Little, Endianness::Big] {
			let limbs = to_limbs(&bytes, *e);
			assert_eq!(limbs.len(), (bytes.len() + 7) / 8);
			assert_eq!(from_limbs(&limbs, bytes.len(), *e).unwrap(), bytes);
		}
	}
}

#[test]
fn layouts_differ_by_trailing_fields() {
	let legacy = sample_header(5, HeaderKind::Legacy);
	let london = sample_header(5, HeaderKind::London);
	let shanghai = sample_header(5, HeaderKind::Shanghai);
	assert_eq!(legacy.fields().len(), 15);
	assert_eq!(london.fields().len(), 16);
	assert_eq!(shanghai.fields().len(), 17);
	assert_eq!(shanghai.fields()[16].0, "withdrawals_root");
	// base fee 12 is a single byte string, withdrawals root 33 bytes
	assert_eq!(london.canonicalize().len(), legacy.canonicalize().len() + 1);
	assert_eq!(shanghai.canonicalize().len(), london.canonicalize().len() + 33);
}

#[test]
fn rlp_rejects_garbage() {
	let bytes = sample_header(1, HeaderKind::London).canonicalize();
	assert!(BlockHeader::from_rlp(&bytes[..bytes.len() - 1]).is_err());
	// a string instead of a list
	assert!(BlockHeader::from_rlp(&[0x83, 1, 2, 3]).is_err());
	// list of 2 items
	match BlockHeader::from_rlp(&[0xc2, 0x01, 0x02]) {
		Err(ser::Error::UnexpectedData { .. }) => {}
		other => panic!("unexpected {:?}", other),
	}
}

#[test]
fn rpc_json_roundtrip() {
	for kind in &[HeaderKind::Legacy, HeaderKind::London, HeaderKind::Shanghai] {
		let header = sample_header(42, *kind);
		let rpc = RpcHeader::from(&header);
		let json = serde_json::to_string(&rpc).unwrap();
		assert!(json.contains("\"parentHash\""));
		assert!(json.contains("\"sha3Uncles\""));
		let back: RpcHeader = serde_json::from_str(&json).unwrap();
		assert_eq!(back.to_header().unwrap(), header);
	}
}

#[test]
fn rpc_hash_checked() {
	let header = sample_header(42, HeaderKind::London);
	let mut rpc = RpcHeader::from(&header);
	rpc.gas_used = "0x1".to_owned();
	assert!(rpc.to_header().is_err());
	rpc.hash = None;
	assert_eq!(rpc.to_header().unwrap().gas_used, 1);
}

#[test]
fn rpc_extra_members_ignored() {
	let genesis = mainnet_genesis();
	let mut value = serde_json::to_value(RpcHeader::from(&genesis)).unwrap();
	value["transactions"] = serde_json::json!([]);
	value["totalDifficulty"] = serde_json::json!("0x400000000");
	let rpc: RpcHeader = serde_json::from_value(value).unwrap();
	assert_eq!(rpc.to_header().unwrap(), genesis);
}

#[test]
fn header_limbs() {
	let bytes = mainnet_genesis().canonicalize();
	let limbs = to_limbs(&bytes, Endianness::Little);
	assert_eq!(limbs.len(), 67);
	assert_eq!(limbs[0] & 0xff, 0xf9);
	assert_eq!(from_limbs(&limbs, bytes.len(), Endianness::Little).unwrap(), bytes);
}

#[test]
fn header_leaf_digests() {
	let bytes = mainnet_genesis().canonicalize();
	assert_eq!(
		KeccakHasher::new().hash_header(&bytes).unwrap(),
		mainnet_genesis().hash()
	);

	// poseidon over the limbs matches accumulating them by hand
	let mut by_hand = PoseidonHasher::new();
	for limb in to_limbs(&bytes, Endianness::Little) {
		by_hand.update(&hmmr_core::core::hash::Hash::from_u64(limb));
	}
	assert_eq!(
		PoseidonHasher::new().hash_header(&bytes).unwrap(),
		by_hand.digest().unwrap()
	);
	assert!(PoseidonHasher::new().hash_header(&[]).is_err());

	// 535 bytes absorb in 4 keccak permutations
	let mock = MockHasher::new();
	mock.hash_header(&bytes).unwrap();
	assert_eq!(mock.count(), 4);

	assert!(KeccakHasher::new().hash_header(GENESIS_SEED).is_ok());
}

#[test]
fn fork_schedule() {
	assert_eq!(ChainTypes::Mainnet.header_kind_at(0), Some(HeaderKind::Legacy));
	assert_eq!(
		ChainTypes::Mainnet.header_kind_at(12_965_000),
		Some(HeaderKind::London)
	);
	assert_eq!(
		ChainTypes::Mainnet.header_kind_at(17_034_870),
		Some(HeaderKind::Shanghai)
	);
	assert_eq!(ChainTypes::Sepolia.header_kind_at(1), Some(HeaderKind::London));
	assert_eq!(ChainTypes::AutomatedTesting.header_kind_at(1), None);
}
