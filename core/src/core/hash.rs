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

//! Hash Functions
//!
//! The accumulator is computed in lock-step under two hash functions: Poseidon
//! over the Stark field and Keccak-256 over bytes. Both are driven through the
//! same accumulate-then-finalize contract, a third mock implementation only
//! counts operations and is used to size batches.

use std::cmp::min;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::{fmt, ops};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use starknet_crypto::{poseidon_hash, poseidon_hash_many, poseidon_hash_single, Felt};
use tiny_keccak::{Hasher, Keccak};

use crate::global::KECCAK_RATE;
use crate::ser::{to_limbs, Endianness};
use crate::util;

/// A hash consisting of all zeroes, used as a sentinel. No known preimage.
pub const ZERO_HASH: Hash = Hash([0; 32]);

/// The Stark field prime `2^251 + 17 * 2^192 + 1`, big-endian. Poseidon
/// digests are strictly below it.
pub const STARK_PRIME: Hash = Hash([
	0x08, 0, 0, 0, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
	0, 0, 0x01,
]);

/// A 256 bit digest, stored big-endian. Either a Stark field element or a
/// Keccak-256 output, values from different algorithms are not comparable.
#[derive(Copy, Clone, PartialEq, PartialOrd, Eq, Ord, Hash, Default)]
pub struct Hash(pub [u8; 32]);

impl fmt::Debug for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let hash_hex = self.to_hex();
		const NUM_SHOW: usize = 12;

		write!(f, "{}", &hash_hex[..NUM_SHOW])
	}
}

impl fmt::Display for Hash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", self.to_hex())
	}
}

impl Hash {
	/// Size of a hash in bytes.
	pub const LEN: usize = 32;

	/// Builds a Hash from a byte vector. If the vector is too short, it will be
	/// completed by zeroes on the left (big-endian). Longer vectors keep their
	/// least significant 32 bytes.
	pub fn from_vec(v: &[u8]) -> Hash {
		let mut h = [0; Hash::LEN];
		let copy_size = min(v.len(), Hash::LEN);
		h[Hash::LEN - copy_size..].copy_from_slice(&v[v.len() - copy_size..]);
		Hash(h)
	}

	/// Builds a Hash holding a small integer.
	pub fn from_u64(v: u64) -> Hash {
		let mut h = [0; Hash::LEN];
		h[Hash::LEN - 8..].copy_from_slice(&v.to_be_bytes());
		Hash(h)
	}

	/// Builds a Hash from its low and high 128 bit halves.
	pub fn from_halves(low: u128, high: u128) -> Hash {
		let mut h = [0; Hash::LEN];
		h[..16].copy_from_slice(&high.to_be_bytes());
		h[16..].copy_from_slice(&low.to_be_bytes());
		Hash(h)
	}

	/// Splits the hash into its `(low, high)` 128 bit halves.
	pub fn split_128(&self) -> (u128, u128) {
		let mut high = [0; 16];
		let mut low = [0; 16];
		high.copy_from_slice(&self.0[..16]);
		low.copy_from_slice(&self.0[16..]);
		(u128::from_be_bytes(low), u128::from_be_bytes(high))
	}

	/// The same 32 bytes read as a little-endian integer.
	pub fn reversed(&self) -> Hash {
		let mut h = self.0;
		h.reverse();
		Hash(h)
	}

	/// Converts the hash to a byte vector
	pub fn to_vec(&self) -> Vec<u8> {
		self.0.to_vec()
	}

	/// Returns a byte slice of the hash contents.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Convert a hash to hex string format, without prefix.
	pub fn to_hex(&self) -> String {
		util::to_hex(&self.0)
	}

	/// Convert hex string back to hash. Accepts an optional `0x` prefix and
	/// short (unpadded) quantities.
	pub fn from_hex(hex: &str) -> Result<Hash, Error> {
		let bytes = util::from_hex(hex).map_err(|_| Error::InvalidHex(hex.to_owned()))?;
		if bytes.len() > Hash::LEN {
			return Err(Error::InvalidHex(hex.to_owned()));
		}
		Ok(Hash::from_vec(&bytes))
	}

	/// Whether the digest is a canonical Stark field element, i.e. would not
	/// be reduced when fed to Poseidon.
	pub fn is_field_element(&self) -> bool {
		*self < STARK_PRIME
	}

	fn to_felt(&self) -> Felt {
		Felt::from_bytes_be(&self.0)
	}

	fn from_felt(felt: &Felt) -> Hash {
		Hash(felt.to_bytes_be())
	}
}

impl ops::Index<ops::Range<usize>> for Hash {
	type Output = [u8];

	fn index(&self, idx: ops::Range<usize>) -> &[u8] {
		&self.0[idx]
	}
}

impl AsRef<[u8]> for Hash {
	fn as_ref(&self) -> &[u8] {
		&self.0
	}
}

impl Serialize for Hash {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

impl<'de> Deserialize<'de> for Hash {
	fn deserialize<D>(deserializer: D) -> Result<Hash, D::Error>
	where
		D: Deserializer<'de>,
	{
		let s = String::deserialize(deserializer)?;
		Hash::from_hex(&s).map_err(de::Error::custom)
	}
}

/// Errors raised while hashing
#[derive(Clone, Debug, Eq, PartialEq, Fail)]
pub enum Error {
	/// Nothing was accumulated before asking for a digest
	#[fail(display = "Hash buffer is empty")]
	EmptyBuffer,
	/// Not a valid hex encoded digest
	#[fail(display = "Invalid hex digest: {}", _0)]
	InvalidHex(String),
}

/// Incremental hashing contract shared by all algorithms. An accumulator is a
/// value: `update` appends to it and `digest` consumes it, so every logical
/// hash operation starts from a `fresh` instance of the algorithm.
pub trait HashAlgorithm: Clone + Send + Sync + fmt::Debug {
	/// Short name of the algorithm, used in logs.
	fn name(&self) -> &'static str;

	/// A new, empty accumulator of the same algorithm. State that is shared
	/// between operations (such as a counter) is carried over.
	fn fresh(&self) -> Self;

	/// Appends a value to the accumulator.
	fn update(&mut self, value: &Hash);

	/// Finalizes the accumulated values into a digest.
	fn digest(self) -> Result<Hash, Error>;

	/// Digest of a canonically encoded block header, used as MMR leaf.
	fn hash_header(&self, bytes: &[u8]) -> Result<Hash, Error>;

	/// Digest of an ordered pair, used for MMR parents and root bagging.
	fn hash_pair(&self, left: &Hash, right: &Hash) -> Result<Hash, Error> {
		let mut hasher = self.fresh();
		hasher.update(left);
		hasher.update(right);
		hasher.digest()
	}
}

/// Poseidon over the Stark field. Values are reduced into the field as they
/// are accumulated.
#[derive(Clone, Debug, Default)]
pub struct PoseidonHasher {
	buffer: Vec<Felt>,
}

impl PoseidonHasher {
	/// New empty Poseidon accumulator
	pub fn new() -> PoseidonHasher {
		PoseidonHasher { buffer: vec![] }
	}
}

impl HashAlgorithm for PoseidonHasher {
	fn name(&self) -> &'static str {
		"poseidon"
	}

	fn fresh(&self) -> PoseidonHasher {
		PoseidonHasher::new()
	}

	fn update(&mut self, value: &Hash) {
		self.buffer.push(value.to_felt());
	}

	fn digest(self) -> Result<Hash, Error> {
		let felt = match self.buffer.len() {
			0 => return Err(Error::EmptyBuffer),
			1 => poseidon_hash_single(self.buffer[0]),
			2 => poseidon_hash(self.buffer[0], self.buffer[1]),
			_ => poseidon_hash_many(&self.buffer),
		};
		Ok(Hash::from_felt(&felt))
	}

	/// Poseidon over the little-endian 64 bit limbs of the header bytes.
	fn hash_header(&self, bytes: &[u8]) -> Result<Hash, Error> {
		let mut hasher = self.fresh();
		for limb in to_limbs(bytes, Endianness::Little) {
			hasher.buffer.push(Felt::from(limb));
		}
		hasher.digest()
	}
}

/// Keccak-256, the Ethereum flavour (original padding, not SHA3).
#[derive(Clone, Debug, Default)]
pub struct KeccakHasher {
	buffer: Vec<u8>,
}

impl KeccakHasher {
	/// New empty Keccak accumulator
	pub fn new() -> KeccakHasher {
		KeccakHasher { buffer: vec![] }
	}
}

impl HashAlgorithm for KeccakHasher {
	fn name(&self) -> &'static str {
		"keccak"
	}

	fn fresh(&self) -> KeccakHasher {
		KeccakHasher::new()
	}

	fn update(&mut self, value: &Hash) {
		self.buffer.extend_from_slice(value.as_bytes());
	}

	fn digest(self) -> Result<Hash, Error> {
		Ok(keccak256(&self.buffer))
	}

	fn hash_header(&self, bytes: &[u8]) -> Result<Hash, Error> {
		Ok(keccak256(bytes))
	}
}

/// Keccak-256 of the provided bytes.
pub fn keccak256(bytes: &[u8]) -> Hash {
	let mut keccak = Keccak::v256();
	let mut out = [0; 32];
	keccak.update(bytes);
	keccak.finalize(&mut out);
	Hash(out)
}

/// Counts hash operations instead of computing them. Every `digest` returns
/// the incremented counter, clones (and fresh instances) share the counter.
#[derive(Clone, Debug, Default)]
pub struct MockHasher {
	counter: Arc<AtomicU64>,
}

impl MockHasher {
	/// New mock hasher with a zeroed counter
	pub fn new() -> MockHasher {
		MockHasher {
			counter: Arc::new(AtomicU64::new(0)),
		}
	}

	/// Number of operations counted so far.
	pub fn count(&self) -> u64 {
		self.counter.load(Ordering::SeqCst)
	}

	/// Number of Keccak permutations needed to absorb `len` bytes.
	pub fn keccak_ops(len: usize) -> u64 {
		let len = len as u64;
		(len + KECCAK_RATE - 1) / KECCAK_RATE
	}
}

impl HashAlgorithm for MockHasher {
	fn name(&self) -> &'static str {
		"mock"
	}

	fn fresh(&self) -> MockHasher {
		self.clone()
	}

	fn update(&mut self, _value: &Hash) {}

	fn digest(self) -> Result<Hash, Error> {
		let count = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
		Ok(Hash::from_u64(count))
	}

	fn hash_header(&self, bytes: &[u8]) -> Result<Hash, Error> {
		let ops = MockHasher::keccak_ops(bytes.len());
		let count = self.counter.fetch_add(ops, Ordering::SeqCst) + ops;
		Ok(Hash::from_u64(count))
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn hash_halves() {
		let h = Hash::from_halves(7, 9);
		assert_eq!(h.split_128(), (7, 9));
		assert_eq!(h.0[15], 9);
		assert_eq!(h.0[31], 7);
		assert_eq!(Hash::from_u64(5).split_128(), (5, 0));
	}

	#[test]
	fn hash_hex() {
		let h = Hash::from_u64(0xabcd);
		assert_eq!(
			h.to_string(),
			"0x000000000000000000000000000000000000000000000000000000000000abcd"
		);
		assert_eq!(Hash::from_hex("0xabcd").unwrap(), h);
		assert_eq!(Hash::from_hex(&h.to_string()).unwrap(), h);
		assert!(Hash::from_hex("0xzz").is_err());
		assert!(Hash::from_hex(&format!("0x{}00", h.to_hex())).is_err());
	}

	#[test]
	fn keccak_empty() {
		// well known Keccak-256 of the empty string
		assert_eq!(
			KeccakHasher::new().digest().unwrap().to_hex(),
			"c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
		);
	}

	#[test]
	fn field_elements() {
		let mut below = STARK_PRIME;
		below.0[31] = 0;
		assert!(below.is_field_element());
		assert!(!STARK_PRIME.is_field_element());
		assert!(!Hash([0xff; 32]).is_field_element());
		let digest = PoseidonHasher::new().hash_header(&[1, 2, 3]).unwrap();
		assert!(digest.is_field_element());
		// most keccak outputs are above the prime
		assert!(!KeccakHasher::new().digest().unwrap().is_field_element());
	}

	#[test]
	fn poseidon_dispatch() {
		assert_eq!(PoseidonHasher::new().digest(), Err(Error::EmptyBuffer));

		let a = Hash::from_u64(1);
		let b = Hash::from_u64(2);
		let c = Hash::from_u64(3);

		let mut single = PoseidonHasher::new();
		single.update(&a);
		assert_eq!(
			single.digest().unwrap(),
			Hash::from_felt(&poseidon_hash_single(Felt::from(1u64)))
		);

		let pair = PoseidonHasher::new().hash_pair(&a, &b).unwrap();
		assert_eq!(
			pair,
			Hash::from_felt(&poseidon_hash(Felt::from(1u64), Felt::from(2u64)))
		);

		let mut many = PoseidonHasher::new();
		many.update(&a);
		many.update(&b);
		many.update(&c);
		let felts = vec![Felt::from(1u64), Felt::from(2u64), Felt::from(3u64)];
		assert_eq!(
			many.digest().unwrap(),
			Hash::from_felt(&poseidon_hash_many(&felts))
		);
	}

	#[test]
	fn mock_counts() {
		let mock = MockHasher::new();
		assert_eq!(mock.hash_pair(&ZERO_HASH, &ZERO_HASH).unwrap(), Hash::from_u64(1));
		let other = mock.fresh();
		assert_eq!(other.digest().unwrap(), Hash::from_u64(2));
		assert_eq!(mock.hash_header(&[0; 137]).unwrap(), Hash::from_u64(4));
		assert_eq!(mock.count(), 4);

		assert_eq!(MockHasher::keccak_ops(0), 0);
		assert_eq!(MockHasher::keccak_ops(136), 1);
		assert_eq!(MockHasher::keccak_ops(540), 4);
	}
}
