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

use std::collections::HashMap;

use crate::core::hash::{self, Hash, HashAlgorithm, ZERO_HASH};

/// Errors raised by MMR operations
#[derive(Clone, Debug, PartialEq, Eq, Fail)]
pub enum Error {
	/// The underlying hash algorithm failed
	#[fail(display = "Hash error: {}", _0)]
	Hash(hash::Error),
	/// A node needed for the operation isn't stored
	#[fail(display = "No hash at position {}", _0)]
	MissingNode(u64),
	/// Seeding peaks don't match the peak positions of the size
	#[fail(display = "Expected {} peaks, got {}", expected, actual)]
	PeakCount {
		/// number of peaks of the size
		expected: usize,
		/// number of peaks provided
		actual: usize,
	},
	/// No MMR can have this many nodes
	#[fail(display = "Invalid MMR size {}", _0)]
	InvalidSize(u64),
	/// A stored parent isn't the hash of its children
	#[fail(display = "Invalid MMR, hash of parent at {} does not match children", _0)]
	InvalidParent(u64),
}

impl From<hash::Error> for Error {
	fn from(e: hash::Error) -> Error {
		Error::Hash(e)
	}
}

/// Append-only Merkle Mountain Range keeping every node digest it computed
/// (or was seeded with) in memory. All positions within the tree start at 0
/// just like array indices, a size n MMR has nodes 0 through n-1.
#[derive(Clone, Debug)]
pub struct MMR<H: HashAlgorithm> {
	hasher: H,
	size: u64,
	hashes: HashMap<u64, Hash>,
}

impl<H: HashAlgorithm> MMR<H> {
	/// Build a new empty MMR hashing with the provided algorithm.
	pub fn new(hasher: H) -> MMR<H> {
		MMR {
			hasher,
			size: 0,
			hashes: HashMap::new(),
		}
	}

	/// Build an MMR of the given size knowing only its peaks, ordered left to
	/// right. Enough to keep appending and to compute roots, not enough to
	/// fully validate.
	pub fn from_peaks(hasher: H, size: u64, peak_hashes: &[Hash]) -> Result<MMR<H>, Error> {
		if !is_valid_size(size) {
			return Err(Error::InvalidSize(size));
		}
		let peak_pos = peaks(size);
		if peak_pos.len() != peak_hashes.len() {
			return Err(Error::PeakCount {
				expected: peak_pos.len(),
				actual: peak_hashes.len(),
			});
		}
		let hashes = peak_pos
			.into_iter()
			.zip(peak_hashes.iter().cloned())
			.collect();
		Ok(MMR {
			hasher,
			size,
			hashes,
		})
	}

	/// Push a new leaf digest onto the MMR, merging equal height subtrees as
	/// far as they go. Returns the position of the new leaf.
	pub fn add(&mut self, leaf: Hash) -> Result<u64, Error> {
		let leaf_pos = self.size;
		self.hashes.insert(leaf_pos, leaf);
		self.size += 1;

		// a higher next position means we just completed a right child
		let mut height = 0;
		while bintree_postorder_height(self.size) > height {
			let pos = self.size;
			let left = self.get(pos - (2 << height))?;
			let right = self.get(pos - 1)?;
			let parent = self.hasher.hash_pair(&left, &right)?;
			self.hashes.insert(pos, parent);
			self.size += 1;
			height += 1;
		}
		trace!(
			"{} mmr: leaf at {}, size now {}",
			self.hasher.name(),
			leaf_pos,
			self.size
		);
		Ok(leaf_pos)
	}

	/// Digests of the peaks, left to right.
	pub fn peaks(&self) -> Result<Vec<Hash>, Error> {
		peaks(self.size).into_iter().map(|pos| self.get(pos)).collect()
	}

	/// Computes the root of the MMR. Find all the peaks in the current tree
	/// and "bags" them from right to left to get a single digest.
	pub fn root(&self) -> Result<Hash, Error> {
		if self.is_empty() {
			return Ok(ZERO_HASH);
		}
		let mut res = None;
		for peak in self.peaks()?.into_iter().rev() {
			res = match res {
				None => Some(peak),
				Some(rhash) => Some(self.hasher.hash_pair(&peak, &rhash)?),
			}
		}
		res.ok_or(Error::InvalidSize(self.size))
	}

	/// Walks all parent nodes and checks each is the hash of its children.
	/// Nodes dropped by seeding from peaks are skipped.
	pub fn validate(&self) -> Result<(), Error> {
		for n in 0..self.size {
			let height = bintree_postorder_height(n);
			if height == 0 {
				continue;
			}
			if let Some(hash) = self.get_hash(n) {
				let left_pos = n - (1 << height);
				let right_pos = n - 1;
				if let (Some(left), Some(right)) = (self.get_hash(left_pos), self.get_hash(right_pos)) {
					if self.hasher.hash_pair(&left, &right)? != hash {
						return Err(Error::InvalidParent(n));
					}
				}
			}
		}
		Ok(())
	}

	/// Get the hash at provided position in the MMR.
	pub fn get_hash(&self, pos: u64) -> Option<Hash> {
		self.hashes.get(&pos).cloned()
	}

	fn get(&self, pos: u64) -> Result<Hash, Error> {
		self.get_hash(pos).ok_or(Error::MissingNode(pos))
	}

	/// Total number of nodes, leaves and parents.
	pub fn size(&self) -> u64 {
		self.size
	}

	/// Position of the last node, None when empty.
	pub fn last_pos(&self) -> Option<u64> {
		self.size.checked_sub(1)
	}

	/// Is the MMR empty?
	pub fn is_empty(&self) -> bool {
		self.size == 0
	}

	/// Number of leaves in the MMR
	pub fn n_leaves(&self) -> u64 {
		n_leaves(self.size)
	}

	/// The hash algorithm of this MMR.
	pub fn hasher(&self) -> &H {
		&self.hasher
	}
}

fn all_ones(num: u64) -> bool {
	num != 0 && num.count_zeros() == num.leading_zeros()
}

fn bit_length(num: u64) -> u64 {
	64 - num.leading_zeros() as u64
}

/// Jump from a 1-based position to the same position in the left sibling
/// subtree, i.e. drop the most significant bit and subtract one less.
fn jump_left(pos: u64) -> u64 {
	let most_significant_bit = 1 << (bit_length(pos) - 1);
	pos - (most_significant_bit - 1)
}

/// The height of a node in a full binary tree from its postorder traversal
/// index. Works on the 1-based position, jumping left until we reach an all
/// ones number whose bit length gives the height.
pub fn bintree_postorder_height(pos0: u64) -> u64 {
	let mut pos = pos0 + 1;
	while !all_ones(pos) {
		pos = jump_left(pos);
	}
	bit_length(pos) - 1
}

/// Distance between a node and its sibling at the given height.
pub fn sibling_offset(height: u64) -> u64 {
	(2 << height) - 1
}

/// Height and position of the leftmost (and highest) peak of an MMR of the
/// given size, None for an empty MMR.
pub fn left_peak_height_pos(size: u64) -> Option<(u64, u64)> {
	if size == 0 {
		return None;
	}
	// leftmost node at each height is all ones in 1-based encoding
	let left_pos = |height: u64| (2 << height) - 2;
	let mut height = 0;
	let mut prev_pos = 0;
	let mut pos = left_pos(height);
	while pos < size {
		height += 1;
		prev_pos = pos;
		pos = left_pos(height);
	}
	Some((height - 1, prev_pos))
}

fn right_peak(mut height: u64, pos: u64, size: u64) -> Option<(u64, u64)> {
	// jump to right sibling, then down to its left child until inside
	let mut pos = pos + sibling_offset(height);
	while pos > size - 1 {
		if height == 0 {
			return None;
		}
		height -= 1;
		pos -= 2 << height;
	}
	Some((height, pos))
}

/// Gets the postorder traversal 0-based index of all peaks in a MMR given its
/// size. Starts with the top peak, which is always on the left side of the
/// range, and navigates toward lower siblings toward the right of the range.
pub fn peaks(size: u64) -> Vec<u64> {
	let (mut height, mut pos) = match left_peak_height_pos(size) {
		Some(left) => left,
		None => return vec![],
	};
	let mut res = vec![pos];
	while height > 0 {
		match right_peak(height, pos, size) {
			Some((h, p)) => {
				height = h;
				pos = p;
				res.push(pos);
			}
			None => break,
		}
	}
	res
}

/// Whether an MMR can have exactly this many nodes, i.e. the size splits into
/// perfect binary trees of strictly decreasing heights.
pub fn is_valid_size(mut size: u64) -> bool {
	if size == 0 {
		// rust can't shift right by 64
		return true;
	}
	let mut peak_size = u64::MAX >> size.leading_zeros();
	while peak_size != 0 {
		if size >= peak_size {
			size -= peak_size;
		}
		peak_size >>= 1;
	}
	size == 0
}

/// The number of leaves in a MMR of the provided size.
pub fn n_leaves(size: u64) -> u64 {
	peaks(size)
		.into_iter()
		.map(|pos| 1 << bintree_postorder_height(pos))
		.sum()
}

/// Returns the 0-based pmmr index of 0-based leaf index n
pub fn insertion_to_pmmr_index(nleaf0: u64) -> u64 {
	2 * nleaf0 - nleaf0.count_ones() as u64
}

/// Is this position a leaf in the MMR?
pub fn is_leaf(pos0: u64) -> bool {
	bintree_postorder_height(pos0) == 0
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn binary_helpers() {
		assert!(!all_ones(0));
		assert!(all_ones(1));
		assert!(all_ones(0b111));
		assert!(!all_ones(0b101));
		assert!(all_ones(u64::MAX));

		assert_eq!(jump_left(0b1000), 0b1);
		assert_eq!(jump_left(0b1010), 0b11);
		assert_eq!(bit_length(0b1010), 4);
	}

	#[test]
	fn right_peak_walk() {
		// size 11: peaks at 6, 9, 10
		assert_eq!(right_peak(2, 6, 11), Some((1, 9)));
		assert_eq!(right_peak(1, 9, 11), Some((0, 10)));
		assert_eq!(right_peak(0, 10, 11), None);
	}
}
