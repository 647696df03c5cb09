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

//! Merkle Mountain Ranges are an alternative to Merkle trees. For a high
//! level description of MMRs, see:
//!
//! https://github.com/opentimestamps/opentimestamps-server/blob/master/doc/merkle-mountain-range.md
//!
//! This implementation is built in two major parts:
//!
//! 1. A set of low-level functions that allow navigation within an arbitrary
//! sized binary tree traversed in postorder. The height sequence of an MMR
//! 0010012001... is the postorder traversal (left-right-top) of a binary
//! tree, so the height of any node, the position of its siblings and the
//! peaks of an MMR of a given size all follow from binary operations on
//! positions.
//! 2. An append-only MMR holding every node digest in memory, generic over the
//! hash algorithm. Two of them (Poseidon and Keccak) are extended in
//! lock-step by the chunk planner.

mod pmmr;

pub use self::pmmr::*;
