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

//! Values that should be shared across all modules, developer-set rather
//! than tweakable by users. Chain selection is passed around explicitly,
//! nothing in here is mutable.

use crate::core::header::HeaderKind;

/// Number of bytes absorbed by one Keccak-256 permutation.
pub const KECCAK_RATE: u64 = 136;

/// Default maximum number of Keccak permutations a single chunk may cost the
/// proving backend.
pub const DEFAULT_KECCAK_BUDGET: u64 = 2_000;

/// Default number of headers per chunk when batches are fixed size.
pub const DEFAULT_BATCH_SIZE: u64 = 100;

/// Upper bound on the number of headers requested in a single source call.
pub const DEFAULT_SOURCE_BATCH_SIZE: u64 = 50;

/// Seed of the genesis leaf every fresh accumulator starts with.
pub const GENESIS_SEED: &[u8] = b"brave new world";

/// Mainnet block activating the London (EIP-1559) header layout
pub const MAINNET_LONDON_HEIGHT: u64 = 12_965_000;

/// Mainnet block activating the Shanghai (withdrawals) header layout
pub const MAINNET_SHANGHAI_HEIGHT: u64 = 17_034_870;

/// Sepolia block activating the Shanghai header layout, London was active
/// from genesis
pub const SEPOLIA_SHANGHAI_HEIGHT: u64 = 2_990_908;

/// Types of chain a header source can be backed by.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ChainTypes {
	/// For CI testing, no fork schedule is enforced
	AutomatedTesting,
	/// Sepolia test network
	Sepolia,
	/// Main production network
	Mainnet,
}

impl ChainTypes {
	/// Short name representing the chain type ("mainnet", "sepolia", etc.)
	pub fn shortname(&self) -> String {
		match *self {
			ChainTypes::AutomatedTesting => "auto".to_owned(),
			ChainTypes::Sepolia => "sepolia".to_owned(),
			ChainTypes::Mainnet => "mainnet".to_owned(),
		}
	}

	/// Header layout expected at the given block number, if the chain
	/// enforces a fork schedule.
	pub fn header_kind_at(&self, number: u64) -> Option<HeaderKind> {
		match *self {
			ChainTypes::AutomatedTesting => None,
			ChainTypes::Sepolia => {
				if number >= SEPOLIA_SHANGHAI_HEIGHT {
					Some(HeaderKind::Shanghai)
				} else {
					Some(HeaderKind::London)
				}
			}
			ChainTypes::Mainnet => {
				if number >= MAINNET_SHANGHAI_HEIGHT {
					Some(HeaderKind::Shanghai)
				} else if number >= MAINNET_LONDON_HEIGHT {
					Some(HeaderKind::London)
				} else {
					Some(HeaderKind::Legacy)
				}
			}
		}
	}
}

impl Default for ChainTypes {
	fn default() -> ChainTypes {
		ChainTypes::Mainnet
	}
}
