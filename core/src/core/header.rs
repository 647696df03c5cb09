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

//! Ethereum block headers and their canonical RLP encoding. The encoded bytes
//! are what both hash algorithms consume to produce MMR leaves, and what the
//! block hash is computed over.

use std::fmt;

use alloy_rlp::{Encodable, Header};

use crate::core::hash::{keccak256, Hash};
use crate::ser::Error;
use crate::util;

/// Size of the logs bloom filter in bytes
pub const BLOOM_LEN: usize = 256;

/// Header layouts, one per hard fork that appended fields to the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeaderKind {
	/// Before London, 15 fields
	Legacy,
	/// London adds the base fee
	London,
	/// Shanghai adds the withdrawals root
	Shanghai,
}

impl fmt::Display for HeaderKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			HeaderKind::Legacy => write!(f, "legacy"),
			HeaderKind::London => write!(f, "london"),
			HeaderKind::Shanghai => write!(f, "shanghai"),
		}
	}
}

/// Fields appended to the header by successive forks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderVersion {
	/// No trailing fields
	Legacy,
	/// EIP-1559 headers
	London {
		/// Base fee per gas in wei
		base_fee_per_gas: u128,
	},
	/// EIP-4895 headers
	Shanghai {
		/// Base fee per gas in wei
		base_fee_per_gas: u128,
		/// Root of the withdrawals trie
		withdrawals_root: Hash,
	},
}

impl HeaderVersion {
	/// The layout of this version
	pub fn kind(&self) -> HeaderKind {
		match *self {
			HeaderVersion::Legacy => HeaderKind::Legacy,
			HeaderVersion::London { .. } => HeaderKind::London,
			HeaderVersion::Shanghai { .. } => HeaderKind::Shanghai,
		}
	}
}

/// A single header field, ready to be RLP encoded or compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field<'a> {
	/// Fixed or variable width byte string
	Bytes(&'a [u8]),
	/// Unsigned integer, encoded minimal big-endian
	Uint(u128),
}

impl<'a> Field<'a> {
	fn length(&self) -> usize {
		match *self {
			Field::Bytes(b) => b.length(),
			Field::Uint(v) => v.length(),
		}
	}

	fn encode(&self, out: &mut Vec<u8>) {
		match *self {
			Field::Bytes(b) => b.encode(out),
			Field::Uint(v) => v.encode(out),
		}
	}
}

/// Ethereum block header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockHeader {
	/// Hash of the previous block
	pub parent_hash: Hash,
	/// Hash of the uncles (ommers) list
	pub uncles_hash: Hash,
	/// Beneficiary address
	pub coinbase: [u8; 20],
	/// Root of the state trie
	pub state_root: Hash,
	/// Root of the transactions trie
	pub transactions_root: Hash,
	/// Root of the receipts trie
	pub receipts_root: Hash,
	/// Bloom filter over the logs, always `BLOOM_LEN` bytes
	pub logs_bloom: Vec<u8>,
	/// Proof of work difficulty, zero after the merge
	pub difficulty: u128,
	/// Block number
	pub number: u64,
	/// Gas limit
	pub gas_limit: u64,
	/// Gas used
	pub gas_used: u64,
	/// Unix timestamp
	pub timestamp: u64,
	/// Arbitrary extra data, at most 32 bytes on mainnet
	pub extra_data: Vec<u8>,
	/// Mix hash, prev randao after the merge
	pub mix_hash: Hash,
	/// Proof of work nonce
	pub nonce: [u8; 8],
	/// Fork dependent trailing fields
	pub version: HeaderVersion,
}

impl BlockHeader {
	/// The layout of this header
	pub fn kind(&self) -> HeaderKind {
		self.version.kind()
	}

	/// All fields in canonical order, named. Shared by the encoder and by
	/// field-wise comparisons so there is a single source of field order.
	pub fn fields(&self) -> Vec<(&'static str, Field<'_>)> {
		let mut fields = vec![
			("parent_hash", Field::Bytes(self.parent_hash.as_bytes())),
			("uncles_hash", Field::Bytes(self.uncles_hash.as_bytes())),
			("coinbase", Field::Bytes(&self.coinbase)),
			("state_root", Field::Bytes(self.state_root.as_bytes())),
			(
				"transactions_root",
				Field::Bytes(self.transactions_root.as_bytes()),
			),
			("receipts_root", Field::Bytes(self.receipts_root.as_bytes())),
			("logs_bloom", Field::Bytes(&self.logs_bloom)),
			("difficulty", Field::Uint(self.difficulty)),
			("number", Field::Uint(self.number as u128)),
			("gas_limit", Field::Uint(self.gas_limit as u128)),
			("gas_used", Field::Uint(self.gas_used as u128)),
			("timestamp", Field::Uint(self.timestamp as u128)),
			("extra_data", Field::Bytes(&self.extra_data)),
			("mix_hash", Field::Bytes(self.mix_hash.as_bytes())),
			("nonce", Field::Bytes(&self.nonce)),
		];
		match self.version {
			HeaderVersion::Legacy => {}
			HeaderVersion::London { base_fee_per_gas } => {
				fields.push(("base_fee_per_gas", Field::Uint(base_fee_per_gas)));
			}
			HeaderVersion::Shanghai {
				base_fee_per_gas,
				ref withdrawals_root,
			} => {
				fields.push(("base_fee_per_gas", Field::Uint(base_fee_per_gas)));
				fields.push(("withdrawals_root", Field::Bytes(withdrawals_root.as_bytes())));
			}
		}
		fields
	}

	/// Canonical RLP serialization of the header, the exact bytes the block
	/// hash is computed over.
	pub fn canonicalize(&self) -> Vec<u8> {
		let fields = self.fields();
		let payload_length = fields.iter().map(|(_, f)| f.length()).sum();

		let mut out = Vec::with_capacity(payload_length + 3);
		Header {
			list: true,
			payload_length,
		}
		.encode(&mut out);
		for (_, field) in &fields {
			field.encode(&mut out);
		}
		out
	}

	/// The block hash, Keccak-256 of the canonical encoding.
	pub fn hash(&self) -> Hash {
		keccak256(&self.canonicalize())
	}

	/// Decodes a header from its canonical RLP encoding. The layout is
	/// inferred from the number of fields.
	pub fn from_rlp(bytes: &[u8]) -> Result<BlockHeader, Error> {
		let mut buf = bytes;
		let header = Header::decode(&mut buf)?;
		if !header.list {
			return Err(Error::Rlp("header is not a list".to_owned()));
		}
		if header.payload_length != buf.len() {
			return Err(Error::Rlp(format!(
				"payload length {} but {} bytes remain",
				header.payload_length,
				buf.len()
			)));
		}

		let mut items = vec![];
		while !buf.is_empty() {
			items.push(Header::decode_bytes(&mut buf, false)?);
		}

		let version = match items.len() {
			15 => HeaderVersion::Legacy,
			16 => HeaderVersion::London {
				base_fee_per_gas: read_uint("base_fee_per_gas", items[15], 16)?,
			},
			17 => HeaderVersion::Shanghai {
				base_fee_per_gas: read_uint("base_fee_per_gas", items[15], 16)?,
				withdrawals_root: Hash(read_fixed("withdrawals_root", items[16])?),
			},
			n => {
				return Err(Error::UnexpectedData {
					expected: "15, 16 or 17 header fields".to_owned(),
					received: format!("{} fields", n),
				});
			}
		};

		let logs_bloom: [u8; BLOOM_LEN] = read_fixed("logs_bloom", items[6])?;
		Ok(BlockHeader {
			parent_hash: Hash(read_fixed("parent_hash", items[0])?),
			uncles_hash: Hash(read_fixed("uncles_hash", items[1])?),
			coinbase: read_fixed("coinbase", items[2])?,
			state_root: Hash(read_fixed("state_root", items[3])?),
			transactions_root: Hash(read_fixed("transactions_root", items[4])?),
			receipts_root: Hash(read_fixed("receipts_root", items[5])?),
			logs_bloom: logs_bloom.to_vec(),
			difficulty: read_uint("difficulty", items[7], 16)?,
			number: read_uint("number", items[8], 8)? as u64,
			gas_limit: read_uint("gas_limit", items[9], 8)? as u64,
			gas_used: read_uint("gas_used", items[10], 8)? as u64,
			timestamp: read_uint("timestamp", items[11], 8)? as u64,
			extra_data: items[12].to_vec(),
			mix_hash: Hash(read_fixed("mix_hash", items[13])?),
			nonce: read_fixed("nonce", items[14])?,
			version,
		})
	}
}

fn read_fixed<const N: usize>(name: &str, bytes: &[u8]) -> Result<[u8; N], Error> {
	if bytes.len() != N {
		return Err(Error::UnexpectedData {
			expected: format!("{} of {} bytes", name, N),
			received: format!("{} bytes", bytes.len()),
		});
	}
	let mut res = [0; N];
	res.copy_from_slice(bytes);
	Ok(res)
}

fn read_uint(name: &str, bytes: &[u8], max_len: usize) -> Result<u128, Error> {
	if bytes.len() > max_len {
		return Err(Error::UnexpectedData {
			expected: format!("{} of at most {} bytes", name, max_len),
			received: format!("{} bytes", bytes.len()),
		});
	}
	if bytes.first() == Some(&0) {
		return Err(Error::CorruptedData(format!("{} has leading zeros", name)));
	}
	Ok(bytes.iter().fold(0u128, |acc, b| (acc << 8) | *b as u128))
}

/// Header as returned by `eth_getBlockByNumber`, quantities and data as hex
/// strings. Unknown members (transactions, size...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpcHeader {
	/// Block hash, checked against the computed hash when present
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub hash: Option<String>,
	/// Parent hash
	pub parent_hash: String,
	/// Uncles hash
	#[serde(rename = "sha3Uncles")]
	pub uncles_hash: String,
	/// Coinbase
	#[serde(rename = "miner")]
	pub coinbase: String,
	/// State root
	pub state_root: String,
	/// Transactions root
	pub transactions_root: String,
	/// Receipts root
	pub receipts_root: String,
	/// Logs bloom
	pub logs_bloom: String,
	/// Difficulty quantity
	pub difficulty: String,
	/// Number quantity
	pub number: String,
	/// Gas limit quantity
	pub gas_limit: String,
	/// Gas used quantity
	pub gas_used: String,
	/// Timestamp quantity
	pub timestamp: String,
	/// Extra data
	pub extra_data: String,
	/// Mix hash
	pub mix_hash: String,
	/// Nonce
	pub nonce: String,
	/// Base fee quantity, London onward
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub base_fee_per_gas: Option<String>,
	/// Withdrawals root, Shanghai onward
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub withdrawals_root: Option<String>,
}

impl RpcHeader {
	/// Decodes the hex members into a header, verifying the block hash if
	/// one was provided.
	pub fn to_header(&self) -> Result<BlockHeader, Error> {
		let version = match (&self.base_fee_per_gas, &self.withdrawals_root) {
			(None, None) => HeaderVersion::Legacy,
			(Some(fee), None) => HeaderVersion::London {
				base_fee_per_gas: quantity("baseFeePerGas", fee, 16)?,
			},
			(Some(fee), Some(root)) => HeaderVersion::Shanghai {
				base_fee_per_gas: quantity("baseFeePerGas", fee, 16)?,
				withdrawals_root: Hash(fixed("withdrawalsRoot", root)?),
			},
			(None, Some(_)) => {
				return Err(Error::CorruptedData(
					"withdrawalsRoot without baseFeePerGas".to_owned(),
				));
			}
		};

		let logs_bloom: [u8; BLOOM_LEN] = fixed("logsBloom", &self.logs_bloom)?;
		let header = BlockHeader {
			parent_hash: Hash(fixed("parentHash", &self.parent_hash)?),
			uncles_hash: Hash(fixed("sha3Uncles", &self.uncles_hash)?),
			coinbase: fixed("miner", &self.coinbase)?,
			state_root: Hash(fixed("stateRoot", &self.state_root)?),
			transactions_root: Hash(fixed("transactionsRoot", &self.transactions_root)?),
			receipts_root: Hash(fixed("receiptsRoot", &self.receipts_root)?),
			logs_bloom: logs_bloom.to_vec(),
			difficulty: quantity("difficulty", &self.difficulty, 16)?,
			number: quantity("number", &self.number, 8)? as u64,
			gas_limit: quantity("gasLimit", &self.gas_limit, 8)? as u64,
			gas_used: quantity("gasUsed", &self.gas_used, 8)? as u64,
			timestamp: quantity("timestamp", &self.timestamp, 8)? as u64,
			extra_data: data("extraData", &self.extra_data)?,
			mix_hash: Hash(fixed("mixHash", &self.mix_hash)?),
			nonce: fixed("nonce", &self.nonce)?,
			version,
		};

		if let Some(ref expected) = self.hash {
			let expected = Hash(fixed("hash", expected)?);
			let actual = header.hash();
			if expected != actual {
				return Err(Error::UnexpectedData {
					expected: format!("block {} hash {}", header.number, expected),
					received: actual.to_string(),
				});
			}
		}
		Ok(header)
	}
}

impl<'a> From<&'a BlockHeader> for RpcHeader {
	fn from(h: &'a BlockHeader) -> RpcHeader {
		let (base_fee_per_gas, withdrawals_root) = match h.version {
			HeaderVersion::Legacy => (None, None),
			HeaderVersion::London { base_fee_per_gas } => (Some(base_fee_per_gas), None),
			HeaderVersion::Shanghai {
				base_fee_per_gas,
				withdrawals_root,
			} => (Some(base_fee_per_gas), Some(withdrawals_root)),
		};
		RpcHeader {
			hash: Some(h.hash().to_string()),
			parent_hash: h.parent_hash.to_string(),
			uncles_hash: h.uncles_hash.to_string(),
			coinbase: util::to_prefixed_hex(&h.coinbase),
			state_root: h.state_root.to_string(),
			transactions_root: h.transactions_root.to_string(),
			receipts_root: h.receipts_root.to_string(),
			logs_bloom: util::to_prefixed_hex(&h.logs_bloom),
			difficulty: format!("{:#x}", h.difficulty),
			number: format!("{:#x}", h.number),
			gas_limit: format!("{:#x}", h.gas_limit),
			gas_used: format!("{:#x}", h.gas_used),
			timestamp: format!("{:#x}", h.timestamp),
			extra_data: util::to_prefixed_hex(&h.extra_data),
			mix_hash: h.mix_hash.to_string(),
			nonce: util::to_prefixed_hex(&h.nonce),
			base_fee_per_gas: base_fee_per_gas.map(|v| format!("{:#x}", v)),
			withdrawals_root: withdrawals_root.map(|v| v.to_string()),
		}
	}
}

fn data(name: &str, hex: &str) -> Result<Vec<u8>, Error> {
	util::from_hex(hex).map_err(|_| Error::CorruptedData(format!("{} is not hex: {}", name, hex)))
}

fn fixed<const N: usize>(name: &str, hex: &str) -> Result<[u8; N], Error> {
	read_fixed(name, &data(name, hex)?)
}

fn quantity(name: &str, hex: &str, max_len: usize) -> Result<u128, Error> {
	let bytes = data(name, hex)?;
	// quantities may carry leading zeros in hex form, "0x0" included
	let start = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
	read_uint(name, &bytes[start..], max_len)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn uint_decoding() {
		assert_eq!(read_uint("n", &[], 8).unwrap(), 0);
		assert_eq!(read_uint("n", &[1, 0], 8).unwrap(), 256);
		assert!(read_uint("n", &[0, 1], 8).is_err());
		assert!(read_uint("n", &[1; 9], 8).is_err());
		assert_eq!(quantity("n", "0x0", 8).unwrap(), 0);
		assert_eq!(quantity("n", "0x00ff", 8).unwrap(), 255);
	}

	#[test]
	fn fixed_decoding() {
		let nonce: [u8; 8] = fixed("nonce", "0x0000000000000042").unwrap();
		assert_eq!(nonce[7], 0x42);
		assert!(fixed::<8>("nonce", "0x42").is_err());
	}
}
