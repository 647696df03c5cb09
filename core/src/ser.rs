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

//! Conversion of canonical header bytes to and from the 64 bit limbs the
//! proving backend consumes, and the errors raised while decoding headers.

use std::{error, fmt};

use byteorder::{BigEndian, ByteOrder, LittleEndian};

/// Possible errors deriving from serializing or deserializing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Error {
	/// Malformed RLP
	Rlp(String),
	/// Expected a given value that wasn't found
	UnexpectedData {
		/// What we wanted
		expected: String,
		/// What we got
		received: String,
	},
	/// Data wasn't in a consumable format
	CorruptedData(String),
	/// The limb count does not match the byte length
	LimbCount {
		/// limbs needed for the byte length
		expected: usize,
		/// limbs provided
		received: usize,
	},
	/// A short trailing limb holds more bytes than it may
	LimbOverflow(u64),
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match *self {
			Error::Rlp(ref e) => write!(f, "rlp: {}", e),
			Error::UnexpectedData {
				ref expected,
				ref received,
			} => write!(f, "expected {}, got {}", expected, received),
			Error::CorruptedData(ref e) => write!(f, "corrupted data: {}", e),
			Error::LimbCount { expected, received } => {
				write!(f, "expected {} limbs, got {}", expected, received)
			}
			Error::LimbOverflow(limb) => write!(f, "limb {:#x} overflows its width", limb),
		}
	}
}

impl error::Error for Error {}

impl From<alloy_rlp::Error> for Error {
	fn from(e: alloy_rlp::Error) -> Error {
		Error::Rlp(e.to_string())
	}
}

/// Byte order used when packing bytes into limbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endianness {
	/// Least significant byte first
	Little,
	/// Most significant byte first
	Big,
}

/// Number of 8 byte limbs needed to hold `len` bytes.
pub fn limb_count(len: usize) -> usize {
	(len + 7) / 8
}

/// Packs bytes into 64 bit limbs, 8 bytes at a time. The last limb only holds
/// the remaining `len % 8` bytes when the length isn't a multiple of 8.
pub fn to_limbs(bytes: &[u8], endianness: Endianness) -> Vec<u64> {
	bytes
		.chunks(8)
		.map(|chunk| match endianness {
			Endianness::Little => LittleEndian::read_uint(chunk, chunk.len()),
			Endianness::Big => BigEndian::read_uint(chunk, chunk.len()),
		})
		.collect()
}

/// Inverse of `to_limbs`, the original byte length is needed to know how
/// wide the final limb is.
pub fn from_limbs(limbs: &[u64], byte_len: usize, endianness: Endianness) -> Result<Vec<u8>, Error> {
	if limbs.len() != limb_count(byte_len) {
		return Err(Error::LimbCount {
			expected: limb_count(byte_len),
			received: limbs.len(),
		});
	}

	let mut bytes = vec![0; byte_len];
	for (chunk, &limb) in bytes.chunks_mut(8).zip(limbs) {
		let width = chunk.len();
		if width < 8 && limb >> (8 * width) != 0 {
			return Err(Error::LimbOverflow(limb));
		}
		match endianness {
			Endianness::Little => LittleEndian::write_uint(chunk, limb, width),
			Endianness::Big => BigEndian::write_uint(chunk, limb, width),
		}
	}
	Ok(bytes)
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn limbs_short_tail() {
		let bytes = [1, 0, 0, 0, 0, 0, 0, 0, 2, 3];
		assert_eq!(to_limbs(&bytes, Endianness::Little), vec![1, 0x0302]);
		assert_eq!(
			to_limbs(&bytes, Endianness::Big),
			vec![0x0100_0000_0000_0000, 0x0203]
		);
		assert_eq!(to_limbs(&[], Endianness::Little), Vec::<u64>::new());
	}

	#[test]
	fn limbs_inverse() {
		let bytes: Vec<u8> = (0..21).collect();
		for e in &[Endianness::Little, Endianness::Big] {
			let limbs = to_limbs(&bytes, *e);
			assert_eq!(limbs.len(), 3);
			assert_eq!(from_limbs(&limbs, bytes.len(), *e).unwrap(), bytes);
		}
	}

	#[test]
	fn limbs_invalid() {
		assert_eq!(
			from_limbs(&[1, 2], 20, Endianness::Little),
			Err(Error::LimbCount {
				expected: 3,
				received: 2
			})
		);
		assert_eq!(
			from_limbs(&[0x1_0000], 2, Endianness::Little),
			Err(Error::LimbOverflow(0x1_0000))
		);
	}
}
