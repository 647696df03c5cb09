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

/// Implements hex-encoding from bytes to string and decoding of strings
/// to bytes. Ethereum style data comes `0x` prefixed, both forms are
/// accepted on decoding.
use std::fmt::Write;
use std::num;

/// Encode the provided bytes into a hex string
pub fn to_hex(bytes: &[u8]) -> String {
	let mut s = String::with_capacity(bytes.len() * 2);
	for byte in bytes {
		write!(&mut s, "{:02x}", byte).expect("Unable to write hex");
	}
	s
}

/// Encode the provided bytes into a `0x` prefixed hex string
pub fn to_prefixed_hex(bytes: &[u8]) -> String {
	format!("0x{}", to_hex(bytes))
}

/// Strip an optional `0x` prefix
pub fn strip_hex_prefix(hex_str: &str) -> &str {
	let hex_trim = hex_str.trim();
	if hex_trim.starts_with("0x") || hex_trim.starts_with("0X") {
		&hex_trim[2..]
	} else {
		hex_trim
	}
}

/// Decode a hex string into bytes. An odd number of digits is treated as
/// if a leading zero was present, so quantities like `0x1` decode fine.
pub fn from_hex(hex_str: &str) -> Result<Vec<u8>, num::ParseIntError> {
	let digits = strip_hex_prefix(hex_str);
	let padded = if digits.len() % 2 == 1 {
		format!("0{}", digits)
	} else {
		digits.to_owned()
	};
	(0..padded.len() / 2)
		.map(|i| u8::from_str_radix(&padded[2 * i..2 * i + 2], 16))
		.collect()
}
