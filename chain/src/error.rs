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

//! Error types for chain
use crate::core::core::{hash, pmmr};
use crate::core::ser;
use failure::{Backtrace, Context, Fail};
use std::fmt::{self, Display};
use std::io;

/// Error definition
#[derive(Debug, Fail)]
pub struct Error {
	inner: Context<ErrorKind>,
}

/// Chain error definitions
#[derive(Clone, Eq, PartialEq, Debug, Fail)]
pub enum ErrorKind {
	/// Block range or batch size makes no sense
	#[fail(display = "Invalid input range: {}", _0)]
	InputRange(String),
	/// The header source returned fewer (or more) headers than asked for
	#[fail(display = "Header source returned {} headers, expected {}", actual, expected)]
	SourceIncomplete {
		/// headers requested
		expected: u64,
		/// headers received
		actual: u64,
	},
	/// Field hash asked for a digest with nothing accumulated
	#[fail(display = "Hash buffer is empty")]
	HashBufferEmpty,
	/// A single header already costs more than the Keccak budget
	#[fail(display = "Keccak budget exceeded, a single header needs {} operations", _0)]
	BudgetExceeded(u64),
	/// External result differs from the expected one, names the first field
	#[fail(display = "Consistency mismatch on field {}", _0)]
	ConsistencyMismatch(String),
	/// Headers don't link up, or don't follow the fork schedule
	#[fail(display = "Invalid header chain: {}", _0)]
	InvalidChain(String),
	/// Error from the MMR
	#[fail(display = "MMR Error: {}", _0)]
	Mmr(pmmr::Error),
	/// Header source failure
	#[fail(display = "Header source error: {}", _0)]
	Source(String),
	/// Reading or writing chunk records
	#[fail(display = "IO error: {}", _0)]
	Io(String),
	/// JSON encoding of chunk records or headers
	#[fail(display = "Serialization error: {}", _0)]
	Serialization(String),
	/// Header encoding or decoding
	#[fail(display = "Header codec error: {}", _0)]
	Codec(String),
	/// Anything else
	#[fail(display = "Other Error: {}", _0)]
	Other(String),
}

impl Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let cause = match self.cause() {
			Some(c) => format!("{}", c),
			None => String::from("Unknown"),
		};
		let backtrace = match self.backtrace() {
			Some(b) => format!("{}", b),
			None => String::from("Unknown"),
		};
		let output = format!(
			"{} \n Cause: {} \n Backtrace: {}",
			self.inner, cause, backtrace
		);
		Display::fmt(&output, f)
	}
}

impl Error {
	/// get kind
	pub fn kind(&self) -> ErrorKind {
		self.inner.get_context().clone()
	}
	/// get cause
	pub fn cause(&self) -> Option<&dyn Fail> {
		self.inner.cause()
	}
	/// get backtrace
	pub fn backtrace(&self) -> Option<&Backtrace> {
		self.inner.backtrace()
	}

	/// Whether retrying the same chunk later could succeed, i.e. the failure
	/// isn't in the data itself
	pub fn is_transient(&self) -> bool {
		match self.kind() {
			ErrorKind::SourceIncomplete { .. } | ErrorKind::Source(_) | ErrorKind::Io(_) => true,
			_ => false,
		}
	}
}

impl From<ErrorKind> for Error {
	fn from(kind: ErrorKind) -> Error {
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<Context<ErrorKind>> for Error {
	fn from(inner: Context<ErrorKind>) -> Error {
		Error { inner: inner }
	}
}

impl From<hash::Error> for Error {
	fn from(error: hash::Error) -> Error {
		let kind = match error {
			hash::Error::EmptyBuffer => ErrorKind::HashBufferEmpty,
			ref e => ErrorKind::Codec(e.to_string()),
		};
		Error {
			inner: Context::new(kind),
		}
	}
}

impl From<pmmr::Error> for Error {
	fn from(error: pmmr::Error) -> Error {
		match error {
			pmmr::Error::Hash(e) => Error::from(e),
			e => Error {
				inner: Context::new(ErrorKind::Mmr(e)),
			},
		}
	}
}

impl From<ser::Error> for Error {
	fn from(error: ser::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Codec(error.to_string())),
		}
	}
}

impl From<io::Error> for Error {
	fn from(e: io::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Io(e.to_string())),
		}
	}
}

impl From<serde_json::Error> for Error {
	fn from(e: serde_json::Error) -> Error {
		Error {
			inner: Context::new(ErrorKind::Serialization(e.to_string())),
		}
	}
}
