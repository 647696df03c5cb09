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

//! Sources of raw block headers. The planner only relies on the
//! `HeaderSource` trait, the implementations here cover headers held in
//! memory, dumped to a JSON file, and paginating any source into bounded
//! requests.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::thread;
use std::time::Duration;

use crate::core::core::header::{BlockHeader, RpcHeader};
use crate::error::{Error, ErrorKind};

/// Provides the block headers of an inclusive range.
pub trait HeaderSource: Send + Sync {
	/// Headers `low..=high`, ascending by number. Implementations may return
	/// fewer headers than asked for when they don't have them, callers check
	/// completeness.
	fn fetch_headers(&self, high: u64, low: u64) -> Result<Vec<BlockHeader>, Error>;
}

/// Checks a fetched range holds exactly the headers `low..=high` in
/// ascending order.
pub fn check_complete(headers: &[BlockHeader], high: u64, low: u64) -> Result<(), Error> {
	let expected = high - low + 1;
	if headers.len() as u64 != expected {
		return Err(ErrorKind::SourceIncomplete {
			expected,
			actual: headers.len() as u64,
		}
		.into());
	}
	for (header, number) in headers.iter().zip(low..=high) {
		if header.number != number {
			return Err(ErrorKind::Source(format!(
				"expected block {}, got block {}",
				number, header.number
			))
			.into());
		}
	}
	Ok(())
}

/// Headers held in memory, indexed by number.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
	headers: BTreeMap<u64, BlockHeader>,
}

impl MemorySource {
	/// Source over the provided headers, a later header replaces an earlier
	/// one with the same number.
	pub fn new(headers: Vec<BlockHeader>) -> MemorySource {
		MemorySource {
			headers: headers.into_iter().map(|h| (h.number, h)).collect(),
		}
	}

	/// Number of headers held
	pub fn len(&self) -> usize {
		self.headers.len()
	}

	/// Whether no header is held
	pub fn is_empty(&self) -> bool {
		self.headers.is_empty()
	}
}

impl HeaderSource for MemorySource {
	fn fetch_headers(&self, high: u64, low: u64) -> Result<Vec<BlockHeader>, Error> {
		if high < low {
			return Err(ErrorKind::InputRange(format!("high {} below low {}", high, low)).into());
		}
		Ok(self.headers.range(low..=high).map(|(_, h)| h.clone()).collect())
	}
}

/// Headers loaded from a JSON array of `eth_getBlockByNumber` results.
#[derive(Debug, Clone)]
pub struct JsonFileSource {
	inner: MemorySource,
}

impl JsonFileSource {
	/// Loads and decodes every header of the file. Block hashes present in
	/// the file are verified.
	pub fn open<P: AsRef<Path>>(path: P) -> Result<JsonFileSource, Error> {
		let file = File::open(path.as_ref()).map_err(|e| {
			ErrorKind::Source(format!("cannot open {}: {}", path.as_ref().display(), e))
		})?;
		let rpc_headers: Vec<RpcHeader> = serde_json::from_reader(BufReader::new(file))?;
		let headers = rpc_headers
			.iter()
			.map(|h| h.to_header())
			.collect::<Result<Vec<_>, _>>()?;
		debug!(
			"loaded {} headers from {}",
			headers.len(),
			path.as_ref().display()
		);
		Ok(JsonFileSource {
			inner: MemorySource::new(headers),
		})
	}

	/// Number of headers loaded
	pub fn len(&self) -> usize {
		self.inner.len()
	}

	/// Whether the file held no header
	pub fn is_empty(&self) -> bool {
		self.inner.is_empty()
	}
}

impl HeaderSource for JsonFileSource {
	fn fetch_headers(&self, high: u64, low: u64) -> Result<Vec<BlockHeader>, Error> {
		self.inner.fetch_headers(high, low)
	}
}

/// Splits a range into requests of at most `max_batch` headers against the
/// wrapped source, pausing between requests, and checks the assembled range
/// is complete.
#[derive(Debug, Clone)]
pub struct BatchedSource<S> {
	inner: S,
	max_batch: u64,
	delay: Duration,
}

impl<S: HeaderSource> BatchedSource<S> {
	/// Wraps a source. A zero `max_batch` is treated as one.
	pub fn new(inner: S, max_batch: u64, delay: Duration) -> BatchedSource<S> {
		BatchedSource {
			inner,
			max_batch: max_batch.max(1),
			delay,
		}
	}

	/// The `(high, low)` sub-ranges a range is fetched in, oldest first.
	pub fn requests(&self, high: u64, low: u64) -> Vec<(u64, u64)> {
		let mut res = vec![];
		let mut start = low;
		while start <= high {
			let end = high.min(start.saturating_add(self.max_batch - 1));
			res.push((end, start));
			if end == u64::MAX {
				break;
			}
			start = end + 1;
		}
		res
	}
}

impl<S: HeaderSource> HeaderSource for BatchedSource<S> {
	fn fetch_headers(&self, high: u64, low: u64) -> Result<Vec<BlockHeader>, Error> {
		if high < low {
			return Err(ErrorKind::InputRange(format!("high {} below low {}", high, low)).into());
		}
		let mut headers = Vec::with_capacity((high - low + 1) as usize);
		for (i, (req_high, req_low)) in self.requests(high, low).into_iter().enumerate() {
			if i > 0 && self.delay > Duration::from_millis(0) {
				thread::sleep(self.delay);
			}
			trace!("fetching headers {} to {}", req_low, req_high);
			headers.extend(self.inner.fetch_headers(req_high, req_low)?);
		}
		check_complete(&headers, high, low)?;
		Ok(headers)
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn request_split() {
		let source = BatchedSource::new(MemorySource::default(), 50, Duration::from_millis(0));
		assert_eq!(source.requests(10, 10), vec![(10, 10)]);
		assert_eq!(source.requests(149, 0), vec![(49, 0), (99, 50), (149, 100)]);
		assert_eq!(source.requests(150, 0), vec![(49, 0), (99, 50), (149, 100), (150, 150)]);

		let unit = BatchedSource::new(MemorySource::default(), 0, Duration::from_millis(0));
		assert_eq!(unit.requests(2, 1), vec![(1, 1), (2, 2)]);
	}
}
