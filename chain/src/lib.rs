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

//! Extends the header accumulator chunk by chunk: pulls headers from a
//! source, hashes them under both algorithms, grows the two MMRs and records
//! what an independent computation of the same chunk must produce.

#![deny(non_upper_case_globals)]
#![deny(non_camel_case_types)]
#![deny(non_snake_case)]
#![deny(unused_mut)]
#![warn(missing_docs)]

#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate log;
#[macro_use]
extern crate failure_derive;

use hmmr_core as core;
use hmmr_util as util;

pub mod checker;
mod error;
pub mod planner;
pub mod source;
pub mod store;
pub mod types;

pub use crate::checker::check;
pub use crate::error::{Error, ErrorKind};
pub use crate::planner::ChunkPlanner;
pub use crate::source::{BatchedSource, HeaderSource, JsonFileSource, MemorySource};
pub use crate::store::ChunkStore;
pub use crate::types::{ChunkInput, ChunkOutput, ChunkState, PlannerConfig, PlannerStatus};
