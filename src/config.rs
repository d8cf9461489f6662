// Copyright 2021 Datafuse Labs
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

//! Configuration of the non-blocking read wrappers.

use std::num::NonZeroUsize;

use serde::Deserialize;
use serde::Serialize;

/// Tunes how a modification resolves the iterators that are open when it starts.
///
/// The configuration is immutable once a wrapper is built with it.
/// It derives `Deserialize` with `#[serde(default)]`,
/// so an application can embed it as a section of its own config file
/// and leave out any field it does not care about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcurrentStoreConfig {
    /// Max number of records pulled from one open iterator into its snapshot buffer
    /// in a single pass of a modification.
    ///
    /// Open iterators are drained round-robin, one chunk at a time,
    /// so a single huge result set can not starve the others.
    pub iterator_cache_chunk_size: NonZeroUsize,

    /// Resolve the iterators that have been open the longest first.
    ///
    /// Iterators are ordered by when they were opened,
    /// then by when they produced their first record.
    pub process_oldest_first: bool,
}

impl ConcurrentStoreConfig {
    pub const DEFAULT_ITERATOR_CACHE_CHUNK_SIZE: usize = 1024;

    pub fn new(iterator_cache_chunk_size: NonZeroUsize, process_oldest_first: bool) -> Self {
        Self {
            iterator_cache_chunk_size,
            process_oldest_first,
        }
    }

    pub fn with_iterator_cache_chunk_size(mut self, size: NonZeroUsize) -> Self {
        self.iterator_cache_chunk_size = size;
        self
    }

    pub fn with_process_oldest_first(mut self, oldest_first: bool) -> Self {
        self.process_oldest_first = oldest_first;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.iterator_cache_chunk_size.get()
    }
}

impl Default for ConcurrentStoreConfig {
    fn default() -> Self {
        Self {
            iterator_cache_chunk_size: NonZeroUsize::new(Self::DEFAULT_ITERATOR_CACHE_CHUNK_SIZE)
                .unwrap_or(NonZeroUsize::MIN),
            process_oldest_first: false,
        }
    }
}
