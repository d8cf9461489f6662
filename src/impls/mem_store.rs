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

use std::collections::BTreeSet;
use std::fmt;
use std::ops::Bound;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::RwLock;

use crate::errors::StoreError;
use crate::impls::prefix_map::PrefixMap;
use crate::model::Triple;
use crate::model::TriplePattern;
use crate::store::Store;
use crate::RecordIter;
use crate::RecordStream;

#[derive(Debug, Default)]
struct Data {
    triples: BTreeSet<Triple>,

    /// Bumped by every change to `triples`.
    mod_count: u64,

    closed: bool,
}

/// An in-memory triple store.
///
/// Not meant to be modified while one of its iterators is in use:
/// every iterator remembers the modification count it was created at
/// and fails with [`StoreError::IteratorFault`] on the first step after a change.
///
/// The internal lock only keeps a single call memory-safe;
/// it does not make a sequence of calls consistent.
pub struct MemStore {
    data: Arc<RwLock<Data>>,
    prefixes: PrefixMap,
    read_only: bool,
    created_iterators: Arc<AtomicUsize>,
}

impl fmt::Debug for MemStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let data = self.data.read();
        f.debug_struct("MemStore")
            .field("len", &data.triples.len())
            .field("mod_count", &data.mod_count)
            .field("closed", &data.closed)
            .field("read_only", &self.read_only)
            .finish()
    }
}

impl Default for MemStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FromIterator<Triple> for MemStore {
    fn from_iter<I: IntoIterator<Item = Triple>>(iter: I) -> Self {
        let store = Self::new();
        store.data.write().triples.extend(iter);
        store
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(Data::default())),
            prefixes: PrefixMap::new(),
            read_only: false,
            created_iterators: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Reject every later `add` and `delete`.
    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Another store over the same triples, with its own prefix table.
    ///
    /// The two stores [depend on](Store::depends_on) each other.
    pub fn share(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            prefixes: self.prefixes.clone(),
            read_only: self.read_only,
            created_iterators: Arc::clone(&self.created_iterators),
        }
    }

    /// Number of store iterators handed out so far.
    pub fn created_iterators(&self) -> usize {
        self.created_iterators.load(Ordering::Relaxed)
    }

    fn check_open(data: &Data) -> Result<(), StoreError> {
        if data.closed {
            return Err(StoreError::Closed);
        }
        Ok(())
    }

    fn check_writable(&self, data: &Data, deleting: bool) -> Result<(), StoreError> {
        Self::check_open(data)?;

        if self.read_only {
            let msg = "store is read-only".to_string();
            return Err(if deleting {
                StoreError::DeletionRejected(msg)
            } else {
                StoreError::InsertionRejected(msg)
            });
        }
        Ok(())
    }
}

impl Store for MemStore {
    type Record = Triple;
    type Pattern = TriplePattern;
    type Prefixes = PrefixMap;

    fn add(&mut self, record: Triple) -> Result<(), StoreError> {
        let mut data = self.data.write();
        self.check_writable(&data, false)?;

        if data.triples.insert(record) {
            data.mod_count += 1;
        }
        Ok(())
    }

    fn delete(&mut self, record: &Triple) -> Result<(), StoreError> {
        let mut data = self.data.write();
        self.check_writable(&data, true)?;

        if data.triples.remove(record) {
            data.mod_count += 1;
        }
        Ok(())
    }

    fn delete_matching(&mut self, pattern: &TriplePattern) -> Result<(), StoreError> {
        let mut data = self.data.write();
        self.check_writable(&data, true)?;

        let before = data.triples.len();
        data.triples.retain(|t| !pattern.matches(t));
        if data.triples.len() != before {
            data.mod_count += 1;
        }
        Ok(())
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        let mut data = self.data.write();
        self.check_writable(&data, true)?;

        if !data.triples.is_empty() {
            data.triples.clear();
            data.mod_count += 1;
        }
        Ok(())
    }

    fn close(&mut self) {
        let mut data = self.data.write();
        if !data.closed {
            data.closed = true;
            data.mod_count += 1;
        }
    }

    fn is_closed(&self) -> bool {
        self.data.read().closed
    }

    fn contains(&self, record: &Triple) -> Result<bool, StoreError> {
        let data = self.data.read();
        Self::check_open(&data)?;
        Ok(data.triples.contains(record))
    }

    fn contains_matching(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
        let data = self.data.read();
        Self::check_open(&data)?;

        Ok(data.triples.iter().any(|t| pattern.matches(t)))
    }

    fn size(&self) -> Result<usize, StoreError> {
        let data = self.data.read();
        Self::check_open(&data)?;
        Ok(data.triples.len())
    }

    fn find(&self, pattern: &TriplePattern) -> RecordIter<Triple> {
        self.created_iterators.fetch_add(1, Ordering::Relaxed);

        let mod_count = self.data.read().mod_count;
        Box::new(FailFastIter {
            data: Arc::clone(&self.data),
            mod_count,
            pattern: pattern.clone(),
            last: None,
            done: false,
        })
    }

    fn stream(&self, pattern: &TriplePattern) -> RecordStream<Triple> {
        futures::stream::iter(self.find(pattern)).boxed()
    }

    fn is_isomorphic_with(&self, other: &Self) -> Result<bool, StoreError> {
        if self.depends_on(other) {
            return Ok(true);
        }

        let a = self.data.read();
        Self::check_open(&a)?;
        let b = other.data.read();
        Self::check_open(&b)?;

        Ok(a.triples == b.triples)
    }

    fn depends_on(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    fn prefixes(&self) -> &PrefixMap {
        &self.prefixes
    }

    fn prefixes_mut(&mut self) -> &mut PrefixMap {
        &mut self.prefixes
    }
}

/// Walks the triple set in order, one lookup per step,
/// and fails once the set changed since the iterator was created.
struct FailFastIter {
    data: Arc<RwLock<Data>>,
    mod_count: u64,
    pattern: TriplePattern,
    last: Option<Triple>,
    done: bool,
}

impl Iterator for FailFastIter {
    type Item = Result<Triple, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let data = self.data.read();

        if data.closed {
            self.done = true;
            return Some(Err(StoreError::Closed));
        }

        if data.mod_count != self.mod_count {
            self.done = true;
            return Some(Err(StoreError::iterator_fault(format!(
                "concurrent modification: store changed from version {} to {} during iteration",
                self.mod_count, data.mod_count
            ))));
        }

        let lower = match &self.last {
            Some(last) => Bound::Excluded(last),
            None => Bound::Unbounded,
        };

        let found = data
            .triples
            .range::<Triple, _>((lower, Bound::Unbounded))
            .find(|t| self.pattern.matches(t))
            .cloned();
        drop(data);

        match found {
            Some(t) => {
                self.last = Some(t.clone());
                Some(Ok(t))
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
