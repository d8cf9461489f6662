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

//! The set of lazy iterators of one wrapper that still read from the live store.

use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use dashmap::DashMap;

use crate::errors::StoreError;
use crate::iter::handle::OpenIterator;
use crate::store::Store;

/// Identifies an open iterator within one wrapper. Never reused.
pub type IteratorId = u64;

/// Open iterators, keyed by id.
///
/// Inserted into under the read side of the store lock, removed from by whoever releases an iterator,
/// and walked by a modification under the write side.
/// No map guard is held while a handle lock is taken.
pub(crate) struct OpenIterators<S: Store> {
    next_id: AtomicU64,
    map: DashMap<IteratorId, Arc<OpenIterator<S>>>,
}

impl<S: Store> fmt::Debug for OpenIterators<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenIterators")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("len", &self.map.len())
            .finish()
    }
}

impl<S: Store> Default for OpenIterators<S> {
    fn default() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            map: DashMap::new(),
        }
    }
}

impl<S: Store> OpenIterators<S> {
    pub(crate) fn next_id(&self) -> IteratorId {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn insert(&self, handle: Arc<OpenIterator<S>>) -> Result<(), StoreError> {
        let id = handle.id();
        if let Some(prev) = self.map.insert(id, handle) {
            // Put the earlier one back: it is the one the registry is responsible for.
            self.map.insert(id, prev);
            return Err(StoreError::illegal_state(format!(
                "iterator {} is already registered",
                id
            )));
        }
        Ok(())
    }

    /// Remove an iterator. Returns `false` if it was already removed.
    pub(crate) fn remove(&self, id: IteratorId) -> bool {
        self.map.remove(&id).is_some()
    }

    /// The registered handles at this moment, in ascending id order.
    pub(crate) fn snapshot(&self) -> Vec<Arc<OpenIterator<S>>> {
        let mut handles = self
            .map
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect::<Vec<_>>();
        handles.sort_by_key(|h| h.id());
        handles
    }

    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
