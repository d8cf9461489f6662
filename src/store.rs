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

//! Defines the record store interface and the thread-safe interface built on top of it.
//!
//! A [`Store`] is not expected to tolerate concurrent use:
//! an iterator it hands out may fail, or worse, if the store is modified while the iterator is alive.
//! A [`ConcurrentStore`] offers the same operations and may be shared between threads freely.

use crate::errors::StoreError;
use crate::prefix::PrefixMapping;
use crate::PatternOf;
use crate::RecordIter;
use crate::RecordOf;
use crate::RecordResult;
use crate::RecordStream;

/// A mutable collection of records that supports pattern lookup.
///
/// Read operations take `&self` and mutations take `&mut self`;
/// the concurrent wrappers decide who holds which reference and when.
///
/// Iterators and streams returned by [`find`](Store::find) and [`stream`](Store::stream)
/// are `'static`: they must not borrow the store,
/// because a wrapper hands them to callers after the store lock is released.
/// They are only ever advanced while no mutation is running on the store.
pub trait Store: Send + Sync + 'static {
    /// An opaque record; the wrappers never look inside it.
    type Record: Send + 'static;

    /// A possibly wildcarded query against records.
    type Pattern: Clone + Send + Sync + 'static;

    /// The namespace-prefix table attached to the store.
    type Prefixes: PrefixMapping;

    /// Add a record. Adding a record that is already present is a no-op.
    fn add(&mut self, record: Self::Record) -> Result<(), StoreError>;

    /// Remove a record. Removing an absent record is a no-op.
    fn delete(&mut self, record: &Self::Record) -> Result<(), StoreError>;

    /// Remove every record matching `pattern`.
    fn delete_matching(&mut self, pattern: &Self::Pattern) -> Result<(), StoreError>;

    fn clear(&mut self) -> Result<(), StoreError>;

    /// Close the store. Closing twice is a no-op.
    fn close(&mut self);

    fn is_closed(&self) -> bool;

    fn contains(&self, record: &Self::Record) -> Result<bool, StoreError>;

    fn contains_matching(&self, pattern: &Self::Pattern) -> Result<bool, StoreError>;

    fn size(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.size()? == 0)
    }

    /// Returns a lazy iterator over the records matching `pattern`.
    fn find(&self, pattern: &Self::Pattern) -> RecordIter<Self::Record>;

    /// Returns a lazy stream over the records matching `pattern`.
    fn stream(&self, pattern: &Self::Pattern) -> RecordStream<Self::Record>;

    /// Whether this store and `other` hold the same records.
    fn is_isomorphic_with(&self, other: &Self) -> Result<bool, StoreError>;

    /// Whether this store shares its data with `other`.
    fn depends_on(&self, other: &Self) -> bool;

    fn prefixes(&self) -> &Self::Prefixes;

    fn prefixes_mut(&mut self) -> &mut Self::Prefixes;
}

/// A record store that can be used from many threads at the same time.
///
/// Implemented by the lazy, coordinating wrappers
/// ([`SynchronizedStore`](crate::SynchronizedStore) and
/// [`ReadWriteLockingStore`](crate::ReadWriteLockingStore))
/// and by the eager baseline [`SimpleSynchronizedStore`](crate::SimpleSynchronizedStore).
pub trait ConcurrentStore: Send + Sync {
    /// The wrapped store.
    type Store: Store;

    /// Iterator returned by [`find`](ConcurrentStore::find).
    type Iter: Iterator<Item = RecordResult<RecordOf<Self::Store>>> + Send + 'static;

    fn add(&self, record: RecordOf<Self::Store>) -> Result<(), StoreError>;

    fn delete(&self, record: &RecordOf<Self::Store>) -> Result<(), StoreError>;

    fn delete_matching(&self, pattern: &PatternOf<Self::Store>) -> Result<(), StoreError>;

    fn clear(&self) -> Result<(), StoreError>;

    fn close(&self);

    fn is_closed(&self) -> bool;

    fn find(&self, pattern: PatternOf<Self::Store>) -> Result<Self::Iter, StoreError>;

    fn stream(
        &self,
        pattern: PatternOf<Self::Store>,
    ) -> Result<RecordStream<RecordOf<Self::Store>>, StoreError>;

    fn contains(&self, record: &RecordOf<Self::Store>) -> Result<bool, StoreError>;

    fn contains_matching(&self, pattern: &PatternOf<Self::Store>) -> Result<bool, StoreError>;

    fn size(&self) -> Result<usize, StoreError>;

    fn is_empty(&self) -> Result<bool, StoreError>;
}
