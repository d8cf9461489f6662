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

//! Store wrappers whose reads return lazy iterators that never block a writer for long.

use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;

use crate::config::ConcurrentStoreConfig;
use crate::coordinator;
use crate::errors::StoreError;
use crate::iter::handle::OpenIterator;
use crate::iter::InnerIterator;
use crate::iter::OuterIterator;
use crate::locking::Locking;
use crate::locking::MutexLocking;
use crate::locking::ReadAccess;
use crate::locking::RwLocking;
use crate::prefix::LockedPrefixMapping;
use crate::registry::OpenIterators;
use crate::store::ConcurrentStore;
use crate::store::Store;
use crate::PatternOf;
use crate::RecordIter;
use crate::RecordOf;
use crate::RecordStream;

/// Wraps a [`Store`] so that it can be read and modified from many threads.
///
/// `find()` and `stream()` only register a lazy iterator and return;
/// the store iterator behind it is created when the caller first asks for a record.
/// Every modification first resolves the open iterators:
/// each is drained into its own buffer and from then on reads from that buffer,
/// so no iterator ever reads from the store while it changes.
///
/// `L` decides whether reads exclude each other ([`MutexLocking`]) or not ([`RwLocking`]).
pub struct NonBlockingReadStore<S, L>
where
    S: Store,
    L: Locking<S>,
{
    lock: Arc<L>,
    open_iterators: Arc<OpenIterators<S>>,
    config: ConcurrentStoreConfig,
}

/// Reads and writes are serialized by one mutex.
pub type SynchronizedStore<S> = NonBlockingReadStore<S, MutexLocking<S>>;

/// Reads share a read lock; writes take the write lock.
pub type ReadWriteLockingStore<S> = NonBlockingReadStore<S, RwLocking<S>>;

impl<S, L> fmt::Debug for NonBlockingReadStore<S, L>
where
    S: Store,
    L: Locking<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NonBlockingReadStore")
            .field("open_iterators", &self.open_iterators.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<S, L> NonBlockingReadStore<S, L>
where
    S: Store,
    L: Locking<S>,
{
    pub fn new(store: S) -> Self {
        Self::with_config(store, ConcurrentStoreConfig::default())
    }

    pub fn with_config(store: S, config: ConcurrentStoreConfig) -> Self {
        Self {
            lock: Arc::new(L::new(store)),
            open_iterators: Arc::new(OpenIterators::default()),
            config,
        }
    }

    pub fn config(&self) -> &ConcurrentStoreConfig {
        &self.config
    }

    /// Number of lazy iterators that still read from the live store.
    pub fn open_iterators(&self) -> usize {
        self.open_iterators.len()
    }

    /// Give back the wrapped store.
    ///
    /// Fails and returns `self` if a view or an iterator still refers to the store.
    pub fn into_inner(self) -> Result<S, Self> {
        let Self {
            lock,
            open_iterators,
            config,
        } = self;

        match Arc::try_unwrap(lock) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(lock) => Err(Self {
                lock,
                open_iterators,
                config,
            }),
        }
    }

    /// Run `f` with shared access to the wrapped store.
    pub fn read_store<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        self.lock.read(f)
    }

    fn modify<T>(&self, action: impl FnOnce(&mut S) -> T) -> T {
        self.lock.write(|store| {
            coordinator::sync_modify(store, &self.open_iterators, &self.config, action)
        })
    }

    pub fn add(&self, record: S::Record) -> Result<(), StoreError> {
        self.modify(|s| s.add(record))
    }

    pub fn delete(&self, record: &S::Record) -> Result<(), StoreError> {
        self.modify(|s| s.delete(record))
    }

    pub fn delete_matching(&self, pattern: &S::Pattern) -> Result<(), StoreError> {
        self.modify(|s| s.delete_matching(pattern))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.modify(|s| s.clear())
    }

    pub fn close(&self) {
        self.modify(|s| s.close())
    }

    /// Returns a lazy iterator over the records matching `pattern`.
    pub fn find(&self, pattern: S::Pattern) -> Result<OuterIterator<S>, StoreError> {
        self.lock
            .read(|_store| self.remember(move |s: &S| s.find(&pattern)))
    }

    /// Returns a lazy stream over the records matching `pattern`.
    ///
    /// The stream is backed by the same lazy iterator as [`find`](Self::find):
    /// it is always ready, and a poll that needs the store blocks on the store lock
    /// the way `next()` does.
    pub fn stream(&self, pattern: S::Pattern) -> Result<RecordStream<S::Record>, StoreError> {
        let outer = self.find(pattern)?;
        Ok(futures::stream::iter(outer).boxed())
    }

    pub fn contains(&self, record: &S::Record) -> Result<bool, StoreError> {
        self.lock.read(|s| s.contains(record))
    }

    pub fn contains_matching(&self, pattern: &S::Pattern) -> Result<bool, StoreError> {
        self.lock.read(|s| s.contains_matching(pattern))
    }

    pub fn size(&self) -> Result<usize, StoreError> {
        self.lock.read(|s| s.size())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        self.lock.read(|s| s.is_empty())
    }

    pub fn is_closed(&self) -> bool {
        self.lock.read(|s| s.is_closed())
    }

    pub fn is_isomorphic_with(&self, other: &S) -> Result<bool, StoreError> {
        self.lock.read(|s| s.is_isomorphic_with(other))
    }

    pub fn depends_on(&self, other: &S) -> bool {
        self.lock.read(|s| s.depends_on(other))
    }

    /// A view of the wrapped store's prefix table that locks this wrapper for every call.
    pub fn prefix_mapping(&self) -> LockedPrefixMapping<S, L> {
        LockedPrefixMapping::new(Arc::clone(&self.lock))
    }

    /// Register a lazy iterator whose store iterator is created by `factory` on first use.
    ///
    /// Called with the read side of the lock held,
    /// so that no modification can run between registering and returning.
    fn remember(
        &self,
        factory: impl FnOnce(&S) -> RecordIter<S::Record> + Send + 'static,
    ) -> Result<OuterIterator<S>, StoreError> {
        let id = self.open_iterators.next_id();

        let registry = Arc::downgrade(&self.open_iterators);
        let release = move || {
            if let Some(registry) = registry.upgrade() {
                registry.remove(id);
            }
        };

        let handle = Arc::new(OpenIterator::new(id, InnerIterator::new(factory, release)));
        self.open_iterators.insert(Arc::clone(&handle))?;

        let access: Arc<dyn ReadAccess<S>> = self.lock.clone();
        Ok(OuterIterator::new(handle, access))
    }
}

impl<S, L> NonBlockingReadStore<S, L>
where
    S: Store,
    S::Pattern: Default,
    L: Locking<S>,
{
    /// Returns a lazy iterator over every record.
    pub fn find_all(&self) -> Result<OuterIterator<S>, StoreError> {
        self.find(S::Pattern::default())
    }

    /// Returns a lazy stream over every record.
    pub fn stream_all(&self) -> Result<RecordStream<S::Record>, StoreError> {
        self.stream(S::Pattern::default())
    }
}

impl<S, L> ConcurrentStore for NonBlockingReadStore<S, L>
where
    S: Store,
    L: Locking<S>,
{
    type Store = S;
    type Iter = OuterIterator<S>;

    fn add(&self, record: RecordOf<S>) -> Result<(), StoreError> {
        NonBlockingReadStore::add(self, record)
    }

    fn delete(&self, record: &RecordOf<S>) -> Result<(), StoreError> {
        NonBlockingReadStore::delete(self, record)
    }

    fn delete_matching(&self, pattern: &PatternOf<S>) -> Result<(), StoreError> {
        NonBlockingReadStore::delete_matching(self, pattern)
    }

    fn clear(&self) -> Result<(), StoreError> {
        NonBlockingReadStore::clear(self)
    }

    fn close(&self) {
        NonBlockingReadStore::close(self)
    }

    fn is_closed(&self) -> bool {
        NonBlockingReadStore::is_closed(self)
    }

    fn find(&self, pattern: PatternOf<S>) -> Result<OuterIterator<S>, StoreError> {
        NonBlockingReadStore::find(self, pattern)
    }

    fn stream(&self, pattern: PatternOf<S>) -> Result<RecordStream<RecordOf<S>>, StoreError> {
        NonBlockingReadStore::stream(self, pattern)
    }

    fn contains(&self, record: &RecordOf<S>) -> Result<bool, StoreError> {
        NonBlockingReadStore::contains(self, record)
    }

    fn contains_matching(&self, pattern: &PatternOf<S>) -> Result<bool, StoreError> {
        NonBlockingReadStore::contains_matching(self, pattern)
    }

    fn size(&self) -> Result<usize, StoreError> {
        NonBlockingReadStore::size(self)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        NonBlockingReadStore::is_empty(self)
    }
}
