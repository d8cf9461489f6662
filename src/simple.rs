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

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use futures_util::StreamExt;
use log::warn;

use crate::errors::StoreError;
use crate::iter::RecordQueueIterator;
use crate::locking::Locking;
use crate::locking::MutexLocking;
use crate::prefix::SynchronizedPrefixMapping;
use crate::store::ConcurrentStore;
use crate::store::Store;
use crate::PatternOf;
use crate::RecordOf;
use crate::RecordResult;
use crate::RecordStream;

/// Results bigger than this are reported when collected.
const LARGE_RESULT: usize = 10_000;

/// The eager baseline: every read collects its whole result under one mutex.
///
/// Iterators and streams it returns are detached from the store and never observe a modification,
/// at the cost of copying every result and holding the mutex for the whole scan.
pub struct SimpleSynchronizedStore<S: Store> {
    lock: Arc<MutexLocking<S>>,
}

impl<S: Store> fmt::Debug for SimpleSynchronizedStore<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleSynchronizedStore")
            .field("lock", &self.lock)
            .finish()
    }
}

impl<S: Store> SimpleSynchronizedStore<S> {
    pub fn new(store: S) -> Self {
        Self {
            lock: Arc::new(MutexLocking::new(store)),
        }
    }

    /// Give back the wrapped store, or `self` if a prefix view still refers to it.
    pub fn into_inner(self) -> Result<S, Self> {
        match Arc::try_unwrap(self.lock) {
            Ok(lock) => Ok(lock.into_inner()),
            Err(lock) => Err(Self { lock }),
        }
    }

    pub fn add(&self, record: S::Record) -> Result<(), StoreError> {
        self.lock.write(|s| s.add(record))
    }

    pub fn delete(&self, record: &S::Record) -> Result<(), StoreError> {
        self.lock.write(|s| s.delete(record))
    }

    pub fn delete_matching(&self, pattern: &S::Pattern) -> Result<(), StoreError> {
        self.lock.write(|s| s.delete_matching(pattern))
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.lock.write(|s| s.clear())
    }

    pub fn close(&self) {
        self.lock.write(|s| s.close())
    }

    pub fn is_closed(&self) -> bool {
        self.lock.read(|s| s.is_closed())
    }

    pub fn find(
        &self,
        pattern: S::Pattern,
    ) -> Result<RecordQueueIterator<RecordResult<S::Record>>, StoreError> {
        let records = self
            .lock
            .read(|s| s.find(&pattern).collect::<Result<VecDeque<_>, _>>())?;

        if records.len() > LARGE_RESULT {
            warn!(
                "SimpleSynchronizedStore::find() collects a big result of len={}",
                records.len()
            );
        }

        Ok(RecordQueueIterator::new(
            records.into_iter().map(Ok).collect(),
        ))
    }

    pub fn stream(&self, pattern: S::Pattern) -> Result<RecordStream<S::Record>, StoreError> {
        let records = self
            .lock
            .read(|s| s.find(&pattern).collect::<Result<Vec<_>, _>>())?;

        if records.len() > LARGE_RESULT {
            warn!(
                "SimpleSynchronizedStore::stream() collects a big result of len={}",
                records.len()
            );
        }

        Ok(futures::stream::iter(records).map(Ok).boxed())
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

    pub fn is_isomorphic_with(&self, other: &S) -> Result<bool, StoreError> {
        self.lock.read(|s| s.is_isomorphic_with(other))
    }

    pub fn depends_on(&self, other: &S) -> bool {
        self.lock.read(|s| s.depends_on(other))
    }

    pub fn prefix_mapping(&self) -> SynchronizedPrefixMapping<S> {
        SynchronizedPrefixMapping::new(Arc::clone(&self.lock))
    }
}

impl<S: Store> ConcurrentStore for SimpleSynchronizedStore<S> {
    type Store = S;
    type Iter = RecordQueueIterator<RecordResult<S::Record>>;

    fn add(&self, record: RecordOf<S>) -> Result<(), StoreError> {
        SimpleSynchronizedStore::add(self, record)
    }

    fn delete(&self, record: &RecordOf<S>) -> Result<(), StoreError> {
        SimpleSynchronizedStore::delete(self, record)
    }

    fn delete_matching(&self, pattern: &PatternOf<S>) -> Result<(), StoreError> {
        SimpleSynchronizedStore::delete_matching(self, pattern)
    }

    fn clear(&self) -> Result<(), StoreError> {
        SimpleSynchronizedStore::clear(self)
    }

    fn close(&self) {
        SimpleSynchronizedStore::close(self)
    }

    fn is_closed(&self) -> bool {
        SimpleSynchronizedStore::is_closed(self)
    }

    fn find(&self, pattern: PatternOf<S>) -> Result<Self::Iter, StoreError> {
        SimpleSynchronizedStore::find(self, pattern)
    }

    fn stream(&self, pattern: PatternOf<S>) -> Result<RecordStream<RecordOf<S>>, StoreError> {
        SimpleSynchronizedStore::stream(self, pattern)
    }

    fn contains(&self, record: &RecordOf<S>) -> Result<bool, StoreError> {
        SimpleSynchronizedStore::contains(self, record)
    }

    fn contains_matching(&self, pattern: &PatternOf<S>) -> Result<bool, StoreError> {
        SimpleSynchronizedStore::contains_matching(self, pattern)
    }

    fn size(&self) -> Result<usize, StoreError> {
        SimpleSynchronizedStore::size(self)
    }

    fn is_empty(&self) -> Result<bool, StoreError> {
        SimpleSynchronizedStore::is_empty(self)
    }
}

#[cfg(test)]
mod tests {
    use futures::TryStreamExt;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::impls::mem_store::MemStore;
    use crate::model::Node;
    use crate::model::Triple;
    use crate::model::TriplePattern;

    fn t(i: usize) -> Triple {
        Triple::new(Node::iri(format!("s{}", i)), Node::iri("p"), Node::literal(i))
    }

    #[test]
    fn test_find_is_detached() -> anyhow::Result<()> {
        let store = SimpleSynchronizedStore::new(MemStore::from_iter((0..5).map(t)));

        let it = store.find(TriplePattern::ANY)?;
        assert_eq!(5, it.remaining());
        assert_eq!(1, store.lock.read(|s| s.created_iterators()));

        store.clear()?;
        assert_eq!(5, it.collect::<Result<Vec<_>, _>>()?.len());
        Ok(())
    }

    #[test]
    fn test_find_reports_store_error() {
        let store = SimpleSynchronizedStore::new(MemStore::from_iter((0..5).map(t)));
        store.close();

        assert_eq!(
            Err(StoreError::Closed),
            store.find(TriplePattern::ANY).map(|it| it.count())
        );
    }

    #[tokio::test]
    async fn test_stream() -> anyhow::Result<()> {
        let store = SimpleSynchronizedStore::new(MemStore::from_iter((0..3).map(t)));

        let strm = store.stream(TriplePattern::ANY)?;
        store.add(t(3))?;

        assert_eq!(3, strm.try_collect::<Vec<_>>().await?.len());
        assert_eq!(4, store.size()?);
        Ok(())
    }
}
