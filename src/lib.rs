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

//! # Concurrent Store
//!
//! Thread-safe wrappers for a mutable record store whose reads return lazy iterators.
//!
//! A plain [`Store`] hands out iterators that must not outlive a modification.
//! The wrappers in this crate let any number of threads read and modify the same store:
//! reads return immediately with a lazy iterator,
//! and a modification never waits for readers to finish.
//! Before a modification runs, every open iterator is drained into its own buffer,
//! a chunk at a time, and from then on reads only from that buffer.
//!
//! ## Core Components
//!
//! - [`SynchronizedStore`]: one mutex for reads and writes
//! - [`ReadWriteLockingStore`]: shared reads, exclusive writes
//! - [`SimpleSynchronizedStore`]: the eager baseline that copies every result
//! - [`OuterIterator`]: the lazy iterator handed to callers
//! - [`ConcurrentStoreConfig`]: how open iterators are drained
//!
//! ## Usage Example
//!
//! ```rust
//! use concurrent_store::impls::mem_store::MemStore;
//! use concurrent_store::model::Node;
//! use concurrent_store::model::Triple;
//! use concurrent_store::ReadWriteLockingStore;
//! use concurrent_store::StoreError;
//!
//! fn main() -> Result<(), StoreError> {
//!     let store = ReadWriteLockingStore::new(MemStore::new());
//!
//!     let t = |s: &str| Triple::new(Node::iri(s), Node::iri("knows"), Node::iri("bob"));
//!     store.add(t("alice"))?;
//!     store.add(t("carol"))?;
//!
//!     // Lazy: nothing is read from the store yet.
//!     let mut it = store.find_all()?;
//!     assert_eq!(Some(t("alice")), it.next().transpose()?);
//!
//!     // Does not wait for `it`; `it` keeps the records it has not yet produced.
//!     store.clear()?;
//!
//!     assert_eq!(Some(t("carol")), it.next().transpose()?);
//!     assert_eq!(None, it.next().transpose()?);
//!     assert_eq!(0, store.size()?);
//!     Ok(())
//! }
//! ```

use futures_util::stream::BoxStream;

pub mod base;
pub mod config;
pub(crate) mod coordinator;
pub mod errors;
pub mod impls;
pub mod iter;
pub mod locking;
pub mod model;
pub mod prefix;
pub mod registry;
pub mod simple;
pub mod store;

#[cfg(test)]
mod testing;

pub use crate::base::NonBlockingReadStore;
pub use crate::base::ReadWriteLockingStore;
pub use crate::base::SynchronizedStore;
pub use crate::config::ConcurrentStoreConfig;
pub use crate::errors::StoreError;
pub use crate::iter::OuterIterator;
pub use crate::iter::RecordQueueIterator;
pub use crate::prefix::LockedPrefixMapping;
pub use crate::prefix::PrefixMapping;
pub use crate::prefix::ReadWriteLockingPrefixMapping;
pub use crate::prefix::SynchronizedPrefixMapping;
pub use crate::simple::SimpleSynchronizedStore;
pub use crate::store::ConcurrentStore;
pub use crate::store::Store;

/// A record, or the error met while producing it.
pub type RecordResult<R> = Result<R, StoreError>;

/// A boxed iterator of records, as returned by [`Store::find`].
pub type RecordIter<R> = Box<dyn Iterator<Item = RecordResult<R>> + Send>;

/// A boxed stream of records, as returned by [`Store::stream`].
/// The stream is 'static so that it can be handed out after the store lock is released.
pub type RecordStream<R> = BoxStream<'static, RecordResult<R>>;

/// The record type of a store.
pub type RecordOf<S> = <S as Store>::Record;

/// The pattern type of a store.
pub type PatternOf<S> = <S as Store>::Pattern;
