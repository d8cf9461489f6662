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
use std::iter::Peekable;
use std::mem;

use crate::errors::StoreError;
use crate::iter::Cursor;
use crate::iter::RecordQueueIterator;
use crate::store::Store;
use crate::RecordIter;
use crate::RecordResult;

type SourceFactory<S> = Box<dyn FnOnce(&S) -> RecordIter<<S as Store>::Record> + Send>;

/// Where the records of an [`InnerIterator`] come from.
enum Source<S: Store> {
    /// The store iterator has not been asked for yet.
    NotCreated(SourceFactory<S>),
    /// The store iterator is alive and may have more records.
    Active(Peekable<RecordIter<S::Record>>),
    /// The store iterator ended, failed or was closed, and has been dropped.
    Exhausted,
}

impl<S: Store> fmt::Debug for Source<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::NotCreated(_) => write!(f, "NotCreated"),
            Source::Active(_) => write!(f, "Active"),
            Source::Exhausted => write!(f, "Exhausted"),
        }
    }
}

/// Wraps a lazily created store iterator, with a buffer in front of it.
///
/// The buffer is filled by [`try_drain`](InnerIterator::try_drain) while a modification is pending,
/// and is always consumed before the store iterator is touched again,
/// so records come out in the order the store produced them.
///
/// `release` is called exactly once, when the iterator is exhausted, fails, is closed,
/// or is turned into a snapshot.
pub struct InnerIterator<S: Store> {
    source: Source<S>,
    buffer: VecDeque<RecordResult<S::Record>>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl<S: Store> fmt::Debug for InnerIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InnerIterator")
            .field("source", &self.source)
            .field("buffered", &self.buffer.len())
            .field("released", &self.release.is_none())
            .finish()
    }
}

impl<S: Store> InnerIterator<S> {
    pub(crate) fn new(
        factory: impl FnOnce(&S) -> RecordIter<S::Record> + Send + 'static,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            source: Source::NotCreated(Box::new(factory)),
            buffer: VecDeque::new(),
            release: Some(Box::new(release)),
        }
    }

    /// Whether the store iterator has been asked for.
    pub fn is_created(&self) -> bool {
        !matches!(self.source, Source::NotCreated(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.source, Source::Exhausted)
    }

    pub fn is_released(&self) -> bool {
        self.release.is_none()
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Create the store iterator if it has not been created yet.
    pub(crate) fn instantiate(&mut self, store: &S) {
        let source = mem::replace(&mut self.source, Source::Exhausted);
        self.source = match source {
            Source::NotCreated(factory) => Source::Active(factory(store).peekable()),
            created => created,
        };
    }

    /// Move up to `chunk_size` records from the store iterator into the buffer.
    ///
    /// Returns `true` if the store iterator has more records.
    /// Calling it again continues where the previous call stopped.
    ///
    /// An error from the store iterator is buffered in its position
    /// and ends the store iterator; the consumer receives it after the records before it.
    pub(crate) fn try_drain(&mut self, store: &S, chunk_size: usize) -> bool {
        self.instantiate(store);

        let Source::Active(iter) = &mut self.source else {
            return false;
        };

        let mut ended = false;
        for _ in 0..chunk_size {
            match iter.next() {
                Some(Ok(record)) => self.buffer.push_back(Ok(record)),
                Some(Err(e)) => {
                    self.buffer.push_back(Err(e));
                    ended = true;
                    break;
                }
                None => {
                    ended = true;
                    break;
                }
            }
        }

        let more = !ended && iter.peek().is_some();
        if !more {
            self.source = Source::Exhausted;
        }
        more
    }

    pub fn has_next(&mut self) -> bool {
        if !self.buffer.is_empty() {
            return true;
        }

        let more = match &mut self.source {
            Source::Active(iter) => iter.peek().is_some(),
            Source::Exhausted => false,
            // Reported by `next()` as an error.
            Source::NotCreated(_) => return true,
        };

        if !more {
            self.source = Source::Exhausted;
            self.invoke_release();
        }
        more
    }

    pub fn next_record(&mut self) -> Option<RecordResult<S::Record>> {
        if let Some(item) = self.buffer.pop_front() {
            if item.is_err() {
                self.invoke_release();
            }
            return Some(item);
        }

        let item = match &mut self.source {
            Source::Active(iter) => iter.next(),
            Source::Exhausted => None,
            Source::NotCreated(_) => {
                return Some(Err(StoreError::illegal_state(
                    "store iterator is advanced before it is created",
                )));
            }
        };

        match item {
            Some(Ok(record)) => Some(Ok(record)),
            Some(Err(e)) => {
                self.source = Source::Exhausted;
                self.invoke_release();
                Some(Err(e))
            }
            None => {
                self.source = Source::Exhausted;
                self.invoke_release();
                None
            }
        }
    }

    /// Drop buffered records and the store iterator, then release.
    pub fn close(&mut self) {
        self.buffer.clear();
        self.source = Source::Exhausted;
        self.invoke_release();
    }

    /// Release and hand over the buffer as a store-independent snapshot.
    ///
    /// Records not yet drained from the store iterator are dropped with it;
    /// callers drain until [`try_drain`](InnerIterator::try_drain) returns `false` first.
    pub(crate) fn into_snapshot(mut self) -> RecordQueueIterator<RecordResult<S::Record>> {
        self.source = Source::Exhausted;
        self.invoke_release();
        RecordQueueIterator::new(mem::take(&mut self.buffer))
    }

    fn invoke_release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
    }
}

impl<S: Store> Cursor<S::Record> for InnerIterator<S> {
    fn has_next(&mut self) -> bool {
        InnerIterator::has_next(self)
    }

    fn next_record(&mut self) -> Option<RecordResult<S::Record>> {
        InnerIterator::next_record(self)
    }
}
