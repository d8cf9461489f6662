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

use std::fmt;
use std::mem;
use std::sync::Arc;
use std::time::Instant;

use crate::iter::handle::Delegate;
use crate::iter::handle::OpenIterator;
use crate::iter::Cursor;
use crate::iter::RecordQueueIterator;
use crate::locking::ReadAccess;
use crate::registry::IteratorId;
use crate::store::Store;
use crate::RecordResult;

/// How an [`OuterIterator`] reaches its records.
enum DelegateLock<S: Store> {
    /// Shares its delegate with the registry; every call takes the handle lock.
    Mutex {
        handle: Arc<OpenIterator<S>>,
        access: Arc<dyn ReadAccess<S>>,
    },

    /// Released: owns a snapshot and never locks again.
    NoOp(RecordQueueIterator<RecordResult<S::Record>>),
}

/// The iterator handed to callers of a lazy `find()`.
///
/// Records are pulled from the live store only when asked for.
/// A modification of the store turns it into a snapshot of the records it has not yet produced;
/// from then on it no longer touches the store or any lock.
///
/// The first record of an iterator that has not created its store iterator yet
/// needs the read side of the store lock,
/// so it waits for a running modification to finish, not just for one drain step.
///
/// Dropping it closes it.
pub struct OuterIterator<S: Store> {
    id: IteratorId,
    lock: DelegateLock<S>,
}

impl<S: Store> fmt::Debug for OuterIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match &self.lock {
            DelegateLock::Mutex { .. } => "Mutex",
            DelegateLock::NoOp(_) => "NoOp",
        };
        f.debug_struct("OuterIterator")
            .field("id", &self.id)
            .field("lock", &mode)
            .finish()
    }
}

impl<S: Store> OuterIterator<S> {
    pub(crate) fn new(handle: Arc<OpenIterator<S>>, access: Arc<dyn ReadAccess<S>>) -> Self {
        Self {
            id: handle.id(),
            lock: DelegateLock::Mutex { handle, access },
        }
    }

    pub fn id(&self) -> IteratorId {
        self.id
    }

    /// Whether this iterator has stopped sharing state with the store.
    pub fn is_released(&self) -> bool {
        matches!(self.lock, DelegateLock::NoOp(_))
    }

    pub fn has_next(&mut self) -> bool {
        self.with_cursor(|c| c.has_next())
    }

    /// Stop iterating and release the store iterator. Closing twice is a no-op.
    pub fn close(&mut self) {
        let handle = match &self.lock {
            DelegateLock::NoOp(_) => None,
            DelegateLock::Mutex { handle, .. } => Some(Arc::clone(handle)),
        };

        if let Some(handle) = handle {
            let mut slot = handle.lock();
            if let Delegate::Inner(mut inner) = mem::replace(&mut slot.delegate, Delegate::Closed) {
                inner.close();
            }
        }

        self.lock = DelegateLock::NoOp(RecordQueueIterator::default());
    }

    fn with_cursor<T>(&mut self, op: impl FnOnce(&mut dyn Cursor<S::Record>) -> T) -> T {
        let (handle, access) = match &mut self.lock {
            DelegateLock::NoOp(snapshot) => return op(snapshot),
            DelegateLock::Mutex { handle, access } => (Arc::clone(handle), Arc::clone(access)),
        };

        let mut guard = handle.lock_created(access.as_ref());

        let slot = &mut *guard;
        if let Delegate::Inner(inner) = &mut slot.delegate {
            slot.started_at.get_or_insert_with(Instant::now);
            return op(inner);
        }

        // Converted by a modification, or closed: switch to the lock-free mode for good.
        let mut snapshot = guard.delegate.take_snapshot().unwrap_or_default();
        drop(guard);

        let res = op(&mut snapshot);
        self.lock = DelegateLock::NoOp(snapshot);
        res
    }
}

impl<S: Store> Iterator for OuterIterator<S> {
    type Item = RecordResult<S::Record>;

    fn next(&mut self) -> Option<Self::Item> {
        self.with_cursor(|c| c.next_record())
    }
}

impl<S: Store> Drop for OuterIterator<S> {
    fn drop(&mut self) {
        self.close();
    }
}
