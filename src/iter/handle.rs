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
use std::time::Instant;

use parking_lot::Mutex;
use parking_lot::MutexGuard;

use crate::iter::InnerIterator;
use crate::iter::RecordQueueIterator;
use crate::locking::ReadAccess;
use crate::registry::IteratorId;
use crate::store::Store;
use crate::RecordResult;

/// What an open iterator currently reads from.
pub(crate) enum Delegate<S: Store> {
    /// Reads from the live store, possibly through a partially drained buffer.
    Inner(InnerIterator<S>),

    /// Reads from a snapshot taken by a modification.
    /// The outer iterator picks it up and stops locking.
    Snapshot(RecordQueueIterator<RecordResult<S::Record>>),

    /// Closed by the consumer, or the snapshot was already picked up.
    Closed,
}

impl<S: Store> fmt::Debug for Delegate<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delegate::Inner(inner) => f.debug_tuple("Inner").field(inner).finish(),
            Delegate::Snapshot(q) => f.debug_tuple("Snapshot").field(&q.remaining()).finish(),
            Delegate::Closed => write!(f, "Closed"),
        }
    }
}

impl<S: Store> Delegate<S> {
    /// The delegate is an inner iterator whose store iterator has not been created.
    pub(crate) fn needs_store(&self) -> bool {
        matches!(self, Delegate::Inner(inner) if !inner.is_created())
    }

    pub(crate) fn instantiate(&mut self, store: &S) {
        if let Delegate::Inner(inner) = self {
            inner.instantiate(store);
        }
    }

    /// Replace an inner delegate with the snapshot of its buffer.
    ///
    /// Other delegates are left as they are.
    pub(crate) fn convert_to_snapshot(&mut self) {
        let d = mem::replace(self, Delegate::Closed);
        *self = match d {
            Delegate::Inner(inner) => Delegate::Snapshot(inner.into_snapshot()),
            other => other,
        };
    }

    /// Take the snapshot out, leaving `Closed` behind.
    pub(crate) fn take_snapshot(&mut self) -> Option<RecordQueueIterator<RecordResult<S::Record>>> {
        match mem::replace(self, Delegate::Closed) {
            Delegate::Snapshot(snapshot) => Some(snapshot),
            other => {
                *self = other;
                None
            }
        }
    }
}

/// The part of an open iterator that is guarded by the handle lock.
pub(crate) struct Slot<S: Store> {
    pub(crate) delegate: Delegate<S>,

    /// When the consumer first asked for a record; `None` while unstarted.
    pub(crate) started_at: Option<Instant>,
}

/// An open lazy iterator, shared by its consumer and the registry.
///
/// The handle lock is [`slot`](OpenIterator::slot).
/// When both are needed, the store lock is always taken before the handle lock.
pub(crate) struct OpenIterator<S: Store> {
    id: IteratorId,
    opened_at: Instant,
    slot: Mutex<Slot<S>>,
}

impl<S: Store> fmt::Debug for OpenIterator<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.slot.lock();
        f.debug_struct("OpenIterator")
            .field("id", &self.id)
            .field("delegate", &slot.delegate)
            .field("started_at", &slot.started_at)
            .finish()
    }
}

impl<S: Store> OpenIterator<S> {
    pub(crate) fn new(id: IteratorId, inner: InnerIterator<S>) -> Self {
        Self {
            id,
            opened_at: Instant::now(),
            slot: Mutex::new(Slot {
                delegate: Delegate::Inner(inner),
                started_at: None,
            }),
        }
    }

    pub(crate) fn id(&self) -> IteratorId {
        self.id
    }

    pub(crate) fn opened_at(&self) -> Instant {
        self.opened_at
    }

    /// Take the handle lock without touching the store.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Slot<S>> {
        self.slot.lock()
    }

    /// Take the handle lock, creating the store iterator first if it does not exist yet.
    ///
    /// The store iterator is created under the read side of the store lock,
    /// and the handle lock is only taken inside it,
    /// the same order a modification takes them in.
    /// The state is checked again once the handle lock is held,
    /// since a modification may have run in between.
    pub(crate) fn lock_created(&self, access: &dyn ReadAccess<S>) -> MutexGuard<'_, Slot<S>> {
        loop {
            let guard = self.slot.lock();
            if !guard.delegate.needs_store() {
                return guard;
            }
            drop(guard);

            access.read_store(&mut |store| {
                self.slot.lock().delegate.instantiate(store);
            });
        }
    }
}
