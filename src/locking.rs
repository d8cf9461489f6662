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

//! Locking strategies: who may hold `&S` and who may hold `&mut S`, and when.

use std::fmt;

use parking_lot::Mutex;
use parking_lot::RwLock;

/// Owns a store and hands out shared or exclusive access to it.
///
/// [`read`](Locking::read) is the read-side critical section
/// and [`write`](Locking::write) the write-side one.
/// Neither is reentrant: calling back into the same lock from inside `f` deadlocks.
pub trait Locking<S>: Send + Sync + 'static
where S: Send + Sync + 'static
{
    fn new(store: S) -> Self;

    fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T;

    fn write<T>(&self, f: impl FnOnce(&mut S) -> T) -> T;

    fn into_inner(self) -> S;
}

/// Object-safe read access to a locked store.
///
/// An open iterator keeps one of these
/// so that it can create its store iterator on first use, under the read side of the lock.
pub(crate) trait ReadAccess<S>: Send + Sync {
    fn read_store(&self, f: &mut dyn FnMut(&S));
}

impl<S, L> ReadAccess<S> for L
where
    S: Send + Sync + 'static,
    L: Locking<S>,
{
    fn read_store(&self, f: &mut dyn FnMut(&S)) {
        self.read(|store| f(store))
    }
}

/// A single mutex guards reads and writes alike.
///
/// Reads never overlap each other,
/// but lazy iterators are still consumed outside the mutex.
pub struct MutexLocking<S> {
    store: Mutex<S>,
}

impl<S> Locking<S> for MutexLocking<S>
where S: Send + Sync + 'static
{
    fn new(store: S) -> Self {
        Self {
            store: Mutex::new(store),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let guard = self.store.lock();
        f(&*guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut guard = self.store.lock();
        f(&mut *guard)
    }

    fn into_inner(self) -> S {
        self.store.into_inner()
    }
}

impl<S> fmt::Debug for MutexLocking<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutexLocking")
            .field("locked", &self.store.is_locked())
            .finish()
    }
}

/// Shared reads, exclusive writes.
pub struct RwLocking<S> {
    store: RwLock<S>,
}

impl<S> Locking<S> for RwLocking<S>
where S: Send + Sync + 'static
{
    fn new(store: S) -> Self {
        Self {
            store: RwLock::new(store),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&S) -> T) -> T {
        let guard = self.store.read();
        f(&*guard)
    }

    fn write<T>(&self, f: impl FnOnce(&mut S) -> T) -> T {
        let mut guard = self.store.write();
        f(&mut *guard)
    }

    fn into_inner(self) -> S {
        self.store.into_inner()
    }
}

impl<S> fmt::Debug for RwLocking<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RwLocking")
            .field("locked", &self.store.is_locked())
            .field("locked_exclusive", &self.store.is_locked_exclusive())
            .finish()
    }
}
