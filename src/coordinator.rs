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

//! Resolves open lazy iterators before a modification runs.
//!
//! Everything here runs with exclusive access to the store.
//! Each open iterator still reading from the live store is drained into its own buffer,
//! one chunk per turn and round-robin across iterators,
//! then switched to the snapshot of that buffer and removed from the registry.
//! Only when no open iterator depends on the store any more does the modification run.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use log::debug;
use log::warn;

use crate::config::ConcurrentStoreConfig;
use crate::iter::handle::Delegate;
use crate::iter::handle::OpenIterator;
use crate::registry::IteratorId;
use crate::registry::OpenIterators;
use crate::store::Store;

/// What a modification did to the open iterators before it ran.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Iterators turned into snapshots.
    pub converted: usize,

    /// Registered iterators that were already closed or converted when they were reached.
    pub dropped: usize,

    /// Number of `try_drain` turns taken, across all iterators.
    pub drain_steps: usize,
}

impl Resolution {
    pub fn is_noop(&self) -> bool {
        self.converted == 0 && self.dropped == 0
    }
}

/// An iterator waiting for its next drain turn.
pub(crate) struct Pending<S: Store> {
    pub(crate) handle: Arc<OpenIterator<S>>,
    pub(crate) started_at: Option<Instant>,
}

impl<S: Store> Pending<S> {
    pub(crate) fn id(&self) -> IteratorId {
        self.handle.id()
    }

    /// Longest open first; an unstarted iterator sorts before an active one opened at the same time.
    fn order_key(&self) -> (Instant, Option<Instant>, IteratorId) {
        (self.handle.opened_at(), self.started_at, self.handle.id())
    }
}

/// Build the work list from the registered iterators.
///
/// Unstarted and active iterators are both resolved:
/// an unstarted one would otherwise create its store iterator after the modification
/// and see a store it was not opened against.
/// Registered handles that no longer read from the store are removed.
pub(crate) fn plan<S: Store>(
    registry: &OpenIterators<S>,
    config: &ConcurrentStoreConfig,
) -> (VecDeque<Pending<S>>, usize) {
    let mut pending = Vec::new();
    let mut dropped = 0;

    for handle in registry.snapshot() {
        let slot = handle.lock();
        let inner = matches!(slot.delegate, Delegate::Inner(_));
        let started_at = slot.started_at;
        drop(slot);

        if inner {
            pending.push(Pending { handle, started_at });
        } else {
            warn!(
                "coordinator::plan: iterator {} is registered but no longer reads from the store",
                handle.id()
            );
            registry.remove(handle.id());
            dropped += 1;
        }
    }

    if config.process_oldest_first {
        pending.sort_by_key(|p| p.order_key());
    }

    (pending.into(), dropped)
}

/// Drain and convert every registered iterator, round-robin, `chunk_size` records per turn.
pub(crate) fn resolve<S: Store>(
    store: &S,
    registry: &OpenIterators<S>,
    config: &ConcurrentStoreConfig,
) -> Resolution {
    if registry.is_empty() {
        return Resolution::default();
    }

    let (mut work, dropped) = plan(registry, config);
    let mut res = Resolution {
        dropped,
        ..Default::default()
    };

    let chunk_size = config.chunk_size();

    while let Some(p) = work.pop_front() {
        let mut slot = p.handle.lock();

        let more = match &mut slot.delegate {
            Delegate::Inner(inner) => {
                res.drain_steps += 1;
                Some(inner.try_drain(store, chunk_size))
            }
            // Closed by its consumer since it was planned.
            Delegate::Snapshot(_) | Delegate::Closed => None,
        };

        match more {
            Some(true) => {
                drop(slot);
                work.push_back(p);
            }
            Some(false) => {
                slot.delegate.convert_to_snapshot();
                drop(slot);
                registry.remove(p.id());
                res.converted += 1;
            }
            None => {
                drop(slot);
                registry.remove(p.id());
                res.dropped += 1;
            }
        }
    }

    res
}

/// Resolve open iterators, then run `action` on the store.
///
/// The caller holds exclusive access to the store for the whole call.
pub(crate) fn sync_modify<S, T>(
    store: &mut S,
    registry: &OpenIterators<S>,
    config: &ConcurrentStoreConfig,
    action: impl FnOnce(&mut S) -> T,
) -> T
where
    S: Store,
{
    let res = resolve(&*store, registry, config);
    if !res.is_noop() {
        debug!("sync_modify: resolved open iterators: {:?}", res);
    }

    action(store)
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::impls::mem_store::MemStore;
    use crate::iter::InnerIterator;
    use crate::model::Node;
    use crate::model::Triple;
    use crate::model::TriplePattern;

    fn t(i: usize) -> Triple {
        Triple::new(Node::iri(format!("s{}", i)), Node::iri("p"), Node::literal(i))
    }

    fn open(registry: &Arc<OpenIterators<MemStore>>) -> Arc<OpenIterator<MemStore>> {
        let id = registry.next_id();
        let weak = Arc::downgrade(registry);
        let inner = InnerIterator::new(
            |s: &MemStore| s.find(&TriplePattern::ANY),
            move || {
                if let Some(r) = weak.upgrade() {
                    r.remove(id);
                }
            },
        );
        let h = Arc::new(OpenIterator::new(id, inner));
        registry.insert(Arc::clone(&h)).unwrap();
        h
    }

    fn config(chunk: usize, oldest_first: bool) -> ConcurrentStoreConfig {
        ConcurrentStoreConfig::new(NonZeroUsize::new(chunk).unwrap(), oldest_first)
    }

    #[test]
    fn test_resolve_converts_all() {
        let store = MemStore::from_iter((0..10).map(t));
        let registry = Arc::new(OpenIterators::default());
        let a = open(&registry);
        let b = open(&registry);

        let res = resolve(&store, &registry, &config(3, false));
        assert_eq!(
            Resolution {
                converted: 2,
                dropped: 0,
                // 10 records in chunks of 3: 4 turns each.
                drain_steps: 8,
            },
            res
        );
        assert!(registry.is_empty());

        for h in [a, b] {
            let mut slot = h.lock();
            let snapshot = slot.delegate.take_snapshot().unwrap();
            assert_eq!(
                (0..10).map(t).collect::<Vec<_>>(),
                snapshot.map(|r| r.unwrap()).collect::<Vec<_>>()
            );
        }
    }

    #[test]
    fn test_resolve_drops_closed() {
        let store = MemStore::from_iter((0..3).map(t));
        let registry = Arc::new(OpenIterators::default());
        let h = open(&registry);

        // Closed behind the registry's back.
        h.lock().delegate = Delegate::Closed;

        let res = resolve(&store, &registry, &config(3, false));
        assert_eq!(1, res.dropped);
        assert_eq!(0, res.converted);
        assert!(registry.is_empty());
    }

    #[test]
    fn test_plan_classifies_unstarted_and_active() {
        let registry = Arc::new(OpenIterators::default());
        let unstarted = open(&registry);
        let active = open(&registry);
        active.lock().started_at = Some(Instant::now());

        let (work, dropped) = plan(&registry, &config(1, false));
        assert_eq!(0, dropped);
        assert_eq!(
            vec![(unstarted.id(), false), (active.id(), true)],
            work.iter()
                .map(|p| (p.id(), p.started_at.is_some()))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_plan_oldest_first() {
        let registry = Arc::new(OpenIterators::default());

        let a = open(&registry);
        thread::sleep(Duration::from_millis(2));
        let b = open(&registry);
        thread::sleep(Duration::from_millis(2));
        let c = open(&registry);

        // b never started; c started before a.
        c.lock().started_at = Some(Instant::now());
        thread::sleep(Duration::from_millis(2));
        a.lock().started_at = Some(Instant::now());

        let (work, _) = plan(&registry, &config(1, true));
        assert_eq!(
            vec![a.id(), b.id(), c.id()],
            work.iter().map(|p| p.id()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_plan_oldest_first_active_before_later_unstarted() {
        let registry = Arc::new(OpenIterators::default());

        let active = open(&registry);
        active.lock().started_at = Some(Instant::now());
        thread::sleep(Duration::from_millis(2));
        let unstarted = open(&registry);

        let (work, _) = plan(&registry, &config(1, true));
        assert_eq!(
            vec![active.id(), unstarted.id()],
            work.iter().map(|p| p.id()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_plan_registry_order() {
        let registry = Arc::new(OpenIterators::default());
        let a = open(&registry);
        let b = open(&registry);
        b.lock().started_at = Some(Instant::now());

        let (work, _) = plan(&registry, &config(1, false));
        assert_eq!(
            vec![a.id(), b.id()],
            work.iter().map(|p| p.id()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_sync_modify_runs_action_after_resolving() {
        let mut store = MemStore::from_iter((0..4).map(t));
        let registry = Arc::new(OpenIterators::default());
        let h = open(&registry);

        let size = sync_modify(&mut store, &registry, &config(1, false), |s| {
            s.add(t(100)).unwrap();
            s.size().unwrap()
        });
        assert_eq!(5, size);

        let snapshot = h.lock().delegate.take_snapshot().unwrap();
        assert_eq!(4, snapshot.count());
    }
}
