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

//! Test data and reusable scenarios shared by the concurrency tests.

use std::collections::BTreeSet;
use std::iter;
use std::sync::Arc;
use std::sync::Barrier;
use std::thread;

use futures::TryStreamExt;
use futures_util::StreamExt;
use parking_lot::Mutex;

use crate::impls::mem_store::MemStore;
use crate::impls::prefix_map::PrefixMap;
use crate::model::Node;
use crate::model::Triple;
use crate::model::TriplePattern;
use crate::store::ConcurrentStore;
use crate::store::Store;
use crate::RecordIter;
use crate::RecordStream;
use crate::StoreError;

pub(crate) const NS: &str = "https://ex.com#";
pub(crate) const PIZZA_NS: &str = "http://www.co-ode.org/ontologies/pizza/pizza.owl#";

pub(crate) fn uri(local: impl ToString) -> Node {
    Node::iri(format!("{}{}", NS, local.to_string()))
}

pub(crate) fn spo(s: Node, p: Node, o: Node) -> Triple {
    Triple::new(s, p, o)
}

pub(crate) fn by_subject(s: &Node) -> TriplePattern {
    TriplePattern::new(Some(s.clone()), None, None)
}

pub(crate) fn by_predicate(p: &Node) -> TriplePattern {
    TriplePattern::new(None, Some(p.clone()), None)
}

/// 49 fixed triples.
pub(crate) fn small_graph() -> Vec<Triple> {
    let mut v = vec![
        // s1 p1 [o1, o2, _:b1, "x", "y"]
        spo(uri("s1"), uri("p1"), uri("o1")),
        spo(uri("s1"), uri("p1"), uri("o2")),
        spo(uri("s1"), uri("p1"), Node::blank("b1")),
        spo(uri("s1"), uri("p1"), Node::literal("x")),
        spo(uri("s1"), uri("p1"), Node::literal("y")),
        // [s2, s3, _:b2] p2 o3
        spo(uri("s2"), uri("p2"), uri("o3")),
        spo(uri("s3"), uri("p2"), uri("o3")),
        spo(Node::blank("b2"), uri("p2"), uri("o3")),
        // [s4, s5] p3 [o4, o5]
        spo(uri("s4"), uri("p3"), uri("o4")),
        spo(uri("s5"), uri("p3"), uri("o5")),
        // s6 [p4, p5, p6] o6
        spo(uri("s6"), uri("p4"), uri("o6")),
        spo(uri("s6"), uri("p5"), uri("o6")),
        spo(uri("s6"), uri("p6"), uri("o6")),
    ];

    for i in 7..=42 {
        v.push(spo(
            uri(format!("s{}", i)),
            uri(format!("p{}", i)),
            uri(format!("o{}", i)),
        ));
    }
    v
}

/// 1937 distinct triples shaped like a small ontology: classes with labels, parents and restrictions.
pub(crate) fn pizza_graph() -> Vec<Triple> {
    let p = |local: &str| Node::iri(format!("{}{}", PIZZA_NS, local));
    let rdf_type = Node::iri("http://www.w3.org/1999/02/22-rdf-syntax-ns#type");
    let sub_class_of = Node::iri("http://www.w3.org/2000/01/rdf-schema#subClassOf");
    let label = Node::iri("http://www.w3.org/2000/01/rdf-schema#label");
    let owl_class = Node::iri("http://www.w3.org/2002/07/owl#Class");

    let mut v = Vec::with_capacity(1937);

    // 387 classes, 5 triples each.
    for i in 0..387 {
        let class = p(&format!("Class{}", i));
        v.push(spo(class.clone(), rdf_type.clone(), owl_class.clone()));
        v.push(spo(class.clone(), label.clone(), Node::literal(format!("Class {}", i))));
        v.push(spo(class.clone(), sub_class_of.clone(), p(&format!("Class{}", i / 7))));
        v.push(spo(class.clone(), p("hasTopping"), p(&format!("Topping{}", i % 23))));
        v.push(spo(class, sub_class_of.clone(), Node::blank(format!("r{}", i))));
    }

    // And 2 more.
    v.push(spo(p("hasTopping"), rdf_type.clone(), p("ObjectProperty")));
    v.push(spo(p("pizza"), rdf_type, p("Ontology")));

    v
}

/// Consume an iterator, failing on the first error.
pub(crate) fn collect<I>(it: I) -> Result<Vec<Triple>, StoreError>
where I: Iterator<Item = Result<Triple, StoreError>> {
    it.collect()
}

/// Assert every record is one of `known`.
pub(crate) fn assert_known(known: &BTreeSet<Triple>, got: &[Triple]) {
    for t in got {
        assert!(known.contains(t), "unexpected record: {}", t);
    }
}

/// For each of `records`: add it, query, delete it while an iterator is half consumed, query again.
///
/// With `exclusive` the store is only used by this call, and query results are checked exactly;
/// otherwise they are only checked to be a subset of `base` and `records`.
pub(crate) fn modify_and_read<C>(
    store: &C,
    base: &BTreeSet<Triple>,
    records: &[Triple],
    iterations: usize,
    exclusive: bool,
) -> Result<(), StoreError>
where
    C: ConcurrentStore<Store = MemStore>,
{
    let known = base
        .iter()
        .chain(records.iter())
        .cloned()
        .collect::<BTreeSet<_>>();

    for i in 0..iterations {
        let r = &records[i % records.len()];

        store.add(r.clone())?;

        // (b) three queries
        let all = collect(store.find(TriplePattern::ANY)?)?;
        assert_known(&known, &all);
        let subj = collect(store.find(by_subject(&r.subject))?)?;
        assert_known(&known, &subj);
        let n = futures::executor::block_on(
            store
                .stream(by_predicate(&r.predicate))?
                .try_collect::<Vec<_>>(),
        )?;
        assert_known(&known, &n);

        if exclusive {
            assert_eq!(base.len() + 1, all.len());
            assert!(subj.contains(r));
            assert!(store.contains(r)?);
        }

        // (c) delete while an iterator is in use
        let mut held = store.find(by_subject(&r.subject))?;
        let first = held.next().transpose()?;
        store.delete(r)?;
        let rest = collect(held)?;
        assert_known(&known, &rest);
        if exclusive {
            assert_eq!(subj.len(), first.iter().count() + rest.len());
        }

        // (d) three more queries
        let all = collect(store.find(TriplePattern::ANY)?)?;
        assert_known(&known, &all);
        let exists = store.contains_matching(&TriplePattern::from(r))?;
        let size = store.size()?;

        if exclusive {
            assert_eq!(base.len(), all.len());
            assert!(!exists);
            assert_eq!(base.len(), size);
        } else {
            assert!(size <= known.len());
        }
    }

    Ok(())
}

/// Run `f(thread_index)` on `n` threads that start together, and wait for all of them.
///
/// Panics if any of them fails.
pub(crate) fn run_threads<F>(n: usize, f: F)
where F: Fn(usize) -> Result<(), StoreError> + Sync {
    let barrier = Barrier::new(n);

    thread::scope(|s| {
        let handles = (0..n)
            .map(|i| {
                let barrier = &barrier;
                let f = &f;
                s.spawn(move || {
                    barrier.wait();
                    f(i)
                })
            })
            .collect::<Vec<_>>();

        for (i, h) in handles.into_iter().enumerate() {
            let res = h.join().unwrap_or_else(|_| panic!("thread {} panicked", i));
            if let Err(e) = res {
                panic!("thread {} failed: {}", i, e);
            }
        }
    });
}

/// Triples derived from `records` with a predicate that occurs nowhere else.
pub(crate) fn probes(records: &[Triple]) -> Vec<Triple> {
    records
        .iter()
        .map(|t| spo(t.subject.clone(), uri("probe"), t.object.clone()))
        .collect()
}

/// A [`MemStore`] whose iterators log the pattern they serve for every record they produce.
///
/// With `failing_after(n)` every iterator reports a fault after `n` records.
pub(crate) struct RecordingStore {
    inner: MemStore,
    fail_after: Option<usize>,
    pulls: Arc<Mutex<Vec<TriplePattern>>>,
}

impl RecordingStore {
    pub(crate) fn new(inner: MemStore) -> Self {
        Self {
            inner,
            fail_after: None,
            pulls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// The log of produced records, shared with every iterator of this store.
    pub(crate) fn pulls(&self) -> Arc<Mutex<Vec<TriplePattern>>> {
        Arc::clone(&self.pulls)
    }
}

impl Store for RecordingStore {
    type Record = Triple;
    type Pattern = TriplePattern;
    type Prefixes = PrefixMap;

    fn add(&mut self, record: Triple) -> Result<(), StoreError> {
        self.inner.add(record)
    }

    fn delete(&mut self, record: &Triple) -> Result<(), StoreError> {
        self.inner.delete(record)
    }

    fn delete_matching(&mut self, pattern: &TriplePattern) -> Result<(), StoreError> {
        self.inner.delete_matching(pattern)
    }

    fn clear(&mut self) -> Result<(), StoreError> {
        self.inner.clear()
    }

    fn close(&mut self) {
        self.inner.close()
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    fn contains(&self, record: &Triple) -> Result<bool, StoreError> {
        self.inner.contains(record)
    }

    fn contains_matching(&self, pattern: &TriplePattern) -> Result<bool, StoreError> {
        self.inner.contains_matching(pattern)
    }

    fn size(&self) -> Result<usize, StoreError> {
        self.inner.size()
    }

    fn find(&self, pattern: &TriplePattern) -> RecordIter<Triple> {
        let pulls = Arc::clone(&self.pulls);
        let served = pattern.clone();
        let records = self
            .inner
            .find(pattern)
            .inspect(move |_| pulls.lock().push(served.clone()));

        match self.fail_after {
            None => Box::new(records),
            Some(n) => Box::new(records.take(n).chain(iter::once(Err(
                StoreError::iterator_fault(format!("failed after {} records", n)),
            )))),
        }
    }

    fn stream(&self, pattern: &TriplePattern) -> RecordStream<Triple> {
        futures::stream::iter(self.find(pattern)).boxed()
    }

    fn is_isomorphic_with(&self, other: &Self) -> Result<bool, StoreError> {
        self.inner.is_isomorphic_with(&other.inner)
    }

    fn depends_on(&self, other: &Self) -> bool {
        self.inner.depends_on(&other.inner)
    }

    fn prefixes(&self) -> &PrefixMap {
        self.inner.prefixes()
    }

    fn prefixes_mut(&mut self) -> &mut PrefixMap {
        self.inner.prefixes_mut()
    }
}

#[test]
fn test_fixture_sizes() {
    assert_eq!(49, small_graph().iter().collect::<BTreeSet<_>>().len());
    assert_eq!(1937, pizza_graph().iter().collect::<BTreeSet<_>>().len());
}
