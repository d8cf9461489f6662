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

//! Namespace-prefix tables and their lock-guarded views.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::errors::StoreError;
use crate::locking::Locking;
use crate::locking::MutexLocking;
use crate::locking::RwLocking;
use crate::store::Store;

/// A table of namespace prefixes, e.g. `rdf` -> `http://www.w3.org/1999/02/22-rdf-syntax-ns#`.
pub trait PrefixMapping: Send + Sync {
    fn set_ns_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), StoreError>;

    fn remove_ns_prefix(&mut self, prefix: &str) -> Result<(), StoreError>;

    fn clear_ns_prefix_map(&mut self) -> Result<(), StoreError>;

    /// Copy every mapping in `map` into this table, replacing existing prefixes.
    fn set_ns_prefixes(&mut self, map: &BTreeMap<String, String>) -> Result<(), StoreError>;

    /// Copy the mappings in `defaults` whose prefix and uri are both unused in this table.
    fn with_default_mappings(
        &mut self,
        defaults: &BTreeMap<String, String>,
    ) -> Result<(), StoreError>;

    fn ns_prefix_uri(&self, prefix: &str) -> Option<String>;

    /// Returns the prefix mapped to exactly `uri`.
    fn ns_uri_prefix(&self, uri: &str) -> Option<String>;

    fn ns_prefix_map(&self) -> BTreeMap<String, String>;

    /// Expand `prefix:local` to the full uri; returns the input unchanged if the prefix is unknown.
    fn expand_prefix(&self, prefixed: &str) -> String;

    /// Compress a uri to `prefix:local`; returns the input unchanged if no namespace matches.
    fn short_form(&self, uri: &str) -> String;

    /// Like [`short_form`](PrefixMapping::short_form) but only if the local part is a legal name.
    fn qname_for(&self, uri: &str) -> Option<String>;

    /// Freeze the table: every later change fails with [`StoreError::PrefixMappingLocked`].
    fn lock(&mut self);

    fn num_prefixes(&self) -> usize;

    fn has_no_mappings(&self) -> bool {
        self.num_prefixes() == 0
    }

    fn same_prefix_mapping_as(&self, other: &BTreeMap<String, String>) -> bool {
        &self.ns_prefix_map() == other
    }
}

/// A view of a wrapped store's prefix table that takes the wrapper's lock for every call.
///
/// Queries take the read side of the lock and changes take the write side.
/// Changing prefixes does not touch records,
/// so it does not resolve open record iterators.
pub struct LockedPrefixMapping<S, L>
where
    S: Store,
    L: Locking<S>,
{
    lock: Arc<L>,
    _phantom: PhantomData<fn() -> S>,
}

/// Prefix view of [`SynchronizedStore`](crate::SynchronizedStore)
/// and [`SimpleSynchronizedStore`](crate::SimpleSynchronizedStore):
/// one mutex for everything.
pub type SynchronizedPrefixMapping<S> = LockedPrefixMapping<S, MutexLocking<S>>;

/// Prefix view of [`ReadWriteLockingStore`](crate::ReadWriteLockingStore).
pub type ReadWriteLockingPrefixMapping<S> = LockedPrefixMapping<S, RwLocking<S>>;

impl<S, L> LockedPrefixMapping<S, L>
where
    S: Store,
    L: Locking<S>,
{
    pub(crate) fn new(lock: Arc<L>) -> Self {
        Self {
            lock,
            _phantom: PhantomData,
        }
    }

    fn read<T>(&self, f: impl FnOnce(&S::Prefixes) -> T) -> T {
        self.lock.read(|store| f(store.prefixes()))
    }

    fn write<T>(&self, f: impl FnOnce(&mut S::Prefixes) -> T) -> T {
        self.lock.write(|store| f(store.prefixes_mut()))
    }
}

impl<S, L> Clone for LockedPrefixMapping<S, L>
where
    S: Store,
    L: Locking<S>,
{
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.lock))
    }
}

impl<S, L> fmt::Debug for LockedPrefixMapping<S, L>
where
    S: Store,
    L: Locking<S>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LockedPrefixMapping")
            .field("prefixes", &self.ns_prefix_map())
            .finish()
    }
}

impl<S, L> PrefixMapping for LockedPrefixMapping<S, L>
where
    S: Store,
    L: Locking<S>,
{
    fn set_ns_prefix(&mut self, prefix: &str, uri: &str) -> Result<(), StoreError> {
        self.write(|pm| pm.set_ns_prefix(prefix, uri))
    }

    fn remove_ns_prefix(&mut self, prefix: &str) -> Result<(), StoreError> {
        self.write(|pm| pm.remove_ns_prefix(prefix))
    }

    fn clear_ns_prefix_map(&mut self) -> Result<(), StoreError> {
        self.write(|pm| pm.clear_ns_prefix_map())
    }

    fn set_ns_prefixes(&mut self, map: &BTreeMap<String, String>) -> Result<(), StoreError> {
        self.write(|pm| pm.set_ns_prefixes(map))
    }

    fn with_default_mappings(
        &mut self,
        defaults: &BTreeMap<String, String>,
    ) -> Result<(), StoreError> {
        self.write(|pm| pm.with_default_mappings(defaults))
    }

    fn ns_prefix_uri(&self, prefix: &str) -> Option<String> {
        self.read(|pm| pm.ns_prefix_uri(prefix))
    }

    fn ns_uri_prefix(&self, uri: &str) -> Option<String> {
        self.read(|pm| pm.ns_uri_prefix(uri))
    }

    fn ns_prefix_map(&self) -> BTreeMap<String, String> {
        self.read(|pm| pm.ns_prefix_map())
    }

    fn expand_prefix(&self, prefixed: &str) -> String {
        self.read(|pm| pm.expand_prefix(prefixed))
    }

    fn short_form(&self, uri: &str) -> String {
        self.read(|pm| pm.short_form(uri))
    }

    fn qname_for(&self, uri: &str) -> Option<String> {
        self.read(|pm| pm.qname_for(uri))
    }

    fn lock(&mut self) {
        self.write(|pm| pm.lock())
    }

    fn num_prefixes(&self) -> usize {
        self.read(|pm| pm.num_prefixes())
    }

    fn same_prefix_mapping_as(&self, other: &BTreeMap<String, String>) -> bool {
        self.read(|pm| pm.same_prefix_mapping_as(other))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use std::thread;

    use pretty_assertions::assert_eq;

    use crate::impls::mem_store::MemStore;
    use crate::prefix::PrefixMapping;
    use crate::ReadWriteLockingStore;
    use crate::SimpleSynchronizedStore;
    use crate::StoreError;
    use crate::SynchronizedStore;

    const EX: &str = "https://ex.com#";

    fn exercise(mut pm: impl PrefixMapping) -> Result<(), StoreError> {
        pm.set_ns_prefix("ex", EX)?;
        pm.set_ns_prefix("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#")?;

        assert_eq!(Some(EX.to_string()), pm.ns_prefix_uri("ex"));
        assert_eq!(Some("ex".to_string()), pm.ns_uri_prefix(EX));
        assert_eq!(format!("{}a", EX), pm.expand_prefix("ex:a"));
        assert_eq!("ex:a", pm.short_form(&format!("{}a", EX)));
        assert_eq!(2, pm.num_prefixes());

        pm.remove_ns_prefix("rdf")?;
        assert_eq!(
            BTreeMap::from([("ex".to_string(), EX.to_string())]),
            pm.ns_prefix_map()
        );

        pm.lock();
        assert_eq!(
            Err(StoreError::PrefixMappingLocked("set prefix x".to_string())),
            pm.set_ns_prefix("x", "urn:x:")
        );
        Ok(())
    }

    #[test]
    fn test_synchronized_prefix_mapping() -> anyhow::Result<()> {
        let store = SynchronizedStore::new(MemStore::new());
        exercise(store.prefix_mapping())?;

        // The view writes through to the wrapped store.
        assert_eq!(Some(EX.to_string()), store.prefix_mapping().ns_prefix_uri("ex"));
        Ok(())
    }

    #[test]
    fn test_rw_locking_prefix_mapping() -> anyhow::Result<()> {
        let store = ReadWriteLockingStore::new(MemStore::new());
        exercise(store.prefix_mapping())?;
        Ok(())
    }

    #[test]
    fn test_simple_synchronized_prefix_mapping() -> anyhow::Result<()> {
        let store = SimpleSynchronizedStore::new(MemStore::new());
        exercise(store.prefix_mapping())?;
        Ok(())
    }

    #[test]
    fn test_prefix_mapping_concurrent_writers() {
        let store = Arc::new(ReadWriteLockingStore::new(MemStore::new()));

        let handles = (0..8)
            .map(|t| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let mut pm = store.prefix_mapping();
                    for i in 0..50 {
                        pm.set_ns_prefix(&format!("p{}x{}", t, i), &format!("urn:{}:{}:", t, i))
                            .unwrap();
                        assert!(pm.num_prefixes() > 0);
                    }
                })
            })
            .collect::<Vec<_>>();

        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(400, store.prefix_mapping().num_prefixes());
    }
}
