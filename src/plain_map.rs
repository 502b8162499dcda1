//! PlainMap: chained hash map without ordering guarantees.
//!
//! Same insertion, removal and resize behavior as `OrderedMap`, minus the
//! global order list. Iteration walks buckets in index order and each
//! chain from its head, which callers must treat as arbitrary.

use crate::chain_table::{ChainIter, ChainTable, Slot};
use crate::error::InsertError;
use crate::policy::{MapPolicy, QueryPolicy, StdPolicy};
use crate::SetOutcome;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;

pub struct PlainMap<K, V, P: MapPolicy<K, V> = StdPolicy> {
    table: ChainTable<K, V, (), P>,
}

impl<K, V> PlainMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_policy(StdPolicy::default())
    }
}

impl<K, V> Default for PlainMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> PlainMap<K, V, StdPolicy<S>>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_policy(StdPolicy::new(hasher))
    }
}

impl<K, V, P: MapPolicy<K, V>> PlainMap<K, V, P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            table: ChainTable::with_policy(policy),
        }
    }

    pub fn policy(&self) -> &P {
        self.table.policy()
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.len() == 0
    }

    pub fn bucket_count(&self) -> usize {
        self.table.bucket_count()
    }

    /// Counter bumped once per inserted key, removed key, or `clear`.
    pub fn revision(&self) -> u64 {
        self.table.revision()
    }

    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        self.table.find(key).map(|id| &self.table.node(id).value)
    }

    pub fn get_key_value<Q>(&self, key: &Q) -> Option<(&K, &V)>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        self.table.find(key).map(|id| {
            let node = self.table.node(id);
            (&node.key, &node.value)
        })
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        let id = self.table.find(key)?;
        Some(&mut self.table.node_mut(id).value)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        self.table.find(key).is_some()
    }

    /// Inserts `key -> value` only if `key` is absent. On
    /// `Err(InsertError::DuplicateKey)` the rejected key and value have
    /// already been passed to the policy's destructors.
    pub fn add(&mut self, key: K, value: V) -> Result<(), InsertError> {
        match self.table.lookup_key(&key) {
            Slot::Occupied { .. } => {
                self.table.discard(key, value);
                Err(InsertError::DuplicateKey)
            }
            Slot::Vacant { bucket, hash } => {
                self.table.insert_vacant(bucket, hash, key, value, ());
                Ok(())
            }
        }
    }

    /// Inserts or overwrites. An overwritten key and value go to the
    /// policy's destructors.
    pub fn set(&mut self, key: K, value: V) -> SetOutcome {
        match self.table.lookup_key(&key) {
            Slot::Occupied { node, .. } => {
                self.table.replace(node, key, value);
                SetOutcome::Replaced
            }
            Slot::Vacant { bucket, hash } => {
                self.table.insert_vacant(bucket, hash, key, value, ());
                SetOutcome::Inserted
            }
        }
    }

    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        match self.remove_entry(key) {
            Some((k, v)) => {
                self.table.discard(k, v);
                true
            }
            None => false,
        }
    }

    /// Removes the entry for `key`, returning ownership of its key and value.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        match self.table.lookup(key) {
            Slot::Occupied { bucket, prev, node } => {
                let node = self.table.unlink(bucket, prev, node);
                self.table.compact();
                Some((node.key, node.value))
            }
            Slot::Vacant { .. } => None,
        }
    }

    pub fn clear(&mut self) {
        self.table.clear();
    }

    pub fn find<F>(&self, mut pred: F) -> Option<(&K, &V)>
    where
        F: FnMut(&K, &V) -> bool,
    {
        self.iter().find(|(k, v)| pred(k, v))
    }

    pub fn for_each<F>(&self, mut f: F)
    where
        F: FnMut(&K, &V),
    {
        self.iter().for_each(|(k, v)| f(k, v));
    }

    pub fn for_each_value<F>(&self, mut f: F)
    where
        F: FnMut(&V),
    {
        self.values().for_each(|v| f(v));
    }

    pub fn loop_each<C, F>(&self, ctx: &mut C, mut f: F)
    where
        F: FnMut(&mut C, &K, &V),
    {
        for (k, v) in self.iter() {
            f(ctx, k, v);
        }
    }

    pub fn loop_each_value<C, F>(&self, ctx: &mut C, mut f: F)
    where
        F: FnMut(&mut C, &V),
    {
        for v in self.values() {
            f(ctx, v);
        }
    }

    pub fn for_each_mut<F>(&mut self, f: F)
    where
        F: FnMut(&K, &mut V),
    {
        self.table.for_each_chained_mut(f);
    }

    #[cfg(test)]
    pub(crate) fn chained_len(&self) -> usize {
        self.table.chained_len()
    }

    #[cfg(test)]
    pub(crate) fn arena_capacity(&self) -> usize {
        self.table.arena_capacity()
    }

    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            it: self.table.chains(),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> + ExactSizeIterator + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + ExactSizeIterator + '_ {
        self.iter().map(|(_, v)| v)
    }
}

/// Iterator over `(&K, &V)` in bucket order.
pub struct Iter<'a, K, V> {
    it: ChainIter<'a, K, V, ()>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|n| (&n.key, &n.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V, P: MapPolicy<K, V>> IntoIterator for &'a PlainMap<K, V, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, P: MapPolicy<K, V>> Extend<(K, V)> for PlainMap<K, V, P> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PlainMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, P> fmt::Debug for PlainMap<K, V, P>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: MapPolicy<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
