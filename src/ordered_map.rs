//! OrderedMap: chained hash map that remembers insertion order.
//!
//! On top of the bucket chains every node is threaded into one global
//! doubly linked list. A new node becomes `head` and its `next` points at
//! the previous head, so `tail` is the oldest entry and walking `prev`
//! from `tail` yields entries oldest first. Overwriting a key with `set`
//! keeps its position.

use crate::chain_table::{ChainTable, Links, Node, NodeId, Renumbering, Slot};
use crate::error::InsertError;
use crate::policy::{MapPolicy, QueryPolicy, StdPolicy};
use crate::SetOutcome;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::iter::FusedIterator;
use slotmap::SlotMap;

/// Insertion-order links. `next` points at the older neighbor, `prev` at
/// the newer one.
#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct OrderLinks {
    next: Option<NodeId>,
    prev: Option<NodeId>,
}

impl Links for OrderLinks {
    fn renumber(&mut self, moved: &Renumbering) {
        self.next = self.next.map(|id| moved[&id]);
        self.prev = self.prev.map(|id| moved[&id]);
    }
}

pub struct OrderedMap<K, V, P: MapPolicy<K, V> = StdPolicy> {
    table: ChainTable<K, V, OrderLinks, P>,
    /// Most recently inserted node.
    head: Option<NodeId>,
    /// Oldest node still present.
    tail: Option<NodeId>,
}

impl<K, V> OrderedMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_policy(StdPolicy::default())
    }
}

impl<K, V> Default for OrderedMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> OrderedMap<K, V, StdPolicy<S>>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::with_policy(StdPolicy::new(hasher))
    }
}

impl<K, V, P: MapPolicy<K, V>> OrderedMap<K, V, P> {
    pub fn with_policy(policy: P) -> Self {
        Self {
            table: ChainTable::with_policy(policy),
            head: None,
            tail: None,
        }
    }

    pub fn policy(&self) -> &P {
        self.table.policy()
    }

    /// Number of live entries.
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
    /// Overwriting an existing key leaves it unchanged.
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

    /// Inserts `key -> value` only if `key` is absent.
    ///
    /// The map takes ownership of both arguments either way: on
    /// `Err(InsertError::DuplicateKey)` the stored entry is untouched and
    /// the rejected key and value are passed to the policy's destructors.
    pub fn add(&mut self, key: K, value: V) -> Result<(), InsertError> {
        match self.table.lookup_key(&key) {
            Slot::Occupied { .. } => {
                self.table.discard(key, value);
                Err(InsertError::DuplicateKey)
            }
            Slot::Vacant { bucket, hash } => {
                self.link_new(bucket, hash, key, value);
                Ok(())
            }
        }
    }

    /// Inserts `key -> value`, or overwrites the entry for an equal key in
    /// place. On overwrite the old key and value go to the policy's
    /// destructors and the entry keeps its position in the order.
    pub fn set(&mut self, key: K, value: V) -> SetOutcome {
        match self.table.lookup_key(&key) {
            Slot::Occupied { node, .. } => {
                self.table.replace(node, key, value);
                SetOutcome::Replaced
            }
            Slot::Vacant { bucket, hash } => {
                self.link_new(bucket, hash, key, value);
                SetOutcome::Inserted
            }
        }
    }

    fn link_new(&mut self, bucket: usize, hash: u64, key: K, value: V) {
        let links = OrderLinks {
            next: self.head,
            prev: None,
        };
        let id = self.table.insert_vacant(bucket, hash, key, value, links);
        match self.head {
            Some(old) => self.table.node_mut(old).links.prev = Some(id),
            None => self.tail = Some(id),
        }
        self.head = Some(id);
        self.debug_check();
    }

    /// Removes the entry for `key`, passing its key and value to the
    /// policy's destructors. Returns whether an entry was removed.
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

    /// Removes the entry for `key` and hands its key and value back to the
    /// caller instead of destroying them.
    pub fn remove_entry<Q>(&mut self, key: &Q) -> Option<(K, V)>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        let Slot::Occupied { bucket, prev, node } = self.table.lookup(key) else {
            return None;
        };
        let node = self.table.unlink(bucket, prev, node);
        let OrderLinks { next, prev } = node.links;
        match prev {
            Some(newer) => self.table.node_mut(newer).links.next = next,
            None => self.head = next,
        }
        match next {
            Some(older) => self.table.node_mut(older).links.prev = prev,
            None => self.tail = prev,
        }
        if let Some(moved) = self.table.compact() {
            self.head = self.head.map(|id| moved[&id]);
            self.tail = self.tail.map(|id| moved[&id]);
        }
        self.debug_check();
        Some((node.key, node.value))
    }

    /// Removes every entry, passing each key and value to the policy's
    /// destructors oldest first. The bucket table keeps its size.
    pub fn clear(&mut self) {
        let oldest = self.tail.take();
        self.head = None;
        self.table.clear_along(oldest, |links| links.prev);
    }

    /// Oldest entry.
    pub fn first(&self) -> Option<(&K, &V)> {
        self.tail.map(|id| {
            let node = self.table.node(id);
            (&node.key, &node.value)
        })
    }

    /// Most recently inserted entry.
    pub fn last(&self) -> Option<(&K, &V)> {
        self.head.map(|id| {
            let node = self.table.node(id);
            (&node.key, &node.value)
        })
    }

    /// First entry in insertion order for which `pred` holds.
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

    /// Like `for_each`, threading a caller-supplied context through every
    /// call.
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

    /// Visits every entry oldest first with mutable access to the value.
    pub fn for_each_mut<F>(&mut self, mut f: F)
    where
        F: FnMut(&K, &mut V),
    {
        let mut cur = self.tail;
        while let Some(id) = cur {
            let node = self.table.node_mut(id);
            f(&node.key, &mut node.value);
            cur = node.links.prev;
        }
    }

    /// Entries in insertion order, oldest first. Double-ended: `.rev()`
    /// yields newest first.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            nodes: self.table.nodes(),
            front: self.tail,
            back: self.head,
            remaining: self.table.len(),
        }
    }

    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys { it: self.iter() }
    }

    pub fn values(&self) -> Values<'_, K, V> {
        Values { it: self.iter() }
    }

    #[cfg(test)]
    pub(crate) fn chained_len(&self) -> usize {
        self.table.chained_len()
    }

    #[cfg(test)]
    pub(crate) fn arena_capacity(&self) -> usize {
        self.table.arena_capacity()
    }

    #[inline]
    fn debug_check(&self) {
        debug_assert_eq!(self.head.is_none(), self.table.len() == 0);
        debug_assert_eq!(self.head.is_none(), self.tail.is_none());
        debug_assert!(self.head.map_or(true, |h| self.table.node(h).links.prev.is_none()));
        debug_assert!(self.tail.map_or(true, |t| self.table.node(t).links.next.is_none()));
    }
}

/// Iterator over `(&K, &V)` in insertion order.
pub struct Iter<'a, K, V> {
    nodes: &'a SlotMap<NodeId, Node<K, V, OrderLinks>>,
    front: Option<NodeId>,
    back: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.front?];
        self.front = node.links.prev;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> DoubleEndedIterator for Iter<'_, K, V> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let node = &self.nodes[self.back?];
        self.back = node.links.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

impl<K, V> Clone for Iter<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            nodes: self.nodes,
            front: self.front,
            back: self.back,
            remaining: self.remaining,
        }
    }
}

pub struct Keys<'a, K, V> {
    it: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Keys<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back().map(|(k, _)| k)
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

impl<K, V> Clone for Keys<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            it: self.it.clone(),
        }
    }
}

pub struct Values<'a, K, V> {
    it: Iter<'a, K, V>,
}

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.it.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<K, V> DoubleEndedIterator for Values<'_, K, V> {
    #[inline]
    fn next_back(&mut self) -> Option<Self::Item> {
        self.it.next_back().map(|(_, v)| v)
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

impl<K, V> Clone for Values<'_, K, V> {
    fn clone(&self) -> Self {
        Self {
            it: self.it.clone(),
        }
    }
}

impl<'a, K, V, P: MapPolicy<K, V>> IntoIterator for &'a OrderedMap<K, V, P> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<K, V, P: MapPolicy<K, V>> Extend<(K, V)> for OrderedMap<K, V, P> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (k, v) in iter {
            self.set(k, v);
        }
    }
}

impl<K, V> FromIterator<(K, V)> for OrderedMap<K, V>
where
    K: Eq + Hash,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K, V, P> fmt::Debug for OrderedMap<K, V, P>
where
    K: fmt::Debug,
    V: fmt::Debug,
    P: MapPolicy<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
