//! ChainTable: the structural layer shared by both map flavors.
//!
//! Separate chaining over a prime-sized array of chain heads. Nodes live
//! in a generational arena and link to each other by `NodeId`; a bucket
//! holds the id of its most recently linked node and each node holds the
//! id of the next node in its chain (`sibling`).
//!
//! The table knows nothing about ordering. Each node carries an opaque
//! `links: L` payload that the owning map maintains (`()` for the plain
//! map, the insertion-order links for the ordered map). Resizing relinks
//! `sibling` pointers only and never touches `links`.
//!
//! The arena never shrinks on its own, so after a burst of removals the
//! owning map calls `compact`, which moves live nodes into a fresh arena
//! and renumbers every id, including those inside `links` (see `Links`).
//!
//! Every mutation leaves the structure consistent before any key or value
//! is handed to the policy's destructors.

use crate::capacity::{self, Resize, LOAD_FACTOR, MIN_BUCKETS};
use crate::policy::{MapPolicy, QueryPolicy};
use crate::reentrancy::{PolicyCallTracker, PolicyPhase};
use slotmap::SlotMap;
use std::collections::TryReserveError;

slotmap::new_key_type! {
    /// Stable id of a node inside one table's arena.
    pub(crate) struct NodeId;
}

/// Old id to new id, produced by `ChainTable::compact`.
pub(crate) type Renumbering = hashbrown::HashMap<NodeId, NodeId>;

/// Per-node payload kept by the map layer. Any ids it stores are
/// rewritten when the arena is compacted.
pub(crate) trait Links {
    fn renumber(&mut self, moved: &Renumbering);
}

impl Links for () {
    #[inline]
    fn renumber(&mut self, _moved: &Renumbering) {}
}

#[derive(Debug)]
pub(crate) struct Node<K, V, L> {
    pub(crate) hash: u64,
    pub(crate) key: K,
    pub(crate) value: V,
    sibling: Option<NodeId>,
    pub(crate) links: L,
}

/// Result of a probe: where a key lives, or where it would be linked.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum Slot {
    Occupied {
        bucket: usize,
        /// Chain predecessor, `None` when the node is the bucket head.
        prev: Option<NodeId>,
        node: NodeId,
    },
    Vacant {
        bucket: usize,
        hash: u64,
    },
}

pub(crate) struct ChainTable<K, V, L, P: MapPolicy<K, V>> {
    policy: P,
    buckets: Vec<Option<NodeId>>,
    nodes: SlotMap<NodeId, Node<K, V, L>>,
    revision: u64,
    policy_calls: PolicyCallTracker,
    /// Nodes moved by `rehash` since creation.
    #[cfg(test)]
    rehash_visits: usize,
}

impl<K, V, L, P: MapPolicy<K, V>> ChainTable<K, V, L, P> {
    pub(crate) fn with_policy(policy: P) -> Self {
        Self {
            policy,
            buckets: vec![None; MIN_BUCKETS],
            nodes: SlotMap::with_key(),
            revision: 0,
            policy_calls: PolicyCallTracker::new(),
            #[cfg(test)]
            rehash_visits: 0,
        }
    }

    pub(crate) fn policy(&self) -> &P {
        &self.policy
    }

    pub(crate) fn len(&self) -> usize {
        self.nodes.len()
    }

    pub(crate) fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn revision(&self) -> u64 {
        self.revision
    }

    #[inline]
    fn bucket_of(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Walks the chain for `hash`, comparing cached hashes before calling
    /// `eq` on the stored key.
    fn probe(&self, hash: u64, mut eq: impl FnMut(&K) -> bool) -> Slot {
        let _call = self.policy_calls.begin(PolicyPhase::ChainWalk);
        let bucket = self.bucket_of(hash);
        let mut prev = None;
        let mut cur = self.buckets[bucket];
        while let Some(id) = cur {
            let node = &self.nodes[id];
            if node.hash == hash && eq(&node.key) {
                return Slot::Occupied {
                    bucket,
                    prev,
                    node: id,
                };
            }
            prev = Some(id);
            cur = node.sibling;
        }
        Slot::Vacant { bucket, hash }
    }

    /// Probe for an owned key, as done by the insert paths.
    pub(crate) fn lookup_key(&self, key: &K) -> Slot {
        let hash = {
            let _call = self.policy_calls.begin(PolicyPhase::Hash);
            self.policy.hash(key)
        };
        self.probe(hash, |stored| self.policy.equal(stored, key))
    }

    /// Probe for a borrowed query.
    pub(crate) fn lookup<Q>(&self, query: &Q) -> Slot
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        let hash = {
            let _call = self.policy_calls.begin(PolicyPhase::Hash);
            self.policy.hash_query(query)
        };
        self.probe(hash, |stored| self.policy.matches(query, stored))
    }

    pub(crate) fn find<Q>(&self, query: &Q) -> Option<NodeId>
    where
        Q: ?Sized,
        P: QueryPolicy<K, Q>,
    {
        match self.lookup(query) {
            Slot::Occupied { node, .. } => Some(node),
            Slot::Vacant { .. } => None,
        }
    }

    pub(crate) fn nodes(&self) -> &SlotMap<NodeId, Node<K, V, L>> {
        &self.nodes
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<K, V, L> {
        &self.nodes[id]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut Node<K, V, L> {
        &mut self.nodes[id]
    }

    /// Links a new node as the head of `bucket`'s chain. `bucket` and
    /// `hash` must come from a `Slot::Vacant` produced against the current
    /// table. Bumps the revision and runs the resize check.
    pub(crate) fn insert_vacant(
        &mut self,
        bucket: usize,
        hash: u64,
        key: K,
        value: V,
        links: L,
    ) -> NodeId {
        let sibling = self.buckets[bucket];
        let id = self.nodes.insert(Node {
            hash,
            key,
            value,
            sibling,
            links,
        });
        self.buckets[bucket] = Some(id);
        self.revision += 1;
        self.rebalance();
        id
    }

    /// Overwrites key and value of a live node in place. Chain positions,
    /// the cached hash and the revision are unchanged.
    pub(crate) fn replace(&mut self, id: NodeId, key: K, value: V) {
        let node = &mut self.nodes[id];
        let old_key = core::mem::replace(&mut node.key, key);
        let old_value = core::mem::replace(&mut node.value, value);
        self.discard(old_key, old_value);
    }

    /// Hands a key/value pair the map will not store to the destructors.
    pub(crate) fn discard(&self, key: K, value: V) {
        self.policy.destroy_key(key);
        self.policy.destroy_value(value);
    }

    /// Unlinks the node described by an occupied slot from its bucket chain
    /// and returns it. Bumps the revision and runs the resize check; the
    /// caller is responsible for its own `links`.
    pub(crate) fn unlink(&mut self, bucket: usize, prev: Option<NodeId>, id: NodeId) -> Node<K, V, L> {
        let node = self.nodes.remove(id).expect("occupied slot refers to a live node");
        match prev {
            Some(p) => self.nodes[p].sibling = node.sibling,
            None => self.buckets[bucket] = node.sibling,
        }
        self.revision += 1;
        self.rebalance();
        node
    }

    /// Removes every node, destroying them bucket by bucket along each
    /// chain. Bucket count is left as is.
    pub(crate) fn clear(&mut self) {
        let (heads, nodes) = self.detach_all();
        Detached {
            policy: &self.policy,
            nodes,
        }
        .destroy_chains(heads);
    }

    /// Like `clear`, but destroys nodes along a caller-maintained list:
    /// starting at `first` and moving on with `next(&links)`.
    pub(crate) fn clear_along(&mut self, first: Option<NodeId>, next: impl Fn(&L) -> Option<NodeId>) {
        let (_, nodes) = self.detach_all();
        let mut rest = Detached {
            policy: &self.policy,
            nodes,
        };
        let mut cur = first;
        while let Some(node) = cur.and_then(|id| rest.nodes.remove(id)) {
            cur = next(&node.links);
            rest.destroy(node);
        }
        debug_assert!(rest.nodes.is_empty());
    }

    /// Leaves the table empty with its current bucket count and hands the
    /// old chain heads and arena to the caller for destruction.
    fn detach_all(&mut self) -> (Vec<Option<NodeId>>, SlotMap<NodeId, Node<K, V, L>>) {
        let empty = vec![None; self.buckets.len()];
        let heads = core::mem::replace(&mut self.buckets, empty);
        let nodes = core::mem::replace(&mut self.nodes, SlotMap::with_key());
        self.revision += 1;
        (heads, nodes)
    }

    fn rebalance(&mut self) {
        if let Resize::To(n) = capacity::decide(self.buckets.len(), self.nodes.len()) {
            // On allocation failure the current table stays valid, only
            // with longer chains; the next mutation retries.
            let _ = self.rehash(n);
        }
    }

    /// Redistributes every node over `bucket_count` fresh chains using the
    /// cached hashes, walking the old chains so only live nodes are
    /// visited. The new array is allocated before any node moves.
    fn rehash(&mut self, bucket_count: usize) -> Result<(), TryReserveError> {
        let mut buckets: Vec<Option<NodeId>> = Vec::new();
        buckets.try_reserve_exact(bucket_count)?;
        buckets.resize(bucket_count, None);
        let old = core::mem::replace(&mut self.buckets, buckets);
        for head in old {
            let mut cur = head;
            while let Some(id) = cur {
                let node = &mut self.nodes[id];
                cur = node.sibling;
                let b = (node.hash % bucket_count as u64) as usize;
                node.sibling = self.buckets[b];
                self.buckets[b] = Some(id);
                #[cfg(test)]
                {
                    self.rehash_visits += 1;
                }
            }
        }
        Ok(())
    }

    /// Buckets in index order, each chain from its head.
    pub(crate) fn chains(&self) -> ChainIter<'_, K, V, L> {
        ChainIter {
            buckets: &self.buckets,
            nodes: &self.nodes,
            bucket: 0,
            cur: None,
            remaining: self.nodes.len(),
        }
    }

    /// Visits nodes in chain order with mutable access to their values.
    pub(crate) fn for_each_chained_mut(&mut self, mut f: impl FnMut(&K, &mut V)) {
        for b in 0..self.buckets.len() {
            let mut cur = self.buckets[b];
            while let Some(id) = cur {
                let node = &mut self.nodes[id];
                f(&node.key, &mut node.value);
                cur = node.sibling;
            }
        }
    }

    /// Number of nodes reachable through the bucket chains.
    #[cfg(test)]
    pub(crate) fn chained_len(&self) -> usize {
        self.chains().count()
    }

    #[cfg(test)]
    pub(crate) fn arena_capacity(&self) -> usize {
        self.nodes.capacity()
    }
}

impl<K, V, L: Links, P: MapPolicy<K, V>> ChainTable<K, V, L, P> {
    /// Moves the live nodes into a right-sized arena once the current one
    /// holds more than `LOAD_FACTOR` slots per live node (never below the
    /// minimum table's worth). Returns the renumbering when it ran; ids
    /// kept outside the nodes must be translated through it.
    ///
    /// Call only while no `Slot` or `NodeId` from before is still in use.
    pub(crate) fn compact(&mut self) -> Option<Renumbering> {
        let live = self.nodes.len();
        if self.nodes.capacity() <= LOAD_FACTOR * live.max(MIN_BUCKETS) {
            return None;
        }
        let old = core::mem::replace(&mut self.nodes, SlotMap::with_capacity_and_key(live));
        let mut moved = Renumbering::with_capacity(live);
        for (id, node) in old {
            moved.insert(id, self.nodes.insert(node));
        }
        for node in self.nodes.values_mut() {
            node.sibling = node.sibling.map(|s| moved[&s]);
            node.links.renumber(&moved);
        }
        for head in self.buckets.iter_mut() {
            *head = head.map(|h| moved[&h]);
        }
        Some(moved)
    }
}

impl<K, V, L, P: MapPolicy<K, V>> Drop for ChainTable<K, V, L, P> {
    fn drop(&mut self) {
        let heads = core::mem::take(&mut self.buckets);
        let nodes = core::mem::replace(&mut self.nodes, SlotMap::with_key());
        Detached {
            policy: &self.policy,
            nodes,
        }
        .destroy_chains(heads);
    }
}

/// Nodes already cut loose from a table and awaiting destruction. Whatever
/// is left when this drops still goes through the policy's destructors,
/// so one panicking destructor does not skip the rest.
struct Detached<'a, K, V, L, P: MapPolicy<K, V>> {
    policy: &'a P,
    nodes: SlotMap<NodeId, Node<K, V, L>>,
}

impl<K, V, L, P: MapPolicy<K, V>> Detached<'_, K, V, L, P> {
    fn destroy(&self, node: Node<K, V, L>) {
        self.policy.destroy_key(node.key);
        self.policy.destroy_value(node.value);
    }

    /// Destroys nodes bucket by bucket along each chain.
    fn destroy_chains(mut self, heads: Vec<Option<NodeId>>) {
        for head in heads {
            let mut cur = head;
            while let Some(node) = cur.and_then(|id| self.nodes.remove(id)) {
                cur = node.sibling;
                self.destroy(node);
            }
        }
        debug_assert!(self.nodes.is_empty());
    }
}

impl<K, V, L, P: MapPolicy<K, V>> Drop for Detached<'_, K, V, L, P> {
    // Only reached with nodes left when a destructor panicked mid-walk.
    fn drop(&mut self) {
        for (_, node) in self.nodes.drain() {
            self.policy.destroy_key(node.key);
            self.policy.destroy_value(node.value);
        }
    }
}

/// Iterator over nodes in bucket order.
pub(crate) struct ChainIter<'a, K, V, L> {
    buckets: &'a [Option<NodeId>],
    nodes: &'a SlotMap<NodeId, Node<K, V, L>>,
    bucket: usize,
    cur: Option<NodeId>,
    remaining: usize,
}

impl<'a, K, V, L> Iterator for ChainIter<'a, K, V, L> {
    type Item = &'a Node<K, V, L>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(id) = self.cur {
                let node = &self.nodes[id];
                self.cur = node.sibling;
                self.remaining -= 1;
                return Some(node);
            }
            if self.bucket >= self.buckets.len() {
                return None;
            }
            self.cur = self.buckets[self.bucket];
            self.bucket += 1;
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V, L> Clone for ChainIter<'_, K, V, L> {
    fn clone(&self) -> Self {
        Self {
            buckets: self.buckets,
            nodes: self.nodes,
            bucket: self.bucket,
            cur: self.cur,
            remaining: self.remaining,
        }
    }
}
