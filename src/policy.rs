//! Policy bundles: how a map hashes, compares and destroys its keys and
//! values.
//!
//! A map is bound to exactly one policy for its whole life. The policy's
//! `hash` must agree with `equal`: keys that compare equal must hash
//! identically, because a stored hash is never recomputed once the entry
//! exists.

use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use hashbrown::hash_map::DefaultHashBuilder;

/// Hashing, equality and destruction for a concrete key/value pair.
pub trait MapPolicy<K, V> {
    fn hash(&self, key: &K) -> u64;

    fn equal(&self, a: &K, b: &K) -> bool;

    /// Called for every key the map releases without handing it back to
    /// the caller.
    #[inline]
    fn destroy_key(&self, key: K) {
        drop(key);
    }

    /// Called for every value the map releases without handing it back to
    /// the caller.
    #[inline]
    fn destroy_value(&self, value: V) {
        drop(value);
    }
}

/// Lookup by a query type `Q` that stands in for a stored key `K`.
///
/// `hash_query(q)` must equal `hash(k)` for every `k` that `matches(q, k)`.
pub trait QueryPolicy<K, Q: ?Sized> {
    fn hash_query(&self, query: &Q) -> u64;

    fn matches(&self, query: &Q, key: &K) -> bool;
}

/// Policy derived from `K: Hash + Eq` and a `BuildHasher`; keys and values
/// are destroyed by dropping them.
#[derive(Clone, Debug, Default)]
pub struct StdPolicy<S = DefaultHashBuilder> {
    hasher: S,
}

impl<S> StdPolicy<S> {
    pub fn new(hasher: S) -> Self {
        Self { hasher }
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }
}

impl<K, V, S> MapPolicy<K, V> for StdPolicy<S>
where
    K: Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        self.hasher.hash_one(key)
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        a == b
    }
}

impl<K, Q, S> QueryPolicy<K, Q> for StdPolicy<S>
where
    K: Borrow<Q>,
    Q: ?Sized + Hash + Eq,
    S: BuildHasher,
{
    #[inline]
    fn hash_query(&self, query: &Q) -> u64 {
        self.hasher.hash_one(query)
    }

    #[inline]
    fn matches(&self, query: &Q, key: &K) -> bool {
        key.borrow() == query
    }
}

/// Policy assembled from plain function pointers.
///
/// Useful when keys do not implement `Hash`/`Eq`, or when releasing a key
/// or value needs more than `Drop` (returning a resource to a pool,
/// counting releases, ...). Lookups take `&K`.
pub struct FnPolicy<K, V> {
    pub hash: fn(&K) -> u64,
    pub equal: fn(&K, &K) -> bool,
    pub destroy_key: fn(K),
    pub destroy_value: fn(V),
}

impl<K, V> FnPolicy<K, V> {
    /// Policy with the given hash/equality and drop-based destructors.
    pub fn new(hash: fn(&K) -> u64, equal: fn(&K, &K) -> bool) -> Self {
        Self {
            hash,
            equal,
            destroy_key: drop::<K>,
            destroy_value: drop::<V>,
        }
    }

    pub fn with_destructors(mut self, destroy_key: fn(K), destroy_value: fn(V)) -> Self {
        self.destroy_key = destroy_key;
        self.destroy_value = destroy_value;
        self
    }
}

impl<K, V> Clone for FnPolicy<K, V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, V> Copy for FnPolicy<K, V> {}

impl<K, V> core::fmt::Debug for FnPolicy<K, V> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FnPolicy").finish_non_exhaustive()
    }
}

impl<K, V> MapPolicy<K, V> for FnPolicy<K, V> {
    #[inline]
    fn hash(&self, key: &K) -> u64 {
        (self.hash)(key)
    }

    #[inline]
    fn equal(&self, a: &K, b: &K) -> bool {
        (self.equal)(a, b)
    }

    #[inline]
    fn destroy_key(&self, key: K) {
        (self.destroy_key)(key)
    }

    #[inline]
    fn destroy_value(&self, value: V) {
        (self.destroy_value)(value)
    }
}

impl<K, V> QueryPolicy<K, K> for FnPolicy<K, V> {
    #[inline]
    fn hash_query(&self, query: &K) -> u64 {
        (self.hash)(query)
    }

    #[inline]
    fn matches(&self, query: &K, key: &K) -> bool {
        (self.equal)(key, query)
    }
}
