//! chainmap: separately chained hash maps with prime-sized bucket tables,
//! in an insertion-ordered and a plain flavor.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: one structural engine shared by both flavors, so the chaining,
//!   resize and ownership rules are written and checked once.
//! - Layers:
//!   - `ChainTable<K, V, L, P>`: node arena (generational `NodeId`s),
//!     array of chain heads, probe, link/unlink, resize, revision
//!     counter. Each node carries an opaque `L` payload for the layer
//!     above.
//!   - `PlainMap<K, V, P>`: `ChainTable` with `L = ()`.
//!   - `OrderedMap<K, V, P>`: `ChainTable` with insertion-order links and
//!     `head`/`tail`.
//!
//! Policies
//! - A map is bound to a `MapPolicy` that hashes, compares and destroys
//!   keys and values. `StdPolicy<S>` uses `Hash`/`Eq`/`Drop` and a
//!   `BuildHasher` (default: hashbrown's); `FnPolicy` is a bundle of
//!   plain function pointers.
//! - Inserts consume key and value. Whatever the map does not store
//!   (rejected by `add`, overwritten by `set`, removed by `remove`,
//!   cleared, or left at drop) goes through the policy's destructors;
//!   `remove_entry` is the one path that hands ownership back instead.
//!
//! Sizing
//! - Bucket counts are primes in `[MIN_BUCKETS, MAX_BUCKETS]`. After each
//!   insert of a new key or removal the table grows when it holds at
//!   least three entries per bucket and shrinks when it has at least
//!   three buckets per entry; the new size is the smallest prime not
//!   below the entry count.
//! - Each node caches its hash; resizing never calls the policy.
//!
//! Revision
//! - `revision()` increases by one per inserted key, removed key and
//!   `clear`; overwriting a value does not change it. Callers compare
//!   revisions to detect structural change between two points in time.
//!
//! Constraints and non-goals
//! - Single-threaded: no internal locking. Maps are `Send` when their
//!   contents are, and `!Sync`; share them behind an external lock.
//! - Reentrancy: a policy's hash/equality code must not call back into
//!   the map it serves. Debug builds detect this and panic.
//! - No persistence or serialization.

pub mod capacity;
mod chain_table;
mod error;
pub mod ordered_map;
#[cfg(test)]
mod ordered_map_proptest;
pub mod plain_map;
#[cfg(test)]
mod plain_map_proptest;
pub mod policy;
mod reentrancy;

pub use capacity::{MAX_BUCKETS, MIN_BUCKETS};
pub use error::InsertError;
pub use ordered_map::OrderedMap;
pub use plain_map::PlainMap;
pub use policy::{FnPolicy, MapPolicy, QueryPolicy, StdPolicy};

/// What `set` did with its arguments.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SetOutcome {
    /// The key was absent; a new entry was linked.
    Inserted,
    /// An equal key was present; its key and value were replaced in place.
    Replaced,
}
