//! Debug-only check that a map's policy does not call back into the map.
//!
//! `ChainTable` runs user code at two points of every lookup: the policy's
//! hash while the query's hash is computed, and the policy's equality
//! while a bucket chain is walked. A callback into the same map from
//! either point would probe a table that may be mid-update. Each point is
//! bracketed by a `PolicyCall`; in debug builds opening a second one on
//! the same map panics and names the call already in progress. Release
//! builds keep no state.

use core::cell::Cell;
use core::marker::PhantomData;

/// Which policy callback a map is currently running.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) enum PolicyPhase {
    /// `MapPolicy::hash` / `QueryPolicy::hash_query`.
    Hash,
    /// `MapPolicy::equal` / `QueryPolicy::matches` during a chain walk.
    ChainWalk,
}

impl PolicyPhase {
    #[cfg(debug_assertions)]
    fn describe(self) -> &'static str {
        match self {
            PolicyPhase::Hash => "hashing a key",
            PolicyPhase::ChainWalk => "comparing keys along a bucket chain",
        }
    }
}

/// Per-table record of the policy call in progress, if any.
#[derive(Debug)]
pub(crate) struct PolicyCallTracker {
    #[cfg(debug_assertions)]
    active: Cell<Option<PolicyPhase>>,
    // Send and !Sync in every profile, so release and debug builds agree.
    _not_sync: PhantomData<Cell<()>>,
}

impl PolicyCallTracker {
    pub(crate) const fn new() -> Self {
        Self {
            #[cfg(debug_assertions)]
            active: Cell::new(None),
            _not_sync: PhantomData,
        }
    }

    /// Marks `phase` as running until the returned value drops.
    #[inline]
    #[cfg_attr(not(debug_assertions), allow(unused_variables))]
    pub(crate) fn begin(&self, phase: PolicyPhase) -> PolicyCall<'_> {
        #[cfg(debug_assertions)]
        {
            if let Some(running) = self.active.get() {
                panic!(
                    "map re-entered from its own policy while {} (attempted: {})",
                    running.describe(),
                    phase.describe()
                );
            }
            self.active.set(Some(phase));
            PolicyCall { tracker: self }
        }

        #[cfg(not(debug_assertions))]
        {
            PolicyCall { _z: PhantomData }
        }
    }
}

pub(crate) struct PolicyCall<'a> {
    #[cfg(debug_assertions)]
    tracker: &'a PolicyCallTracker,
    #[cfg(not(debug_assertions))]
    _z: PhantomData<&'a ()>,
}

impl Drop for PolicyCall<'_> {
    fn drop(&mut self) {
        #[cfg(debug_assertions)]
        {
            debug_assert!(self.tracker.active.get().is_some());
            self.tracker.active.set(None);
        }
    }
}
