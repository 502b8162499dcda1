//! Bucket-table sizing: prime capacities and the grow/shrink decision.
//!
//! Tables are always sized to a prime so that `hash % bucket_count`
//! spreads weak hashes (e.g. sequential integers) across every bucket.
//! The target for a resize is derived from the entry count, not from the
//! current bucket count, so a grow followed by a shrink is not an exact
//! inverse.

/// Smallest bucket table a map ever uses; also the size of a fresh map.
pub const MIN_BUCKETS: usize = 11;

/// Largest bucket table a map ever allocates (largest prime below 2^24).
pub const MAX_BUCKETS: usize = 16_777_213;

/// Entries-per-bucket ratio at which the table grows, and buckets-per-entry
/// ratio at which it shrinks.
pub const LOAD_FACTOR: usize = 3;

/// Outcome of a resize check.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Resize {
    Keep,
    To(usize),
}

/// Returns the smallest prime `>= n` (and `>= 2`).
pub fn next_prime(n: usize) -> usize {
    let mut candidate = n.max(2);
    while !is_prime(candidate) {
        candidate += 1;
    }
    candidate
}

fn is_prime(n: usize) -> bool {
    if n < 4 {
        return n >= 2;
    }
    if n % 2 == 0 || n % 3 == 0 {
        return false;
    }
    let mut i = 5;
    while i * i <= n {
        if n % i == 0 || n % (i + 2) == 0 {
            return false;
        }
        i += 6;
    }
    true
}

/// Rounds `count` up to a good bucket count, clamped to
/// `[MIN_BUCKETS, MAX_BUCKETS]`.
pub fn good_capacity(count: usize) -> usize {
    if count >= MAX_BUCKETS {
        return MAX_BUCKETS;
    }
    next_prime(count).clamp(MIN_BUCKETS, MAX_BUCKETS)
}

/// Decides whether a table with `bucket_count` buckets holding `count`
/// entries must be resized.
///
/// - Shrink when `bucket_count >= 3 * count` and the table is above the
///   minimum.
/// - Grow when `3 * bucket_count <= count` and the table is below the
///   maximum.
pub fn decide(bucket_count: usize, count: usize) -> Resize {
    let shrink =
        bucket_count >= count.saturating_mul(LOAD_FACTOR) && bucket_count > MIN_BUCKETS;
    let grow = bucket_count.saturating_mul(LOAD_FACTOR) <= count && bucket_count < MAX_BUCKETS;
    if !(shrink || grow) {
        return Resize::Keep;
    }
    match good_capacity(count) {
        n if n == bucket_count => Resize::Keep,
        n => Resize::To(n),
    }
}
