//! Table: open-addressing string table with triangular quadratic probing.

use crate::config::{LengthPolicy, TableConfig};
use crate::error::{AllocError, CreateError, PutError};
use crate::hash::{key_hash, round_capacity, Fnv1aBuildHasher, ProbeSeq};
use core::fmt;
use core::hash::BuildHasher;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Slot {
    pub(crate) key: String,
    pub(crate) value: String,
    pub(crate) hash: u32,
    pub(crate) position: usize, // always equals the bucket index holding this slot
}

impl Slot {
    /// Copy `key`/`value` into owned strings, surfacing allocation failure.
    fn copy_from(key: &str, value: &str, hash: u32, buckets: usize) -> Result<Self, AllocError> {
        Ok(Slot {
            key: try_to_owned(key, buckets)?,
            value: try_to_owned(value, buckets)?,
            hash,
            position: 0,
        })
    }
}

fn try_to_owned(s: &str, buckets: usize) -> Result<String, AllocError> {
    let mut out = String::new();
    out.try_reserve_exact(s.len())
        .map_err(|_| AllocError { buckets })?;
    out.push_str(s);
    Ok(out)
}

/// Allocate `n` empty buckets without aborting on allocation failure.
pub(crate) fn alloc_buckets(n: usize) -> Result<Vec<Option<Slot>>, AllocError> {
    let mut v = Vec::new();
    v.try_reserve_exact(n).map_err(|_| AllocError { buckets: n })?;
    v.resize_with(n, || None);
    Ok(v)
}

/// Longest prefix of `s` that is at most `limit` bytes and ends on a char boundary.
fn clip(s: &str, limit: usize) -> &str {
    if s.len() <= limit {
        return s;
    }
    let mut end = limit;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Put `slot` into the first empty bucket of its probe sequence, raising
/// `probe_bound` if this insertion needed more attempts than any before.
/// Hands the slot back if every bucket is occupied.
fn place(buckets: &mut [Option<Slot>], probe_bound: &mut usize, mut slot: Slot) -> Result<usize, Slot> {
    let cap = buckets.len();
    for (i, b) in ProbeSeq::new(slot.hash, cap, cap) {
        if buckets[b].is_none() {
            if i > *probe_bound {
                trace!(from = *probe_bound, to = i, "probe bound raised");
                *probe_bound = i;
            }
            slot.position = b;
            buckets[b] = Some(slot);
            return Ok(b);
        }
    }
    Err(slot)
}

/// Read-only view of an occupied bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotView<'a> {
    pub position: usize,
    pub hash: u32,
    pub key: &'a str,
    pub value: &'a str,
}

/// String-keyed hash table with quadratic probing and a bounded lookup scan.
///
/// Lookups never scan past `probe_bound`, the deepest probe any insertion
/// has needed. The bound only grows, which keeps deletion without
/// tombstones safe: a cleared bucket can shorten no chain below the bound.
#[derive(Clone)]
pub struct Table<S = Fnv1aBuildHasher> {
    hasher: S,
    config: TableConfig,
    buckets: Vec<Option<Slot>>,
    count: usize,
    probe_bound: usize,
}

impl Table {
    /// Empty table with the default config and `initial_capacity` rounded up
    /// to a power of two (minimum 2).
    pub fn new(initial_capacity: usize) -> Result<Self, AllocError> {
        let config = TableConfig::default().with_initial_capacity(initial_capacity);
        Self::build(config, Fnv1aBuildHasher)
    }

    pub fn with_config(config: TableConfig) -> Result<Self, CreateError> {
        Self::with_config_and_hasher(config, Fnv1aBuildHasher)
    }
}

impl<S> Table<S>
where
    S: BuildHasher,
{
    pub fn with_config_and_hasher(config: TableConfig, hasher: S) -> Result<Self, CreateError> {
        config.validate()?;
        Ok(Self::build(config, hasher)?)
    }

    fn build(config: TableConfig, hasher: S) -> Result<Self, AllocError> {
        let cap = round_capacity(config.initial_capacity).ok_or(AllocError {
            buckets: config.initial_capacity,
        })?;
        let buckets = alloc_buckets(cap)?;
        Ok(Self {
            hasher,
            config,
            buckets,
            count: 0,
            probe_bound: 0,
        })
    }

    /// Assemble a table from decoded parts. The caller guarantees that every
    /// slot sits at its own `position`, and that `count` matches.
    pub(crate) fn from_parts(
        config: TableConfig,
        hasher: S,
        buckets: Vec<Option<Slot>>,
        count: usize,
        probe_bound: usize,
    ) -> Self {
        debug_assert!(buckets.len().is_power_of_two());
        debug_assert_eq!(buckets.iter().flatten().count(), count);
        Self {
            hasher,
            config,
            buckets,
            count,
            probe_bound,
        }
    }

    /// Number of buckets.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn probe_bound(&self) -> usize {
        self.probe_bound
    }

    pub fn load_factor(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    pub fn hasher(&self) -> &S {
        &self.hasher
    }

    /// Normalise a query key the way `put` would have stored it. `None` if no
    /// stored key can match it.
    fn query_key<'k>(&self, key: &'k str) -> Option<&'k str> {
        let limit = self.config.max_key_len;
        match self.config.length_policy {
            LengthPolicy::Truncate => Some(clip(key, limit)),
            LengthPolicy::Reject if key.len() > limit => None,
            LengthPolicy::Reject => Some(key),
        }
    }

    /// Bucket index holding `key`, scanning at most `probe_bound + 1` attempts.
    fn locate(&self, key: &str) -> Option<usize> {
        let hash = key_hash(&self.hasher, key);
        let cap = self.capacity();
        // Attempts past `cap` only revisit buckets.
        let limit = self.probe_bound.min(cap - 1) + 1;
        ProbeSeq::new(hash, cap, limit).find_map(|(_, b)| match &self.buckets[b] {
            Some(s) if s.hash == hash && s.key == key => Some(b),
            _ => None,
        })
    }

    pub fn find(&self, key: &str) -> Option<&str> {
        let key = self.query_key(key)?;
        self.locate(key)
            .and_then(|b| self.buckets[b].as_ref())
            .map(|s| s.value.as_str())
    }

    pub fn exists(&self, key: &str) -> bool {
        self.query_key(key)
            .map(|k| self.locate(k).is_some())
            .unwrap_or(false)
    }

    /// Apply the length policy to one input.
    fn fit<'a>(&self, s: &'a str, limit: usize, what: &'static str) -> Result<&'a str, PutError> {
        if s.len() <= limit {
            return Ok(s);
        }
        match self.config.length_policy {
            LengthPolicy::Truncate => {
                debug!(what, len = s.len(), limit, "truncating oversized input");
                Ok(clip(s, limit))
            }
            LengthPolicy::Reject => Err(PutError::TooLong {
                what,
                len: s.len(),
                limit,
            }),
        }
    }

    /// Insert a new entry. Duplicate keys are rejected and leave the table
    /// unchanged; on allocation failure the table is also left as it was.
    pub fn put(&mut self, key: &str, value: &str) -> Result<(), PutError> {
        let key = self.fit(key, self.config.max_key_len, "key")?;
        let value = self.fit(value, self.config.max_value_len, "value")?;
        if self.locate(key).is_some() {
            return Err(PutError::KeyExists);
        }

        let hash = key_hash(&self.hasher, key);
        let mut pending = Slot::copy_from(key, value, hash, self.capacity())?;
        while self.needs_grow() {
            self.grow()?;
        }
        // Growth keeps a free bucket, so this normally succeeds first time.
        while let Err(back) = place(&mut self.buckets, &mut self.probe_bound, pending) {
            pending = back;
            self.grow()?;
        }
        self.count += 1;
        Ok(())
    }

    /// Checked against the count before the pending insertion.
    fn needs_grow(&self) -> bool {
        self.count >= self.capacity() || self.load_factor() > self.config.max_load_factor
    }

    /// Double the bucket array and reinsert every slot in bucket order.
    /// The new array is fully allocated before any slot moves, so a failure
    /// leaves the table untouched.
    fn grow(&mut self) -> Result<(), AllocError> {
        let old_cap = self.capacity();
        let new_cap = old_cap
            .checked_mul(2)
            .ok_or(AllocError { buckets: old_cap })?;
        let mut fresh = alloc_buckets(new_cap)?;
        let mut bound = self.probe_bound;
        for slot in self.buckets.drain(..).flatten() {
            if place(&mut fresh, &mut bound, slot).is_err() {
                // The sequence visits every bucket and new_cap > count.
                unreachable!("{new_cap} buckets cannot hold {} slots", self.count);
            }
        }
        debug!(
            old_cap,
            new_cap,
            count = self.count,
            probe_bound = bound,
            "table resized"
        );
        self.buckets = fresh;
        self.probe_bound = bound;
        Ok(())
    }

    /// Remove `key` if present and return its entry. Deleting an absent key is a no-op.
    pub fn delete(&mut self, key: &str) -> Option<(String, String)> {
        let key = self.query_key(key)?;
        let b = self.locate(key)?;
        let slot = self.buckets[b].take()?;
        self.count -= 1;
        Some((slot.key, slot.value))
    }

    /// Occupied buckets in ascending index order.
    pub fn slots(&self) -> impl Iterator<Item = SlotView<'_>> + '_ {
        self.buckets.iter().flatten().map(|s| SlotView {
            position: s.position,
            hash: s.hash,
            key: &s.key,
            value: &s.value,
        })
    }

    /// `(key, value)` pairs in bucket order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.buckets
            .iter()
            .flatten()
            .map(|s| (s.key.as_str(), s.value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &str> + '_ {
        self.iter().map(|(_, v)| v)
    }

    /// Panics if any structural invariant is broken.
    #[cfg(test)]
    pub(crate) fn assert_invariants(&self) {
        use std::collections::HashSet;

        let cap = self.capacity();
        assert!(cap >= 2 && cap.is_power_of_two(), "capacity {cap}");
        let mut keys = HashSet::new();
        let mut occupied = 0;
        for (i, b) in self.buckets.iter().enumerate() {
            if let Some(s) = b {
                occupied += 1;
                assert_eq!(s.position, i, "cached position of {:?}", s.key);
                assert_eq!(s.hash, key_hash(&self.hasher, &s.key));
                assert!(keys.insert(s.key.as_str()), "duplicate key {:?}", s.key);
                assert_eq!(self.locate(&s.key), Some(i), "key {:?} unreachable", s.key);
            }
        }
        assert_eq!(occupied, self.count);
        if self.count > 0 {
            let before = (self.count - 1) as f64 / cap as f64;
            assert!(before <= self.config.max_load_factor, "load {before} before last insert");
        }
    }
}

impl<S> fmt::Debug for Table<S>
where
    S: BuildHasher,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        struct Entries<'a, S>(&'a Table<S>);
        impl<S: BuildHasher> fmt::Debug for Entries<'_, S> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_map().entries(self.0.iter()).finish()
            }
        }
        f.debug_struct("Table")
            .field("capacity", &self.capacity())
            .field("len", &self.count)
            .field("probe_bound", &self.probe_bound)
            .field("entries", &Entries(self))
            .finish()
    }
}
