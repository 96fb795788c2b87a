//! FNV-1a hashing, capacity rounding and the triangular probe sequence.

use core::hash::{BuildHasher, Hasher};

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

/// Smallest bucket count a table may have.
pub const MIN_CAPACITY: usize = 2;

/// 32-bit FNV-1a over raw bytes.
#[inline]
pub fn fnv1a_32(bytes: &[u8]) -> u32 {
    let mut h = FNV_OFFSET_BASIS;
    for &b in bytes {
        h ^= b as u32;
        h = h.wrapping_mul(FNV_PRIME);
    }
    h
}

/// Streaming FNV-1a. `finish` returns the 32-bit state widened to `u64`.
#[derive(Debug, Clone, Copy)]
pub struct Fnv1aHasher(u32);

impl Default for Fnv1aHasher {
    fn default() -> Self {
        Fnv1aHasher(FNV_OFFSET_BASIS)
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 ^= b as u32;
            self.0 = self.0.wrapping_mul(FNV_PRIME);
        }
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0 as u64
    }
}

/// Default hasher of [`Table`](crate::Table); stateless, so snapshots written
/// by one process resolve in another.
#[derive(Debug, Clone, Copy, Default)]
pub struct Fnv1aBuildHasher;

impl BuildHasher for Fnv1aBuildHasher {
    type Hasher = Fnv1aHasher;
    fn build_hasher(&self) -> Self::Hasher {
        Fnv1aHasher::default()
    }
}

/// Hash a key's bytes with `S`, keeping the low 32 bits.
///
/// The bytes are fed in a single `write` with no length prefix or
/// terminator, so the default hasher yields exactly `fnv1a_32(key)`.
#[inline]
pub(crate) fn key_hash<S: BuildHasher>(s: &S, key: &str) -> u32 {
    let mut h = s.build_hasher();
    h.write(key.as_bytes());
    h.finish() as u32
}

/// Effective capacity for a requested size: `n` itself when it is a power of
/// two, otherwise the next power of two; never below [`MIN_CAPACITY`].
/// `None` if the result would overflow `usize`.
pub fn round_capacity(n: usize) -> Option<usize> {
    n.max(MIN_CAPACITY).checked_next_power_of_two()
}

/// Bucket index of probe attempt `i` for `hash` in a table of `capacity`
/// buckets (a power of two): `(hash + i*(i+1)/2) mod capacity`.
#[inline]
pub fn probe_index(hash: u32, i: usize, capacity: usize) -> usize {
    debug_assert!(capacity.is_power_of_two());
    let tri = if i % 2 == 0 {
        (i / 2).wrapping_mul(i.wrapping_add(1))
    } else {
        i.wrapping_mul((i + 1) / 2)
    };
    (hash as usize).wrapping_add(tri) & (capacity - 1)
}

/// Iterator over `(attempt, bucket)` pairs of the triangular probe sequence.
///
/// Over a power-of-two capacity the first `capacity` attempts visit every
/// bucket exactly once; the iterator stops after `limit` attempts.
#[derive(Debug, Clone)]
pub struct ProbeSeq {
    pos: usize,
    mask: usize,
    i: usize,
    limit: usize,
}

impl ProbeSeq {
    pub fn new(hash: u32, capacity: usize, limit: usize) -> Self {
        debug_assert!(capacity.is_power_of_two());
        let mask = capacity - 1;
        ProbeSeq {
            pos: hash as usize & mask,
            mask,
            i: 0,
            limit,
        }
    }
}

impl Iterator for ProbeSeq {
    type Item = (usize, usize);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if self.i >= self.limit {
            return None;
        }
        let out = (self.i, self.pos);
        // T(i+1) = T(i) + (i+1)
        self.i += 1;
        self.pos = self.pos.wrapping_add(self.i) & self.mask;
        Some(out)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.limit.saturating_sub(self.i);
        (n, Some(n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    /// Reference values for 32-bit FNV-1a.
    #[test]
    fn fnv1a_known_vectors() {
        assert_eq!(fnv1a_32(b""), 0x811c9dc5);
        assert_eq!(fnv1a_32(b"a"), 0xe40c292c);
        assert_eq!(fnv1a_32(b"foobar"), 0xbf9cf968);
    }

    /// The streaming hasher and `key_hash` agree with the one-shot function.
    #[test]
    fn build_hasher_matches_one_shot() {
        for k in ["", "key1", "a longer key with spaces", "ünïcödé"] {
            assert_eq!(key_hash(&Fnv1aBuildHasher, k), fnv1a_32(k.as_bytes()));
        }
    }

    #[test]
    fn capacity_rounding() {
        assert_eq!(round_capacity(0), Some(2));
        assert_eq!(round_capacity(1), Some(2));
        assert_eq!(round_capacity(2), Some(2));
        assert_eq!(round_capacity(3), Some(4));
        assert_eq!(round_capacity(4), Some(4));
        assert_eq!(round_capacity(5), Some(8));
        assert_eq!(round_capacity(32), Some(32));
        assert_eq!(round_capacity(33), Some(64));
        assert_eq!(round_capacity(usize::MAX), None);
    }

    /// Invariant: the first `capacity` attempts cover every bucket once.
    #[test]
    fn probe_sequence_is_a_permutation() {
        for cap in [2usize, 4, 8, 64, 1024] {
            for hash in [0u32, 1, 7, 0xdead_beef, u32::MAX] {
                let seen: BTreeSet<usize> =
                    ProbeSeq::new(hash, cap, cap).map(|(_, b)| b).collect();
                assert_eq!(seen.len(), cap);
            }
        }
    }

    /// The incremental iterator and the closed form produce the same buckets.
    #[test]
    fn probe_seq_matches_closed_form() {
        let cap = 256;
        for hash in [3u32, 0x811c_9dc5, u32::MAX] {
            for (i, b) in ProbeSeq::new(hash, cap, 600) {
                assert_eq!(b, probe_index(hash, i, cap), "attempt {i}");
            }
        }
    }

    #[test]
    fn probe_seq_respects_limit() {
        assert_eq!(ProbeSeq::new(5, 8, 0).count(), 0);
        assert_eq!(ProbeSeq::new(5, 8, 3).count(), 3);
        let first: Vec<_> = ProbeSeq::new(5, 8, 4).collect();
        assert_eq!(first, vec![(0, 5), (1, 6), (2, 0), (3, 3)]);
    }
}
