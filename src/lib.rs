//! quadkv: an embedded string-keyed hash table with quadratic probing and
//! an exact-position binary snapshot format.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a small, single-owner key-value table whose on-disk image can be
//!   restored without rehashing.
//! - Layers:
//!   - `hash`: FNV-1a (32-bit), capacity rounding, and the triangular probe
//!     sequence `(hash + i*(i+1)/2) mod capacity`.
//!   - `Table<S>`: open-addressing bucket array of optional owned slots;
//!     `put`/`find`/`exists`/`delete`, growth by doubling, probe-bound
//!     tracking.
//!   - `codec`: full-table dump and reload that writes each slot's bucket
//!     index and puts it straight back there.
//!
//! Constraints
//! - Single-threaded and synchronous; the table has exactly one owner.
//! - Capacity is always a power of two, at least 2. With triangular probing
//!   that makes the first `capacity` attempts a permutation of the buckets.
//! - Unique keys; a duplicate `put` fails and changes nothing.
//! - Keys and values are bounded in length (99 content bytes by default, so the
//!   terminator fills a 100-byte buffer); longer
//!   input is truncated on a char boundary, or refused under
//!   `LengthPolicy::Reject`.
//!
//! Probe bound
//! - `probe_bound` is the highest probe attempt any insertion has needed
//!   since the table was created. It survives resizes and snapshots and is
//!   never lowered.
//! - Lookups stop after `probe_bound + 1` attempts instead of at the first
//!   empty bucket. Deletion therefore leaves no tombstone: an emptied bucket
//!   inside a chain does not cut the chain short.
//!
//! Growth
//! - Before each insertion the table doubles while `count / capacity`
//!   exceeds the configured threshold (0.60 by default), reinserting slots
//!   in bucket order. The new array is allocated up front, so allocation
//!   failure leaves the old table intact.
//!
//! Snapshots
//! - Little-endian `u64` header (capacity, count, probe bound) followed by
//!   one record per occupied bucket in index order. See [`codec`].
//! - Decode trusts the stored hash, position and probe bound, which makes
//!   loading O(count) and the restored table bucket-for-bucket identical.
//!
//! Notes and non-goals
//! - No concurrent access, transactions, range scans or write-ahead log.
//! - The catalog of named tables and any command-line front end live
//!   outside this crate.

pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
mod table;
mod table_proptest;

// Public surface
pub use config::{ConfigError, LengthPolicy, TableConfig};
pub use error::{AllocError, CodecError, CreateError, PutError};
pub use hash::{fnv1a_32, Fnv1aBuildHasher, Fnv1aHasher};
pub use table::{SlotView, Table};
