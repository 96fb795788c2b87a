//! Snapshot codec: full-table dump that preserves every slot's bucket index.
//!
//! ```text
//! capacity      u64 LE
//! count         u64 LE
//! probe_bound   u64 LE
//! count x, ascending bucket index:
//!   key_len     u64 LE   (content bytes + 1 terminator)
//!   key_bytes   [key_len] (last byte is 0)
//!   val_len     u64 LE   (content bytes + 1 terminator)
//!   val_bytes   [val_len] (last byte is 0)
//!   hash        u32 LE
//!   position    u64 LE
//! ```
//!
//! Decoding places each record straight at its stored position and restores
//! the probe bound verbatim; nothing is rehashed. Lookups depend on slots
//! sitting where their original probe sequence put them.
//!
//! The header alone decides how many buckets get allocated, so a capacity
//! above [`TableConfig::max_decode_capacity`] is refused up front. Key
//! uniqueness is checked once every record is placed.

use crate::config::TableConfig;
use crate::error::{AllocError, CodecError};
use crate::hash::{Fnv1aBuildHasher, MIN_CAPACITY};
use crate::table::{alloc_buckets, Slot, Table};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use core::hash::BuildHasher;
use std::collections::HashSet;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Number of fixed header fields preceding the records.
pub const HEADER_FIELDS: usize = 3;

/// Writer adapter counting bytes accepted by the inner sink.
struct CountingWriter<W> {
    inner: W,
    bytes: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.bytes += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

fn write_str<W: Write>(w: &mut W, s: &str) -> io::Result<()> {
    w.write_u64::<LittleEndian>(s.len() as u64 + 1)?;
    w.write_all(s.as_bytes())?;
    w.write_u8(0)
}

fn read_u64<R: Read>(r: &mut R, what: &'static str) -> Result<u64, CodecError> {
    r.read_u64::<LittleEndian>()
        .map_err(|e| CodecError::from_read(e, what))
}

/// Read a length-prefixed, zero-terminated string of at most `max` content bytes.
fn read_str<R: Read>(r: &mut R, max: usize, what: &'static str) -> Result<String, CodecError> {
    let len = read_u64(r, what)?;
    let max_len = (max as u64).saturating_add(1);
    if len == 0 || len > max_len {
        return Err(CodecError::LengthOutOfRange {
            what,
            len,
            max: max_len,
        });
    }
    let len = len as usize;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| AllocError { buckets: 0 })?;
    r.by_ref()
        .take(len as u64)
        .read_to_end(&mut buf)
        .map_err(|e| CodecError::from_read(e, what))?;
    if buf.len() < len {
        return Err(CodecError::Truncated { what });
    }
    if buf.pop() != Some(0) {
        return Err(CodecError::MissingTerminator { what });
    }
    String::from_utf8(buf).map_err(|_| CodecError::InvalidUtf8 { what })
}

impl<S> Table<S>
where
    S: BuildHasher,
{
    /// Write the table to `w` and return the number of bytes written.
    ///
    /// On a sink failure the error reports how many top-level fields (three
    /// header fields, then one per record) were completely written.
    pub fn encode<W: Write>(&self, w: &mut W) -> Result<u64, CodecError> {
        let mut out = CountingWriter { inner: w, bytes: 0 };
        let mut fields = 0usize;
        let failed = |fields_written, source| CodecError::WriteFailed {
            fields_written,
            source,
        };

        for v in [self.capacity(), self.len(), self.probe_bound()] {
            out.write_u64::<LittleEndian>(v as u64)
                .map_err(|e| failed(fields, e))?;
            fields += 1;
        }

        for s in self.slots() {
            let res = write_str(&mut out, s.key)
                .and_then(|_| write_str(&mut out, s.value))
                .and_then(|_| out.write_u32::<LittleEndian>(s.hash))
                .and_then(|_| out.write_u64::<LittleEndian>(s.position as u64));
            res.map_err(|e| failed(fields, e))?;
            fields += 1;
        }

        out.flush().map_err(|e| failed(fields, e))?;
        debug!(records = self.len(), bytes = out.bytes, "table encoded");
        Ok(out.bytes)
    }

    /// Rebuild a table from `r`. Length limits come from `config`; its
    /// `initial_capacity` is ignored in favour of the stored capacity.
    pub fn decode_with<R: Read>(r: &mut R, config: TableConfig, hasher: S) -> Result<Self, CodecError> {
        decode_inner(r, config, hasher).map_err(|e| {
            warn!(error = %e, "snapshot rejected");
            e
        })
    }

    /// Write a snapshot to `path`, replacing any existing file.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<u64, CodecError> {
        let path = path.as_ref();
        let mut w = BufWriter::new(File::create(path)?);
        let bytes = self.encode(&mut w)?;
        let file = w.into_inner().map_err(|e| CodecError::Io(e.into_error()))?;
        file.sync_all()?;
        info!(path = %path.display(), records = self.len(), bytes, "snapshot saved");
        Ok(bytes)
    }

    pub fn load_with<P: AsRef<Path>>(path: P, config: TableConfig, hasher: S) -> Result<Self, CodecError> {
        let path = path.as_ref();
        let mut r = BufReader::new(File::open(path)?);
        let table = Self::decode_with(&mut r, config, hasher)?;
        info!(
            path = %path.display(),
            records = table.len(),
            capacity = table.capacity(),
            "snapshot loaded"
        );
        Ok(table)
    }
}

impl Table {
    /// Decode with the default config and FNV-1a hasher.
    pub fn decode<R: Read>(r: &mut R) -> Result<Self, CodecError> {
        Self::decode_with(r, TableConfig::default(), Fnv1aBuildHasher)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CodecError> {
        Self::load_with(path, TableConfig::default(), Fnv1aBuildHasher)
    }
}

fn decode_inner<R, S>(r: &mut R, config: TableConfig, hasher: S) -> Result<Table<S>, CodecError>
where
    R: Read,
    S: BuildHasher,
{
    let capacity = read_u64(r, "capacity")?;
    if capacity < MIN_CAPACITY as u64 || !capacity.is_power_of_two() {
        return Err(CodecError::InvalidCapacity(capacity));
    }
    let max = config.max_decode_capacity as u64;
    if capacity > max {
        return Err(CodecError::CapacityTooLarge { capacity, max });
    }
    let count = read_u64(r, "count")?;
    if count > capacity {
        return Err(CodecError::CountOutOfRange { count, capacity });
    }
    let probe_bound = read_u64(r, "probe_bound")?;

    let cap = usize::try_from(capacity).map_err(|_| AllocError { buckets: usize::MAX })?;
    let mut buckets = alloc_buckets(cap)?;

    for _ in 0..count {
        let key = read_str(r, config.max_key_len, "key")?;
        let value = read_str(r, config.max_value_len, "value")?;
        let hash = r
            .read_u32::<LittleEndian>()
            .map_err(|e| CodecError::from_read(e, "hash"))?;
        let position = read_u64(r, "position")?;
        if position >= capacity {
            return Err(CodecError::PositionOutOfRange { position, capacity });
        }
        let bucket = &mut buckets[position as usize];
        if bucket.is_some() {
            return Err(CodecError::DuplicatePosition(position));
        }
        *bucket = Some(Slot {
            key,
            value,
            hash,
            position: position as usize,
        });
    }

    let mut seen = HashSet::with_capacity(count as usize);
    for slot in buckets.iter().flatten() {
        if !seen.insert(slot.key.as_str()) {
            return Err(CodecError::DuplicateKey(slot.key.clone()));
        }
    }

    // Lookups clamp the bound to the capacity, so saturating is lossless.
    let probe_bound = usize::try_from(probe_bound).unwrap_or(usize::MAX);
    debug!(capacity, count, probe_bound, "table decoded");
    Ok(Table::from_parts(
        config,
        hasher,
        buckets,
        count as usize,
        probe_bound,
    ))
}
