//! Construction parameters for a [`Table`](crate::Table).

use thiserror::Error;

/// Initial bucket count used by [`TableConfig::default`].
pub const DEFAULT_INITIAL_CAPACITY: usize = 32;
/// Size of a key or value buffer in the snapshot format, terminator included.
pub const LEN_BUFFER: usize = 100;
/// Default limit for keys and values, in content bytes. The terminator takes
/// the last byte of the buffer, so length fields on disk stay within
/// [`LEN_BUFFER`].
pub const DEFAULT_MAX_LEN: usize = LEN_BUFFER - 1;
/// Largest snapshot capacity [`Table::decode`](crate::Table::decode) will
/// allocate buckets for.
pub const DEFAULT_MAX_DECODE_CAPACITY: usize = 1 << 24;
/// Default load threshold checked before each insertion.
pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.60;

/// What `put` does with a key or value longer than its limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LengthPolicy {
    /// Store the longest prefix that fits, ending on a char boundary.
    #[default]
    Truncate,
    /// Refuse the insertion with `PutError::TooLong`.
    Reject,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{0} must be at least 1 byte")]
    ZeroLength(&'static str),
    #[error("max load factor {0} must be in (0, 1)")]
    LoadFactor(f64),
    #[error("max decode capacity must be at least 2")]
    DecodeCapacity,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableConfig {
    pub initial_capacity: usize,
    pub max_key_len: usize,
    pub max_value_len: usize,
    pub max_load_factor: f64,
    pub length_policy: LengthPolicy,
    /// Snapshots whose header declares more buckets are refused before
    /// anything is allocated.
    pub max_decode_capacity: usize,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            max_key_len: DEFAULT_MAX_LEN,
            max_value_len: DEFAULT_MAX_LEN,
            max_load_factor: DEFAULT_MAX_LOAD_FACTOR,
            length_policy: LengthPolicy::Truncate,
            max_decode_capacity: DEFAULT_MAX_DECODE_CAPACITY,
        }
    }
}

impl TableConfig {
    pub fn with_initial_capacity(mut self, n: usize) -> Self {
        self.initial_capacity = n;
        self
    }

    pub fn with_max_key_len(mut self, n: usize) -> Self {
        self.max_key_len = n;
        self
    }

    pub fn with_max_value_len(mut self, n: usize) -> Self {
        self.max_value_len = n;
        self
    }

    pub fn with_max_load_factor(mut self, f: f64) -> Self {
        self.max_load_factor = f;
        self
    }

    pub fn with_length_policy(mut self, p: LengthPolicy) -> Self {
        self.length_policy = p;
        self
    }

    pub fn with_max_decode_capacity(mut self, n: usize) -> Self {
        self.max_decode_capacity = n;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_key_len == 0 {
            return Err(ConfigError::ZeroLength("max_key_len"));
        }
        if self.max_value_len == 0 {
            return Err(ConfigError::ZeroLength("max_value_len"));
        }
        // Written so that NaN fails too.
        if !(self.max_load_factor > 0.0 && self.max_load_factor < 1.0) {
            return Err(ConfigError::LoadFactor(self.max_load_factor));
        }
        if self.max_decode_capacity < 2 {
            return Err(ConfigError::DecodeCapacity);
        }
        Ok(())
    }
}
