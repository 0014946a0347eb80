//! Common types and constants for the metazip codecs
//!
//! This module defines the error type, the format constants shared by the
//! encoder and decoder, the tunable match parameters and the statistics
//! collected by every engine.

use thiserror::Error;

/// Size of the sliding window shared by the LZ encoder and decoder (64 KiB)
pub const WINDOW_SIZE: usize = 0x10000;

/// Number of buckets in the encoder's hash index
pub const HASH_TABLE_SIZE: usize = 0x10000;

/// Number of bytes hashed together to key a hash chain
pub const HASH_BYTES: usize = 4;

/// Maximum number of hash chain entries examined per position
pub const MAX_CANDIDATES: usize = 64;

/// Minimum match length the token format can express
pub const MIN_MATCH_LENGTH: usize = 3;

/// Default upper bound for a single match token
pub const MAX_MATCH_LENGTH: usize = 270;

/// Longest literal run a single token can carry
pub const MAX_LITERAL_RUN: usize = 0xFFFF;

/// Longest match a single (extended) token can carry
pub const MAX_ENCODED_MATCH: usize = 0xFFFF;

/// Token code that terminates a compressed region
pub const CODE_END: u8 = 0x00;

/// Largest literal run length stored directly in the code byte
pub const CODE_LITERAL_INLINE_MAX: u8 = 0x7E;

/// Token code announcing a literal run with a 2-byte length
pub const CODE_LITERAL_EXTENDED: u8 = 0x7F;

/// First token code of the match range
pub const CODE_MATCH_BASE: u8 = 0x80;

/// Token code announcing a match with a 2-byte length
pub const CODE_MATCH_EXTENDED: u8 = 0xFF;

/// Longest match length stored directly in the code byte (129)
pub const MATCH_INLINE_MAX: usize =
    (CODE_MATCH_EXTENDED - 1 - CODE_MATCH_BASE) as usize + MIN_MATCH_LENGTH;

/// Error type for metazip operations
#[derive(Debug, Error)]
pub enum MetazipError {
    /// A buffer could not grow to the requested number of items
    #[error("Out of memory: cannot grow buffer to {requested} items")]
    OutOfMemory {
        /// Number of items the buffer tried to hold
        requested: usize,
    },

    /// The engine API was called in the wrong state
    #[error("Usage error: {0}")]
    Usage(&'static str),

    /// The compressed data cannot be decoded
    #[error("Corrupt stream: {0}")]
    CorruptStream(String),

    /// A decoded back-reference points before the start of the window
    #[error("Invalid offset {offset}: only {available} bytes of history")]
    InvalidOffset {
        /// Decoded back-distance
        offset: usize,
        /// Bytes held by the recall buffer
        available: usize,
    },

    /// The compressed region ended in the middle of a token
    #[error("Unexpected end of compressed region")]
    UnexpectedEof,

    /// The region starts with a marker no engine claims
    #[error("Unknown engine marker: 0x{0:02X}")]
    UnknownEngine(u8),

    /// Rejected tuning parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// An internal invariant does not hold
    #[error("Internal error: {0}")]
    Internal(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl MetazipError {
    /// Whether the error describes undecodable input rather than misuse or I/O
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            MetazipError::CorruptStream(_)
                | MetazipError::InvalidOffset { .. }
                | MetazipError::UnexpectedEof
                | MetazipError::UnknownEngine(_)
        )
    }
}

/// Result type alias for metazip operations
pub type Result<T> = std::result::Result<T, MetazipError>;

/// Tunable match-finding parameters for the LZ encoder
///
/// The decoder does not need these: every token carries its own lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LzParams {
    /// Hash chain entries examined per position
    pub max_candidates: usize,
    /// Shortest match worth a token
    pub min_match_length: usize,
    /// Longest match emitted as a single token
    pub max_match_length: usize,
    /// Longest literal run emitted as a single token
    pub max_literal_run: usize,
}

impl Default for LzParams {
    fn default() -> Self {
        Self {
            max_candidates: MAX_CANDIDATES,
            min_match_length: MIN_MATCH_LENGTH,
            max_match_length: MAX_MATCH_LENGTH,
            max_literal_run: MAX_LITERAL_RUN,
        }
    }
}

impl LzParams {
    /// Check the parameters against the limits of the token format
    pub fn validate(&self) -> Result<()> {
        if self.max_candidates == 0 {
            return Err(MetazipError::InvalidParameter(
                "max_candidates must be at least 1".to_string(),
            ));
        }
        if self.min_match_length < MIN_MATCH_LENGTH {
            return Err(MetazipError::InvalidParameter(format!(
                "min_match_length {} is below the format minimum {}",
                self.min_match_length, MIN_MATCH_LENGTH
            )));
        }
        if self.max_match_length < self.min_match_length
            || self.max_match_length > MAX_ENCODED_MATCH
        {
            return Err(MetazipError::InvalidParameter(format!(
                "max_match_length {} must lie in {}..={}",
                self.max_match_length, self.min_match_length, MAX_ENCODED_MATCH
            )));
        }
        if self.max_literal_run == 0 || self.max_literal_run > MAX_LITERAL_RUN {
            return Err(MetazipError::InvalidParameter(format!(
                "max_literal_run {} must lie in 1..={}",
                self.max_literal_run, MAX_LITERAL_RUN
            )));
        }
        Ok(())
    }
}

/// Statistics for compression/decompression operations
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CompressionStats {
    /// Number of literal bytes encoded/decoded
    pub literal_count: usize,
    /// Number of match tokens encoded/decoded
    pub match_count: usize,
    /// Uncompressed bytes consumed or produced
    pub bytes_in: u64,
    /// Compressed bytes produced or consumed
    pub bytes_out: u64,
    /// Longest match found
    pub longest_match: usize,
}

impl CompressionStats {
    /// Compressed size as a fraction of the uncompressed size
    pub fn ratio(&self) -> f64 {
        if self.bytes_in == 0 {
            0.0
        } else {
            self.bytes_out as f64 / self.bytes_in as f64
        }
    }
}
