//! metazip - Streaming byte codecs for binary graphics metafile streams
//!
//! This crate compresses and decompresses the byte streams embedded in
//! binary CAD/graphics metafiles. Two engines share one lifecycle:
//!
//! - **LZ** - a hash-chained LZ77 codec with a 64 KiB sliding window whose
//!   windows are primed with a fixed preamble of common metafile opcodes
//! - **DEFLATE** - a zlib stream produced by flate2
//!
//! A region coded through [`StreamWriter`] starts with a one-byte engine
//! marker (`b'L'` or `b'D'`) that [`StreamReader`] uses to pick the decoder.
//!
//! # Features
//!
//! - Incremental compression through `start`/`compress`/`stop`
//! - Decompression resumable at any byte boundary
//! - Streaming API via Read/Write traits
//! - Tunable match finder via [`LzParams`]
//!
//! # Example
//!
//! ```no_run
//! use metazip::{compress_bytes, decompress_bytes, EngineKind, StreamReader, StreamWriter};
//! use std::io::{Read, Write};
//!
//! // Compress data in-memory
//! let data = b"(Polyline 2 0,0 10,10)(Polyline 2 0,0 10,10)";
//! let compressed = compress_bytes(data, EngineKind::Lz)?;
//! assert_eq!(decompress_bytes(&compressed)?, data);
//!
//! // Or use streaming API
//! let mut writer = StreamWriter::new(Vec::new(), EngineKind::Deflate);
//! writer.write_all(data)?;
//! let compressed = writer.finish()?;
//!
//! let mut reader = StreamReader::new(compressed.as_slice());
//! let mut output = Vec::new();
//! reader.read_to_end(&mut output)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

// Public modules
pub mod common;
pub mod compress;
pub mod decompress;
pub mod deflate;
pub mod engine;
pub mod error;
pub mod preamble;
pub mod queue;

// Re-export commonly used types
pub use common::{
    CompressionStats, LzParams, MetazipError, Result, CODE_END, CODE_LITERAL_EXTENDED,
    CODE_LITERAL_INLINE_MAX, CODE_MATCH_BASE, CODE_MATCH_EXTENDED, HASH_BYTES, HASH_TABLE_SIZE,
    MATCH_INLINE_MAX, MAX_CANDIDATES, MAX_ENCODED_MATCH, MAX_LITERAL_RUN, MAX_MATCH_LENGTH,
    MIN_MATCH_LENGTH, WINDOW_SIZE,
};
pub use compress::{lz_compress_bytes, LzWriter};
pub use decompress::{lz_decompress_bytes, LzReader};
pub use deflate::{DeflateReader, DeflateWriter};
pub use engine::{
    CompressEngine, DecompressEngine, EngineKind, StreamReader, StreamWriter, MARKER_DEFLATE,
    MARKER_LZ,
};
pub use preamble::PRIMING_PREAMBLE;
pub use queue::RingQueue;

// Convenience functions

/// Output chunk size used by `decompress_bytes`
const READ_CHUNK_SIZE: usize = 0x2000;

/// Compress data into a marked region
///
/// # Arguments
/// * `data` - The data to compress
/// * `engine` - Engine coding the region
///
/// # Returns
/// A vector holding the engine marker followed by the compressed region
pub fn compress_bytes(data: &[u8], engine: EngineKind) -> Result<Vec<u8>> {
    let mut writer = StreamWriter::new(Vec::new(), engine);
    writer.start()?;
    writer.compress(data)?;
    writer.finish()
}

/// Decompress a marked region
///
/// # Arguments
/// * `data` - Engine marker followed by the compressed region
///
/// # Returns
/// A vector containing the decompressed data
pub fn decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = StreamReader::new(data);
    reader.start()?;

    let mut output = Vec::new();
    let mut chunk = [0u8; READ_CHUNK_SIZE];
    loop {
        let count = reader.decompress(&mut chunk)?;
        if count == 0 {
            return Ok(output);
        }
        output.extend_from_slice(&chunk[..count]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reexports() {
        let _ = EngineKind::Lz;
        let _ = LzParams::default();
        assert_eq!(WINDOW_SIZE, 65536);
        assert!(!PRIMING_PREAMBLE.is_empty());
    }

    #[test]
    fn test_bytes_helpers() {
        let data = b"(Color 0 255 255 255 255)(Color 0 255 255 255 255)";
        for engine in [EngineKind::Lz, EngineKind::Deflate] {
            let compressed = compress_bytes(data, engine).unwrap();
            assert_eq!(compressed[0], engine.marker());
            assert_eq!(decompress_bytes(&compressed).unwrap(), data);
        }
    }

    #[test]
    fn test_preamble_content_compresses() {
        let compressed = compress_bytes(&PRIMING_PREAMBLE[..200], EngineKind::Lz).unwrap();
        assert!(compressed.len() < 20);
    }
}
