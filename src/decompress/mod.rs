//! LZ decompression engine
//!
//! A resumable token decoder replaying literal runs and back-references
//! against a recall buffer primed with the shared preamble.

mod decoder;
mod reader;
mod state;

pub use reader::LzReader;
pub use state::{remember, DecodeStage, DecompressState, IN_BUFF_SIZE};

use crate::engine::DecompressEngine;
use crate::Result;

/// Output chunk size used by the in-memory helper
const READ_CHUNK_SIZE: usize = 0x2000;

/// Convenience function to decompress a bare LZ token stream in memory
pub fn lz_decompress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    let mut reader = LzReader::new(std::io::Cursor::new(data));
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
