//! LZ compression engine
//!
//! A hash-chained sliding-window match finder feeding a token encoder.
//! The window is primed with the shared preamble before the first byte.

mod encoder;
mod history;
mod matcher;
mod state;
mod writer;

pub use encoder::Progress;
pub use history::{hash4, BackLink, HistoryBuffer, HistoryEntry};
pub use matcher::MatchCandidate;
pub use state::{CompressState, EncoderStage, INPUT_CHUNK_SIZE, OUT_BUFF_SIZE};
pub use writer::LzWriter;

use crate::engine::CompressEngine;
use crate::{LzParams, Result};

/// Convenience function to compress data in memory with the LZ engine
///
/// The result is a bare token stream without an engine marker.
pub fn lz_compress_bytes(data: &[u8], params: LzParams) -> Result<Vec<u8>> {
    let mut writer = LzWriter::with_params(Vec::new(), params)?;
    writer.start()?;
    writer.compress(data)?;
    writer.finish()
}
