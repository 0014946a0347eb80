//! Decompression state management
//!
//! The decoder is resumable at every byte: where it stopped inside a token is
//! captured by `DecodeStage`, whose variants carry their own counters.

use crate::preamble::PRIMING_PREAMBLE;
use crate::queue::RingQueue;
use crate::{CompressionStats, Result, WINDOW_SIZE};

/// Input buffer size for decompression (2048 bytes)
pub const IN_BUFF_SIZE: usize = 0x800;

/// Position of the decoder inside the token stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeStage {
    /// Expecting the code byte of the next token
    CompressionCode,
    /// Reading the 2-byte length of an extended literal run
    ExtendedLiteralLength {
        /// Length bytes consumed so far
        bytes_read: u8,
        /// Length accumulated so far
        partial: u16,
    },
    /// Copying raw bytes of a literal run
    LiteralData {
        /// Bytes of the run still to copy
        remaining: usize,
    },
    /// Reading the 2-byte length of an extended match
    ExtendedCompressionLength {
        /// Length bytes consumed so far
        bytes_read: u8,
        /// Length accumulated so far
        partial: u16,
    },
    /// Expecting the low byte of a match offset
    FirstOffsetByte {
        /// Match length
        length: usize,
    },
    /// Expecting the high byte of a match offset
    SecondOffsetByte {
        /// Match length
        length: usize,
        /// Low offset byte
        low: u8,
    },
    /// Replaying a match from the recall buffer
    RecallCopy {
        /// Bytes of the match still to copy
        remaining: usize,
        /// Backward distance into the recall buffer
        offset: usize,
    },
    /// The end-of-region token was read
    Finished,
    /// The stream was found corrupt; nothing more will be decoded
    Failed,
}

/// State of one LZ decompression session
#[derive(Debug)]
pub struct DecompressState {
    /// Reconstructed window, primed with the preamble
    pub recall: RingQueue<u8>,
    /// Compressed bytes read from the source
    pub in_buff: [u8; IN_BUFF_SIZE],
    /// Next unread byte in `in_buff`
    pub in_pos: usize,
    /// Number of valid bytes in `in_buff`
    pub in_bytes: usize,
    /// Where decoding resumes
    pub stage: DecodeStage,
    /// Session statistics
    pub stats: CompressionStats,
}

impl DecompressState {
    /// Create a primed session
    pub fn new() -> Result<Self> {
        // Starts at the preamble size and grows with the output up to the window
        let mut recall = RingQueue::with_capacity(PRIMING_PREAMBLE.len())?;
        recall.add(PRIMING_PREAMBLE)?;

        Ok(Self {
            recall,
            in_buff: [0; IN_BUFF_SIZE],
            in_pos: 0,
            in_bytes: 0,
            stage: DecodeStage::CompressionCode,
            stats: CompressionStats::default(),
        })
    }

    /// Bytes read from the source but not consumed by the decoder
    pub fn unconsumed(&self) -> &[u8] {
        &self.in_buff[self.in_pos..self.in_bytes]
    }

    /// Whether the end-of-region token has been decoded
    pub fn is_finished(&self) -> bool {
        self.stage == DecodeStage::Finished
    }
}

/// Append decoded bytes to the recall buffer, sliding it at the window size
pub fn remember(recall: &mut RingQueue<u8>, bytes: &[u8]) -> Result<()> {
    let bytes = &bytes[bytes.len().saturating_sub(WINDOW_SIZE)..];
    let overflow = (recall.len() + bytes.len()).saturating_sub(WINDOW_SIZE);
    // Grow first so a failed allocation leaves the window untouched
    recall.reserve(bytes.len() - overflow)?;
    recall.skip(overflow);
    recall.add(bytes)
}
