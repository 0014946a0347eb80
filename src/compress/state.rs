//! Compression state management
//!
//! `CompressState` owns everything an LZ compression session mutates: the
//! history window, the lookahead of bytes not yet coded, the pending literal
//! run and the staged token output.

use super::history::HistoryBuffer;
use crate::preamble::PRIMING_PREAMBLE;
use crate::queue::RingQueue;
use crate::{CompressionStats, LzParams, Result};

/// Size of the staged token output before it is handed to the sink
pub const OUT_BUFF_SIZE: usize = 0x1000;

/// Number of input bytes moved into the lookahead at a time
pub const INPUT_CHUNK_SIZE: usize = 0x1000;

/// Lifecycle of an encoder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderStage {
    /// Created, `start()` not called yet
    Idle,
    /// Primed, no data yet
    Started,
    /// At least one `compress()` call accepted
    Compressing,
    /// The region has been terminated
    Stopped,
}

impl EncoderStage {
    /// Whether data may be compressed in this stage
    pub fn is_open(self) -> bool {
        matches!(self, EncoderStage::Started | EncoderStage::Compressing)
    }
}

/// State of one LZ compression session
#[derive(Debug)]
pub struct CompressState {
    /// Match finder tuning
    pub params: LzParams,
    /// Window of bytes already coded
    pub history: HistoryBuffer,
    /// Input bytes not coded yet
    pub lookahead: RingQueue<u8>,
    /// Literals waiting to be emitted as a run
    pub pending: RingQueue<u8>,
    /// Encoded tokens not yet written out
    pub out_buff: Vec<u8>,
    /// Session statistics
    pub stats: CompressionStats,
}

impl CompressState {
    /// Create a primed session
    pub fn new(params: LzParams) -> Result<Self> {
        params.validate()?;

        let mut state = Self {
            params,
            history: HistoryBuffer::new()?,
            lookahead: RingQueue::with_capacity(INPUT_CHUNK_SIZE + params.max_match_length)?,
            pending: RingQueue::with_capacity(params.max_literal_run.min(INPUT_CHUNK_SIZE))?,
            out_buff: Vec::with_capacity(OUT_BUFF_SIZE + 2 * params.max_literal_run.min(OUT_BUFF_SIZE)),
            stats: CompressionStats::default(),
        };
        state.prime()?;
        Ok(state)
    }

    /// Load the preamble into a freshly cleared window
    pub fn prime(&mut self) -> Result<()> {
        self.history.clear();
        self.history.insert_all(PRIMING_PREAMBLE)?;
        self.lookahead.clear();
        self.pending.clear();
        self.out_buff.clear();
        self.stats = CompressionStats::default();
        Ok(())
    }

    /// Whether enough tokens are staged to be worth writing out
    pub fn output_full(&self) -> bool {
        self.out_buff.len() >= OUT_BUFF_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_state_is_primed() {
        let state = CompressState::new(LzParams::default()).unwrap();
        assert_eq!(state.history.len(), PRIMING_PREAMBLE.len());
        assert!(state.lookahead.is_empty());
        assert!(state.pending.is_empty());
        assert!(state.out_buff.is_empty());
    }

    #[test]
    fn test_invalid_params_rejected() {
        let params = LzParams {
            max_literal_run: 0,
            ..LzParams::default()
        };
        assert!(CompressState::new(params).is_err());
    }

    #[test]
    fn test_stage_is_open() {
        assert!(!EncoderStage::Idle.is_open());
        assert!(EncoderStage::Started.is_open());
        assert!(EncoderStage::Compressing.is_open());
        assert!(!EncoderStage::Stopped.is_open());
    }
}
