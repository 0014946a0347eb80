//! LzWriter - Streaming LZ compression writer
//!
//! This module implements the encoder lifecycle (`Idle → Started →
//! Compressing → Stopped`) on top of `CompressState` and hands finished tokens
//! to the underlying sink.

use super::encoder::Progress;
use super::state::{CompressState, EncoderStage, INPUT_CHUNK_SIZE};
use crate::engine::CompressEngine;
use crate::{CompressionStats, LzParams, MetazipError, Result};
use log::debug;
use std::io::Write;

/// Streaming compression writer implementing Write trait
#[derive(Debug)]
pub struct LzWriter<W: Write> {
    writer: W,
    params: LzParams,
    state: Option<CompressState>,
    stage: EncoderStage,
    stats: CompressionStats,
}

impl<W: Write> LzWriter<W> {
    /// Create a new LzWriter with the default match parameters
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            params: LzParams::default(),
            state: None,
            stage: EncoderStage::Idle,
            stats: CompressionStats::default(),
        }
    }

    /// Create a new LzWriter with custom match parameters
    pub fn with_params(writer: W, params: LzParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            ..Self::new(writer)
        })
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> EncoderStage {
        self.stage
    }

    /// Statistics of the current or last session
    pub fn stats(&self) -> CompressionStats {
        match &self.state {
            Some(state) if self.stage.is_open() => CompressionStats {
                bytes_out: self.stats.bytes_out,
                ..state.stats.clone()
            },
            _ => self.stats.clone(),
        }
    }

    /// Mutable access to the underlying sink
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Stop the session if it is open and return the sink
    pub fn finish(mut self) -> Result<W> {
        if self.stage == EncoderStage::Idle {
            self.start()?;
        }
        if self.stage.is_open() {
            self.stop()?;
        }
        Ok(self.writer)
    }

    fn open_state(&mut self) -> Result<&mut CompressState> {
        if !self.stage.is_open() {
            return Err(MetazipError::Usage(match self.stage {
                EncoderStage::Stopped => "compress called after stop",
                _ => "compress called before start",
            }));
        }
        self.state
            .as_mut()
            .ok_or_else(|| MetazipError::Internal("open encoder without state".to_string()))
    }

    /// Write staged tokens to the sink
    fn flush_output(&mut self) -> Result<()> {
        if let Some(state) = self.state.as_mut() {
            if !state.out_buff.is_empty() {
                self.writer.write_all(&state.out_buff)?;
                self.stats.bytes_out += state.out_buff.len() as u64;
                state.out_buff.clear();
            }
        }
        Ok(())
    }

    /// Run the encoder until it needs more input, writing full output buffers
    fn drain(&mut self, finishing: bool) -> Result<()> {
        while self.open_state()?.process(finishing)? == Progress::OutputFull {
            self.flush_output()?;
        }
        Ok(())
    }
}

impl<W: Write> CompressEngine for LzWriter<W> {
    fn start(&mut self) -> Result<()> {
        if self.stage != EncoderStage::Idle {
            return Err(MetazipError::Usage("encoder already started"));
        }
        self.state = Some(CompressState::new(self.params)?);
        self.stats = CompressionStats::default();
        self.stage = EncoderStage::Started;
        debug!("lz encoder started with {:?}", self.params);
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.stage.is_open()
    }

    fn compress(&mut self, buf: &[u8]) -> Result<()> {
        self.open_state()?;
        self.stage = EncoderStage::Compressing;

        for chunk in buf.chunks(INPUT_CHUNK_SIZE) {
            let state = self.open_state()?;
            state.lookahead.add(chunk)?;
            state.stats.bytes_in += chunk.len() as u64;
            self.drain(false)?;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.open_state()?;
        self.drain(true)?;
        self.open_state()?.emit_end();
        self.flush_output()?;
        self.writer.flush()?;

        if let Some(state) = self.state.take() {
            self.stats = CompressionStats {
                bytes_out: self.stats.bytes_out,
                ..state.stats
            };
        }
        self.stage = EncoderStage::Stopped;
        debug!(
            "lz encoder stopped: {} -> {} bytes, {} matches, {} literals",
            self.stats.bytes_in, self.stats.bytes_out, self.stats.match_count, self.stats.literal_count
        );
        Ok(())
    }
}

impl<W: Write> Write for LzWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.stage == EncoderStage::Idle {
            self.start()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        }
        self.compress(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_output()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_before_start() {
        let mut writer = LzWriter::new(Vec::new());
        assert!(matches!(
            writer.compress(b"data"),
            Err(MetazipError::Usage(_))
        ));
        assert!(matches!(writer.stop(), Err(MetazipError::Usage(_))));
    }

    #[test]
    fn test_compress_after_stop() {
        let mut writer = LzWriter::new(Vec::new());
        writer.start().unwrap();
        writer.compress(b"data").unwrap();
        writer.stop().unwrap();
        assert!(!writer.is_started());
        assert!(matches!(
            writer.compress(b"more"),
            Err(MetazipError::Usage(_))
        ));
        assert!(matches!(writer.start(), Err(MetazipError::Usage(_))));
    }

    #[test]
    fn test_stages() {
        let mut writer = LzWriter::new(Vec::new());
        assert_eq!(writer.stage(), EncoderStage::Idle);
        writer.start().unwrap();
        assert_eq!(writer.stage(), EncoderStage::Started);
        assert!(writer.is_started());
        writer.compress(b"abc").unwrap();
        assert_eq!(writer.stage(), EncoderStage::Compressing);
        writer.stop().unwrap();
        assert_eq!(writer.stage(), EncoderStage::Stopped);
    }

    #[test]
    fn test_stop_releases_session_state() {
        let mut writer = LzWriter::new(Vec::new());
        writer.write_all(b"released released released").unwrap();
        assert!(writer.state.is_some());
        writer.stop().unwrap();
        assert!(writer.state.is_none());

        let stats = writer.stats();
        assert_eq!(stats.bytes_in, 26);
        assert!(stats.match_count >= 1);
        writer.flush().unwrap();
        assert_eq!(stats.bytes_out as usize, writer.get_mut().len());
    }

    #[test]
    fn test_empty_region_is_just_end_token() {
        let output = LzWriter::new(Vec::new()).finish().unwrap();
        assert_eq!(output, vec![crate::CODE_END]);
    }

    #[test]
    fn test_chunked_writes_match_single_write() {
        let data: Vec<u8> = b"The quick brown fox jumps over the lazy dog. "
            .iter()
            .cycle()
            .take(5000)
            .copied()
            .collect();

        let mut single = LzWriter::new(Vec::new());
        single.write_all(&data).unwrap();
        let single = single.finish().unwrap();

        let mut chunked = LzWriter::new(Vec::new());
        for chunk in data.chunks(7) {
            chunked.write_all(chunk).unwrap();
        }
        let chunked = chunked.finish().unwrap();

        assert_eq!(crate::decompress::lz_decompress_bytes(&single).unwrap(), data);
        assert_eq!(crate::decompress::lz_decompress_bytes(&chunked).unwrap(), data);
    }

    #[test]
    fn test_stats() {
        let mut writer = LzWriter::new(Vec::new());
        writer.write_all(&[0x55; 600]).unwrap();
        writer.stop().unwrap();
        let stats = writer.stats();
        assert_eq!(stats.bytes_in, 600);
        assert!(stats.match_count >= 2);
        assert_eq!(stats.longest_match, 270);
        assert_eq!(stats.bytes_out as usize, writer.get_mut().len());
    }
}
