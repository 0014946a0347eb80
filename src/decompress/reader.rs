//! LzReader - Streaming LZ decompression reader
//!
//! This module wraps `DecompressState` in the `DecompressEngine` lifecycle and
//! provides a Read interface over one compressed region.

use super::state::DecompressState;
use crate::engine::DecompressEngine;
use crate::{CompressionStats, MetazipError, Result};
use log::debug;
use std::io::Read;

/// Streaming decompression reader implementing Read trait
#[derive(Debug)]
pub struct LzReader<R: Read> {
    reader: R,
    state: Option<DecompressState>,
    reported: bool,
}

impl<R: Read> LzReader<R> {
    /// Create a new LzReader; the recall buffer is primed on `start`
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            state: None,
            reported: false,
        }
    }

    /// Bytes read from the source past the end-of-region token
    pub fn unconsumed(&self) -> &[u8] {
        match &self.state {
            Some(state) => state.unconsumed(),
            None => &[],
        }
    }

    /// Statistics of the session so far
    ///
    /// `bytes_in` counts decoded bytes and `bytes_out` compressed bytes read.
    pub fn stats(&self) -> CompressionStats {
        self.state
            .as_ref()
            .map(|state| state.stats.clone())
            .unwrap_or_default()
    }

    /// Whether the end-of-region token has been decoded
    pub fn is_finished(&self) -> bool {
        self.state.as_ref().is_some_and(DecompressState::is_finished)
    }

    /// Return the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }
}

impl<R: Read> DecompressEngine for LzReader<R> {
    fn start(&mut self) -> Result<()> {
        if self.state.is_some() {
            return Err(MetazipError::Usage("decoder already started"));
        }
        self.state = Some(DecompressState::new()?);
        debug!("lz decoder started");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.state.is_some()
    }

    fn decompress(&mut self, buf: &mut [u8]) -> Result<usize> {
        let state = self
            .state
            .as_mut()
            .ok_or(MetazipError::Usage("decompress called before start"))?;

        let count = state.decode(&mut self.reader, buf)?;
        if count == 0 && state.is_finished() && !self.reported {
            self.reported = true;
            debug!(
                "lz decoder finished: {} -> {} bytes, {} matches, {} literals",
                state.stats.bytes_out,
                state.stats.bytes_in,
                state.stats.match_count,
                state.stats.literal_count
            );
        }
        Ok(count)
    }
}

impl<R: Read> Read for LzReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if self.state.is_none() {
            self.start()
                .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        }
        self.decompress(buf)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_decompress_before_start() {
        let mut reader = LzReader::new(Cursor::new(vec![0x00]));
        let mut buf = [0u8; 4];
        assert!(matches!(
            reader.decompress(&mut buf),
            Err(MetazipError::Usage(_))
        ));
        assert!(!reader.is_started());
    }

    #[test]
    fn test_double_start() {
        let mut reader = LzReader::new(Cursor::new(vec![0x00]));
        reader.start().unwrap();
        assert!(matches!(reader.start(), Err(MetazipError::Usage(_))));
    }

    #[test]
    fn test_read_to_end() {
        let tokens = vec![0x03, 1, 2, 3, 0x83, 0x02, 0x00, 0x01, 9, 0x00];
        let mut reader = LzReader::new(Cursor::new(tokens));
        let mut output = Vec::new();
        reader.read_to_end(&mut output).unwrap();
        assert_eq!(output, vec![1, 2, 3, 1, 2, 3, 1, 2, 3, 9]);
        assert!(reader.is_finished());

        let stats = reader.stats();
        assert_eq!(stats.bytes_in, 10);
        assert_eq!(stats.bytes_out, 10);
        assert_eq!(stats.match_count, 1);
        assert_eq!(stats.literal_count, 4);
    }

    #[test]
    fn test_finished_region_keeps_returning_zero() {
        let mut reader = LzReader::new(Cursor::new(vec![0x01, 0x41, 0x00, 0x42]));
        reader.start().unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(reader.decompress(&mut buf).unwrap(), 1);
        assert_eq!(reader.decompress(&mut buf).unwrap(), 0);
        assert_eq!(reader.decompress(&mut buf).unwrap(), 0);
        assert_eq!(reader.unconsumed(), &[0x42]);
    }

    #[test]
    fn test_corruption_maps_to_invalid_data() {
        let mut reader = LzReader::new(Cursor::new(vec![0x80, 0xFF, 0xFF, 0x00]));
        let mut output = Vec::new();
        let err = reader.read_to_end(&mut output).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::InvalidData);
    }
}
