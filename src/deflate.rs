//! DEFLATE engine
//!
//! Streams data through flate2's incremental zlib codec behind the same
//! lifecycle as the LZ engine. The payload is a complete zlib stream.

use crate::compress::EncoderStage;
use crate::engine::{CompressEngine, DecompressEngine};
use crate::{CompressionStats, MetazipError, Result};
use flate2::{Compress, Compression, Decompress, FlushCompress, FlushDecompress, Status};
use log::{debug, warn};
use std::io::{ErrorKind, Read, Write};

/// Size of the compressed staging buffer (4096 bytes)
pub const DEFLATE_STAGING_SIZE: usize = 0x1000;

/// Size of the compressed input buffer (2048 bytes)
pub const DEFLATE_IN_BUFF_SIZE: usize = 0x800;

/// Streaming DEFLATE writer implementing Write trait
pub struct DeflateWriter<W: Write> {
    writer: W,
    level: Compression,
    compressor: Option<Compress>,
    staging: [u8; DEFLATE_STAGING_SIZE],
    staged: usize,
    stage: EncoderStage,
    stats: CompressionStats,
}

impl<W: Write> std::fmt::Debug for DeflateWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateWriter")
            .field("level", &self.level)
            .field("staged", &self.staged)
            .field("stage", &self.stage)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<W: Write> DeflateWriter<W> {
    /// Create a new DeflateWriter at the default level
    pub fn new(writer: W) -> Self {
        Self::with_level(writer, Compression::default())
    }

    /// Create a new DeflateWriter at the given level
    pub fn with_level(writer: W, level: Compression) -> Self {
        Self {
            writer,
            level,
            compressor: None,
            staging: [0; DEFLATE_STAGING_SIZE],
            staged: 0,
            stage: EncoderStage::Idle,
            stats: CompressionStats::default(),
        }
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> EncoderStage {
        self.stage
    }

    /// Statistics of the current or last session
    pub fn stats(&self) -> CompressionStats {
        self.stats.clone()
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

    fn check_open(&self) -> Result<()> {
        if self.stage.is_open() {
            Ok(())
        } else {
            Err(MetazipError::Usage(match self.stage {
                EncoderStage::Stopped => "compress called after stop",
                _ => "compress called before start",
            }))
        }
    }

    /// Write the staging buffer to the sink
    fn flush_staging(&mut self) -> Result<()> {
        if self.staged > 0 {
            self.writer.write_all(&self.staging[..self.staged])?;
            self.stats.bytes_out += self.staged as u64;
            self.staged = 0;
        }
        Ok(())
    }

    /// Run the compressor once into the free part of the staging buffer
    ///
    /// Returns the number of input bytes consumed, output bytes produced and
    /// the compressor status.
    fn deflate_step(&mut self, input: &[u8], flush: FlushCompress) -> Result<(usize, usize, Status)> {
        if self.staged == DEFLATE_STAGING_SIZE {
            self.flush_staging()?;
        }

        let compressor = self
            .compressor
            .as_mut()
            .ok_or_else(|| MetazipError::Internal("open encoder without compressor".to_string()))?;
        let before_in = compressor.total_in();
        let before_out = compressor.total_out();

        let status = compressor
            .compress(input, &mut self.staging[self.staged..], flush)
            .map_err(|e| MetazipError::Internal(e.to_string()))?;

        let consumed = (compressor.total_in() - before_in) as usize;
        let produced = (compressor.total_out() - before_out) as usize;
        self.staged += produced;
        Ok((consumed, produced, status))
    }
}

impl<W: Write> CompressEngine for DeflateWriter<W> {
    fn start(&mut self) -> Result<()> {
        if self.stage != EncoderStage::Idle {
            return Err(MetazipError::Usage("encoder already started"));
        }
        self.compressor = Some(Compress::new(self.level, true));
        self.stats = CompressionStats::default();
        self.stage = EncoderStage::Started;
        debug!("deflate encoder started at level {}", self.level.level());
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.stage.is_open()
    }

    fn compress(&mut self, buf: &[u8]) -> Result<()> {
        self.check_open()?;
        self.stage = EncoderStage::Compressing;

        let mut input = buf;
        while !input.is_empty() {
            let (consumed, produced, _) = self.deflate_step(input, FlushCompress::None)?;
            input = &input[consumed..];

            if consumed == 0 && produced == 0 {
                if self.staged == 0 {
                    return Err(MetazipError::Internal(
                        "deflate encoder stalled".to_string(),
                    ));
                }
                self.flush_staging()?;
            }
        }

        self.stats.bytes_in += buf.len() as u64;
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        self.check_open()?;

        loop {
            let (_, produced, status) = self.deflate_step(&[], FlushCompress::Finish)?;
            if status == Status::StreamEnd {
                break;
            }
            if produced == 0 {
                if self.staged == 0 {
                    return Err(MetazipError::Internal(
                        "deflate encoder stalled while finishing".to_string(),
                    ));
                }
                self.flush_staging()?;
            }
        }

        self.flush_staging()?;
        self.writer.flush()?;
        self.compressor = None;
        self.stage = EncoderStage::Stopped;
        debug!(
            "deflate encoder stopped: {} -> {} bytes",
            self.stats.bytes_in, self.stats.bytes_out
        );
        Ok(())
    }
}

impl<W: Write> Write for DeflateWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.stage == EncoderStage::Idle {
            self.start()
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        }
        self.compress(buf)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_staging()
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        self.writer.flush()
    }
}

/// Streaming DEFLATE reader implementing Read trait
pub struct DeflateReader<R: Read> {
    reader: R,
    decompressor: Option<Decompress>,
    in_buff: [u8; DEFLATE_IN_BUFF_SIZE],
    in_pos: usize,
    in_bytes: usize,
    source_done: bool,
    finished: bool,
    failed: bool,
    stats: CompressionStats,
}

impl<R: Read> std::fmt::Debug for DeflateReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeflateReader")
            .field("in_pos", &self.in_pos)
            .field("in_bytes", &self.in_bytes)
            .field("finished", &self.finished)
            .field("failed", &self.failed)
            .field("stats", &self.stats)
            .finish()
    }
}

impl<R: Read> DeflateReader<R> {
    /// Create a new DeflateReader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decompressor: None,
            in_buff: [0; DEFLATE_IN_BUFF_SIZE],
            in_pos: 0,
            in_bytes: 0,
            source_done: false,
            finished: false,
            failed: false,
            stats: CompressionStats::default(),
        }
    }

    /// Bytes read from the source past the end of the zlib stream
    pub fn unconsumed(&self) -> &[u8] {
        &self.in_buff[self.in_pos..self.in_bytes]
    }

    /// Statistics of the session so far
    pub fn stats(&self) -> CompressionStats {
        self.stats.clone()
    }

    /// Whether the end of the zlib stream has been reached
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Return the underlying source
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn fill(&mut self) -> Result<()> {
        loop {
            match self.reader.read(&mut self.in_buff) {
                Ok(count) => {
                    self.in_pos = 0;
                    self.in_bytes = count;
                    self.source_done = count == 0;
                    self.stats.bytes_out += count as u64;
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn fail<T>(&mut self, error: MetazipError) -> Result<T> {
        warn!("deflate stream rejected: {}", error);
        self.failed = true;
        Err(error)
    }

    fn inflate(&mut self, out: &mut [u8]) -> Result<usize> {
        loop {
            if self.in_pos == self.in_bytes && !self.source_done {
                self.fill()?;
            }
            let flush = if self.source_done {
                FlushDecompress::Finish
            } else {
                FlushDecompress::None
            };

            let decompressor = self
                .decompressor
                .as_mut()
                .ok_or(MetazipError::Usage("decompress called before start"))?;
            let before_in = decompressor.total_in();
            let before_out = decompressor.total_out();

            let status = decompressor
                .decompress(&self.in_buff[self.in_pos..self.in_bytes], out, flush)
                .map_err(|e| MetazipError::CorruptStream(e.to_string()))?;

            let consumed = (decompressor.total_in() - before_in) as usize;
            let produced = (decompressor.total_out() - before_out) as usize;
            self.in_pos += consumed;
            self.stats.bytes_in += produced as u64;

            if status == Status::StreamEnd {
                self.finished = true;
                debug!(
                    "deflate decoder finished: {} -> {} bytes",
                    self.stats.bytes_out, self.stats.bytes_in
                );
                return Ok(produced);
            }
            if produced > 0 {
                return Ok(produced);
            }
            if consumed == 0 {
                if self.source_done {
                    return Err(MetazipError::UnexpectedEof);
                }
                if self.in_pos < self.in_bytes {
                    return Err(MetazipError::CorruptStream(
                        "deflate decoder made no progress".to_string(),
                    ));
                }
            }
        }
    }
}

impl<R: Read> DecompressEngine for DeflateReader<R> {
    fn start(&mut self) -> Result<()> {
        if self.decompressor.is_some() {
            return Err(MetazipError::Usage("decoder already started"));
        }
        self.decompressor = Some(Decompress::new(true));
        debug!("deflate decoder started");
        Ok(())
    }

    fn is_started(&self) -> bool {
        self.decompressor.is_some()
    }

    fn decompress(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.decompressor.is_none() {
            return Err(MetazipError::Usage("decompress called before start"));
        }
        if self.failed {
            return Err(MetazipError::CorruptStream(
                "stream was already reported corrupt".to_string(),
            ));
        }
        if self.finished || buf.is_empty() {
            return Ok(0);
        }

        match self.inflate(buf) {
            Err(error) if error.is_corruption() => self.fail(error),
            other => other,
        }
    }
}

impl<R: Read> Read for DeflateReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.decompressor.is_none() {
            self.start()
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        }
        self.decompress(buf)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }
}
