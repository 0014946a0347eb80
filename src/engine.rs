//! Engine abstraction
//!
//! Both codecs implement the same start/compress/stop and
//! start/decompress lifecycles. `StreamWriter` and `StreamReader` frame a
//! region with the one-byte engine marker and dispatch to the selected codec.

use crate::compress::{EncoderStage, LzWriter};
use crate::decompress::LzReader;
use crate::deflate::{DeflateReader, DeflateWriter};
use crate::{CompressionStats, LzParams, MetazipError, Result};
use flate2::Compression;
use log::debug;
use std::fmt;
use std::io::{ErrorKind, Read, Write};

/// Marker byte of a region coded with the LZ engine
pub const MARKER_LZ: u8 = b'L';

/// Marker byte of a region coded with the DEFLATE engine
pub const MARKER_DEFLATE: u8 = b'D';

/// Compression side of an engine
pub trait CompressEngine {
    /// Begin a new compressed region
    fn start(&mut self) -> Result<()>;

    /// Whether a region is open for data
    fn is_started(&self) -> bool;

    /// Compress all of `buf`; output reaches the sink as buffers fill
    fn compress(&mut self, buf: &[u8]) -> Result<()>;

    /// Code all remaining input, terminate the region and flush the sink
    fn stop(&mut self) -> Result<()>;
}

/// Decompression side of an engine
pub trait DecompressEngine {
    /// Prepare to decode a region
    fn start(&mut self) -> Result<()>;

    /// Whether `start` has been called
    fn is_started(&self) -> bool;

    /// Decode up to `buf.len()` bytes
    ///
    /// Returns 0 once the region has ended. An empty `buf` also returns 0
    /// without reading anything, so it says nothing about the region.
    fn decompress(&mut self, buf: &mut [u8]) -> Result<usize>;
}

/// Available codecs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// The hash-chained LZ77 codec
    #[default]
    Lz,
    /// zlib-framed DEFLATE
    Deflate,
}

impl EngineKind {
    /// Marker byte that opens a region coded with this engine
    pub fn marker(self) -> u8 {
        match self {
            EngineKind::Lz => MARKER_LZ,
            EngineKind::Deflate => MARKER_DEFLATE,
        }
    }

    /// Engine named by a region's marker byte
    pub fn from_marker(marker: u8) -> Result<Self> {
        match marker {
            MARKER_LZ => Ok(EngineKind::Lz),
            MARKER_DEFLATE => Ok(EngineKind::Deflate),
            other => Err(MetazipError::UnknownEngine(other)),
        }
    }
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineKind::Lz => write!(f, "lz"),
            EngineKind::Deflate => write!(f, "deflate"),
        }
    }
}

#[derive(Debug)]
enum WriterEngine<W: Write> {
    Lz(LzWriter<W>),
    Deflate(DeflateWriter<W>),
}

/// Streaming writer that prefixes the region with its engine marker
#[derive(Debug)]
pub struct StreamWriter<W: Write> {
    engine: WriterEngine<W>,
    marked: bool,
}

impl<W: Write> StreamWriter<W> {
    /// Create a writer for the given engine with default tuning
    pub fn new(writer: W, kind: EngineKind) -> Self {
        let engine = match kind {
            EngineKind::Lz => WriterEngine::Lz(LzWriter::new(writer)),
            EngineKind::Deflate => WriterEngine::Deflate(DeflateWriter::new(writer)),
        };
        Self {
            engine,
            marked: false,
        }
    }

    /// Create an LZ writer with custom match parameters
    pub fn with_lz_params(writer: W, params: LzParams) -> Result<Self> {
        Ok(Self {
            engine: WriterEngine::Lz(LzWriter::with_params(writer, params)?),
            marked: false,
        })
    }

    /// Create a DEFLATE writer at the given level
    pub fn with_deflate_level(writer: W, level: Compression) -> Self {
        Self {
            engine: WriterEngine::Deflate(DeflateWriter::with_level(writer, level)),
            marked: false,
        }
    }

    /// Engine selected for this stream
    pub fn kind(&self) -> EngineKind {
        match self.engine {
            WriterEngine::Lz(_) => EngineKind::Lz,
            WriterEngine::Deflate(_) => EngineKind::Deflate,
        }
    }

    /// Current lifecycle stage
    pub fn stage(&self) -> EncoderStage {
        match &self.engine {
            WriterEngine::Lz(w) => w.stage(),
            WriterEngine::Deflate(w) => w.stage(),
        }
    }

    /// Statistics of the engine, excluding the marker byte
    pub fn stats(&self) -> CompressionStats {
        match &self.engine {
            WriterEngine::Lz(w) => w.stats(),
            WriterEngine::Deflate(w) => w.stats(),
        }
    }

    /// Stop the session if it is open and return the sink
    pub fn finish(mut self) -> Result<W> {
        if self.stage() == EncoderStage::Idle {
            self.start()?;
        }
        match self.engine {
            WriterEngine::Lz(w) => w.finish(),
            WriterEngine::Deflate(w) => w.finish(),
        }
    }
}

impl<W: Write> CompressEngine for StreamWriter<W> {
    fn start(&mut self) -> Result<()> {
        if self.stage() != EncoderStage::Idle {
            return Err(MetazipError::Usage("encoder already started"));
        }

        // The marker goes out exactly once, before the engine opens
        if !self.marked {
            let marker = self.kind().marker();
            match &mut self.engine {
                WriterEngine::Lz(w) => w.get_mut().write_all(&[marker])?,
                WriterEngine::Deflate(w) => w.get_mut().write_all(&[marker])?,
            }
            self.marked = true;
        }

        match &mut self.engine {
            WriterEngine::Lz(w) => w.start(),
            WriterEngine::Deflate(w) => w.start(),
        }
    }

    fn is_started(&self) -> bool {
        self.stage().is_open()
    }

    fn compress(&mut self, buf: &[u8]) -> Result<()> {
        match &mut self.engine {
            WriterEngine::Lz(w) => w.compress(buf),
            WriterEngine::Deflate(w) => w.compress(buf),
        }
    }

    fn stop(&mut self) -> Result<()> {
        match &mut self.engine {
            WriterEngine::Lz(w) => w.stop(),
            WriterEngine::Deflate(w) => w.stop(),
        }
    }
}

impl<W: Write> Write for StreamWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if self.stage() == EncoderStage::Idle {
            self.start()
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        }
        self.compress(buf)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.engine {
            WriterEngine::Lz(w) => w.flush(),
            WriterEngine::Deflate(w) => w.flush(),
        }
    }
}

#[derive(Debug)]
enum ReaderEngine<R: Read> {
    Unopened(R),
    Lz(LzReader<R>),
    Deflate(DeflateReader<R>),
    /// The marker could not be read or named no engine
    Rejected(R),
    /// Transient placeholder while `start` owns the source
    Taken,
}

/// Streaming reader that selects the engine from the region's marker byte
#[derive(Debug)]
pub struct StreamReader<R: Read> {
    engine: ReaderEngine<R>,
}

impl<R: Read> StreamReader<R> {
    /// Create a reader; the marker is consumed on `start`
    pub fn new(reader: R) -> Self {
        Self {
            engine: ReaderEngine::Unopened(reader),
        }
    }

    /// Engine named by the marker, once it has been read
    pub fn kind(&self) -> Option<EngineKind> {
        match self.engine {
            ReaderEngine::Lz(_) => Some(EngineKind::Lz),
            ReaderEngine::Deflate(_) => Some(EngineKind::Deflate),
            _ => None,
        }
    }

    /// Statistics of the engine, excluding the marker byte
    pub fn stats(&self) -> CompressionStats {
        match &self.engine {
            ReaderEngine::Lz(r) => r.stats(),
            ReaderEngine::Deflate(r) => r.stats(),
            _ => CompressionStats::default(),
        }
    }

    /// Bytes read from the source past the end of the region
    pub fn unconsumed(&self) -> &[u8] {
        match &self.engine {
            ReaderEngine::Lz(r) => r.unconsumed(),
            ReaderEngine::Deflate(r) => r.unconsumed(),
            _ => &[],
        }
    }

    /// Whether the end of the region has been decoded
    pub fn is_finished(&self) -> bool {
        match &self.engine {
            ReaderEngine::Lz(r) => r.is_finished(),
            ReaderEngine::Deflate(r) => r.is_finished(),
            _ => false,
        }
    }

    /// Return the underlying source
    ///
    /// Bytes already buffered past the end of the region are only available
    /// through `unconsumed`; read them before the rest of the source.
    /// `None` only if a panic unwound out of `start` while it held the source.
    pub fn into_inner(self) -> Option<R> {
        match self.engine {
            ReaderEngine::Unopened(reader) | ReaderEngine::Rejected(reader) => Some(reader),
            ReaderEngine::Lz(r) => Some(r.into_inner()),
            ReaderEngine::Deflate(r) => Some(r.into_inner()),
            ReaderEngine::Taken => None,
        }
    }
}

fn read_marker<R: Read>(reader: &mut R) -> Result<u8> {
    let mut marker = [0u8; 1];
    match reader.read_exact(&mut marker) {
        Ok(()) => Ok(marker[0]),
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => Err(MetazipError::UnexpectedEof),
        Err(e) => Err(e.into()),
    }
}

impl<R: Read> DecompressEngine for StreamReader<R> {
    fn start(&mut self) -> Result<()> {
        let mut reader = match std::mem::replace(&mut self.engine, ReaderEngine::Taken) {
            ReaderEngine::Unopened(reader) => reader,
            ReaderEngine::Rejected(reader) => {
                self.engine = ReaderEngine::Rejected(reader);
                return Err(MetazipError::Usage("stream marker could not be read"));
            }
            started => {
                self.engine = started;
                return Err(MetazipError::Usage("decoder already started"));
            }
        };

        let kind = match read_marker(&mut reader).and_then(EngineKind::from_marker) {
            Ok(kind) => kind,
            Err(error) => {
                self.engine = ReaderEngine::Rejected(reader);
                return Err(error);
            }
        };
        debug!("stream marker selects the {} engine", kind);

        self.engine = match kind {
            EngineKind::Lz => ReaderEngine::Lz(LzReader::new(reader)),
            EngineKind::Deflate => ReaderEngine::Deflate(DeflateReader::new(reader)),
        };
        match &mut self.engine {
            ReaderEngine::Lz(r) => r.start(),
            ReaderEngine::Deflate(r) => r.start(),
            _ => Ok(()),
        }
    }

    fn is_started(&self) -> bool {
        match &self.engine {
            ReaderEngine::Lz(r) => r.is_started(),
            ReaderEngine::Deflate(r) => r.is_started(),
            _ => false,
        }
    }

    fn decompress(&mut self, buf: &mut [u8]) -> Result<usize> {
        match &mut self.engine {
            ReaderEngine::Lz(r) => r.decompress(buf),
            ReaderEngine::Deflate(r) => r.decompress(buf),
            ReaderEngine::Unopened(_) => Err(MetazipError::Usage("decompress called before start")),
            ReaderEngine::Rejected(_) | ReaderEngine::Taken => {
                Err(MetazipError::Usage("stream marker could not be read"))
            }
        }
    }
}

impl<R: Read> Read for StreamReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if matches!(self.engine, ReaderEngine::Unopened(_)) {
            self.start()
                .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))?;
        }
        if buf.is_empty() {
            return Ok(0);
        }
        self.decompress(buf)
            .map_err(|e| std::io::Error::new(ErrorKind::InvalidData, e))
    }
}
