//! Token decoding for LZ decompression
//!
//! Advances the `DecodeStage` machine one token field at a time, refilling
//! the input buffer from the source whenever it runs dry.

use super::state::{remember, DecodeStage, DecompressState};
use crate::{
    MetazipError, Result, CODE_END, CODE_LITERAL_EXTENDED, CODE_LITERAL_INLINE_MAX,
    CODE_MATCH_BASE, CODE_MATCH_EXTENDED, MIN_MATCH_LENGTH, WINDOW_SIZE,
};
use log::{debug, trace, warn};
use std::io::{ErrorKind, Read};

impl DecompressState {
    /// Refill the input buffer; `false` means the source is exhausted
    fn fill<R: Read>(&mut self, reader: &mut R) -> Result<bool> {
        loop {
            match reader.read(&mut self.in_buff) {
                Ok(count) => {
                    self.in_pos = 0;
                    self.in_bytes = count;
                    self.stats.bytes_out += count as u64;
                    return Ok(count > 0);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Next compressed byte, or `None` at the end of the source
    fn next_byte<R: Read>(&mut self, reader: &mut R) -> Result<Option<u8>> {
        if self.in_pos >= self.in_bytes && !self.fill(reader)? {
            return Ok(None);
        }
        let byte = self.in_buff[self.in_pos];
        self.in_pos += 1;
        Ok(Some(byte))
    }

    /// Next byte of a token that must not be cut short
    fn token_byte<R: Read>(&mut self, reader: &mut R) -> Result<u8> {
        match self.next_byte(reader)? {
            Some(byte) => Ok(byte),
            None => Err(MetazipError::UnexpectedEof),
        }
    }

    /// Mark the stream as unreadable and report why
    fn fail<T>(&mut self, error: MetazipError) -> Result<T> {
        warn!("lz stream rejected: {}", error);
        self.stage = DecodeStage::Failed;
        Err(error)
    }

    /// Decode up to `out.len()` bytes; returns 0 once the region has ended
    ///
    /// An empty `out` also returns 0 without touching the stream. If the
    /// source fails after some bytes were decoded, those bytes are returned
    /// and the error is left for the next call to run into.
    pub fn decode<R: Read>(&mut self, reader: &mut R, out: &mut [u8]) -> Result<usize> {
        let mut written = 0;
        let outcome = self.decode_into(reader, out, &mut written);
        self.stats.bytes_in += written as u64;

        match outcome {
            Ok(()) => Ok(written),
            Err(error) if error.is_corruption() => self.fail(error),
            Err(error) if written > 0 => {
                debug!("returning {} decoded bytes before error: {}", written, error);
                Ok(written)
            }
            Err(error) => Err(error),
        }
    }

    /// Advance the stage machine, counting delivered bytes in `written`
    ///
    /// Every byte counted in `written` has been consumed from the input and
    /// recorded in the recall buffer, even when an error is returned.
    fn decode_into<R: Read>(
        &mut self,
        reader: &mut R,
        out: &mut [u8],
        written: &mut usize,
    ) -> Result<()> {
        while *written < out.len() {
            self.stage = match self.stage {
                DecodeStage::Finished => break,

                DecodeStage::Failed => {
                    return Err(MetazipError::CorruptStream(
                        "stream was already reported corrupt".to_string(),
                    ))
                }

                DecodeStage::CompressionCode => {
                    let code = self.token_byte(reader)?;
                    match code {
                        CODE_END => {
                            trace!("end of region");
                            DecodeStage::Finished
                        }
                        1..=CODE_LITERAL_INLINE_MAX => DecodeStage::LiteralData {
                            remaining: code as usize,
                        },
                        CODE_LITERAL_EXTENDED => DecodeStage::ExtendedLiteralLength {
                            bytes_read: 0,
                            partial: 0,
                        },
                        CODE_MATCH_EXTENDED => DecodeStage::ExtendedCompressionLength {
                            bytes_read: 0,
                            partial: 0,
                        },
                        _ => DecodeStage::FirstOffsetByte {
                            length: (code - CODE_MATCH_BASE) as usize + MIN_MATCH_LENGTH,
                        },
                    }
                }

                DecodeStage::ExtendedLiteralLength {
                    bytes_read,
                    partial,
                } => {
                    let byte = self.token_byte(reader)?;
                    if bytes_read == 0 {
                        DecodeStage::ExtendedLiteralLength {
                            bytes_read: 1,
                            partial: byte as u16,
                        }
                    } else {
                        let length = partial | (byte as u16) << 8;
                        if length == 0 {
                            return Err(MetazipError::CorruptStream(
                                "empty literal run".to_string(),
                            ));
                        }
                        DecodeStage::LiteralData {
                            remaining: length as usize,
                        }
                    }
                }

                DecodeStage::LiteralData { remaining } => {
                    if self.in_pos >= self.in_bytes && !self.fill(reader)? {
                        return Err(MetazipError::UnexpectedEof);
                    }

                    let count = remaining
                        .min(out.len() - *written)
                        .min(self.in_bytes - self.in_pos);
                    let bytes = &self.in_buff[self.in_pos..self.in_pos + count];
                    remember(&mut self.recall, bytes)?;
                    out[*written..*written + count].copy_from_slice(bytes);

                    self.in_pos += count;
                    *written += count;
                    self.stats.literal_count += count;

                    if remaining == count {
                        DecodeStage::CompressionCode
                    } else {
                        DecodeStage::LiteralData {
                            remaining: remaining - count,
                        }
                    }
                }

                DecodeStage::ExtendedCompressionLength {
                    bytes_read,
                    partial,
                } => {
                    let byte = self.token_byte(reader)?;
                    if bytes_read == 0 {
                        DecodeStage::ExtendedCompressionLength {
                            bytes_read: 1,
                            partial: byte as u16,
                        }
                    } else {
                        let length = (partial | (byte as u16) << 8) as usize;
                        if length < MIN_MATCH_LENGTH {
                            return Err(MetazipError::CorruptStream(format!(
                                "match length {} below minimum {}",
                                length, MIN_MATCH_LENGTH
                            )));
                        }
                        DecodeStage::FirstOffsetByte { length }
                    }
                }

                DecodeStage::FirstOffsetByte { length } => {
                    let low = self.token_byte(reader)?;
                    DecodeStage::SecondOffsetByte { length, low }
                }

                DecodeStage::SecondOffsetByte { length, low } => {
                    let high = self.token_byte(reader)?;
                    let offset = u16::from_le_bytes([low, high]) as usize + 1;

                    // Never reach before the start of the primed window
                    if offset > self.recall.len() {
                        return Err(MetazipError::InvalidOffset {
                            offset,
                            available: self.recall.len(),
                        });
                    }

                    self.stats.match_count += 1;
                    self.stats.longest_match = self.stats.longest_match.max(length);
                    trace!("match length={} offset={}", length, offset);
                    DecodeStage::RecallCopy {
                        remaining: length,
                        offset,
                    }
                }

                DecodeStage::RecallCopy { remaining, offset } => {
                    let count = remaining.min(out.len() - *written);

                    // One byte at a time: the source may overlap what is being produced
                    for copied in 0..count {
                        let byte = *self.recall.item(self.recall.len() - offset);
                        if self.recall.len() == WINDOW_SIZE {
                            self.recall.skip(1);
                        }
                        if let Err(error) = self.recall.push(byte) {
                            self.stage = DecodeStage::RecallCopy {
                                remaining: remaining - copied,
                                offset,
                            };
                            return Err(error);
                        }
                        out[*written] = byte;
                        *written += 1;
                    }

                    if remaining == count {
                        DecodeStage::CompressionCode
                    } else {
                        DecodeStage::RecallCopy {
                            remaining: remaining - count,
                            offset,
                        }
                    }
                }
            };
        }

        Ok(())
    }
}
