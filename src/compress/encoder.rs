//! Token encoding for LZ compression
//!
//! Drives the match finder over the lookahead and stages literal runs and
//! match tokens in the output buffer.

use super::matcher::MatchCandidate;
use super::state::CompressState;
use crate::{
    Result, CODE_END, CODE_LITERAL_EXTENDED, CODE_LITERAL_INLINE_MAX, CODE_MATCH_BASE,
    CODE_MATCH_EXTENDED, HASH_BYTES, MATCH_INLINE_MAX, MIN_MATCH_LENGTH,
};
use log::trace;

/// Why `process` returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// The staged output should be written before continuing
    OutputFull,
    /// Everything that can be coded with the current input has been
    NeedInput,
}

impl CompressState {
    /// Code as much of the lookahead as the available input allows
    ///
    /// Unless `finishing` is set, fewer than four lookahead bytes or an
    /// extendible match leave the rest of the lookahead for the next call.
    pub fn process(&mut self, finishing: bool) -> Result<Progress> {
        while !self.lookahead.is_empty() {
            if self.output_full() {
                return Ok(Progress::OutputFull);
            }
            if !finishing && self.lookahead.len() < HASH_BYTES {
                break;
            }

            let candidate = self.find_match();
            if candidate.extendible && !finishing {
                break;
            }

            if candidate.is_match(self.params.min_match_length) {
                self.flush_literals()?;
                self.emit_match(&candidate);
                self.advance(candidate.length)?;
            } else {
                let byte = *self.lookahead.item(0);
                self.lookahead.skip(1);
                self.history.insert(byte)?;
                self.pending.push(byte)?;
                self.stats.literal_count += 1;

                if self.pending.len() >= self.params.max_literal_run {
                    self.flush_literals()?;
                }
            }
        }

        if finishing {
            self.flush_literals()?;
        }
        Ok(Progress::NeedInput)
    }

    /// Move coded bytes from the lookahead into the history window
    fn advance(&mut self, count: usize) -> Result<()> {
        for _ in 0..count {
            let byte = *self.lookahead.item(0);
            self.lookahead.skip(1);
            self.history.insert(byte)?;
        }
        Ok(())
    }

    /// Emit the pending literals, split into runs of at most `max_literal_run`
    pub fn flush_literals(&mut self) -> Result<()> {
        while !self.pending.is_empty() {
            let run = self.pending.len().min(self.params.max_literal_run);
            if run <= CODE_LITERAL_INLINE_MAX as usize {
                self.out_buff.push(run as u8);
            } else {
                self.out_buff.push(CODE_LITERAL_EXTENDED);
                self.out_buff.extend_from_slice(&(run as u16).to_le_bytes());
            }

            let from = self.out_buff.len();
            self.out_buff.resize(from + run, 0);
            self.pending.remove(&mut self.out_buff[from..]);
            trace!("literal run of {} bytes", run);
        }
        Ok(())
    }

    /// Emit a match token
    fn emit_match(&mut self, candidate: &MatchCandidate) {
        let length = candidate.length;
        if length <= MATCH_INLINE_MAX {
            self.out_buff
                .push(CODE_MATCH_BASE + (length - MIN_MATCH_LENGTH) as u8);
        } else {
            self.out_buff.push(CODE_MATCH_EXTENDED);
            self.out_buff
                .extend_from_slice(&(length as u16).to_le_bytes());
        }
        self.out_buff
            .extend_from_slice(&((candidate.offset - 1) as u16).to_le_bytes());

        self.stats.match_count += 1;
        self.stats.longest_match = self.stats.longest_match.max(length);
        trace!("match length={} offset={}", length, candidate.offset);
    }

    /// Emit the token that terminates the region
    pub fn emit_end(&mut self) {
        self.out_buff.push(CODE_END);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::preamble::PRIMING_PREAMBLE;
    use crate::LzParams;

    fn encode(data: &[u8], params: LzParams) -> Vec<u8> {
        let mut state = CompressState::new(params).unwrap();
        state.lookahead.add(data).unwrap();
        let mut tokens = Vec::new();
        while state.process(true).unwrap() == Progress::OutputFull {
            tokens.append(&mut state.out_buff);
        }
        state.emit_end();
        tokens.append(&mut state.out_buff);
        tokens
    }

    #[test]
    fn test_concrete_scenario() {
        let tokens = encode(&[1, 2, 3, 1, 2, 3, 1, 2, 3, 9], LzParams::default());
        assert_eq!(
            tokens,
            vec![
                0x03, 1, 2, 3, // literal run
                0x83, 0x02, 0x00, // match length 6, offset 3
                0x01, 9, // literal run
                0x00,
            ]
        );
    }

    #[test]
    fn test_literal_splitting() {
        let params = LzParams {
            max_literal_run: 16,
            ..LzParams::default()
        };
        let data: Vec<u8> = (0x80..0x80 + 40).collect();
        let tokens = encode(&data, params);

        // 16 + 16 + 8
        assert_eq!(tokens.len(), 3 + 40 + 1);
        assert_eq!(tokens[0], 16);
        assert_eq!(tokens[17], 16);
        assert_eq!(tokens[34], 8);
        assert_eq!(&tokens[35..43], &data[32..]);
    }

    #[test]
    fn test_extended_literal_length() {
        let data: Vec<u8> = (0..=255u8).collect();
        let tokens = encode(&data, LzParams::default());
        // Ascending bytes only repeat inside the preamble as short fragments
        assert_eq!(tokens[0], CODE_LITERAL_EXTENDED);
        let run = u16::from_le_bytes([tokens[1], tokens[2]]) as usize;
        assert!(run > CODE_LITERAL_INLINE_MAX as usize);
    }

    #[test]
    fn test_long_repeat_is_split() {
        let data = vec![0xEEu8; 1000];
        let params = LzParams::default();
        let mut state = CompressState::new(params).unwrap();
        state.lookahead.add(&data).unwrap();
        state.process(true).unwrap();
        assert!(state.stats.longest_match <= params.max_match_length);
        assert!(state.stats.match_count >= 1000 / params.max_match_length);
        assert_eq!(state.stats.literal_count, 1);
    }

    #[test]
    fn test_extendible_match_is_deferred() {
        let mut state = CompressState::new(LzParams::default()).unwrap();
        state.lookahead.add(b"abcdefgh-abcdefgh").unwrap();
        state.process(false).unwrap();
        // The second "abcdefgh" could continue with the next write
        assert_eq!(state.lookahead.len(), 8);
        assert_eq!(state.stats.match_count, 0);

        state.lookahead.add(b"-tail").unwrap();
        state.process(true).unwrap();
        assert!(state.lookahead.is_empty());
        assert_eq!(state.stats.match_count, 1);
        assert_eq!(state.stats.longest_match, 9);
    }

    #[test]
    fn test_offsets_stay_inside_window() {
        let mut data = Vec::new();
        for round in 0..3000u32 {
            data.extend_from_slice(&round.to_le_bytes());
            data.extend_from_slice(b"pattern");
        }
        let tokens = encode(&data, LzParams::default());

        let mut pos = 0;
        let mut produced = PRIMING_PREAMBLE.len();
        while tokens[pos] != CODE_END {
            let code = tokens[pos];
            pos += 1;
            match code {
                0x01..=0x7E => {
                    pos += code as usize;
                    produced += code as usize;
                }
                0x7F => {
                    let run = u16::from_le_bytes([tokens[pos], tokens[pos + 1]]) as usize;
                    pos += 2 + run;
                    produced += run;
                }
                _ => {
                    let length = if code == CODE_MATCH_EXTENDED {
                        pos += 2;
                        u16::from_le_bytes([tokens[pos - 2], tokens[pos - 1]]) as usize
                    } else {
                        (code - CODE_MATCH_BASE) as usize + MIN_MATCH_LENGTH
                    };
                    let offset = u16::from_le_bytes([tokens[pos], tokens[pos + 1]]) as usize + 1;
                    assert!(offset <= produced.min(crate::WINDOW_SIZE));
                    pos += 2;
                    produced += length;
                }
            }
        }
        assert_eq!(pos, tokens.len() - 1);
        assert_eq!(produced, PRIMING_PREAMBLE.len() + data.len());
    }
}
