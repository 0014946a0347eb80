//! Match finding for LZ compression
//!
//! Looks for the longest earlier occurrence of the bytes at the front of the
//! lookahead. The three most recent positions are probed directly because
//! their four-byte groups are not in the hash index yet; everything older is
//! reached through the hash chain of the next four bytes.

use super::history::hash4;
use super::state::CompressState;
use crate::HASH_BYTES;

/// Best back-reference found at the current position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate {
    /// Absolute history position where the match source starts
    pub position: usize,
    /// Backward distance from the current position
    pub offset: usize,
    /// Number of matching bytes
    pub length: usize,
    /// The match ran into the end of the visible input and might grow
    pub extendible: bool,
}

impl MatchCandidate {
    /// Create a candidate that is not extendible
    pub fn new(position: usize, offset: usize, length: usize) -> Self {
        Self {
            position,
            offset,
            length,
            extendible: false,
        }
    }

    /// Create a "no match" result
    pub fn none() -> Self {
        Self::new(0, 0, 0)
    }

    /// Check if the candidate is long enough to be coded as a match
    pub fn is_match(&self, min_length: usize) -> bool {
        self.length >= min_length
    }
}

impl CompressState {
    /// Byte a match source yields at an absolute position
    ///
    /// Positions at or past the end of the window continue into the lookahead,
    /// which is what lets a match overlap the bytes it produces.
    fn source_byte(&self, position: usize) -> u8 {
        let end = self.history.end_position();
        if position < end {
            self.history.byte_at(position)
        } else {
            *self.lookahead.item(position - end)
        }
    }

    /// Count matching bytes between a source position and the lookahead
    fn match_length(&self, source: usize, limit: usize) -> usize {
        let mut length = 0;
        while length < limit && self.source_byte(source + length) == *self.lookahead.item(length)
        {
            length += 1;
        }
        length
    }

    /// Find the longest match for the front of the lookahead
    ///
    /// Candidates are visited from the smallest offset up and only a strictly
    /// longer match replaces the best so far, so equal lengths keep the
    /// closer source. A candidate shorter than the minimum is still returned
    /// when it is extendible, so the caller can wait for more input.
    pub fn find_match(&self) -> MatchCandidate {
        let available = self.lookahead.len();
        let limit = available.min(self.params.max_match_length);
        let mut best = MatchCandidate::none();
        if limit == 0 {
            return best;
        }

        let end = self.history.end_position();
        let window = self.history.len();

        for offset in 1..HASH_BYTES {
            if offset > window || best.length == limit {
                break;
            }
            let length = self.match_length(end - offset, limit);
            if length > best.length {
                best = MatchCandidate::new(end - offset, offset, length);
            }
        }

        if available >= HASH_BYTES && best.length < limit {
            let hash = hash4([
                *self.lookahead.item(0),
                *self.lookahead.item(1),
                *self.lookahead.item(2),
                *self.lookahead.item(3),
            ]);
            let oldest = self.history.start_position();

            for position in self.history.chain(hash).take(self.params.max_candidates) {
                let source = position + 1 - HASH_BYTES;
                // Chains run newest to oldest, so nothing further is in the window
                if source < oldest {
                    break;
                }

                // Cannot beat the current best unless the next byte also matches
                if best.length > 0
                    && self.source_byte(source + best.length) != *self.lookahead.item(best.length)
                {
                    continue;
                }

                let length = self.match_length(source, limit);
                if length > best.length {
                    best = MatchCandidate::new(source, end - source, length);
                    if length == limit {
                        break;
                    }
                }
            }
        }

        best.extendible = best.length > 0
            && best.length == available
            && available < self.params.max_match_length;

        if best.extendible || best.is_match(self.params.min_match_length) {
            best
        } else {
            MatchCandidate::none()
        }
    }
}
