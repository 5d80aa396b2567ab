//! Byte-stream codec that cuts a TCP stream into sentences.
//!
//! Devices end each sentence with `#`, usually followed by a literal `<LF>`
//! token or a real line break. Those trailers are skipped before the next
//! sentence. Bytes ahead of the last `*` before a `#` are noise and dropped.

use bytes::{Buf, BytesMut};
use thiserror::Error;

/// Default maximum sentence length in bytes.
pub const DEFAULT_MAX_SENTENCE_LEN: usize = 1024;

/// Terminator token some devices send as text.
const LF_TOKEN: &[u8] = b"<LF>";

/// A sentence exceeded the configured maximum length and was discarded.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("sentence too long: maximum {max} bytes, got {len}")]
pub struct Oversized {
    /// Bytes discarded.
    pub len: usize,
    /// Maximum allowed length.
    pub max: usize,
}

/// Accumulates received bytes and yields complete sentences.
#[derive(Debug)]
pub struct SentenceCodec {
    buffer: BytesMut,
    max_len: usize,
}

impl Default for SentenceCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SENTENCE_LEN)
    }
}

impl SentenceCodec {
    /// Create a codec that rejects sentences longer than `max_len`.
    pub fn new(max_len: usize) -> Self {
        SentenceCodec {
            buffer: BytesMut::with_capacity(max_len),
            max_len,
        }
    }

    /// Add received data to the buffer.
    pub fn push(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Try to decode the next complete sentence, `#` included.
    ///
    /// Returns `Ok(None)` when more data is needed. An oversized sentence is
    /// discarded and reported once; decoding resumes after it.
    pub fn decode_sentence(&mut self) -> Result<Option<String>, Oversized> {
        self.skip_trailers();

        let Some(end) = self.buffer.iter().position(|&b| b == b'#') else {
            if self.buffer.len() > self.max_len {
                return Err(self.resync());
            }
            return Ok(None);
        };

        let frame = self.buffer.split_to(end + 1);
        let start = frame.iter().rposition(|&b| b == b'*').unwrap_or(0);
        let sentence = &frame[start..];
        if sentence.len() > self.max_len {
            return Err(Oversized {
                len: sentence.len(),
                max: self.max_len,
            });
        }
        Ok(Some(String::from_utf8_lossy(sentence).into_owned()))
    }

    /// Discard unterminated data, keeping a trailing frame start that still fits.
    fn resync(&mut self) -> Oversized {
        let len = self.buffer.len();
        match self.buffer.iter().rposition(|&b| b == b'*') {
            Some(start) if start > 0 && len - start <= self.max_len => {
                self.buffer.advance(start);
                Oversized { len: start, max: self.max_len }
            }
            _ => {
                self.buffer.clear();
                Oversized { len, max: self.max_len }
            }
        }
    }

    /// Drop line breaks, spaces and `<LF>` tokens left after the last sentence.
    fn skip_trailers(&mut self) {
        loop {
            if self.buffer.starts_with(LF_TOKEN) {
                self.buffer.advance(LF_TOKEN.len());
            } else if matches!(self.buffer.first(), Some(b'\r' | b'\n' | b' ')) {
                self.buffer.advance(1);
            } else {
                break;
            }
        }
    }

    /// Get the number of buffered bytes.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_single_sentence() {
        let mut codec = SentenceCodec::default();
        codec.push(b"*CMDR,OM,1,0,Q0,412,80#<LF>\r\n");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,OM,1,0,Q0,412,80#".to_string())
        );
        assert_eq!(codec.decode_sentence().unwrap(), None);
        assert_eq!(codec.buffered_len(), 0);
    }

    #[test]
    fn test_partial_sentence() {
        let mut codec = SentenceCodec::default();
        codec.push(b"\xff*CMDR,OM,1,0,");
        assert_eq!(codec.decode_sentence().unwrap(), None);

        codec.push(b"W0,3#");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,OM,1,0,W0,3#".to_string())
        );
    }

    #[test]
    fn test_multiple_sentences() {
        let mut codec = SentenceCodec::default();
        codec.push(b"*CMDR,OM,1,0,L3,2#<LF>*CMDR,OM,1,0,Q0,400,70#\n");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,OM,1,0,L3,2#".to_string())
        );
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,OM,1,0,Q0,400,70#".to_string())
        );
        assert_eq!(codec.decode_sentence().unwrap(), None);
    }

    #[test]
    fn test_oversized_without_terminator() {
        let mut codec = SentenceCodec::new(8);
        codec.push(b"*CMDR,OM,123456");
        assert_eq!(
            codec.decode_sentence(),
            Err(Oversized { len: 15, max: 8 })
        );
        assert_eq!(codec.buffered_len(), 0);

        codec.push(b"*a,b#");
        assert_eq!(codec.decode_sentence().unwrap(), Some("*a,b#".to_string()));
    }

    #[test]
    fn test_oversized_sentence_is_skipped() {
        let mut codec = SentenceCodec::new(8);
        codec.push(b"*CMDR,OM,1#*a#");
        assert_eq!(codec.decode_sentence(), Err(Oversized { len: 11, max: 8 }));
        assert_eq!(codec.decode_sentence().unwrap(), Some("*a#".to_string()));
    }

    #[test]
    fn test_noise_before_frame_start_is_dropped() {
        let mut codec = SentenceCodec::new(16);
        codec.push(b"garbage-garbage-garbage*CMDR,1,W0#");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,1,W0#".to_string())
        );
    }

    #[test]
    fn test_resync_keeps_trailing_frame_start() {
        let mut codec = SentenceCodec::new(16);
        codec.push(b"garbage-garbage-garbage*CMDR,1");
        assert_eq!(codec.decode_sentence(), Err(Oversized { len: 23, max: 16 }));
        assert_eq!(codec.buffered_len(), 7);

        codec.push(b",W0#");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("*CMDR,1,W0#".to_string())
        );
    }

    #[test]
    fn test_unframed_sentence() {
        let mut codec = SentenceCodec::default();
        codec.push(b"CMDR,OM,1,0,Q0,412,80#");
        assert_eq!(
            codec.decode_sentence().unwrap(),
            Some("CMDR,OM,1,0,Q0,412,80#".to_string())
        );
    }
}
