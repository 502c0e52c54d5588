use std::error;
use std::fmt;
use std::io::{self, Read};

use crate::bitio::BitReader;
use crate::encoder::DataPoint;

const FIRST_DELTA_BITS: u32 = 14;
const FIRST_DELTA_MAX: u64 = (1 << FIRST_DELTA_BITS) - 1;

/// An error raised while decoding a sample.
///
/// End-of-stream is not an error — see [`Decoder::next_sample`].
#[derive(Debug)]
pub enum DecodeError {
    /// The underlying byte source failed (for any reason other than a clean
    /// end-of-stream at a sample boundary).
    Io(io::Error),
    /// The 4-bit delta-of-delta prefix did not match any of the five
    /// patterns the encoder can produce. Unreachable from a conforming
    /// encoder.
    InvalidPrefix(u8),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::Io(e) => write!(f, "failed to read from the compressed stream: {e}"),
            DecodeError::InvalidPrefix(bits) => {
                write!(f, "invalid delta-of-delta prefix bits: {bits:#06b}")
            }
        }
    }
}

impl error::Error for DecodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            DecodeError::Io(e) => Some(e),
            DecodeError::InvalidPrefix(_) => None,
        }
    }
}

impl From<io::Error> for DecodeError {
    fn from(e: io::Error) -> Self {
        DecodeError::Io(e)
    }
}

/// Returns `true` if `err` represents a clean end-of-stream at a sample
/// boundary rather than a genuine I/O failure.
fn is_clean_eof(err: &io::Error) -> bool {
    err.kind() == io::ErrorKind::UnexpectedEof
}

/// The result of parsing the delta-of-delta prefix and payload.
enum Dod {
    Value(i64),
    EndOfStream,
}

/// The Gorilla decompressor (decoder).
///
/// Reconstructs time-series samples from a Gorilla-compressed bit stream.
///
/// # Example
/// ```
/// use gorilla::{Encoder, Decoder, DataPoint};
///
/// let mut encoder = Encoder::new(Vec::new(), 1_609_459_200).unwrap();
/// encoder.encode(DataPoint::new(1_609_459_200, 12.0)).unwrap();
/// encoder.encode(DataPoint::new(1_609_459_260, 12.5)).unwrap();
/// let bytes = encoder.finish().unwrap();
///
/// let mut decoder = Decoder::new(bytes.as_slice()).unwrap();
/// assert_eq!(decoder.header(), 1_609_459_200);
/// let mut points = Vec::new();
/// while let Some(dp) = decoder.next_sample().unwrap() {
///     points.push(dp);
/// }
/// assert_eq!(points.len(), 2);
/// ```
pub struct Decoder<R> {
    br: BitReader<R>,
    header: u32,
    /// Whether a sample has been decoded yet.
    has_sample: bool,
    /// Whether the end marker has already been observed.
    done: bool,
    t_prev: u32,
    delta_prev: i64,
    value_prev: u64,
    lead_prev: u8,
    trail_prev: u8,
}

impl<R: Read> Decoder<R> {
    /// Creates a new `Decoder` over `source`, reading the 32-bit stream
    /// header immediately.
    pub fn new(source: R) -> io::Result<Self> {
        let mut br = BitReader::new(source);
        let header = br.read_bits(32)? as u32;
        Ok(Self {
            br,
            header,
            has_sample: false,
            done: false,
            t_prev: 0,
            delta_prev: 0,
            value_prev: 0,
            lead_prev: 0,
            trail_prev: 0,
        })
    }

    /// Returns the stream header read at construction.
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Reads and returns the next sample, or `None` on a clean end-of-stream
    /// (either end-marker shape of `SPEC_FULL.md` §6, or the underlying byte
    /// source being exhausted exactly at a sample boundary).
    pub fn next_sample(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        if self.done {
            return Ok(None);
        }

        let result = if !self.has_sample {
            self.read_first()
        } else {
            self.read_subsequent()
        };

        match result {
            Ok(Some(dp)) => Ok(Some(dp)),
            Ok(None) => {
                self.done = true;
                Ok(None)
            }
            Err(DecodeError::Io(e)) if is_clean_eof(&e) => {
                self.done = true;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_first(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        let delta = self.br.read_bits(FIRST_DELTA_BITS)?;
        if delta == FIRST_DELTA_MAX {
            return Ok(None);
        }
        let value_bits = self.br.read_bits(64)?;

        self.has_sample = true;
        self.delta_prev = delta as i64;
        self.t_prev = self.header + delta as u32;
        self.value_prev = value_bits;

        Ok(Some(DataPoint::new(self.t_prev, f64::from_bits(value_bits))))
    }

    fn read_subsequent(&mut self) -> Result<Option<DataPoint>, DecodeError> {
        match self.read_delta_of_delta()? {
            Dod::EndOfStream => return Ok(None),
            Dod::Value(dod) => {
                self.delta_prev += dod;
                self.t_prev = (self.t_prev as i64 + self.delta_prev) as u32;
            }
        }

        let value_bits = self.read_value()?;
        Ok(Some(DataPoint::new(self.t_prev, f64::from_bits(value_bits))))
    }

    /// Reads the unary-terminated 4-bit-max prefix and its payload,
    /// returning the signed delta-of-delta or the end-of-stream signal.
    fn read_delta_of_delta(&mut self) -> Result<Dod, DecodeError> {
        let mut prefix: u8 = 0;
        let mut width = 0u32;
        for _ in 0..4 {
            let bit = self.br.read_bit()?;
            prefix = (prefix << 1) | bit as u8;
            if !bit {
                break;
            }
            width += 1;
        }

        let payload_width = match (width, prefix) {
            (0, 0b0) => return Ok(Dod::Value(0)),
            (1, 0b10) => 7,
            (2, 0b110) => 9,
            (3, 0b1110) => 12,
            (4, 0b1111) => 32,
            _ => return Err(DecodeError::InvalidPrefix(prefix)),
        };

        let raw = self.br.read_bits(payload_width)?;
        if payload_width == 32 && raw == 0xFFFF_FFFF {
            return Ok(Dod::EndOfStream);
        }
        Ok(Dod::Value(sign_extend(raw, payload_width)))
    }

    /// Reads an XOR-coded value, applying it to `value_prev`.
    fn read_value(&mut self) -> Result<u64, DecodeError> {
        if !self.br.read_bit()? {
            return Ok(self.value_prev);
        }

        if !self.br.read_bit()? {
            let sig = 64 - self.lead_prev - self.trail_prev;
            let m = self.br.read_bits(sig as u32)?;
            self.value_prev ^= m << self.trail_prev;
        } else {
            let lead = self.br.read_bits(5)? as u8;
            let mut sig = self.br.read_bits(6)? as u8;
            if sig == 0 {
                sig = 64;
            }
            let trail = 64 - sig - lead;
            let m = self.br.read_bits(sig as u32)?;
            self.lead_prev = lead;
            self.trail_prev = trail;
            self.value_prev ^= m << trail;
        }

        Ok(self.value_prev)
    }
}

/// Sign-extends the low `width` bits of `raw` to a full `i64`. For
/// `width == 32` the 32 payload bits are always read as a signed
/// two's-complement `i32` (the strict reading of `SPEC_FULL.md` §9's
/// sign-extension note).
fn sign_extend(raw: u64, width: u32) -> i64 {
    if width == 32 {
        raw as u32 as i32 as i64
    } else if raw > 1 << (width - 1) {
        raw as i64 - (1i64 << width)
    } else {
        raw as i64
    }
}

impl<R: Read> Iterator for Decoder<R> {
    type Item = Result<DataPoint, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_sample() {
            Ok(Some(dp)) => Some(Ok(dp)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;

    fn roundtrip(header: u32, input: &[DataPoint]) -> Vec<DataPoint> {
        let mut enc = Encoder::new(Vec::new(), header).unwrap();
        for dp in input {
            enc.encode(*dp).unwrap();
        }
        let bytes = enc.finish().unwrap();

        let mut dec = Decoder::new(bytes.as_slice()).unwrap();
        let mut out = Vec::new();
        while let Some(dp) = dec.next_sample().unwrap() {
            out.push(dp);
        }
        out
    }

    #[test]
    fn empty_stream_decodes_to_no_samples() {
        let out = roundtrip(1_600_000_000, &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn single_sample_roundtrip() {
        let input = vec![DataPoint::new(1_600_000_060, 1.0)];
        assert_eq!(roundtrip(1_600_000_000, &input), input);
    }

    #[test]
    fn header_is_available_before_any_sample() {
        let enc = Encoder::new(Vec::new(), 42).unwrap();
        let bytes = enc.finish().unwrap();
        let dec = Decoder::new(bytes.as_slice()).unwrap();
        assert_eq!(dec.header(), 42);
    }

    #[test]
    fn decode_error_display_mentions_prefix_bits() {
        // InvalidPrefix can't be reached from a conforming encoder's output
        // (the unary prefix matcher only ever produces the five patterns it
        // checks for) — exercised directly here for Display coverage.
        let err = DecodeError::InvalidPrefix(0b1101);
        assert!(err.to_string().contains("1101"));
    }

    #[test]
    fn iterator_matches_next_sample() {
        let input: Vec<DataPoint> = (0..50)
            .map(|i| DataPoint::new(1_000 + i * 60, (i as f64).sqrt()))
            .collect();

        let mut enc = Encoder::new(Vec::new(), 1_000).unwrap();
        for dp in &input {
            enc.encode(*dp).unwrap();
        }
        let bytes = enc.finish().unwrap();

        let decoder = Decoder::new(bytes.as_slice()).unwrap();
        let collected: Result<Vec<_>, _> = decoder.collect();
        assert_eq!(collected.unwrap(), input);
    }
}
