use std::error;
use std::fmt;
use std::io::{self, Write};

use crate::bitio::BitWriter;

const FIRST_DELTA_BITS: u32 = 14;
const FIRST_DELTA_MAX: u64 = (1 << FIRST_DELTA_BITS) - 1;
const LEAD_SENTINEL: u8 = 255;

/// A single time-series sample: a Unix timestamp (seconds) and an IEEE-754
/// `f64` value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DataPoint {
    pub timestamp: u32,
    pub value: f64,
}

impl DataPoint {
    /// Creates a new `DataPoint`.
    pub fn new(timestamp: u32, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// An error raised while encoding a sample or finalizing the stream.
#[derive(Debug)]
pub enum EncodeError {
    /// The underlying byte sink failed.
    Io(io::Error),
    /// The first sample's timestamp is earlier than the stream header.
    TimestampBeforeHeader { header: u32, timestamp: u32 },
}

impl fmt::Display for EncodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodeError::Io(e) => write!(f, "failed to write to the compressed stream: {e}"),
            EncodeError::TimestampBeforeHeader { header, timestamp } => write!(
                f,
                "first sample timestamp {timestamp} is before the stream header {header}"
            ),
        }
    }
}

impl error::Error for EncodeError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            EncodeError::Io(e) => Some(e),
            EncodeError::TimestampBeforeHeader { .. } => None,
        }
    }
}

impl From<io::Error> for EncodeError {
    fn from(e: io::Error) -> Self {
        EncodeError::Io(e)
    }
}

/// The Gorilla compressor (encoder).
///
/// Implements the compression scheme from Facebook's Gorilla paper:
/// - **Timestamps**: delta-of-delta encoding with variable-length prefixes.
/// - **Values**: XOR-based compression with leading/trailing zero tracking.
///
/// # Example
/// ```
/// use gorilla::{Encoder, DataPoint};
///
/// let mut encoder = Encoder::new(Vec::new(), 1_609_459_200).unwrap();
/// encoder.encode(DataPoint::new(1_609_459_200, 12.0)).unwrap();
/// encoder.encode(DataPoint::new(1_609_459_260, 12.5)).unwrap();
/// encoder.encode(DataPoint::new(1_609_459_320, 13.0)).unwrap();
/// let bytes = encoder.finish().unwrap();
/// ```
pub struct Encoder<W> {
    bw: BitWriter<W>,
    header: u32,
    /// Whether a sample has been encoded yet.
    has_sample: bool,
    /// Previous timestamp.
    t_prev: u32,
    /// Previous delta between timestamps.
    delta_prev: i64,
    /// Previous value as raw bits.
    value_prev: u64,
    /// Leading-zero count of the previous non-zero XOR window.
    lead_prev: u8,
    /// Trailing-zero count of the previous non-zero XOR window.
    trail_prev: u8,
    /// Number of samples encoded so far.
    count: u64,
    /// Whether `finish()` has already run.
    finished: bool,
}

impl<W: Write> Encoder<W> {
    /// Creates a new `Encoder` over `sink`, writing the 32-bit stream header
    /// immediately.
    pub fn new(sink: W, header: u32) -> io::Result<Self> {
        let mut bw = BitWriter::new(sink);
        bw.write_bits(header as u64, 32)?;
        Ok(Self {
            bw,
            header,
            has_sample: false,
            t_prev: 0,
            delta_prev: 0,
            value_prev: 0,
            lead_prev: LEAD_SENTINEL,
            trail_prev: 0,
            count: 0,
            finished: false,
        })
    }

    /// Returns the stream header this encoder was constructed with.
    pub fn header(&self) -> u32 {
        self.header
    }

    /// Returns the number of samples encoded so far.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Encodes one sample into the compressed stream.
    ///
    /// Samples must be submitted in strictly increasing timestamp order. The
    /// very first sample's timestamp must be at or after the header,
    /// otherwise this returns [`EncodeError::TimestampBeforeHeader`].
    ///
    /// A delta-of-delta of exactly `-1` in the 32-bit branch is
    /// indistinguishable from the end-of-stream marker and will decode back
    /// as end-of-stream; this is an open question inherited from the
    /// original paper (see `SPEC_FULL.md` §9) rather than a guarded error.
    pub fn encode(&mut self, dp: DataPoint) -> Result<(), EncodeError> {
        assert!(!self.finished, "cannot encode after finish()");

        if !self.has_sample {
            self.encode_first(dp)?;
        } else {
            self.encode_subsequent(dp)?;
        }

        self.count += 1;
        Ok(())
    }

    /// Writes the end-of-stream marker, pads to a byte boundary, and
    /// returns the inner byte sink.
    pub fn finish(mut self) -> io::Result<W> {
        if !self.has_sample {
            // Empty stream: reserved first-sample delta plus a zero value.
            self.bw.write_bits(FIRST_DELTA_MAX, FIRST_DELTA_BITS)?;
            self.bw.write_bits(0, 64)?;
        } else {
            self.bw.write_bits(0b1111, 4)?;
            self.bw.write_bits(0xFFFF_FFFFu64, 32)?;
            self.bw.write_bit(false)?;
        }
        self.bw.flush(false)?;
        self.finished = true;
        Ok(self.bw.into_inner())
    }

    fn encode_first(&mut self, dp: DataPoint) -> Result<(), EncodeError> {
        if dp.timestamp < self.header {
            return Err(EncodeError::TimestampBeforeHeader {
                header: self.header,
                timestamp: dp.timestamp,
            });
        }
        let delta = (dp.timestamp - self.header) as u64;
        let bits = dp.value.to_bits();

        self.bw.write_bits(delta, FIRST_DELTA_BITS)?;
        self.bw.write_bits(bits, 64)?;

        self.has_sample = true;
        self.t_prev = dp.timestamp;
        self.delta_prev = delta as i64;
        self.value_prev = bits;
        Ok(())
    }

    fn encode_subsequent(&mut self, dp: DataPoint) -> Result<(), EncodeError> {
        let delta = dp.timestamp as i64 - self.t_prev as i64;
        let dod = delta - self.delta_prev;
        self.encode_delta_of_delta(dod)?;
        self.encode_value(dp.value)?;

        self.t_prev = dp.timestamp;
        self.delta_prev = delta;
        Ok(())
    }

    /// Encodes a delta-of-delta using the Gorilla variable-length prefix
    /// code:
    ///
    /// | dod range       | prefix | payload |
    /// |-----------------|--------|---------|
    /// | `0`             | `0`    | —       |
    /// | `[-63, 64]`     | `10`   | 7 bits  |
    /// | `[-255, 256]`   | `110`  | 9 bits  |
    /// | `[-2047, 2048]` | `1110` | 12 bits |
    /// | otherwise       | `1111` | 32 bits |
    fn encode_delta_of_delta(&mut self, dod: i64) -> io::Result<()> {
        if dod == 0 {
            self.bw.write_bit(false)
        } else if (-63..=64).contains(&dod) {
            self.bw.write_bits(0b10, 2)?;
            self.bw.write_bits(two_complement(dod, 7), 7)
        } else if (-255..=256).contains(&dod) {
            self.bw.write_bits(0b110, 3)?;
            self.bw.write_bits(two_complement(dod, 9), 9)
        } else if (-2047..=2048).contains(&dod) {
            self.bw.write_bits(0b1110, 4)?;
            self.bw.write_bits(two_complement(dod, 12), 12)
        } else {
            self.bw.write_bits(0b1111, 4)?;
            self.bw.write_bits((dod as i32 as u32) as u64, 32)
        }
    }

    /// XOR-based value compression: see `SPEC_FULL.md` §4.3.
    fn encode_value(&mut self, value: f64) -> io::Result<()> {
        let bits = value.to_bits();
        let xor = bits ^ self.value_prev;
        self.value_prev = bits;

        if xor == 0 {
            return self.bw.write_bit(false);
        }
        self.bw.write_bit(true)?;

        // Clamped to 31 because the wire format stores it in a 5-bit field;
        // the extra bits this costs are always zero, so nothing is lost.
        let lead = xor.leading_zeros().min(31) as u8;
        let trail = xor.trailing_zeros() as u8;

        if self.lead_prev != LEAD_SENTINEL && self.lead_prev <= lead && self.trail_prev <= trail {
            self.bw.write_bit(false)?;
            let sig = 64 - self.lead_prev - self.trail_prev;
            self.bw.write_bits(xor >> self.trail_prev, sig as u32)
        } else {
            self.bw.write_bit(true)?;
            self.bw.write_bits(lead as u64, 5)?;
            let sig = 64 - lead - trail;
            self.bw.write_bits((sig % 64) as u64, 6)?;
            self.bw.write_bits(xor >> trail, sig as u32)?;

            self.lead_prev = lead;
            self.trail_prev = trail;
            Ok(())
        }
    }
}

/// Two's-complement encoding of `value` into the low `n` bits of a `u64`.
fn two_complement(value: i64, n: u32) -> u64 {
    if value >= 0 {
        value as u64
    } else {
        ((1i64 << n) + value) as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_written_on_construction() {
        let enc = Encoder::new(Vec::new(), 0x6000_0000).unwrap();
        assert_eq!(enc.header(), 0x6000_0000);
        assert_eq!(enc.count(), 0);
    }

    #[test]
    fn rejects_timestamp_before_header() {
        let mut enc = Encoder::new(Vec::new(), 1_000).unwrap();
        let err = enc.encode(DataPoint::new(999, 1.0)).unwrap_err();
        match err {
            EncodeError::TimestampBeforeHeader { header, timestamp } => {
                assert_eq!(header, 1_000);
                assert_eq!(timestamp, 999);
            }
            _ => panic!("expected TimestampBeforeHeader"),
        }
        assert_eq!(enc.count(), 0);
    }

    #[test]
    fn accepts_timestamp_equal_to_header() {
        let mut enc = Encoder::new(Vec::new(), 1_000).unwrap();
        enc.encode(DataPoint::new(1_000, 1.0)).unwrap();
        assert_eq!(enc.count(), 1);
    }

    #[test]
    fn empty_stream_matches_spec_bytes() {
        // Header H = 1_600_000_000 from the distilled spec's scenario list:
        // 32-bit header, then 14 one-bits (reserved empty-stream delta), then
        // 64 zero-bits, then zero-padding to the next byte boundary.
        let enc = Encoder::new(Vec::new(), 1_600_000_000).unwrap();
        let bytes = enc.finish().unwrap();
        assert_eq!(
            bytes,
            vec![0x5F, 0x5E, 0x10, 0x00, 0xFF, 0xFC, 0, 0, 0, 0, 0, 0, 0, 0]
        );
    }
}
