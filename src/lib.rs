//! # Gorilla
//!
//! A Rust implementation of Facebook's Gorilla time-series compression
//! algorithm, as described in *"Gorilla: A Fast, Scalable, In-Memory Time
//! Series Database"* (VLDB 2015).
//!
//! ## Algorithm overview
//!
//! Gorilla achieves high compression ratios for time-series data by
//! exploiting two key observations:
//!
//! - **Timestamps** in real-world time series tend to arrive at regular
//!   intervals. The *delta-of-delta* encoding captures deviations from the
//!   expected interval using variable-length bit prefixes, often requiring
//!   only 1 bit per timestamp.
//!
//! - **Values** (IEEE 754 doubles) in adjacent readings are frequently close
//!   or identical. XOR-based encoding stores only the changed bits, with a
//!   leading/trailing zero window that is reused across consecutive values.
//!
//! ## Streaming over byte sources and sinks
//!
//! [`Encoder`] and [`Decoder`] are generic over any [`std::io::Write`] /
//! [`std::io::Read`] — a `Vec<u8>`, a `File`, a `TcpStream`, anything. The
//! codec itself is purely synchronous and single-threaded; all blocking is
//! delegated to whatever byte source or sink the caller supplies.
//!
//! ## Example
//!
//! ```rust
//! use gorilla::{Encoder, Decoder, DataPoint};
//!
//! // Compress into an in-memory buffer.
//! let mut encoder = Encoder::new(Vec::new(), 1_609_459_200).unwrap();
//! encoder.encode(DataPoint::new(1_609_459_200, 12.0)).unwrap();
//! encoder.encode(DataPoint::new(1_609_459_260, 12.5)).unwrap();
//! encoder.encode(DataPoint::new(1_609_459_320, 13.0)).unwrap();
//! let bytes = encoder.finish().unwrap();
//! println!("compressed 3 points into {} bytes", bytes.len());
//!
//! // Decompress, pulling one sample at a time.
//! let mut decoder = Decoder::new(bytes.as_slice()).unwrap();
//! let mut points = Vec::new();
//! while let Some(dp) = decoder.next_sample().unwrap() {
//!     points.push(dp);
//! }
//! assert_eq!(points.len(), 3);
//! assert_eq!(points[0], DataPoint::new(1_609_459_200, 12.0));
//! ```
//!
//! ## Lazy iteration
//!
//! `Decoder` implements [`Iterator`] directly, so large streams can be
//! consumed without collecting them first:
//!
//! ```rust
//! # use gorilla::{Encoder, Decoder, DataPoint};
//! # let mut encoder = Encoder::new(Vec::new(), 1_609_459_200).unwrap();
//! # encoder.encode(DataPoint::new(1_609_459_200, 12.0)).unwrap();
//! # encoder.encode(DataPoint::new(1_609_459_260, 12.5)).unwrap();
//! # let bytes = encoder.finish().unwrap();
//! let decoder = Decoder::new(bytes.as_slice()).unwrap();
//! for result in decoder {
//!     let dp = result.unwrap();
//!     println!("{}: {}", dp.timestamp, dp.value);
//! }
//! ```

pub mod bitio;
pub mod decoder;
pub mod encoder;

// Re-export primary types at the crate root.
pub use decoder::{DecodeError, Decoder};
pub use encoder::{DataPoint, EncodeError, Encoder};
