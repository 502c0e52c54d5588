//! Runnable example: compress a handful of samples into a `Vec<u8>`, then
//! decompress them back out, printing the compression ratio achieved.
//!
//! Run with `cargo run --example encode_decode`.

use gorilla::{DataPoint, Decoder, Encoder};

fn main() {
    let header = 1_609_459_200; // 2021-01-01T00:00:00Z
    let samples: Vec<DataPoint> = (0..120)
        .map(|i| {
            let t = header + i * 60;
            let v = 20.0 + 5.0 * ((i as f64) * 0.05).sin();
            DataPoint::new(t, v)
        })
        .collect();

    let mut encoder = Encoder::new(Vec::new(), header).expect("write header");
    for dp in &samples {
        encoder.encode(*dp).expect("encode sample");
    }
    let bytes = encoder.finish().expect("finish stream");

    let uncompressed = samples.len() * 12; // u32 timestamp + f64 value, packed
    println!(
        "encoded {} samples into {} bytes ({:.1}x smaller than {} bytes uncompressed)",
        samples.len(),
        bytes.len(),
        uncompressed as f64 / bytes.len() as f64,
        uncompressed,
    );

    let mut decoder = Decoder::new(bytes.as_slice()).expect("read header");
    let mut decoded = Vec::with_capacity(samples.len());
    while let Some(dp) = decoder.next_sample().expect("decode sample") {
        decoded.push(dp);
    }

    assert_eq!(decoded, samples, "round-trip must reproduce the input exactly");
    println!("round-trip verified: {} samples match exactly", decoded.len());
}
