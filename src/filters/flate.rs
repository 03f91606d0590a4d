//! FlateDecode (zlib/deflate) implementation.
//!
//! The most common compression filter by far. Decoding tolerates the
//! corruption seen in real files: a truncated stream yields whatever
//! decompressed cleanly, a missing zlib wrapper falls back to raw deflate,
//! and a stubborn stream gets one more try through the `inflate` crate
//! before the error is surfaced.

use crate::error::{Error, Result};
use crate::filters::predictor::PredictorParams;
use crate::filters::StreamFilter;
use crate::object::Dictionary;
use flate2::read::{DeflateDecoder, ZlibDecoder};
use flate2::write::ZlibEncoder;
use flate2::Compression;
use inflate::inflate_bytes_zlib;
use std::io::{Read, Write};

const FILTER_NAME: &str = "FlateDecode";

/// FlateDecode filter implementation.
#[derive(Debug)]
pub struct FlateFilter;

impl StreamFilter for FlateFilter {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let data = inflate_with_recovery(input)?;
        PredictorParams::from_dict(params).reverse(&data)
    }

    fn encode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let filtered = PredictorParams::from_dict(params).apply(input)?;

        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(&filtered)?;
        Ok(encoder.finish()?)
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}

fn inflate_with_recovery(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::new();
    let zlib_err = match ZlibDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => return Ok(output),
        Err(e) => e,
    };

    // Truncated but partially valid stream: keep what decompressed.
    if !output.is_empty() {
        log::warn!(
            "FlateDecode partial recovery: {} bytes before corruption: {}",
            output.len(),
            zlib_err
        );
        return Ok(output);
    }

    // Some producers write raw deflate with no zlib wrapper.
    output.clear();
    match DeflateDecoder::new(input).read_to_end(&mut output) {
        Ok(_) => {
            log::warn!("FlateDecode: raw deflate recovery, {} bytes", output.len());
            return Ok(output);
        },
        Err(_) if !output.is_empty() => {
            log::warn!(
                "FlateDecode: partial raw deflate recovery, {} bytes",
                output.len()
            );
            return Ok(output);
        },
        Err(_) => {},
    }

    // Last resort: the inflate crate recovers some streams flate2 rejects.
    if let Ok(data) = inflate_bytes_zlib(input) {
        log::warn!("FlateDecode: inflate crate recovery, {} bytes", data.len());
        return Ok(data);
    }

    Err(Error::decode(
        FILTER_NAME,
        format!(
            "decompression failed after all recovery attempts: {} ({} input bytes)",
            zlib_err,
            input.len()
        ),
    ))
}
