//! Stream filter implementations.
//!
//! Every filter is symmetric where the underlying algorithm allows it:
//! `decode` reverses what `encode` produces. Image codecs (DCTDecode,
//! CCITTFaxDecode) are decode-only pass-throughs; asking them to encode
//! returns `Error::UnsupportedEncode`.
//!
//! A stream's `/Filter` entry describes a chain. Decoding applies the
//! filters in array order; encoding runs the same chain in reverse, so
//! `decode_chain(encode_chain(data)) == data` for any encodable chain.

use crate::config::ReaderOptions;
use crate::error::{Error, Result};
use crate::object::{Dictionary, FilterStage};

mod ascii85;
mod ascii_hex;
mod ccitt;
mod dct;
mod flate;
mod lzw;
mod predictor;
mod runlength;

pub use ascii85::Ascii85Filter;
pub use ascii_hex::AsciiHexFilter;
pub use ccitt::CcittFaxFilter;
pub use dct::DctFilter;
pub use flate::FlateFilter;
pub use lzw::LzwFilter;
pub use predictor::PredictorParams;
pub use runlength::RunLengthFilter;

/// Decompression bomb protection defaults.
///
/// The format does not specify limits; these guard against memory
/// exhaustion from hostile streams.
pub(crate) const DEFAULT_MAX_DECOMPRESSION_RATIO: u32 = 100;
pub(crate) const DEFAULT_MAX_DECOMPRESSED_SIZE: usize = 100 * 1024 * 1024;

/// Trait for stream filters.
///
/// `params` is the `/DecodeParms` dictionary for this stage of the chain,
/// when present. Filters that take no parameters ignore it.
pub trait StreamFilter: std::fmt::Debug {
    /// Decode the input data.
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>>;

    /// Encode the input data. Decode-only filters return `UnsupportedEncode`.
    fn encode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let _ = (input, params);
        Err(Error::UnsupportedEncode(self.name().to_string()))
    }

    /// Get the name of this filter (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

/// Look up a filter implementation by its `/Filter` name.
pub fn filter_by_name(name: &str) -> Result<Box<dyn StreamFilter>> {
    match name {
        "FlateDecode" => Ok(Box::new(FlateFilter)),
        "ASCIIHexDecode" => Ok(Box::new(AsciiHexFilter)),
        "ASCII85Decode" => Ok(Box::new(Ascii85Filter)),
        "LZWDecode" => Ok(Box::new(LzwFilter)),
        "RunLengthDecode" => Ok(Box::new(RunLengthFilter)),
        "DCTDecode" => Ok(Box::new(DctFilter)),
        "CCITTFaxDecode" => Ok(Box::new(CcittFaxFilter)),
        _ => Err(Error::UnsupportedFilter(name.to_string())),
    }
}

/// Decode stream data through a filter chain, stages in `/Filter` order.
pub fn decode_chain(data: &[u8], stages: &[FilterStage]) -> Result<Vec<u8>> {
    decode_chain_with_options(data, stages, &ReaderOptions::default())
}

/// Decode stream data through a filter chain with explicit resource limits.
pub fn decode_chain_with_options(
    data: &[u8],
    stages: &[FilterStage],
    options: &ReaderOptions,
) -> Result<Vec<u8>> {
    let max_ratio = options.max_decompression_ratio;
    let max_size = options.max_decompressed_size;
    let compressed_size = data.len();

    let mut current = data.to_vec();
    for (name, params) in stages {
        let filter = filter_by_name(name)?;
        current = filter.decode(&current, params.as_ref())?;

        // Bomb check after every stage, not just the last.
        if max_ratio > 0 && compressed_size > 0 {
            let ratio = current.len() as u64 / compressed_size.max(1) as u64;
            if ratio > max_ratio as u64 {
                return Err(Error::decode(
                    name,
                    format!(
                        "decompression ratio {}:1 exceeds limit {}:1 ({} -> {} bytes)",
                        ratio,
                        max_ratio,
                        compressed_size,
                        current.len()
                    ),
                ));
            }
        }
        if max_size > 0 && current.len() > max_size {
            return Err(Error::decode(
                name,
                format!(
                    "decompressed size {} bytes exceeds limit {} bytes",
                    current.len(),
                    max_size
                ),
            ));
        }
    }

    Ok(current)
}

/// Encode stream data through a filter chain.
///
/// Stages are given in `/Filter` order; encoding applies them in reverse,
/// producing bytes that `decode_chain` with the same stages will reverse.
pub fn encode_chain(data: &[u8], stages: &[FilterStage]) -> Result<Vec<u8>> {
    let mut current = data.to_vec();
    for (name, params) in stages.iter().rev() {
        let filter = filter_by_name(name)?;
        current = filter.encode(&current, params.as_ref())?;
    }
    Ok(current)
}
