//! DCTDecode (JPEG) implementation.
//!
//! JPEG payloads stay compressed; this filter is a decode-only
//! pass-through, and the bytes are opaque to everything downstream.

use crate::error::{Error, Result};
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "DCTDecode";

/// DCTDecode filter implementation. Decode-only pass-through.
#[derive(Debug)]
pub struct DctFilter;

impl StreamFilter for DctFilter {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        if let Some(dict) = params {
            // ColorTransform is the only parameter this filter takes.
            if let Some(ct) = dict.get("ColorTransform") {
                match ct.as_integer() {
                    Some(0 | 1) => {},
                    _ => {
                        return Err(Error::decode(
                            FILTER_NAME,
                            "/ColorTransform must be 0 or 1",
                        ))
                    },
                }
            }
        }
        log::debug!("DCTDecode: pass-through {} bytes", input.len());
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}
