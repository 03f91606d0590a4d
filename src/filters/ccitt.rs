//! CCITTFaxDecode implementation.
//!
//! Group 3/4 fax compression for monochrome images. The payload stays in
//! its compressed form and is handed downstream opaque; consumers that
//! rasterize images do their own G3/G4 decoding. Parameters are still
//! validated so malformed `/DecodeParms` fail here rather than later.

use crate::error::{Error, Result};
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "CCITTFaxDecode";

/// CCITTFaxDecode filter implementation. Decode-only pass-through.
#[derive(Debug)]
pub struct CcittFaxFilter;

impl StreamFilter for CcittFaxFilter {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        if let Some(dict) = params {
            validate_params(dict)?;
        }
        log::debug!("CCITTFaxDecode: pass-through {} bytes", input.len());
        Ok(input.to_vec())
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}

fn validate_params(dict: &Dictionary) -> Result<()> {
    // K selects the coding scheme: < 0 pure G4, 0 G3 1-D, > 0 mixed G3.
    // Any integer is legal; non-integers are not.
    if let Some(k) = dict.get("K") {
        if k.as_integer().is_none() {
            return Err(Error::decode(FILTER_NAME, "/K must be an integer"));
        }
    }
    for key in ["Columns", "Rows"] {
        if let Some(value) = dict.get(key) {
            match value.as_integer() {
                Some(v) if v >= 0 => {},
                _ => {
                    return Err(Error::decode(
                        FILTER_NAME,
                        format!("/{} must be a non-negative integer", key),
                    ))
                },
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    #[test]
    fn test_ccitt_decode_passthrough() {
        let filter = CcittFaxFilter;
        let data = b"\x00\x01\x02\x03";
        let output = filter.decode(data, None).unwrap();
        assert_eq!(output, data);
    }

    #[test]
    fn test_ccitt_decode_with_valid_params() {
        let filter = CcittFaxFilter;
        let mut params = Dictionary::new();
        params.insert("K".to_string(), Object::Integer(-1));
        params.insert("Columns".to_string(), Object::Integer(1728));
        let output = filter.decode(b"\xAA\xBB", Some(&params)).unwrap();
        assert_eq!(output, b"\xAA\xBB");
    }

    #[test]
    fn test_ccitt_decode_rejects_bad_params() {
        let filter = CcittFaxFilter;
        let mut params = Dictionary::new();
        params.insert("Columns".to_string(), Object::Integer(-5));
        assert!(filter.decode(b"\xAA", Some(&params)).is_err());
    }

    #[test]
    fn test_ccitt_encode_unsupported() {
        let filter = CcittFaxFilter;
        match filter.encode(b"data", None) {
            Err(Error::UnsupportedEncode(name)) => assert_eq!(name, "CCITTFaxDecode"),
            _ => panic!("Expected UnsupportedEncode"),
        }
    }

    #[test]
    fn test_ccitt_filter_name() {
        assert_eq!(CcittFaxFilter.name(), "CCITTFaxDecode");
    }
}
