//! ASCIIHexDecode implementation.
//!
//! Decodes hexadecimal-encoded data (e.g., "48656C6C6F" -> "Hello").
//! Whitespace is ignored, `>` ends the data, and odd-length input is
//! padded with an implicit trailing '0'.

use crate::error::{Error, Result};
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "ASCIIHexDecode";

/// ASCIIHexDecode filter implementation.
#[derive(Debug)]
pub struct AsciiHexFilter;

impl StreamFilter for AsciiHexFilter {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 2);
        let mut pending: Option<u8> = None;

        for &ch in input {
            if ch == b'>' {
                break;
            }
            if ch.is_ascii_whitespace() || ch == 0x00 {
                continue;
            }
            let nibble = hex_digit_to_value(ch).ok_or_else(|| {
                Error::decode(FILTER_NAME, format!("invalid hex digit '{}'", ch as char))
            })?;
            match pending.take() {
                Some(high) => output.push((high << 4) | nibble),
                None => pending = Some(nibble),
            }
        }

        // Odd digit count: final nibble is the high half of a byte.
        if let Some(high) = pending {
            output.push(high << 4);
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() * 2 + 1);
        for &byte in input {
            output.push(value_to_hex_digit(byte >> 4));
            output.push(value_to_hex_digit(byte & 0x0F));
        }
        output.push(b'>');
        Ok(output)
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}

/// Convert a hexadecimal ASCII character to its numeric value.
fn hex_digit_to_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}

fn value_to_hex_digit(value: u8) -> u8 {
    match value {
        0..=9 => b'0' + value,
        _ => b'A' + value - 10,
    }
}
