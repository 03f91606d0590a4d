//! ASCII85Decode implementation.
//!
//! Base-85 text armor: every 4 bytes become 5 characters from the alphabet
//! `!`..`u`, with `z` as shorthand for a full group of zero bytes and `~`
//! ending the data. Decoding is deliberately lenient about a trailing group
//! of one character, which broken producers emit; such a group carries less
//! than one byte of information and is silently dropped.

use crate::error::{Error, Result};
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "ASCII85Decode";

/// ASCII85Decode filter implementation.
#[derive(Debug)]
pub struct Ascii85Filter;

impl StreamFilter for Ascii85Filter {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        // Some producers wrap the payload in Adobe's <~ ... ~> frame. The
        // opening '<' sits inside the digit alphabet, so it must be stripped
        // here or it would corrupt the first group.
        let input = strip_frame_prefix(input);

        let mut output = Vec::with_capacity(input.len() * 4 / 5);
        let mut chn = [0u32; 5];
        let mut state = 0usize;

        for &ch in input {
            if ch == b'~' {
                break;
            }
            if is_whitespace(ch) {
                continue;
            }
            if ch == b'z' && state == 0 {
                output.extend_from_slice(&[0, 0, 0, 0]);
                continue;
            }
            if !(b'!'..=b'u').contains(&ch) {
                return Err(Error::decode(
                    FILTER_NAME,
                    format!("illegal character 0x{:02X}", ch),
                ));
            }
            chn[state] = (ch - b'!') as u32;
            state += 1;
            if state == 5 {
                state = 0;
                // A group above u32::MAX is invalid; wrap to the low 32
                // bits instead of rejecting, as decoders in the wild do.
                let mut r = 0u32;
                for &digit in &chn {
                    r = r.wrapping_mul(85).wrapping_add(digit);
                }
                output.extend_from_slice(&r.to_be_bytes());
            }
        }

        // A dangling single character cannot encode a byte. Real files
        // contain them; drop without complaint.
        match state {
            2 => {
                let r = chn[0] as u64 * 85 * 85 * 85 * 85
                    + chn[1] as u64 * 85 * 85 * 85
                    + 85 * 85 * 85
                    + 85 * 85
                    + 85;
                output.push((r >> 24) as u8);
            },
            3 => {
                let r = chn[0] as u64 * 85 * 85 * 85 * 85
                    + chn[1] as u64 * 85 * 85 * 85
                    + chn[2] as u64 * 85 * 85
                    + 85 * 85
                    + 85;
                output.push((r >> 24) as u8);
                output.push((r >> 16) as u8);
            },
            4 => {
                let r = chn[0] as u64 * 85 * 85 * 85 * 85
                    + chn[1] as u64 * 85 * 85 * 85
                    + chn[2] as u64 * 85 * 85
                    + chn[3] as u64 * 85
                    + 85;
                output.push((r >> 24) as u8);
                output.push((r >> 16) as u8);
                output.push((r >> 8) as u8);
            },
            _ => {},
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(input.len() / 4 * 5 + 8);

        let mut chunks = input.chunks_exact(4);
        for chunk in chunks.by_ref() {
            let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if value == 0 {
                output.push(b'z');
            } else {
                output.extend_from_slice(&group_digits(value));
            }
        }

        let tail = chunks.remainder();
        if !tail.is_empty() {
            // n leftover bytes emit n+1 characters; never 'z', even for zeros.
            let mut padded = [0u8; 4];
            padded[..tail.len()].copy_from_slice(tail);
            let value = u32::from_be_bytes(padded);
            let digits = group_digits(value);
            output.extend_from_slice(&digits[..tail.len() + 1]);
        }

        output.extend_from_slice(b"~>");
        Ok(output)
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}

/// Split a 32-bit group into its five base-85 digits.
fn group_digits(mut value: u32) -> [u8; 5] {
    let mut digits = [0u8; 5];
    for slot in digits.iter_mut().rev() {
        *slot = (value % 85) as u8 + b'!';
        value /= 85;
    }
    digits
}

/// Whitespace per the file syntax: NUL, TAB, LF, FF, CR, SPACE.
fn is_whitespace(ch: u8) -> bool {
    matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

fn strip_frame_prefix(input: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < input.len() && is_whitespace(input[start]) {
        start += 1;
    }
    if input[start..].starts_with(b"<~") {
        &input[start + 2..]
    } else {
        &input[start..]
    }
}
