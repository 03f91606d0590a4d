//! LZWDecode implementation.
//!
//! LZW as the file format uses it:
//! - MSB-first bit ordering
//! - 9-bit codes to start, growing as the table fills
//! - EarlyChange=1 (code size grows one code earlier than GIF/TIFF)
//! - Clear code 256, EOD code 257, first dynamic code 258

use crate::error::{Error, Result};
use crate::filters::predictor::PredictorParams;
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "LZWDecode";

/// LZWDecode filter implementation.
#[derive(Debug)]
pub struct LzwFilter;

impl StreamFilter for LzwFilter {
    fn decode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        // weezl handles the common case; the hand-rolled decoder covers
        // EarlyChange edge cases weezl rejects.
        let data = match decode_lzw_weezl(input) {
            Ok(data) => data,
            Err(_) => decode_lzw_custom(input)?,
        };

        PredictorParams::from_dict(params).reverse(&data)
    }

    fn encode(&self, input: &[u8], params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let pred = PredictorParams::from_dict(params);
        let filtered = pred.apply(input)?;

        use weezl::{encode::Encoder as WeezlEncoder, BitOrder};
        let mut encoder = WeezlEncoder::new(BitOrder::Msb, 8);
        encoder
            .encode(&filtered)
            .map_err(|e| Error::decode(FILTER_NAME, format!("encode failed: {:?}", e)))
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}

/// Decode using the weezl crate.
fn decode_lzw_weezl(input: &[u8]) -> Result<Vec<u8>> {
    use weezl::{decode::Decoder as WeezlDecoder, BitOrder};

    let mut decoder = WeezlDecoder::new(BitOrder::Msb, 8);
    decoder
        .decode(input)
        .map_err(|e| Error::decode(FILTER_NAME, format!("{:?}", e)))
}

/// Hand-rolled LZW decoder with EarlyChange=1 code-width growth.
fn decode_lzw_custom(input: &[u8]) -> Result<Vec<u8>> {
    const CLEAR_CODE: u16 = 256;
    const EOD_CODE: u16 = 257;
    const FIRST_CODE: u16 = 258;
    const MAX_CODE_BITS: u8 = 12;

    let mut output = Vec::new();
    let mut table = init_lzw_table();
    let mut code_bits = 9;
    let mut next_code = FIRST_CODE;
    let mut bit_reader = BitReader::new(input);
    let mut prev_code: Option<u16> = None;

    loop {
        // EarlyChange=1: grow the code size when next_code reaches
        // 2^code_bits - 1, one code earlier than standard LZW.
        if code_bits < MAX_CODE_BITS && next_code > 0 {
            let increase_at = (1 << code_bits) - 1;
            if next_code == increase_at {
                code_bits += 1;
            }
        }

        let code = match bit_reader.read_bits(code_bits) {
            Some(c) => c as u16,
            None => break,
        };

        if code == EOD_CODE {
            break;
        }

        if code == CLEAR_CODE {
            table = init_lzw_table();
            code_bits = 9;
            next_code = FIRST_CODE;
            prev_code = None;
            continue;
        }

        let string = if code < next_code {
            table
                .get(&code)
                .ok_or_else(|| {
                    Error::decode(
                        FILTER_NAME,
                        format!("invalid code {} (table size {})", code, table.len()),
                    )
                })?
                .clone()
        } else if let (true, Some(prev)) = (code == next_code, prev_code) {
            // code == next_code: string is prev + prev[0]
            let prev_string = table.get(&prev).ok_or_else(|| {
                Error::decode(FILTER_NAME, format!("dangling previous code {}", prev))
            })?;
            let mut s = prev_string.clone();
            s.push(prev_string[0]);
            s
        } else {
            return Err(Error::decode(
                FILTER_NAME,
                format!(
                    "invalid code {} (next_code={}, code_bits={})",
                    code, next_code, code_bits
                ),
            ));
        };

        output.extend_from_slice(&string);

        if let Some(prev) = prev_code {
            if next_code < 4096 {
                if let Some(prev_string) = table.get(&prev) {
                    let mut new_string = prev_string.clone();
                    new_string.push(string[0]);
                    table.insert(next_code, new_string);
                    next_code += 1;
                }
            }
        }

        prev_code = Some(code);
    }

    Ok(output)
}

/// Initialize the LZW string table with single-byte strings.
fn init_lzw_table() -> std::collections::HashMap<u16, Vec<u8>> {
    let mut table = std::collections::HashMap::new();
    for i in 0..=255u16 {
        table.insert(i, vec![i as u8]);
    }
    table
}

/// Bit reader for MSB-first bit ordering.
struct BitReader<'a> {
    data: &'a [u8],
    byte_pos: usize,
    bit_pos: u8, // 0-7, position within current byte (0 = MSB)
}

impl<'a> BitReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            byte_pos: 0,
            bit_pos: 0,
        }
    }

    fn read_bits(&mut self, n: u8) -> Option<u32> {
        if n == 0 || n > 16 {
            return None;
        }

        let mut result = 0u32;
        let mut remaining = n;

        while remaining > 0 {
            if self.byte_pos >= self.data.len() {
                return None;
            }

            let bits_in_current_byte = 8 - self.bit_pos;
            let bits_to_read = remaining.min(bits_in_current_byte);

            let byte = self.data[self.byte_pos];
            let shift_amount = bits_in_current_byte - bits_to_read;
            let mask = if bits_to_read == 8 {
                0xFF
            } else {
                ((1u8 << bits_to_read) - 1) << shift_amount
            };
            let bits = (byte & mask) >> shift_amount;

            result = (result << bits_to_read) | (bits as u32);

            self.bit_pos += bits_to_read;
            if self.bit_pos >= 8 {
                self.byte_pos += 1;
                self.bit_pos = 0;
            }

            remaining -= bits_to_read;
        }

        Some(result)
    }
}
