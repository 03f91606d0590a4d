//! RunLengthDecode implementation.
//!
//! Packet format:
//! - Length byte 0-127: copy next N+1 bytes literally
//! - Length byte 128: EOD marker
//! - Length byte 129-255: repeat next byte 257-N times

use crate::error::{Error, Result};
use crate::filters::StreamFilter;
use crate::object::Dictionary;

const FILTER_NAME: &str = "RunLengthDecode";

/// RunLengthDecode filter implementation.
#[derive(Debug)]
pub struct RunLengthFilter;

impl StreamFilter for RunLengthFilter {
    fn decode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            let length = input[i];
            i += 1;

            match length {
                0..=127 => {
                    let count = length as usize + 1;
                    if i + count > input.len() {
                        return Err(Error::decode(
                            FILTER_NAME,
                            format!(
                                "not enough data for literal run (need {}, have {})",
                                count,
                                input.len() - i
                            ),
                        ));
                    }
                    output.extend_from_slice(&input[i..i + count]);
                    i += count;
                },
                128 => break,
                129..=255 => {
                    let count = 257 - length as usize;
                    if i >= input.len() {
                        return Err(Error::decode(FILTER_NAME, "missing byte for run"));
                    }
                    let byte = input[i];
                    i += 1;
                    output.resize(output.len() + count, byte);
                },
            }
        }

        Ok(output)
    }

    fn encode(&self, input: &[u8], _params: Option<&Dictionary>) -> Result<Vec<u8>> {
        let mut output = Vec::new();
        let mut i = 0;

        while i < input.len() {
            // Measure the run starting here; runs of 2 are left literal
            // (a run packet would not save anything).
            let byte = input[i];
            let mut run = 1;
            while run < 128 && i + run < input.len() && input[i + run] == byte {
                run += 1;
            }

            if run >= 3 {
                output.push((257 - run) as u8);
                output.push(byte);
                i += run;
                continue;
            }

            // Literal packet: extend until the next worthwhile run or 128 bytes.
            let start = i;
            i += run;
            while i < input.len() && i - start < 128 {
                let byte = input[i];
                let mut next_run = 1;
                while next_run < 3 && i + next_run < input.len() && input[i + next_run] == byte {
                    next_run += 1;
                }
                if next_run >= 3 {
                    break;
                }
                i += 1;
            }
            let len = (i - start).min(128);
            output.push((len - 1) as u8);
            output.extend_from_slice(&input[start..start + len]);
            i = start + len;
        }

        output.push(128); // EOD
        Ok(output)
    }

    fn name(&self) -> &str {
        FILTER_NAME
    }
}
