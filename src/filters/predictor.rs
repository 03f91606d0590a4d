//! Predictor pre-filtering for Flate and LZW streams.
//!
//! `/DecodeParms` can specify a predictor (1 = none, 2 = TIFF, 10-15 = PNG)
//! that was applied to the data before compression. Decoding reverses the
//! predictor after decompression; encoding applies it before compression.
//! Cross-reference streams in the wild almost always use PNG Up (12).

use crate::error::{Error, Result};
use crate::object::Dictionary;

const FILTER_NAME: &str = "Predictor";

/// Predictor parameters extracted from a `/DecodeParms` dictionary.
#[derive(Debug, Clone)]
pub struct PredictorParams {
    /// Predictor algorithm (1 = none, 2 = TIFF, 10-15 = PNG)
    pub predictor: i64,
    /// Number of columns (width in samples)
    pub columns: usize,
    /// Number of color components per sample (default 1)
    pub colors: usize,
    /// Bits per component (default 8)
    pub bits_per_component: usize,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            predictor: 1,
            columns: 1,
            colors: 1,
            bits_per_component: 8,
        }
    }
}

impl PredictorParams {
    /// Read predictor parameters from a stage's `/DecodeParms` dictionary.
    pub fn from_dict(params: Option<&Dictionary>) -> Self {
        let Some(dict) = params else {
            return Self::default();
        };
        let int = |key: &str, default: i64| {
            dict.get(key).and_then(|o| o.as_integer()).unwrap_or(default)
        };
        Self {
            predictor: int("Predictor", 1),
            columns: int("Columns", 1).max(1) as usize,
            colors: int("Colors", 1).max(1) as usize,
            bits_per_component: int("BitsPerComponent", 8).max(1) as usize,
        }
    }

    /// Row size in the encoded form (PNG rows carry a leading tag byte).
    pub fn bytes_per_row(&self) -> usize {
        let pixel_bytes = (self.columns * self.colors * self.bits_per_component).div_ceil(8);
        if self.predictor >= 10 {
            pixel_bytes + 1
        } else {
            pixel_bytes
        }
    }

    /// Row size of the actual sample data, without any tag byte.
    pub fn pixel_bytes_per_row(&self) -> usize {
        (self.columns * self.colors * self.bits_per_component).div_ceil(8)
    }

    /// Undo the predictor after decompression.
    pub fn reverse(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.predictor {
            1 => Ok(data.to_vec()),
            2 => reverse_tiff(data, self),
            10..=15 => reverse_png(data, self),
            _ => Err(Error::decode(
                FILTER_NAME,
                format!("unsupported predictor {}", self.predictor),
            )),
        }
    }

    /// Apply the predictor before compression.
    pub fn apply(&self, data: &[u8]) -> Result<Vec<u8>> {
        match self.predictor {
            1 => Ok(data.to_vec()),
            2 => apply_tiff(data, self),
            10..=15 => apply_png(data, self),
            _ => Err(Error::decode(
                FILTER_NAME,
                format!("unsupported predictor {}", self.predictor),
            )),
        }
    }
}

fn check_row_multiple(len: usize, row: usize) -> Result<()> {
    if row == 0 || len % row != 0 {
        return Err(Error::decode(
            FILTER_NAME,
            format!("data length {} is not a multiple of row size {}", len, row),
        ));
    }
    Ok(())
}

/// TIFF predictor 2: each sample is the difference from its left neighbor.
fn reverse_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.pixel_bytes_per_row();
    let colors = params.colors;
    check_row_multiple(data.len(), bytes_per_row)?;

    let mut output = Vec::with_capacity(data.len());
    for row_data in data.chunks(bytes_per_row) {
        for (i, &byte) in row_data.iter().enumerate() {
            if i < colors {
                output.push(byte);
            } else {
                let left = output[output.len() - colors];
                output.push(byte.wrapping_add(left));
            }
        }
    }
    Ok(output)
}

fn apply_tiff(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.pixel_bytes_per_row();
    let colors = params.colors;
    check_row_multiple(data.len(), bytes_per_row)?;

    let mut output = Vec::with_capacity(data.len());
    for row_data in data.chunks(bytes_per_row) {
        for (i, &byte) in row_data.iter().enumerate() {
            if i < colors {
                output.push(byte);
            } else {
                output.push(byte.wrapping_sub(row_data[i - colors]));
            }
        }
    }
    Ok(output)
}

/// PNG predictors: each row starts with a tag byte naming the row's filter.
fn reverse_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let bytes_per_row = params.bytes_per_row();
    let pixel_bytes = params.pixel_bytes_per_row();
    check_row_multiple(data.len(), bytes_per_row)?;

    let row_count = data.len() / bytes_per_row;
    let mut output: Vec<u8> = Vec::with_capacity(row_count * pixel_bytes);
    let bpp = (params.colors * params.bits_per_component).div_ceil(8);

    for row_idx in 0..row_count {
        let row = &data[row_idx * bytes_per_row..(row_idx + 1) * bytes_per_row];
        let tag = row[0];
        let encoded = &row[1..];
        let start = output.len();

        for (i, &byte) in encoded.iter().enumerate() {
            let left = if i >= bpp { output[start + i - bpp] } else { 0 };
            let up = if row_idx > 0 {
                output[start - pixel_bytes + i]
            } else {
                0
            };
            let up_left = if row_idx > 0 && i >= bpp {
                output[start - pixel_bytes + i - bpp]
            } else {
                0
            };

            let reconstructed = match tag {
                0 => byte,
                1 => byte.wrapping_add(left),
                2 => byte.wrapping_add(up),
                3 => byte.wrapping_add(((left as u16 + up as u16) / 2) as u8),
                4 => byte.wrapping_add(paeth(left, up, up_left)),
                _ => {
                    return Err(Error::decode(
                        FILTER_NAME,
                        format!("invalid PNG row tag {}", tag),
                    ))
                },
            };
            output.push(reconstructed);
        }
    }

    Ok(output)
}

fn apply_png(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let pixel_bytes = params.pixel_bytes_per_row();
    check_row_multiple(data.len(), pixel_bytes)?;

    // Fixed tag per row; predictor 15 (per-row optimum) is written as Up,
    // which any reader accepts.
    let tag: u8 = match params.predictor {
        10 => 0,
        11 => 1,
        12 | 15 => 2,
        13 => 3,
        14 => 4,
        _ => unreachable!(),
    };

    let row_count = data.len() / pixel_bytes;
    let mut output = Vec::with_capacity(row_count * (pixel_bytes + 1));
    let bpp = (params.colors * params.bits_per_component).div_ceil(8);

    for row_idx in 0..row_count {
        let row = &data[row_idx * pixel_bytes..(row_idx + 1) * pixel_bytes];
        let prev_row = if row_idx > 0 {
            Some(&data[(row_idx - 1) * pixel_bytes..row_idx * pixel_bytes])
        } else {
            None
        };

        output.push(tag);
        for (i, &byte) in row.iter().enumerate() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = prev_row.map_or(0, |p| p[i]);
            let up_left = if i >= bpp { prev_row.map_or(0, |p| p[i - bpp]) } else { 0 };

            let filtered = match tag {
                0 => byte,
                1 => byte.wrapping_sub(left),
                2 => byte.wrapping_sub(up),
                3 => byte.wrapping_sub(((left as u16 + up as u16) / 2) as u8),
                4 => byte.wrapping_sub(paeth(left, up, up_left)),
                _ => unreachable!(),
            };
            output.push(filtered);
        }
    }

    Ok(output)
}

/// Paeth predictor function from the PNG specification.
fn paeth(a: u8, b: u8, c: u8) -> u8 {
    let (a, b, c) = (a as i16, b as i16, c as i16);
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();

    if pa <= pb && pa <= pc {
        a as u8
    } else if pb <= pc {
        b as u8
    } else {
        c as u8
    }
}
