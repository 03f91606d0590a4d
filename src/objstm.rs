//! Object stream unpacking.
//!
//! Object streams (`/Type /ObjStm`) pack multiple non-stream objects into
//! one compressed stream. The decoded payload has two parts:
//!
//! ```text
//! 10 0 11 15 12 28     header: N pairs of (object number, offset)
//! <obj> <obj> <obj>    object data; offsets are relative to /First
//! ```
//!
//! `/N` gives the pair count and `/First` the byte offset where object
//! data begins. Objects inside a stream are implicitly generation 0 and
//! cannot themselves be streams or carry indirect definitions.

use crate::error::{Error, Result};
use crate::object::Object;
use crate::parser::parse_object;
use std::collections::HashMap;

/// Parse an object stream and extract every packed object.
///
/// Returns a map from object number to parsed object. Individual objects
/// that fail to parse are skipped with a warning so one corrupt entry does
/// not take down the rest of the stream.
pub fn parse_object_stream(stream_obj: &Object) -> Result<HashMap<u32, Object>> {
    let dict = match stream_obj {
        Object::Stream { dict, .. } => dict,
        other => {
            return Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "ObjStm" {
            return Err(Error::InvalidPdf(format!(
                "expected /Type /ObjStm, got /Type /{}",
                type_name
            )));
        }
    }

    let n = dict
        .get("N")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /N entry".to_string()))?;
    let first = dict
        .get("First")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidPdf("object stream missing /First entry".to_string()))?;

    // Sanity caps against hostile headers.
    if !(0..=1_000_000).contains(&n) {
        return Err(Error::InvalidPdf(format!("invalid /N value {}", n)));
    }
    if !(0..=10_000_000).contains(&first) {
        return Err(Error::InvalidPdf(format!("invalid /First value {}", first)));
    }

    let n = n as usize;
    let first = first as usize;

    let decoded = stream_obj.decode_stream_data()?;
    if decoded.len() < first {
        return Err(Error::InvalidPdf(format!(
            "object stream holds {} bytes but /First is {}",
            decoded.len(),
            first
        )));
    }

    let pairs = parse_object_number_pairs(&decoded[..first], n)?;
    let objects_data = &decoded[first..];
    let mut result = HashMap::new();

    for (obj_num, offset) in pairs {
        if offset >= objects_data.len() {
            log::warn!(
                "object {} offset {} is beyond stream data length {}",
                obj_num,
                offset,
                objects_data.len()
            );
            continue;
        }

        match parse_object(&objects_data[offset..]) {
            Ok((_, obj)) => {
                result.insert(obj_num, obj);
            },
            Err(e) => {
                log::warn!(
                    "skipping unparseable object {} at stream offset {}: {:?}",
                    obj_num,
                    offset,
                    e
                );
            },
        }
    }

    Ok(result)
}

/// Parse the header pairs: N pairs of (object number, offset).
fn parse_object_number_pairs(data: &[u8], count: usize) -> Result<Vec<(u32, usize)>> {
    let mut pairs = Vec::with_capacity(count);
    let mut remaining = data;

    for i in 0..count {
        remaining = skip_whitespace(remaining);
        let (rest, obj_num) = read_unsigned(remaining).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("missing object number for header pair {}", i),
        })?;

        remaining = skip_whitespace(rest);
        let (rest, offset) = read_unsigned(remaining).ok_or_else(|| Error::ParseError {
            offset: 0,
            reason: format!("missing offset for header pair {}", i),
        })?;

        pairs.push((obj_num as u32, offset as usize));
        remaining = rest;
    }

    Ok(pairs)
}

/// Whitespace set: NUL, TAB, LF, FF, CR, SPACE.
fn skip_whitespace(data: &[u8]) -> &[u8] {
    let mut i = 0;
    while i < data.len() {
        match data[i] {
            0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20 => i += 1,
            _ => break,
        }
    }
    &data[i..]
}

/// Read a run of ASCII digits as a u64.
fn read_unsigned(data: &[u8]) -> Option<(&[u8], u64)> {
    let end = data
        .iter()
        .position(|c| !c.is_ascii_digit())
        .unwrap_or(data.len());
    if end == 0 {
        return None;
    }
    let value = std::str::from_utf8(&data[..end]).ok()?.parse().ok()?;
    Some((&data[end..], value))
}
