//! Object serialization to file syntax.

use crate::error::Result;
use crate::filters::encode_chain;
use crate::object::{filter_stages, Dictionary, Object, StringFormat};
use std::borrow::Cow;
use std::io::Write;

/// Serializer for objects.
///
/// Dictionaries keep their insertion order, strings round-trip in the
/// format they were read in, and streams flagged as decoded are re-encoded
/// through their filter chain with `/Length` rewritten to match.
#[derive(Debug, Clone, Default)]
pub struct ObjectSerializer {
    /// Minimal whitespace instead of one dictionary entry per line.
    compact: bool,
}

impl ObjectSerializer {
    /// Create a serializer with default (readable) formatting.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compact serializer (minimal whitespace).
    pub fn compact() -> Self {
        Self { compact: true }
    }

    /// Serialize an object to bytes.
    pub fn serialize(&self, obj: &Object) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        self.write_object(&mut buf, obj)?;
        Ok(buf)
    }

    /// Serialize an object to a string (for debugging).
    pub fn serialize_to_string(&self, obj: &Object) -> Result<String> {
        Ok(String::from_utf8_lossy(&self.serialize(obj)?).to_string())
    }

    /// Serialize an indirect object definition.
    ///
    /// Format: `{id} {gen} obj\n{object}\nendobj\n`
    pub fn serialize_indirect(&self, id: u32, gen: u16, obj: &Object) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        writeln!(buf, "{} {} obj", id, gen)?;
        self.write_object(&mut buf, obj)?;
        write!(buf, "\nendobj\n")?;
        Ok(buf)
    }

    fn write_object(&self, w: &mut Vec<u8>, obj: &Object) -> Result<()> {
        match obj {
            Object::Null => write!(w, "null")?,
            Object::Boolean(b) => write!(w, "{}", if *b { "true" } else { "false" })?,
            Object::Integer(i) => write!(w, "{}", i)?,
            Object::Real(r) => self.write_real(w, *r)?,
            Object::String(s, format) => self.write_string(w, s, *format)?,
            Object::Name(n) => self.write_name(w, n)?,
            Object::Array(arr) => self.write_array(w, arr)?,
            Object::Dictionary(dict) => self.write_dictionary(w, dict)?,
            Object::Stream {
                dict,
                data,
                decoded,
            } => self.write_stream(w, dict, data, *decoded)?,
            Object::Reference(r) => write!(w, "{} {} R", r.id, r.gen)?,
        }
        Ok(())
    }

    /// Write a real number, trimming trailing zeros.
    fn write_real(&self, w: &mut Vec<u8>, value: f64) -> Result<()> {
        if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
            write!(w, "{}", value as i64)?;
        } else {
            let formatted = format!("{:.5}", value);
            let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
            write!(w, "{}", trimmed)?;
        }
        Ok(())
    }

    /// Write a string in the format it carries.
    ///
    /// Literal strings escape the delimiters and put non-printable bytes
    /// through octal escapes, so any byte payload survives either format.
    fn write_string(&self, w: &mut Vec<u8>, data: &[u8], format: StringFormat) -> Result<()> {
        match format {
            StringFormat::Literal => {
                write!(w, "(")?;
                for &byte in data {
                    match byte {
                        b'(' => write!(w, "\\(")?,
                        b')' => write!(w, "\\)")?,
                        b'\\' => write!(w, "\\\\")?,
                        b'\n' => write!(w, "\\n")?,
                        b'\r' => write!(w, "\\r")?,
                        b'\t' => write!(w, "\\t")?,
                        0x20..=0x7E => w.push(byte),
                        _ => write!(w, "\\{:03o}", byte)?,
                    }
                }
                write!(w, ")")?;
            },
            StringFormat::Hexadecimal => {
                write!(w, "<")?;
                for byte in data {
                    write!(w, "{:02X}", byte)?;
                }
                write!(w, ">")?;
            },
        }
        Ok(())
    }

    /// Write a name, escaping irregular bytes as `#xx`.
    fn write_name(&self, w: &mut Vec<u8>, name: &str) -> Result<()> {
        write!(w, "/")?;
        for byte in name.bytes() {
            match byte {
                b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%' => {
                    write!(w, "#{:02X}", byte)?;
                },
                0x21..=0x7E => w.push(byte),
                _ => write!(w, "#{:02X}", byte)?,
            }
        }
        Ok(())
    }

    fn write_array(&self, w: &mut Vec<u8>, arr: &[Object]) -> Result<()> {
        write!(w, "[")?;
        for (i, obj) in arr.iter().enumerate() {
            if i > 0 {
                write!(w, " ")?;
            }
            self.write_object(w, obj)?;
        }
        write!(w, "]")?;
        Ok(())
    }

    /// Write a dictionary in insertion order.
    fn write_dictionary(&self, w: &mut Vec<u8>, dict: &Dictionary) -> Result<()> {
        write!(w, "<<")?;
        for (key, value) in dict {
            if self.compact {
                write!(w, " ")?;
            } else {
                write!(w, "\n  ")?;
            }
            self.write_name(w, key)?;
            write!(w, " ")?;
            self.write_object(w, value)?;
        }
        if !dict.is_empty() {
            if self.compact {
                write!(w, " ")?;
            } else {
                writeln!(w)?;
            }
        }
        write!(w, ">>")?;
        Ok(())
    }

    /// Write a stream, re-encoding decoded payloads.
    ///
    /// A stream read through `decode_stream_data` holds plain bytes, so the
    /// declared filter chain is applied in encode order before the bytes go
    /// out. `/Length` always reflects the bytes actually written.
    fn write_stream(
        &self,
        w: &mut Vec<u8>,
        dict: &Dictionary,
        data: &[u8],
        decoded: bool,
    ) -> Result<()> {
        let payload: Cow<'_, [u8]> = if decoded {
            let stages = filter_stages(dict)?;
            if stages.is_empty() {
                Cow::Borrowed(data)
            } else {
                Cow::Owned(encode_chain(data, &stages)?)
            }
        } else {
            Cow::Borrowed(data)
        };

        let mut dict = dict.clone();
        dict.insert("Length".to_string(), Object::Integer(payload.len() as i64));

        self.write_dictionary(w, &dict)?;
        write!(w, "\nstream\n")?;
        w.extend_from_slice(&payload);
        write!(w, "\nendstream")?;
        Ok(())
    }
}
