//! PDF object types.
//!
//! The `Object` enum is the value type of the document graph. A few
//! representation choices matter for round-tripping:
//!
//! - Integers and reals are distinct variants; `1` never becomes `1.0`.
//! - Strings remember whether they came from literal `(...)` or hex `<...>`
//!   syntax, so serialization can reproduce the source form. Equality is
//!   byte-exact and ignores the form.
//! - Dictionaries preserve insertion order (`IndexMap`), which keeps output
//!   stable without sorting keys.
//! - Streams carry a `decoded` flag: `false` while the payload is the raw
//!   filtered bytes from the file, `true` once it has been run through the
//!   filter chain (the writer re-encodes in that case).

use crate::error::{Error, Result};

/// Dictionary type used throughout the crate. Insertion order is preserved.
pub type Dictionary = indexmap::IndexMap<String, Object>;

/// Source syntax of a string object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringFormat {
    /// Written as `(...)` with backslash escapes
    Literal,
    /// Written as `<...>` hex digits
    Hexadecimal,
}

/// PDF object representation.
#[derive(Debug, Clone)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array) plus the syntax it was written in
    String(Vec<u8>, StringFormat),
    /// Name (starting with /), `#xx` escapes already decoded
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs, insertion order preserved)
    Dictionary(Dictionary),
    /// Stream (dictionary + payload)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Payload bytes
        data: bytes::Bytes,
        /// Whether `data` holds decoded bytes (true) or the raw filtered
        /// bytes as stored in the file (false)
        decoded: bool,
    },
    /// Indirect object reference
    Reference(ObjectRef),
}

// String equality is byte-exact; the recorded syntax does not participate.
impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Null, Object::Null) => true,
            (Object::Boolean(a), Object::Boolean(b)) => a == b,
            (Object::Integer(a), Object::Integer(b)) => a == b,
            (Object::Real(a), Object::Real(b)) => a == b,
            (Object::String(a, _), Object::String(b, _)) => a == b,
            (Object::Name(a), Object::Name(b)) => a == b,
            (Object::Array(a), Object::Array(b)) => a == b,
            (Object::Dictionary(a), Object::Dictionary(b)) => a == b,
            (
                Object::Stream {
                    dict: da,
                    data: pa,
                    decoded: fa,
                },
                Object::Stream {
                    dict: db,
                    data: pb,
                    decoded: fb,
                },
            ) => da == db && pa == pb && fa == fb,
            (Object::Reference(a), Object::Reference(b)) => a == b,
            _ => false,
        }
    }
}

/// Reference to an indirect object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    /// Object number
    pub id: u32,
    /// Generation number
    pub gen: u16,
}

impl ObjectRef {
    /// Create a new object reference.
    pub fn new(id: u32, gen: u16) -> Self {
        Self { id, gen }
    }
}

impl std::fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} R", self.id, self.gen)
    }
}

impl Object {
    /// Build a literal string object from bytes.
    pub fn string(bytes: impl Into<Vec<u8>>) -> Self {
        Object::String(bytes.into(), StringFormat::Literal)
    }

    /// Build a name object.
    pub fn name(name: impl Into<String>) -> Self {
        Object::Name(name.into())
    }

    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(..) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
            Object::Reference(_) => "Reference",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Try to cast to reference.
    pub fn as_reference(&self) -> Option<ObjectRef> {
        match self {
            Object::Reference(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Object::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Try to cast to real number. Integers are not coerced.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Numeric value as f64, whichever variant holds it.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// Try to cast to string (bytes).
    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            Object::String(s, _) => Some(s),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Decode stream data using the filters named in the stream dictionary.
    ///
    /// Filters are applied in `/Filter` array order, each stage fed the
    /// matching `/DecodeParms` entry. Returns the payload unchanged when the
    /// stream is already decoded or carries no filters.
    pub fn decode_stream_data(&self) -> Result<Vec<u8>> {
        match self {
            Object::Stream {
                dict,
                data,
                decoded,
            } => {
                if *decoded {
                    return Ok(data.to_vec());
                }
                // Some generators leave extra whitespace after the "stream"
                // keyword; the payload proper starts at the first non-space.
                let raw = trim_leading_stream_whitespace(data);
                let stages = filter_stages(dict)?;
                if stages.is_empty() {
                    Ok(raw.to_vec())
                } else {
                    crate::filters::decode_chain(raw, &stages)
                }
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

/// One stage of a filter chain: filter name plus its parameter dictionary.
pub type FilterStage = (String, Option<Dictionary>);

/// Extract the filter chain from a stream dictionary, with `/DecodeParms`
/// aligned per stage.
///
/// `/Filter` may be a single Name or an Array of Names; `/DecodeParms`
/// mirrors that shape. A missing or Null parameter entry means the stage
/// takes no parameters. A `/Filter` entry that is neither form is an error.
pub fn filter_stages(dict: &Dictionary) -> Result<Vec<FilterStage>> {
    let names: Vec<String> = match dict.get("Filter") {
        None | Some(Object::Null) => return Ok(Vec::new()),
        Some(Object::Name(name)) => vec![name.clone()],
        Some(Object::Array(arr)) => {
            let mut names = Vec::with_capacity(arr.len());
            for obj in arr {
                match obj.as_name() {
                    Some(name) => names.push(name.to_string()),
                    None => {
                        return Err(Error::InvalidObjectType {
                            expected: "Name".to_string(),
                            found: obj.type_name().to_string(),
                        })
                    },
                }
            }
            names
        },
        Some(other) => {
            return Err(Error::InvalidObjectType {
                expected: "Name or Array".to_string(),
                found: other.type_name().to_string(),
            })
        },
    };

    let params: Vec<Option<Dictionary>> = match dict.get("DecodeParms") {
        None | Some(Object::Null) => vec![None; names.len()],
        Some(Object::Dictionary(d)) => {
            let mut v = vec![None; names.len()];
            if let Some(slot) = v.first_mut() {
                *slot = Some(d.clone());
            }
            v
        },
        Some(Object::Array(arr)) => {
            let mut v = Vec::with_capacity(names.len());
            for i in 0..names.len() {
                v.push(match arr.get(i) {
                    Some(Object::Dictionary(d)) => Some(d.clone()),
                    _ => None,
                });
            }
            v
        },
        // Tolerate junk here; filters that need parameters will complain.
        Some(other) => {
            log::warn!(
                "Ignoring malformed /DecodeParms of type {}",
                other.type_name()
            );
            vec![None; names.len()]
        },
    };

    Ok(names.into_iter().zip(params).collect())
}

/// Trim leading PDF whitespace from stream data.
///
/// Whitespace set per the file syntax: NUL, TAB, LF, FF, CR, SPACE.
fn trim_leading_stream_whitespace(data: &[u8]) -> &[u8] {
    let mut start = 0;
    while start < data.len() {
        match data[start] {
            0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20 => start += 1,
            _ => break,
        }
    }
    &data[start..]
}
