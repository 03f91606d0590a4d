//! Object parser.
//!
//! Combines lexer tokens into complete objects (arrays, dictionaries,
//! indirect references, streams) by recursive descent:
//! 1. Read a token from the lexer
//! 2. Dispatch on the token type
//! 3. For composite types, recursively parse the contents
//!
//! Parsing functions return `IResult` from nom. A depth counter bounds
//! recursion so hostile nesting cannot overflow the stack.

use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef, StringFormat};
use nom::IResult;

/// Default nesting bound when no explicit limit is supplied.
const DEFAULT_MAX_NESTING: usize = 100;

/// Decode escape sequences in literal strings.
///
/// Literal strings (enclosed in parentheses) support:
///
/// - `\n` `\r` `\t` `\b` `\f` control characters
/// - `\(` `\)` `\\` escaped delimiters
/// - `\ddd` character with octal code (1-3 digits, overflow masked to a byte)
/// - `\<newline>` line continuation (produces nothing)
/// - any other `\x` keeps the backslash literally
///
/// # Examples
///
/// ```
/// # use pdf_forge::parser::decode_literal_string_escapes;
/// let decoded = decode_literal_string_escapes(b"Section \\247 71.01");
/// assert_eq!(decoded, b"Section \xa7 71.01");
/// ```
pub fn decode_literal_string_escapes(raw: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(raw.len());
    let mut i = 0;

    while i < raw.len() {
        if raw[i] == b'\\' && i + 1 < raw.len() {
            match raw[i + 1] {
                b'n' => {
                    result.push(b'\n');
                    i += 2;
                },
                b'r' => {
                    result.push(b'\r');
                    i += 2;
                },
                b't' => {
                    result.push(b'\t');
                    i += 2;
                },
                b'b' => {
                    result.push(0x08);
                    i += 2;
                },
                b'f' => {
                    result.push(0x0C);
                    i += 2;
                },
                b'(' => {
                    result.push(b'(');
                    i += 2;
                },
                b')' => {
                    result.push(b')');
                    i += 2;
                },
                b'\\' => {
                    result.push(b'\\');
                    i += 2;
                },
                // Line continuation: backslash followed by EOL produces nothing.
                b'\n' => {
                    i += 2;
                },
                b'\r' => {
                    i += 2;
                    if i < raw.len() && raw[i] == b'\n' {
                        i += 1;
                    }
                },
                c if (b'0'..b'8').contains(&c) => {
                    let start = i + 1;
                    let mut octal_value = 0u32;
                    let mut octal_len = 0;

                    for j in 0..3 {
                        match raw.get(start + j) {
                            Some(&d) if (b'0'..b'8').contains(&d) => {
                                octal_value = octal_value * 8 + (d - b'0') as u32;
                                octal_len += 1;
                            },
                            _ => break,
                        }
                    }

                    // Values above 255 are masked to the low byte.
                    result.push((octal_value & 0xFF) as u8);
                    i += 1 + octal_len;
                },
                // Unknown escape: the backslash stays literal.
                _ => {
                    result.push(b'\\');
                    i += 1;
                },
            }
        } else {
            result.push(raw[i]);
            i += 1;
        }
    }

    result
}

/// Parse an object from input bytes.
///
/// Handles every object type: null, booleans, integers, reals, strings,
/// names, arrays, dictionaries, streams, and indirect references
/// ("10 0 R"). Nesting is bounded by a default depth limit; use
/// [`parse_object_with_limit`] to control the bound.
///
/// # Example
///
/// ```
/// use pdf_forge::parser::parse_object;
///
/// let (remaining, obj) = parse_object(b"[ 1 2 /Name ]").unwrap();
/// assert!(obj.as_array().is_some());
/// ```
pub fn parse_object(input: &[u8]) -> IResult<&[u8], Object> {
    parse_object_at(input, 0, DEFAULT_MAX_NESTING)
}

/// Parse an object with an explicit nesting bound.
pub fn parse_object_with_limit(input: &[u8], max_nesting: usize) -> IResult<&[u8], Object> {
    parse_object_at(input, 0, max_nesting)
}

fn parse_object_at(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Object> {
    if depth > max_nesting {
        return Err(nom::Err::Failure(nom::error::Error::new(
            input,
            nom::error::ErrorKind::TooLarge,
        )));
    }

    let (input, tok) = token(input)?;

    match tok {
        Token::Null => Ok((input, Object::Null)),
        Token::True => Ok((input, Object::Boolean(true))),
        Token::False => Ok((input, Object::Boolean(false))),

        Token::Integer(i) => {
            // Could be a plain integer or the start of "num gen R".
            if i >= 0 && i <= u32::MAX as i64 {
                if let Ok((input2, Token::Integer(gen))) = token(input) {
                    if (0..=u16::MAX as i64).contains(&gen) {
                        if let Ok((input3, Token::R)) = token(input2) {
                            return Ok((
                                input3,
                                Object::Reference(ObjectRef::new(i as u32, gen as u16)),
                            ));
                        }
                    }
                }
            }
            Ok((input, Object::Integer(i)))
        },

        Token::Real(r) => Ok((input, Object::Real(r))),

        Token::LiteralString(bytes) => {
            let decoded = decode_literal_string_escapes(bytes);
            Ok((input, Object::String(decoded, StringFormat::Literal)))
        },

        Token::HexString(hex_bytes) => match decode_hex(hex_bytes) {
            Ok(decoded) => Ok((input, Object::String(decoded, StringFormat::Hexadecimal))),
            Err(_) => Err(nom::Err::Failure(nom::error::Error::new(
                input,
                nom::error::ErrorKind::Fail,
            ))),
        },

        Token::Name(name) => Ok((input, Object::Name(name))),

        Token::ArrayStart => parse_array(input, depth, max_nesting),

        Token::DictStart => {
            let (remaining, dict_obj) = parse_dictionary(input, depth, max_nesting)?;

            // A dictionary followed by the stream keyword is a stream object.
            if let Ok((stream_input, Token::StreamStart)) = token(remaining) {
                let dict = match dict_obj {
                    Object::Dictionary(d) => d,
                    _ => unreachable!("parse_dictionary returns Object::Dictionary"),
                };

                let (final_input, stream_data) = parse_stream_data(stream_input, &dict)?;

                return Ok((
                    final_input,
                    Object::Stream {
                        dict,
                        data: bytes::Bytes::from(stream_data),
                        decoded: false,
                    },
                ));
            }

            Ok((remaining, dict_obj))
        },

        _ => Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Tag,
        ))),
    }
}

/// Parse stream data after the `stream` keyword.
///
/// The keyword must be followed by CRLF or LF (CR alone and a missing EOL
/// are tolerated with a warning). `/Length` gives the payload size; when it
/// is missing, indirect, or does not land on the endstream keyword, the
/// payload is recovered by scanning for `endstream` instead.
fn parse_stream_data<'a>(input: &'a [u8], dict: &Dictionary) -> IResult<&'a [u8], Vec<u8>> {
    let input = if input.starts_with(b"\r\n") {
        &input[2..]
    } else if input.starts_with(b"\n") {
        &input[1..]
    } else if input.starts_with(b"\r") {
        log::warn!("stream keyword followed by CR alone, accepting");
        &input[1..]
    } else {
        log::warn!("no EOL after stream keyword, accepting");
        input
    };

    // Honor a direct /Length when it actually lands on endstream.
    if let Some(length) = dict.get("Length").and_then(Object::as_integer) {
        if length >= 0 && (length as usize) <= input.len() {
            let length = length as usize;
            let after = &input[length..];

            let ws_end = after
                .iter()
                .position(|c| !c.is_ascii_whitespace())
                .unwrap_or(after.len());
            if let Ok((remaining, Token::StreamEnd)) = token(&after[ws_end..]) {
                return Ok((remaining, input[..length].to_vec()));
            }

            log::warn!(
                "/Length {} does not land on endstream, scanning instead",
                length
            );
        } else {
            log::warn!("/Length {} exceeds remaining input, scanning instead", length);
        }
    }

    // /Length missing, indirect, or wrong: recover by scanning. The EOL
    // before endstream belongs to the keyword, not the data.
    if let Some(pos) = find_endstream(input) {
        let mut data = &input[..pos];
        if data.ends_with(b"\r\n") {
            data = &data[..data.len() - 2];
        } else if data.ends_with(b"\n") || data.ends_with(b"\r") {
            data = &data[..data.len() - 1];
        }

        let remaining = &input[pos..];
        let (remaining, _) = token(remaining)?; // consume endstream

        return Ok((remaining, data.to_vec()));
    }

    Err(nom::Err::Error(nom::error::Error::new(
        input,
        nom::error::ErrorKind::Eof,
    )))
}

/// Find the position of the endstream keyword.
fn find_endstream(input: &[u8]) -> Option<usize> {
    let keyword = b"endstream";
    input
        .windows(keyword.len())
        .position(|window| window == keyword)
}

/// Hard failure for input that ends inside an open structure.
fn truncated(input: &[u8]) -> nom::Err<nom::error::Error<&[u8]>> {
    nom::Err::Failure(nom::error::Error::new(input, nom::error::ErrorKind::Eof))
}

/// Parse an array: `[ obj1 obj2 ... objN ]`
///
/// An array left open at EOF is a hard failure; truncated structure never
/// yields a partial object.
fn parse_array(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Object> {
    let mut objects = Vec::new();
    let mut remaining = input;

    loop {
        if remaining.is_empty() {
            return Err(truncated(remaining));
        }
        match token(remaining) {
            Ok((inp, Token::ArrayEnd)) => {
                return Ok((inp, Object::Array(objects)));
            },
            Ok(_) => {
                let (inp, obj) = parse_object_at(remaining, depth + 1, max_nesting)?;
                objects.push(obj);
                remaining = inp;
            },
            Err(nom::Err::Incomplete(_)) => return Err(truncated(remaining)),
            Err(e) => return Err(e),
        }
    }
}

/// Parse a dictionary: `<< /Key1 value1 /Key2 value2 ... >>`
///
/// Keys must be names. A repeated key keeps the last value. Insertion
/// order is preserved by the dictionary type itself. A dictionary left
/// open at EOF is a hard failure.
fn parse_dictionary(input: &[u8], depth: usize, max_nesting: usize) -> IResult<&[u8], Object> {
    let mut dict = Dictionary::new();
    let mut remaining = input;

    loop {
        if remaining.is_empty() {
            return Err(truncated(remaining));
        }
        match token(remaining) {
            Ok((inp, Token::DictEnd)) => {
                return Ok((inp, Object::Dictionary(dict)));
            },
            Ok((inp, Token::Name(key))) => {
                let (inp, value) = parse_object_at(inp, depth + 1, max_nesting)?;
                dict.insert(key, value);
                remaining = inp;
            },
            Ok(_) => {
                return Err(nom::Err::Error(nom::error::Error::new(
                    remaining,
                    nom::error::ErrorKind::Tag,
                )));
            },
            Err(nom::Err::Incomplete(_)) => return Err(truncated(remaining)),
            Err(e) => return Err(e),
        }
    }
}

/// Decode a hex string to bytes.
///
/// Whitespace between digits is ignored. An odd digit count pads the last
/// digit with a trailing zero.
///
/// # Example
///
/// ```
/// use pdf_forge::parser::decode_hex;
///
/// assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
/// ```
pub fn decode_hex(hex_bytes: &[u8]) -> Result<Vec<u8>> {
    let mut result = Vec::with_capacity(hex_bytes.len() / 2 + 1);
    let mut pending: Option<u8> = None;

    for &c in hex_bytes {
        if crate::lexer::is_whitespace_char(c) {
            continue;
        }
        let nibble = match c {
            b'0'..=b'9' => c - b'0',
            b'a'..=b'f' => c - b'a' + 10,
            b'A'..=b'F' => c - b'A' + 10,
            _ => {
                return Err(Error::ParseError {
                    offset: 0,
                    reason: format!("invalid hex digit 0x{:02X}", c),
                })
            },
        };
        match pending.take() {
            Some(high) => result.push((high << 4) | nibble),
            None => pending = Some(nibble),
        }
    }

    // Odd digit count: the last digit is the high nibble.
    if let Some(high) = pending {
        result.push(high << 4);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn literal(s: &[u8]) -> Object {
        Object::String(s.to_vec(), StringFormat::Literal)
    }

    // ========================================================================
    // Primitive Type Tests
    // ========================================================================

    #[test]
    fn test_parse_null() {
        let (remaining, obj) = parse_object(b"null").unwrap();
        assert_eq!(remaining, &b""[..]);
        assert_eq!(obj, Object::Null);
    }

    #[test]
    fn test_parse_booleans() {
        assert_eq!(parse_object(b"true").unwrap().1, Object::Boolean(true));
        assert_eq!(parse_object(b"false").unwrap().1, Object::Boolean(false));
    }

    #[test]
    fn test_parse_integer() {
        assert_eq!(parse_object(b"42").unwrap().1, Object::Integer(42));
        assert_eq!(parse_object(b"-123").unwrap().1, Object::Integer(-123));
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn test_parse_real() {
        assert_eq!(parse_object(b"3.14").unwrap().1, Object::Real(3.14));
    }

    #[test]
    fn test_parse_name() {
        assert_eq!(
            parse_object(b"/Type").unwrap().1,
            Object::Name("Type".to_string())
        );
    }

    #[test]
    fn test_parse_literal_string() {
        let (remaining, obj) = parse_object(b"(Hello World)").unwrap();
        assert_eq!(remaining, &b""[..]);
        assert_eq!(obj, literal(b"Hello World"));
    }

    #[test]
    fn test_literal_string_records_format() {
        match parse_object(b"(abc)").unwrap().1 {
            Object::String(bytes, format) => {
                assert_eq!(bytes, b"abc");
                assert_eq!(format, StringFormat::Literal);
            },
            other => panic!("Expected string, got {:?}", other),
        }
    }

    // ========================================================================
    // Escape Sequence Tests
    // ========================================================================

    #[test]
    fn test_escape_sequences_single_char() {
        assert_eq!(
            parse_object(b"(Line1\\nLine2)").unwrap().1,
            literal(b"Line1\nLine2")
        );
        assert_eq!(
            parse_object(b"(Col1\\tCol2)").unwrap().1,
            literal(b"Col1\tCol2")
        );
        assert_eq!(
            parse_object(b"(Text\\bmore)").unwrap().1,
            literal(b"Text\x08more")
        );
        assert_eq!(
            parse_object(b"(Page1\\fPage2)").unwrap().1,
            literal(b"Page1\x0CPage2")
        );
        assert_eq!(
            parse_object(b"(Open \\( Close \\))").unwrap().1,
            literal(b"Open ( Close )")
        );
        assert_eq!(
            parse_object(b"(Path\\\\to\\\\file)").unwrap().1,
            literal(b"Path\\to\\file")
        );
    }

    #[test]
    fn test_escape_sequence_octal() {
        // \247 = 0xA7 (section sign)
        assert_eq!(
            parse_object(b"(Section \\247)").unwrap().1,
            literal(b"Section \xa7")
        );
        // \53 = '+'
        assert_eq!(parse_object(b"(Plus \\53)").unwrap().1, literal(b"Plus +"));
        // \7 = bell
        assert_eq!(
            parse_object(b"(Bell \\7)").unwrap().1,
            literal(b"Bell \x07")
        );
    }

    #[test]
    fn test_escape_sequence_octal_stops_at_non_octal() {
        // \128 = \12 (newline) followed by a literal '8'
        assert_eq!(
            parse_object(b"(Value \\128)").unwrap().1,
            literal(b"Value \n8")
        );
    }

    #[test]
    fn test_escape_sequence_line_continuation() {
        assert_eq!(
            parse_object(b"(This is a long \\\nstring)").unwrap().1,
            literal(b"This is a long string")
        );
    }

    #[test]
    fn test_escape_sequence_unknown_keeps_backslash() {
        assert_eq!(decode_literal_string_escapes(b"\\q"), b"\\q");
    }

    #[test]
    fn test_decode_literal_string_escapes_directly() {
        assert_eq!(decode_literal_string_escapes(b"Hello"), b"Hello");
        assert_eq!(decode_literal_string_escapes(b"\\n"), b"\n");
        assert_eq!(decode_literal_string_escapes(b"\\247"), b"\xa7");
        assert_eq!(decode_literal_string_escapes(b"\\(\\)"), b"()");
        assert_eq!(decode_literal_string_escapes(b"\\\\"), b"\\");
    }

    // ========================================================================
    // Hex String Tests
    // ========================================================================

    #[test]
    fn test_parse_hex_string() {
        let (_, obj) = parse_object(b"<48656C6C6F>").unwrap();
        assert_eq!(
            obj,
            Object::String(b"Hello".to_vec(), StringFormat::Hexadecimal)
        );
    }

    #[test]
    fn test_parse_hex_string_with_whitespace() {
        let (_, obj) = parse_object(b"<48 65 6C 6C 6F>").unwrap();
        assert_eq!(obj.as_string(), Some(&b"Hello"[..]));
    }

    #[test]
    fn test_parse_hex_string_odd_length() {
        // ABC -> AB C0
        let (_, obj) = parse_object(b"<ABC>").unwrap();
        assert_eq!(obj.as_string(), Some(&[0xAB, 0xC0][..]));
    }

    #[test]
    fn test_hex_and_literal_strings_compare_by_bytes() {
        let (_, hex) = parse_object(b"<48656C6C6F>").unwrap();
        let (_, lit) = parse_object(b"(Hello)").unwrap();
        assert_eq!(hex, lit);
    }

    #[test]
    fn test_decode_hex() {
        assert_eq!(decode_hex(b"48656C6C6F").unwrap(), b"Hello");
        assert_eq!(decode_hex(b"48 65 6C 6C 6F").unwrap(), b"Hello");
        assert_eq!(decode_hex(b"48\x0065").unwrap(), b"He");
        assert_eq!(decode_hex(b"").unwrap(), b"");
        assert_eq!(decode_hex(b"ABC").unwrap(), vec![0xAB, 0xC0]);
        assert!(decode_hex(b"4G").is_err());
    }

    // ========================================================================
    // Indirect Reference Tests
    // ========================================================================

    #[test]
    fn test_parse_indirect_reference() {
        assert_eq!(
            parse_object(b"10 0 R").unwrap().1,
            Object::Reference(ObjectRef::new(10, 0))
        );
        assert_eq!(
            parse_object(b"42 5 R").unwrap().1,
            Object::Reference(ObjectRef::new(42, 5))
        );
    }

    #[test]
    fn test_parse_integer_not_reference() {
        // Plain "10" with no "gen R" following
        assert_eq!(parse_object(b"10").unwrap().1, Object::Integer(10));
        // "10 20" is two integers, not a reference
        let (remaining, obj) = parse_object(b"10 20").unwrap();
        assert_eq!(obj, Object::Integer(10));
        assert_eq!(remaining, &b" 20"[..]);
    }

    #[test]
    fn test_negative_integer_never_starts_reference() {
        // -1 cannot be an object number, so no reference lookahead happens.
        let (remaining, obj) = parse_object(b"-1 0 R").unwrap();
        assert_eq!(obj, Object::Integer(-1));
        assert_eq!(remaining, &b" 0 R"[..]);
    }

    // ========================================================================
    // Array Tests
    // ========================================================================

    #[test]
    fn test_parse_empty_array() {
        assert_eq!(parse_object(b"[]").unwrap().1, Object::Array(vec![]));
    }

    #[test]
    fn test_parse_array_mixed_types() {
        let (_, obj) = parse_object(b"[ 1 /Name (string) true ]").unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Integer(1),
                Object::Name("Name".to_string()),
                literal(b"string"),
                Object::Boolean(true),
            ])
        );
    }

    #[test]
    fn test_parse_nested_arrays() {
        let (_, obj) = parse_object(b"[ 1 [ 2 3 ] 4 ]").unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Integer(1),
                Object::Array(vec![Object::Integer(2), Object::Integer(3)]),
                Object::Integer(4),
            ])
        );
    }

    #[test]
    fn test_parse_array_with_references() {
        let (_, obj) = parse_object(b"[ 10 0 R 20 0 R ]").unwrap();
        assert_eq!(
            obj,
            Object::Array(vec![
                Object::Reference(ObjectRef::new(10, 0)),
                Object::Reference(ObjectRef::new(20, 0)),
            ])
        );
    }

    // ========================================================================
    // Dictionary Tests
    // ========================================================================

    #[test]
    fn test_parse_empty_dictionary() {
        assert_eq!(
            parse_object(b"<<>>").unwrap().1,
            Object::Dictionary(Dictionary::new())
        );
    }

    #[test]
    fn test_parse_dictionary_multiple_entries() {
        let (_, obj) = parse_object(b"<< /Type /Page /Count 3 /Title (My Page) >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Page"));
        assert_eq!(dict.get("Count").unwrap().as_integer(), Some(3));
        assert_eq!(
            dict.get("Title").unwrap().as_string(),
            Some(&b"My Page"[..])
        );
    }

    #[test]
    fn test_dictionary_preserves_insertion_order() {
        let (_, obj) = parse_object(b"<< /Zebra 1 /Apple 2 /Mango 3 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        let keys: Vec<&str> = dict.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["Zebra", "Apple", "Mango"]);
    }

    #[test]
    fn test_dictionary_duplicate_key_last_wins() {
        let (_, obj) = parse_object(b"<< /Key 1 /Key 2 >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.len(), 1);
        assert_eq!(dict.get("Key").unwrap().as_integer(), Some(2));
    }

    #[test]
    fn test_parse_nested_dictionaries() {
        let (_, obj) = parse_object(b"<< /Outer << /Inner /Value >> >>").unwrap();
        let dict = obj.as_dict().unwrap();
        let inner = dict.get("Outer").unwrap().as_dict().unwrap();
        assert_eq!(inner.get("Inner").unwrap().as_name(), Some("Value"));
    }

    #[test]
    fn test_parse_dictionary_with_reference() {
        let (_, obj) = parse_object(b"<< /Pages 2 0 R >>").unwrap();
        let dict = obj.as_dict().unwrap();
        assert_eq!(
            dict.get("Pages").unwrap().as_reference(),
            Some(ObjectRef::new(2, 0))
        );
    }

    // ========================================================================
    // Stream Tests
    // ========================================================================

    #[test]
    fn test_parse_stream_with_length() {
        let input = b"<< /Length 5 >>\nstream\nHello\nendstream";
        let (remaining, obj) = parse_object(input).unwrap();
        assert_eq!(remaining, &b""[..]);
        match obj {
            Object::Stream { dict, data, decoded } => {
                assert_eq!(dict.get("Length").unwrap().as_integer(), Some(5));
                assert_eq!(&data[..], b"Hello");
                assert!(!decoded);
            },
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_missing_length_scans_for_endstream() {
        let input = b"<< /Type /XObject >>\nstream\nPayload\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Payload"),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_wrong_length_falls_back_to_scan() {
        // /Length 3 lands mid-payload, not on endstream
        let input = b"<< /Length 3 >>\nstream\nHello\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"Hello"),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_indirect_length_scans() {
        let input = b"<< /Length 9 0 R >>\nstream\nABC\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"ABC"),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_crlf_after_keyword() {
        let input = b"<< /Length 3 >>\nstream\r\nXYZ\r\nendstream";
        let (_, obj) = parse_object(input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], b"XYZ"),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_stream_binary_payload() {
        let mut input = b"<< /Length 4 >>\nstream\n".to_vec();
        input.extend_from_slice(&[0x00, 0xFF, 0x7F, 0x80]);
        input.extend_from_slice(b"\nendstream");
        let (_, obj) = parse_object(&input).unwrap();
        match obj {
            Object::Stream { data, .. } => assert_eq!(&data[..], &[0x00, 0xFF, 0x7F, 0x80]),
            other => panic!("Expected stream, got {:?}", other),
        }
    }

    // ========================================================================
    // Depth Limit Tests
    // ========================================================================

    #[test]
    fn test_nesting_depth_limit() {
        let mut input = Vec::new();
        for _ in 0..20 {
            input.push(b'[');
        }
        assert!(parse_object_with_limit(&input, 4).is_err());
    }

    #[test]
    fn test_nesting_within_limit() {
        let input = b"[[[1]]]";
        assert!(parse_object_with_limit(input, 10).is_ok());
    }

    // ========================================================================
    // Complex Nested Structure Tests
    // ========================================================================

    #[test]
    fn test_parse_complex_nested_structure() {
        let input = b"<< /Type /Catalog /Pages [ 1 0 R 2 0 R ] /Metadata << /Author (John) >> >>";
        let (remaining, obj) = parse_object(input).unwrap();
        assert_eq!(remaining, &b""[..]);

        let dict = obj.as_dict().unwrap();
        assert_eq!(dict.get("Type").unwrap().as_name(), Some("Catalog"));
        assert_eq!(dict.get("Pages").unwrap().as_array().unwrap().len(), 2);
        let metadata = dict.get("Metadata").unwrap().as_dict().unwrap();
        assert_eq!(
            metadata.get("Author").unwrap().as_string(),
            Some(&b"John"[..])
        );
    }

    // ========================================================================
    // Error Cases
    // ========================================================================

    #[test]
    fn test_parse_unclosed_array_is_hard_error() {
        assert!(matches!(
            parse_object(b"[ 1 2 3").unwrap_err(),
            nom::Err::Failure(_)
        ));
    }

    #[test]
    fn test_parse_unclosed_dictionary_is_hard_error() {
        assert!(matches!(
            parse_object(b"<< /Type /Page").unwrap_err(),
            nom::Err::Failure(_)
        ));
    }

    #[test]
    fn test_parse_unclosed_nested_structure_is_hard_error() {
        assert!(parse_object(b"<< /Kids [ 1 0 R").is_err());
        assert!(parse_object(b"[ << /A 1 >>").is_err());
    }

    #[test]
    fn test_parse_dictionary_missing_value() {
        assert!(parse_object(b"<< /Type >>").is_err());
    }

    #[test]
    fn test_parse_dictionary_non_name_key() {
        assert!(parse_object(b"<< 123 /Value >>").is_err());
    }

    // ========================================================================
    // Whitespace Handling Tests
    // ========================================================================

    #[test]
    fn test_parse_with_leading_whitespace() {
        assert_eq!(parse_object(b"  \n\t  42").unwrap().1, Object::Integer(42));
    }

    #[test]
    fn test_parse_with_extra_internal_whitespace() {
        let (_, obj) = parse_object(b"[  1   2    3  ]").unwrap();
        assert_eq!(obj.as_array().unwrap().len(), 3);
        let (_, obj) = parse_object(b"<<  /Type   /Page  >>").unwrap();
        assert_eq!(
            obj.as_dict().unwrap().get("Type").unwrap().as_name(),
            Some("Page")
        );
    }
}
