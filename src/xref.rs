//! Cross-reference table.
//!
//! The cross-reference table maps object numbers to byte offsets, enabling
//! random access into the file without parsing every object. Both the
//! classic text table format and cross-reference streams are read; chained
//! tables (`/Prev`) merge newest-wins, so incremental updates shadow older
//! definitions.

use crate::config::ReaderOptions;
use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object};
use crate::parser::parse_object_with_limit;
use std::collections::HashMap;

/// How large a tail window to search for the `startxref` keyword.
const STARTXREF_WINDOW: usize = 2048;

/// Upper bound on one subsection's entry count, against hostile headers.
const MAX_SUBSECTION_COUNT: u32 = 1_000_000;

/// One cross-reference entry.
///
/// The three variants carry different payloads, so the fields only exist
/// where they mean something: a free entry has no byte offset, and a
/// compressed entry has no generation (objects in object streams are
/// implicitly generation 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Object slot is free; `next_free` links the free list.
    Free {
        /// Object number of the next free slot (0 terminates the list)
        next_free: u32,
        /// Generation to use if this slot is reused
        generation: u16,
    },
    /// Object stored directly in the file at a byte offset.
    InUse {
        /// Byte offset of the `N G obj` header
        offset: u64,
        /// Generation number
        generation: u16,
    },
    /// Object stored inside an object stream.
    Compressed {
        /// Object number of the containing object stream
        container: u32,
        /// Index of the object within the stream
        index: u16,
    },
}

impl XRefEntry {
    /// Generation number of the entry. Compressed objects are always
    /// generation 0.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Free { generation, .. } => *generation,
            XRefEntry::InUse { generation, .. } => *generation,
            XRefEntry::Compressed { .. } => 0,
        }
    }

    /// Whether this entry marks a free slot.
    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free { .. })
    }
}

/// Cross-reference table mapping object numbers to entries.
#[derive(Debug, Clone, Default)]
pub struct CrossRefTable {
    pub(crate) entries: HashMap<u32, XRefEntry>,
    /// Trailer dictionary. For cross-reference streams this is the stream
    /// dictionary itself.
    trailer: Option<Dictionary>,
}

impl CrossRefTable {
    /// Create a new empty cross-reference table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the trailer dictionary.
    pub fn set_trailer(&mut self, trailer: Dictionary) {
        self.trailer = Some(trailer);
    }

    /// Get the trailer dictionary if present.
    pub fn trailer(&self) -> Option<&Dictionary> {
        self.trailer.as_ref()
    }

    /// Add an entry.
    pub fn add_entry(&mut self, object_number: u32, entry: XRefEntry) {
        self.entries.insert(object_number, entry);
    }

    /// Get an entry by object number.
    pub fn get(&self, object_number: u32) -> Option<&XRefEntry> {
        self.entries.get(&object_number)
    }

    /// Mark an object number free and bump its generation.
    ///
    /// Returns the generation a future reuse of the number must carry.
    /// Generations saturate at 65535, which retires the number for good.
    pub fn free(&mut self, object_number: u32) -> u16 {
        let next_gen = self
            .entries
            .get(&object_number)
            .map(XRefEntry::generation)
            .unwrap_or(0)
            .saturating_add(1)
            .min(65535);
        self.entries.insert(
            object_number,
            XRefEntry::Free {
                next_free: 0,
                generation: next_gen,
            },
        );
        next_gen
    }

    /// Check if an object number has an entry.
    pub fn contains(&self, object_number: u32) -> bool {
        self.entries.contains_key(&object_number)
    }

    /// All object numbers with entries.
    pub fn all_object_numbers(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }

    /// Highest object number with an entry.
    pub fn max_object_number(&self) -> u32 {
        self.entries.keys().copied().max().unwrap_or(0)
    }

    /// Merge entries from an older table.
    ///
    /// Entries already in `self` win; this is the shadowing rule for
    /// incremental updates when following `/Prev` pointers.
    pub fn merge_from(&mut self, other: CrossRefTable) {
        for (obj_num, entry) in other.entries {
            self.entries.entry(obj_num).or_insert(entry);
        }
        if self.trailer.is_none() {
            self.trailer = other.trailer;
        }
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Find the byte offset of the newest cross-reference section.
///
/// Scans the tail of the file for the last `startxref` keyword and parses
/// the offset on the following line.
pub fn find_xref_offset(data: &[u8]) -> Result<u64> {
    let window_start = data.len().saturating_sub(STARTXREF_WINDOW);
    let tail = &data[window_start..];

    let keyword = b"startxref";
    let pos = tail
        .windows(keyword.len())
        .rposition(|w| w == keyword)
        .ok_or_else(|| Error::InvalidXref("startxref keyword not found".to_string()))?;

    let after = &tail[pos + keyword.len()..];
    let digits_start = after
        .iter()
        .position(|c| c.is_ascii_digit())
        .ok_or_else(|| Error::InvalidXref("no offset after startxref".to_string()))?;
    let digits_end = after[digits_start..]
        .iter()
        .position(|c| !c.is_ascii_digit())
        .map(|p| digits_start + p)
        .unwrap_or(after.len());

    std::str::from_utf8(&after[digits_start..digits_end])
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .ok_or_else(|| Error::InvalidXref("malformed offset after startxref".to_string()))
}

/// Parse the cross-reference section at the given offset, following any
/// `/Prev` chain.
///
/// Detects classic tables versus cross-reference streams automatically.
/// Chain length is bounded by `options.max_xref_chain` so circular `/Prev`
/// pointers terminate.
pub fn parse_xref(data: &[u8], offset: u64, options: &ReaderOptions) -> Result<CrossRefTable> {
    parse_xref_chain(data, offset, options, 0)
}

fn parse_xref_chain(
    data: &[u8],
    offset: u64,
    options: &ReaderOptions,
    depth: u32,
) -> Result<CrossRefTable> {
    if depth > options.max_xref_chain {
        return Err(Error::InvalidXref(format!(
            "/Prev chain exceeds {} sections",
            options.max_xref_chain
        )));
    }
    if offset as usize >= data.len() {
        return Err(Error::InvalidXref(format!(
            "section offset {} is beyond end of input ({} bytes)",
            offset,
            data.len()
        )));
    }

    let slice = &data[offset as usize..];
    let head = slice
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .map(|p| &slice[p..])
        .unwrap_or(b"");

    let mut xref = if head.starts_with(b"xref") {
        log::debug!("classic cross-reference table at offset {}", offset);
        parse_classic_xref(slice, options)?
    } else if head.first().is_some_and(u8::is_ascii_digit) {
        log::debug!("cross-reference stream at offset {}", offset);
        parse_xref_stream(slice, options)?
    } else {
        return Err(Error::InvalidXref(format!(
            "offset {} points at neither a table nor a stream",
            offset
        )));
    };

    // Hybrid files carry a second, stream-form section alongside the
    // classic table. The table's own entries win on conflict.
    if let Some(stm_offset) = xref
        .trailer()
        .and_then(|t| t.get("XRefStm"))
        .and_then(Object::as_integer)
    {
        if stm_offset >= 0 && (stm_offset as usize) < data.len() {
            match parse_xref_stream(&data[stm_offset as usize..], options) {
                Ok(stm) => xref.merge_from(stm),
                Err(e) => log::warn!("ignoring unreadable /XRefStm section: {}", e),
            }
        }
    }

    if let Some(prev) = xref
        .trailer()
        .and_then(|t| t.get("Prev"))
        .and_then(Object::as_integer)
    {
        if prev < 0 {
            return Err(Error::InvalidXref(format!("negative /Prev offset {}", prev)));
        }
        let prev_xref = parse_xref_chain(data, prev as u64, options, depth + 1)?;
        xref.merge_from(prev_xref);
    }

    Ok(xref)
}

/// Line iterator that handles LF, CRLF, and bare CR endings, yielding the
/// byte position of each line start.
struct Lines<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Lines<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Lines<'a> {
    type Item = (usize, &'a [u8]);

    fn next(&mut self) -> Option<(usize, &'a [u8])> {
        if self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let mut end = start;
        while end < self.data.len() && self.data[end] != b'\r' && self.data[end] != b'\n' {
            end += 1;
        }
        self.pos = end;
        if self.pos < self.data.len() {
            if self.data[self.pos] == b'\r'
                && self.pos + 1 < self.data.len()
                && self.data[self.pos + 1] == b'\n'
            {
                self.pos += 2;
            } else {
                self.pos += 1;
            }
        }
        Some((start, &self.data[start..end]))
    }
}

/// Parse a classic cross-reference table.
///
/// Format:
/// ```text
/// xref
/// 0 6                    subsection: first object, entry count
/// 0000000000 65535 f     free entry (next-free, generation)
/// 0000000018 00000 n     in-use entry (offset, generation)
/// ...
/// trailer
/// << /Size 6 /Root 1 0 R >>
/// ```
fn parse_classic_xref(slice: &[u8], options: &ReaderOptions) -> Result<CrossRefTable> {
    let mut xref = CrossRefTable::new();
    let mut lines = Lines::new(slice);

    // The xref keyword, past any leading whitespace lines.
    loop {
        match lines.next() {
            Some((_, line)) => {
                let trimmed = trim_ascii(line);
                if trimmed.is_empty() {
                    continue;
                }
                if trimmed.starts_with(b"xref") {
                    break;
                }
                return Err(Error::InvalidXref(
                    "expected xref keyword at section start".to_string(),
                ));
            },
            None => return Err(Error::InvalidXref("empty cross-reference section".to_string())),
        }
    }

    let mut trailer_pos = None;

    'subsections: while let Some((line_start, line)) = lines.next() {
        let trimmed = trim_ascii(line);

        if let Some(rel) = find_keyword(line, b"trailer") {
            trailer_pos = Some(line_start + rel + b"trailer".len());
            break;
        }
        if trimmed.is_empty() || trimmed.starts_with(b"%") {
            continue;
        }

        // Subsection header: "first_object count"
        let header = std::str::from_utf8(trimmed).unwrap_or("");
        let mut parts = header.split_whitespace();
        let (start_obj, count) = match (
            parts.next().and_then(|p| p.parse::<u32>().ok()),
            parts.next().and_then(|p| p.parse::<u32>().ok()),
        ) {
            (Some(s), Some(c)) if parts.next().is_none() => (s, c),
            _ => {
                if options.strict {
                    return Err(Error::InvalidXref(format!(
                        "malformed subsection header {:?}",
                        header
                    )));
                }
                log::warn!("skipping malformed subsection header {:?}", header);
                continue;
            },
        };

        if count > MAX_SUBSECTION_COUNT {
            return Err(Error::InvalidXref(format!(
                "subsection count {} exceeds limit",
                count
            )));
        }

        let mut i = 0;
        while i < count {
            let (line_start, line) = match lines.next() {
                Some(l) => l,
                None => {
                    if options.strict {
                        return Err(Error::InvalidXref(format!(
                            "subsection truncated after {} of {} entries",
                            i, count
                        )));
                    }
                    log::warn!("subsection truncated after {} of {} entries", i, count);
                    break 'subsections;
                },
            };
            let trimmed = trim_ascii(line);
            if trimmed.is_empty() {
                continue;
            }
            if let Some(rel) = find_keyword(line, b"trailer") {
                if options.strict {
                    return Err(Error::InvalidXref(format!(
                        "trailer before {} of {} entries",
                        i, count
                    )));
                }
                log::warn!("expected {} entries but found {} before trailer", count, i);
                trailer_pos = Some(line_start + rel + b"trailer".len());
                break 'subsections;
            }

            match parse_classic_entry(trimmed) {
                Ok(entry) => xref.add_entry(start_obj + i, entry),
                Err(e) => {
                    if options.strict {
                        return Err(e);
                    }
                    // Keep the slot occupied so numbering stays aligned.
                    log::warn!("malformed entry for object {}: {}", start_obj + i, e);
                    xref.add_entry(
                        start_obj + i,
                        XRefEntry::Free {
                            next_free: 0,
                            generation: 65535,
                        },
                    );
                },
            }
            i += 1;
        }
    }

    match trailer_pos {
        Some(pos) => match parse_object_with_limit(&slice[pos..], options.max_nesting) {
            Ok((_, Object::Dictionary(dict))) => xref.set_trailer(dict),
            Ok((_, other)) => {
                let msg = format!("trailer is {} rather than a dictionary", other.type_name());
                if options.strict {
                    return Err(Error::InvalidXref(msg));
                }
                log::warn!("{}", msg);
            },
            Err(e) => {
                if options.strict {
                    return Err(Error::InvalidXref(format!("unparseable trailer: {}", e)));
                }
                log::warn!("unparseable trailer: {}", e);
            },
        },
        None => {
            if options.strict {
                return Err(Error::InvalidXref("missing trailer keyword".to_string()));
            }
            log::warn!("cross-reference table has no trailer");
        },
    }

    Ok(xref)
}

/// Parse one classic entry line: "nnnnnnnnnn ggggg n" or "... f".
fn parse_classic_entry(line: &[u8]) -> Result<XRefEntry> {
    let text = std::str::from_utf8(line)
        .map_err(|_| Error::InvalidXref("entry is not ASCII".to_string()))?;
    let parts: Vec<&str> = text.split_whitespace().collect();
    if parts.len() < 3 {
        return Err(Error::InvalidXref(format!("entry has {} fields", parts.len())));
    }

    let first: u64 = parts[0]
        .parse()
        .map_err(|_| Error::InvalidXref(format!("bad offset field {:?}", parts[0])))?;
    let generation: u16 = parts[1]
        .parse()
        .map_err(|_| Error::InvalidXref(format!("bad generation field {:?}", parts[1])))?;

    match parts[2] {
        "n" => Ok(XRefEntry::InUse {
            offset: first,
            generation,
        }),
        "f" => Ok(XRefEntry::Free {
            next_free: first as u32,
            generation,
        }),
        other => Err(Error::InvalidXref(format!("bad entry type flag {:?}", other))),
    }
}

/// Parse a cross-reference stream.
///
/// The stream is wrapped in an indirect object (`N G obj ... endobj`); its
/// dictionary doubles as the trailer. Binary rows have three fields whose
/// byte widths come from `/W`:
///
/// - field 1: entry type (0 free, 1 in-use, 2 compressed; default 1)
/// - field 2: next-free / offset / container object number
/// - field 3: generation / index within container
fn parse_xref_stream(slice: &[u8], options: &ReaderOptions) -> Result<CrossRefTable> {
    let (rest, _obj_num) = token(slice)
        .map_err(|e| Error::InvalidXref(format!("bad stream object header: {}", e)))?;
    let (rest, _gen) = token(rest)
        .map_err(|e| Error::InvalidXref(format!("bad stream object header: {}", e)))?;
    let (rest, obj_kw) = token(rest)
        .map_err(|e| Error::InvalidXref(format!("bad stream object header: {}", e)))?;
    if !matches!(obj_kw, Token::ObjStart) {
        return Err(Error::InvalidXref(
            "cross-reference stream missing obj keyword".to_string(),
        ));
    }

    let (_, obj) = parse_object_with_limit(rest, options.max_nesting)
        .map_err(|e| Error::InvalidXref(format!("unparseable stream object: {}", e)))?;

    let (dict, raw_data) = match obj {
        Object::Stream { dict, data, .. } => (dict, data),
        other => {
            return Err(Error::InvalidXref(format!(
                "expected a stream object, found {}",
                other.type_name()
            )))
        },
    };

    if let Some(type_name) = dict.get("Type").and_then(Object::as_name) {
        if type_name != "XRef" {
            return Err(Error::InvalidXref(format!(
                "stream has /Type /{}, expected /XRef",
                type_name
            )));
        }
    }

    let widths = dict
        .get("W")
        .and_then(Object::as_array)
        .ok_or_else(|| Error::InvalidXref("missing /W array".to_string()))?;
    if widths.len() != 3 {
        return Err(Error::InvalidXref(format!(
            "/W has {} elements, expected 3",
            widths.len()
        )));
    }
    let mut w = [0usize; 3];
    for (i, obj) in widths.iter().enumerate() {
        w[i] = match obj.as_integer() {
            Some(v) if (0..=8).contains(&v) => v as usize,
            _ => {
                return Err(Error::InvalidXref(format!(
                    "bad /W[{}] value {:?}",
                    i, obj
                )))
            },
        };
    }
    let entry_size = w[0] + w[1] + w[2];
    if entry_size == 0 {
        return Err(Error::InvalidXref("/W describes zero-width entries".to_string()));
    }

    let size = dict
        .get("Size")
        .and_then(Object::as_integer)
        .ok_or_else(|| Error::InvalidXref("missing /Size".to_string()))? as u32;

    let index_ranges: Vec<(u32, u32)> = match dict.get("Index") {
        None => vec![(0, size)],
        Some(obj) => {
            let arr = obj
                .as_array()
                .ok_or_else(|| Error::InvalidXref("/Index is not an array".to_string()))?;
            if arr.len() % 2 != 0 {
                return Err(Error::InvalidXref("/Index has odd length".to_string()));
            }
            arr.chunks_exact(2)
                .map(|pair| {
                    match (pair[0].as_integer(), pair[1].as_integer()) {
                        (Some(start), Some(count)) if start >= 0 && count >= 0 => {
                            Ok((start as u32, count as u32))
                        },
                        _ => Err(Error::InvalidXref("bad /Index pair".to_string())),
                    }
                })
                .collect::<Result<_>>()?
        },
    };

    let stages = crate::object::filter_stages(&dict)?;
    let decoded = if stages.is_empty() {
        raw_data.to_vec()
    } else {
        crate::filters::decode_chain_with_options(&raw_data, &stages, options)?
    };

    let mut xref = CrossRefTable::new();
    let mut pos = 0;

    for (start_obj, count) in index_ranges {
        for i in 0..count {
            if pos + entry_size > decoded.len() {
                return Err(Error::InvalidXref(format!(
                    "stream data truncated at entry for object {}",
                    start_obj + i
                )));
            }
            let row = &decoded[pos..pos + entry_size];
            pos += entry_size;

            // Width 0 for field 1 means every entry is type 1.
            let entry_type = if w[0] > 0 { read_int(&row[..w[0]]) } else { 1 };
            let field2 = read_int(&row[w[0]..w[0] + w[1]]);
            let field3 = read_int(&row[w[0] + w[1]..]);

            let entry = match entry_type {
                0 => XRefEntry::Free {
                    next_free: field2 as u32,
                    generation: field3 as u16,
                },
                1 => XRefEntry::InUse {
                    offset: field2,
                    generation: field3 as u16,
                },
                2 => XRefEntry::Compressed {
                    container: field2 as u32,
                    index: field3 as u16,
                },
                other => {
                    if options.strict {
                        return Err(Error::InvalidXref(format!(
                            "unknown entry type {} for object {}",
                            other,
                            start_obj + i
                        )));
                    }
                    // Unknown types resolve like absent entries.
                    log::warn!(
                        "ignoring unknown entry type {} for object {}",
                        other,
                        start_obj + i
                    );
                    continue;
                },
            };
            xref.add_entry(start_obj + i, entry);
        }
    }

    xref.set_trailer(dict);
    Ok(xref)
}

/// Big-endian integer from up to 8 bytes.
fn read_int(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | b as u64)
}

fn trim_ascii(line: &[u8]) -> &[u8] {
    let start = line
        .iter()
        .position(|c| !c.is_ascii_whitespace())
        .unwrap_or(line.len());
    let end = line
        .iter()
        .rposition(|c| !c.is_ascii_whitespace())
        .map(|p| p + 1)
        .unwrap_or(start);
    &line[start..end]
}

/// Position of `keyword` within `line` if the line begins with it (after
/// optional whitespace).
fn find_keyword(line: &[u8], keyword: &[u8]) -> Option<usize> {
    let start = line.iter().position(|c| !c.is_ascii_whitespace())?;
    if line[start..].starts_with(keyword) {
        Some(start)
    } else {
        None
    }
}
