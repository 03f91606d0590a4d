//! Loaded document: lazy object resolution and mutation tracking.
//!
//! A [`Document`] owns the raw file bytes and the cross-reference table
//! parsed from them. Objects are materialized on first access through
//! [`Document::resolve`] and cached; nothing beyond the header, xref, and
//! trailer is touched at open time. The same structure doubles as the
//! mutable model for writing: objects added or changed in memory shadow
//! their on-disk versions until a save.

use crate::config::ReaderOptions;
use crate::error::{Error, Result};
use crate::lexer::{token, Token};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::objstm::parse_object_stream;
use crate::parser::parse_object_with_limit;
use crate::xref::{find_xref_offset, parse_xref, CrossRefTable, XRefEntry};
use bytes::Bytes;
use std::collections::{HashMap, HashSet};

/// How far into the file the `%PDF-` header marker may sit.
const HEADER_SCAN_WINDOW: usize = 1024;

/// An in-memory document backed by (possibly empty) file bytes.
pub struct Document {
    /// Original file bytes. Empty for documents built from scratch.
    pub(crate) data: Bytes,
    version: (u8, u8),
    pub(crate) xref: CrossRefTable,
    trailer: Dictionary,
    options: ReaderOptions,
    /// Materialized objects: parsed from the file, unpacked from object
    /// streams, or created in memory.
    cache: HashMap<ObjectRef, Object>,
    /// Objects created or changed since the document was opened.
    pub(crate) modified: HashSet<ObjectRef>,
    /// Object numbers released since the document was opened.
    pub(crate) freed: HashSet<u32>,
    /// Objects already written out by a writer. Frozen against mutation.
    pub(crate) flushed: HashSet<ObjectRef>,
    /// References currently being loaded, for cycle detection.
    resolving: HashSet<ObjectRef>,
    resolution_depth: u32,
}

impl Document {
    /// Create an empty document for building from scratch.
    ///
    /// Starts at version 1.7 with object number 0 as the free-list head.
    pub fn new() -> Self {
        let mut xref = CrossRefTable::new();
        xref.add_entry(
            0,
            XRefEntry::Free {
                next_free: 0,
                generation: 65535,
            },
        );
        Self {
            data: Bytes::new(),
            version: (1, 7),
            xref,
            trailer: Dictionary::new(),
            options: ReaderOptions::default(),
            cache: HashMap::new(),
            modified: HashSet::new(),
            freed: HashSet::new(),
            flushed: HashSet::new(),
            resolving: HashSet::new(),
            resolution_depth: 0,
        }
    }

    /// Open a document from raw bytes with default (lenient) options.
    pub fn open(data: impl Into<Bytes>) -> Result<Self> {
        Self::open_with_options(data, ReaderOptions::default())
    }

    /// Open a document from raw bytes.
    ///
    /// Parses the header version, locates the newest cross-reference
    /// section via `startxref`, and follows the `/Prev` chain. Any failure
    /// here fails the open outright; there is no partially loaded state.
    pub fn open_with_options(data: impl Into<Bytes>, options: ReaderOptions) -> Result<Self> {
        let data = data.into();
        let version = parse_header(&data, &options)?;
        let xref_offset = find_xref_offset(&data)?;
        let xref = parse_xref(&data, xref_offset, &options)?;
        let trailer = xref
            .trailer()
            .cloned()
            .ok_or_else(|| Error::InvalidXref("document has no trailer dictionary".to_string()))?;

        Ok(Self {
            data,
            version,
            xref,
            trailer,
            options,
            cache: HashMap::new(),
            modified: HashSet::new(),
            freed: HashSet::new(),
            flushed: HashSet::new(),
            resolving: HashSet::new(),
            resolution_depth: 0,
        })
    }

    /// Header version as (major, minor).
    pub fn version(&self) -> (u8, u8) {
        self.version
    }

    /// Set the header version written on the next full save.
    pub fn set_version(&mut self, major: u8, minor: u8) {
        self.version = (major, minor);
    }

    /// The trailer dictionary.
    pub fn trailer(&self) -> &Dictionary {
        &self.trailer
    }

    /// Mutable access to the trailer dictionary.
    pub fn trailer_mut(&mut self) -> &mut Dictionary {
        &mut self.trailer
    }

    /// The cross-reference table.
    pub fn xref(&self) -> &CrossRefTable {
        &self.xref
    }

    /// The options this document was opened with.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Resolve an indirect reference to its object.
    ///
    /// Loads lazily and caches: the first resolution of a reference parses
    /// it out of the file (or unpacks its object stream, caching every
    /// sibling object along the way); later resolutions are a map lookup.
    ///
    /// A reference whose target is absent, freed, or recorded under a
    /// different generation resolves to [`Object::Null`] with a warning,
    /// or fails with [`Error::ObjectNotFound`] in strict mode.
    pub fn resolve(&mut self, reference: ObjectRef) -> Result<Object> {
        if let Some(obj) = self.cache.get(&reference) {
            return Ok(obj.clone());
        }

        if self.resolving.contains(&reference) {
            return Err(Error::CircularReference(reference));
        }
        if self.resolution_depth >= self.options.max_recursion_depth {
            return Err(Error::RecursionLimitExceeded(
                self.options.max_recursion_depth,
            ));
        }

        self.resolving.insert(reference);
        self.resolution_depth += 1;
        let result = self.load_object(reference);
        self.resolution_depth -= 1;
        self.resolving.remove(&reference);

        result
    }

    /// Resolve a value that may be a reference, following reference chains.
    ///
    /// Non-reference values come back unchanged. A chain that loops fails
    /// with [`Error::CircularReference`].
    pub fn resolve_object(&mut self, value: &Object) -> Result<Object> {
        let mut current = value.clone();
        let mut seen = HashSet::new();
        while let Object::Reference(r) = current {
            if !seen.insert(r) {
                return Err(Error::CircularReference(r));
            }
            current = self.resolve(r)?;
        }
        Ok(current)
    }

    /// The document catalog, via the trailer's `/Root` entry.
    pub fn catalog(&mut self) -> Result<Object> {
        let root = self
            .trailer
            .get("Root")
            .cloned()
            .ok_or_else(|| Error::InvalidPdf("trailer has no /Root entry".to_string()))?;
        let catalog = self.resolve_object(&root)?;
        match catalog {
            Object::Dictionary(_) => Ok(catalog),
            other => Err(Error::InvalidObjectType {
                expected: "Dictionary".to_string(),
                found: other.type_name().to_string(),
            }),
        }
    }

    /// Add a new indirect object and return its reference.
    ///
    /// Reuses the lowest released object number, taking the generation the
    /// free-list entry reserved for it. With no reusable slot the number
    /// space grows by one.
    pub fn add_object(&mut self, obj: Object) -> ObjectRef {
        let slot = self
            .xref
            .entries
            .iter()
            .filter_map(|(&num, entry)| match entry {
                XRefEntry::Free { generation, .. } if num != 0 && *generation < 65535 => {
                    Some((num, *generation))
                },
                _ => None,
            })
            .min_by_key(|&(num, _)| num);

        let (id, gen) = match slot {
            Some(pair) => pair,
            None => (self.xref.max_object_number() + 1, 0),
        };

        let reference = ObjectRef::new(id, gen);
        self.xref.add_entry(
            id,
            XRefEntry::InUse {
                offset: 0,
                generation: gen,
            },
        );
        self.cache.insert(reference, obj);
        self.modified.insert(reference);
        self.freed.remove(&id);
        reference
    }

    /// Release an object number back to the free list.
    ///
    /// The slot's next generation is one past the released one, so a later
    /// reuse cannot alias stale references. Object number 0 is the
    /// permanent free-list head and cannot be released.
    pub fn free_object(&mut self, object_number: u32) -> Result<()> {
        if object_number == 0 {
            return Err(Error::InvalidPdf(
                "object number 0 is reserved for the free-list head".to_string(),
            ));
        }

        let old_gen = self
            .xref
            .get(object_number)
            .map(XRefEntry::generation)
            .unwrap_or(0);

        self.cache.remove(&ObjectRef::new(object_number, old_gen));
        self.modified.remove(&ObjectRef::new(object_number, old_gen));
        self.xref.free(object_number);
        self.freed.insert(object_number);
        Ok(())
    }

    /// Mutable access to an object, loading it first if needed.
    ///
    /// Marks the object modified. Objects a writer has already flushed are
    /// frozen and fail with [`Error::FlushedObjectMutation`].
    pub fn object_mut(&mut self, reference: ObjectRef) -> Result<&mut Object> {
        if self.flushed.contains(&reference) {
            return Err(Error::FlushedObjectMutation(reference));
        }
        if !self.cache.contains_key(&reference) {
            let obj = self.resolve(reference)?;
            if obj.is_null() && !self.cache.contains_key(&reference) {
                return Err(Error::ObjectNotFound(reference.id, reference.gen));
            }
        }
        self.modified.insert(reference);
        self.cache
            .get_mut(&reference)
            .ok_or(Error::ObjectNotFound(reference.id, reference.gen))
    }

    /// Replace an object wholesale.
    pub fn set_object(&mut self, reference: ObjectRef, obj: Object) -> Result<()> {
        if self.flushed.contains(&reference) {
            return Err(Error::FlushedObjectMutation(reference));
        }
        self.xref.add_entry(
            reference.id,
            XRefEntry::InUse {
                offset: 0,
                generation: reference.gen,
            },
        );
        self.cache.insert(reference, obj);
        self.modified.insert(reference);
        Ok(())
    }

    /// Turn a direct dictionary value into an indirect object.
    ///
    /// The value under `key` in the parent dictionary (or stream
    /// dictionary) moves into a new indirect object and the slot is
    /// replaced by a reference to it. A slot that already holds a
    /// reference is returned as-is.
    pub fn promote(&mut self, parent: ObjectRef, key: &str) -> Result<ObjectRef> {
        let value = {
            let parent_obj = self.object_mut(parent)?;
            let dict = parent_obj
                .as_dict()
                .ok_or_else(|| Error::InvalidObjectType {
                    expected: "Dictionary".to_string(),
                    found: parent_obj.type_name().to_string(),
                })?;
            dict.get(key)
                .cloned()
                .ok_or_else(|| Error::InvalidPdf(format!("no /{} entry to promote", key)))?
        };

        if let Object::Reference(r) = value {
            return Ok(r);
        }

        let reference = self.add_object(value);
        // Inserting over an existing key keeps its position in the dictionary.
        match self.object_mut(parent)? {
            Object::Dictionary(dict) | Object::Stream { dict, .. } => {
                dict.insert(key.to_string(), Object::Reference(reference));
            },
            _ => unreachable!("parent type checked above"),
        }
        Ok(reference)
    }

    /// Whether an object has in-memory changes not yet saved.
    pub fn is_modified(&self, reference: ObjectRef) -> bool {
        self.modified.contains(&reference)
    }

    /// References of every in-use object, from the cross-reference table
    /// and in-memory additions, in ascending number order.
    pub(crate) fn in_use_references(&self) -> Vec<ObjectRef> {
        let mut refs: Vec<ObjectRef> = self
            .xref
            .entries
            .iter()
            .filter_map(|(&num, entry)| match entry {
                XRefEntry::Free { .. } => None,
                XRefEntry::InUse { generation, .. } => Some(ObjectRef::new(num, *generation)),
                XRefEntry::Compressed { .. } => Some(ObjectRef::new(num, 0)),
            })
            .collect();
        refs.sort_by_key(|r| r.id);
        refs
    }

    /// Load an object through its cross-reference entry.
    fn load_object(&mut self, reference: ObjectRef) -> Result<Object> {
        let entry = self.xref.get(reference.id).cloned();
        match entry {
            Some(XRefEntry::InUse { offset, generation }) if generation == reference.gen => {
                let obj = self.parse_at(reference, offset as usize)?;
                self.cache.insert(reference, obj.clone());
                Ok(obj)
            },
            Some(XRefEntry::Compressed { container, .. }) if reference.gen == 0 => {
                self.load_from_object_stream(container, reference)
            },
            _ => self.missing_object(reference),
        }
    }

    /// Parse `N G obj ... endobj` at a file offset.
    fn parse_at(&self, reference: ObjectRef, offset: usize) -> Result<Object> {
        if offset >= self.data.len() {
            return Err(Error::InvalidXref(format!(
                "object {} offset {} is beyond end of input",
                reference.id, offset
            )));
        }
        let slice = &self.data[offset..];

        let bad_header = |reason: String| Error::ParseError { offset, reason };

        let (rest, id_token) =
            token(slice).map_err(|e| bad_header(format!("bad object header: {}", e)))?;
        let (rest, gen_token) =
            token(rest).map_err(|e| bad_header(format!("bad object header: {}", e)))?;
        let (rest, obj_token) =
            token(rest).map_err(|e| bad_header(format!("bad object header: {}", e)))?;

        let (id, gen) = match (&id_token, &gen_token, &obj_token) {
            (Token::Integer(id), Token::Integer(gen), Token::ObjStart)
                if *id >= 0 && *gen >= 0 =>
            {
                (*id as u32, *gen as u16)
            },
            _ => {
                return Err(bad_header(format!(
                    "expected object header, found {:?} {:?} {:?}",
                    id_token, gen_token, obj_token
                )))
            },
        };

        if id != reference.id || gen != reference.gen {
            let msg = format!(
                "offset {} holds object {} {} but the table maps it to {} {}",
                offset, id, gen, reference.id, reference.gen
            );
            if self.options.strict {
                return Err(Error::InvalidXref(msg));
            }
            log::warn!("{}", msg);
        }

        let (_, obj) =
            parse_object_with_limit(rest, self.options.max_nesting).map_err(|e| {
                Error::ParseError {
                    offset,
                    reason: format!("object {} {}: {}", reference.id, reference.gen, e),
                }
            })?;
        Ok(obj)
    }

    /// Unpack an object stream and cache everything in it.
    fn load_from_object_stream(&mut self, container: u32, wanted: ObjectRef) -> Result<Object> {
        let container_ref = ObjectRef::new(container, 0);
        let container_obj = self.resolve(container_ref)?;
        let unpacked = parse_object_stream(&container_obj)?;

        for (num, obj) in unpacked {
            let r = ObjectRef::new(num, 0);
            // In-memory edits shadow the packed version.
            if !self.modified.contains(&r) {
                self.cache.entry(r).or_insert(obj);
            }
        }

        match self.cache.get(&wanted) {
            Some(obj) => Ok(obj.clone()),
            None => {
                log::warn!(
                    "object stream {} does not contain object {}",
                    container,
                    wanted.id
                );
                self.missing_object(wanted)
            },
        }
    }

    fn missing_object(&self, reference: ObjectRef) -> Result<Object> {
        if self.options.strict {
            return Err(Error::ObjectNotFound(reference.id, reference.gen));
        }
        log::warn!(
            "reference {} {} R has no resolvable target, treating as null",
            reference.id,
            reference.gen
        );
        Ok(Object::Null)
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("version", &self.version)
            .field("bytes", &self.data.len())
            .field("xref_entries", &self.xref.len())
            .field("cached", &self.cache.len())
            .field("modified", &self.modified.len())
            .finish()
    }
}

/// Parse the `%PDF-M.m` header, allowing the marker to sit anywhere in the
/// first kilobyte in lenient mode.
fn parse_header(data: &[u8], options: &ReaderOptions) -> Result<(u8, u8)> {
    let window = &data[..data.len().min(HEADER_SCAN_WINDOW)];
    let marker = b"%PDF-";
    let pos = window
        .windows(marker.len())
        .position(|w| w == marker)
        .ok_or_else(|| Error::InvalidHeader("missing %PDF- marker".to_string()))?;

    if options.strict && pos != 0 {
        return Err(Error::InvalidHeader(format!(
            "%PDF- marker at offset {} rather than the start of the file",
            pos
        )));
    }

    let rest = &data[pos + marker.len()..];
    let (rest, major) = read_version_component(rest)
        .ok_or_else(|| Error::InvalidHeader("malformed version number".to_string()))?;
    let rest = rest
        .strip_prefix(b".")
        .ok_or_else(|| Error::InvalidHeader("malformed version number".to_string()))?;
    let (_, minor) = read_version_component(rest)
        .ok_or_else(|| Error::InvalidHeader("malformed version number".to_string()))?;

    Ok((major, minor))
}

fn read_version_component(data: &[u8]) -> Option<(&[u8], u8)> {
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
