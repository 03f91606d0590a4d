//! Document output: full rewrites and incremental updates.
//!
//! A [`DocumentWriter`] borrows a [`Document`] and streams objects into an
//! output buffer, recording the byte offset of each one for the
//! cross-reference table emitted at the end. Objects can be flushed
//! eagerly with [`DocumentWriter::flush_object`] to bound memory; a
//! flushed object is frozen in the source document, since its bytes are
//! already fixed in the output.
//!
//! Writes always emit a classic cross-reference table, whatever form the
//! source file used.

mod serializer;

pub use serializer::ObjectSerializer;

use crate::document::Document;
use crate::error::{Error, Result};
use crate::object::{Dictionary, Object, ObjectRef};
use crate::xref::{find_xref_offset, XRefEntry};
use std::collections::HashMap;
use std::io::Write;

/// Keys that describe the cross-reference section itself rather than the
/// document. Never carried over into a freshly written trailer.
const SECTION_KEYS: &[&str] = &[
    "Prev",
    "XRefStm",
    "Type",
    "W",
    "Index",
    "Filter",
    "DecodeParms",
    "Length",
];

/// What a save writes out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveMode {
    /// Rewrite the whole document: header, every live object, one
    /// cross-reference section.
    Full,
    /// Append changed objects and a delta cross-reference section after
    /// the original bytes, leaving them untouched.
    Incremental,
}

/// Streaming writer over a document.
pub struct DocumentWriter<'a> {
    doc: &'a mut Document,
    mode: SaveMode,
    output: Vec<u8>,
    /// Byte offset and generation of each object flushed so far.
    offsets: HashMap<u32, (u16, u64)>,
    serializer: ObjectSerializer,
}

impl<'a> DocumentWriter<'a> {
    /// Start a save of the given document.
    ///
    /// Incremental mode requires a document that was opened from bytes;
    /// there is nothing to append to otherwise.
    pub fn new(doc: &'a mut Document, mode: SaveMode) -> Result<Self> {
        let output = match mode {
            SaveMode::Full => {
                let (major, minor) = doc.version();
                let mut out = Vec::new();
                writeln!(out, "%PDF-{}.{}", major, minor)?;
                // Binary marker so transfer tools treat the file as binary.
                out.extend_from_slice(b"%\xE2\xE3\xCF\xD3\n");
                out
            },
            SaveMode::Incremental => {
                if doc.data.is_empty() {
                    return Err(Error::InvalidPdf(
                        "incremental save requires a document opened from bytes".to_string(),
                    ));
                }
                let mut out = doc.data.to_vec();
                if out.last() != Some(&b'\n') {
                    out.push(b'\n');
                }
                out
            },
        };

        Ok(Self {
            doc,
            mode,
            output,
            offsets: HashMap::new(),
            serializer: ObjectSerializer::new(),
        })
    }

    /// Write one object into the output now and freeze it.
    ///
    /// Records the object's byte offset for the cross-reference table and
    /// marks it flushed in the document, so later mutation attempts fail
    /// instead of silently diverging from the written bytes. Flushing the
    /// same object twice is an error for the same reason.
    pub fn flush_object(&mut self, reference: ObjectRef) -> Result<()> {
        if self.offsets.contains_key(&reference.id) {
            return Err(Error::FlushedObjectMutation(reference));
        }

        let obj = self.doc.resolve(reference)?;
        let offset = self.output.len() as u64;
        let bytes = self
            .serializer
            .serialize_indirect(reference.id, reference.gen, &obj)?;
        self.output.extend_from_slice(&bytes);
        self.offsets.insert(reference.id, (reference.gen, offset));
        self.doc.flushed.insert(reference);
        Ok(())
    }

    /// Flush everything still pending and finish the file.
    ///
    /// Full mode writes every live object; container objects (object
    /// streams and cross-reference streams) are skipped, since their
    /// contents come out as regular objects and their indexes describe the
    /// old file. Incremental mode writes only objects changed since open.
    pub fn save(mut self) -> Result<Vec<u8>> {
        let pending = match self.mode {
            SaveMode::Full => {
                let mut refs = Vec::new();
                let mut containers = Vec::new();
                for r in self.doc.in_use_references() {
                    if self.offsets.contains_key(&r.id) {
                        continue;
                    }
                    // Resolving here also unpacks compressed objects while
                    // their containers are still reachable.
                    if is_section_container(&self.doc.resolve(r)?) {
                        containers.push(r);
                    } else {
                        refs.push(r);
                    }
                }
                for r in containers {
                    self.doc.xref.add_entry(
                        r.id,
                        XRefEntry::Free {
                            next_free: 0,
                            generation: r.gen.saturating_add(1).min(65535),
                        },
                    );
                    self.doc.freed.insert(r.id);
                }
                refs
            },
            SaveMode::Incremental => {
                let mut refs: Vec<ObjectRef> = self
                    .doc
                    .modified
                    .iter()
                    .copied()
                    .filter(|r| !self.offsets.contains_key(&r.id))
                    .collect();
                refs.sort_by_key(|r| r.id);
                refs
            },
        };

        for r in pending {
            self.flush_object(r)?;
        }

        match self.mode {
            SaveMode::Full => self.finish_full(),
            SaveMode::Incremental => self.finish_incremental(),
        }
    }

    /// Emit the single cross-reference section of a full rewrite.
    ///
    /// Every number below the size that was not written is a free entry;
    /// the free entries chain through each other in ascending order, headed
    /// by object 0, with the last one pointing back to 0.
    fn finish_full(mut self) -> Result<Vec<u8>> {
        let size = self
            .offsets
            .keys()
            .copied()
            .max()
            .unwrap_or(0)
            .max(self.doc.xref.max_object_number())
            + 1;

        let free_numbers: Vec<u32> = (0..size)
            .filter(|num| !self.offsets.contains_key(num))
            .collect();
        let next_free: HashMap<u32, u32> = free_numbers
            .iter()
            .zip(free_numbers.iter().cycle().skip(1))
            .map(|(&cur, &next)| (cur, if next > cur { next } else { 0 }))
            .collect();

        let xref_start = self.output.len();
        writeln!(self.output, "xref")?;
        writeln!(self.output, "0 {}", size)?;
        for num in 0..size {
            match self.offsets.get(&num) {
                Some(&(gen, offset)) => {
                    writeln!(self.output, "{:010} {:05} n ", offset, gen)?;
                },
                None => {
                    let gen = if num == 0 {
                        65535
                    } else {
                        self.doc
                            .xref
                            .get(num)
                            .map(XRefEntry::generation)
                            .unwrap_or(0)
                    };
                    writeln!(self.output, "{:010} {:05} f ", next_free[&num], gen)?;
                },
            }
        }

        let mut trailer = strip_section_keys(self.doc.trailer());
        trailer.insert("Size".to_string(), Object::Integer(size as i64));
        self.write_trailer(&trailer, xref_start)?;
        Ok(self.output)
    }

    /// Emit the delta cross-reference section of an incremental update.
    ///
    /// Subsections cover the written and freed numbers, grouped into
    /// consecutive runs. When anything was freed, object 0 is rewritten to
    /// head the new free chain.
    fn finish_incremental(mut self) -> Result<Vec<u8>> {
        let prev = find_xref_offset(&self.doc.data)?;

        let mut freed: Vec<u32> = self.doc.freed.iter().copied().collect();
        freed.sort_unstable();

        // Each freed number points at the next; the last wraps to 0.
        let mut entries: HashMap<u32, String> = HashMap::new();
        for (i, &num) in freed.iter().enumerate() {
            let next = freed.get(i + 1).copied().unwrap_or(0);
            let gen = self
                .doc
                .xref
                .get(num)
                .map(XRefEntry::generation)
                .unwrap_or(0);
            entries.insert(num, format!("{:010} {:05} f \n", next, gen));
        }
        if let Some(&first_freed) = freed.first() {
            entries.insert(0, format!("{:010} 65535 f \n", first_freed));
        }
        for (&num, &(gen, offset)) in &self.offsets {
            entries.insert(num, format!("{:010} {:05} n \n", offset, gen));
        }

        let mut numbers: Vec<u32> = entries.keys().copied().collect();
        numbers.sort_unstable();

        let size = numbers
            .last()
            .copied()
            .unwrap_or(0)
            .max(self.doc.xref.max_object_number())
            + 1;

        let xref_start = self.output.len();
        writeln!(self.output, "xref")?;
        for run in consecutive_runs(&numbers) {
            writeln!(self.output, "{} {}", run[0], run.len())?;
            for num in run {
                self.output.extend_from_slice(entries[num].as_bytes());
            }
        }

        let mut trailer = strip_section_keys(self.doc.trailer());
        trailer.insert("Size".to_string(), Object::Integer(size as i64));
        trailer.insert("Prev".to_string(), Object::Integer(prev as i64));
        self.write_trailer(&trailer, xref_start)?;
        Ok(self.output)
    }

    fn write_trailer(&mut self, trailer: &Dictionary, xref_start: usize) -> Result<()> {
        writeln!(self.output, "trailer")?;
        let bytes = self
            .serializer
            .serialize(&Object::Dictionary(trailer.clone()))?;
        self.output.extend_from_slice(&bytes);
        writeln!(self.output)?;
        writeln!(self.output, "startxref")?;
        writeln!(self.output, "{}", xref_start)?;
        write!(self.output, "%%EOF")?;
        Ok(())
    }
}

/// Convenience entry point: flush everything and produce the file bytes.
pub fn save_document(doc: &mut Document, mode: SaveMode) -> Result<Vec<u8>> {
    DocumentWriter::new(doc, mode)?.save()
}

/// Object stream and cross-reference stream containers describe the layout
/// of the file they were read from, not the one being written.
fn is_section_container(obj: &Object) -> bool {
    match obj {
        Object::Stream { dict, .. } => matches!(
            dict.get("Type").and_then(Object::as_name),
            Some("ObjStm") | Some("XRef")
        ),
        _ => false,
    }
}

fn strip_section_keys(trailer: &Dictionary) -> Dictionary {
    let mut out = trailer.clone();
    for key in SECTION_KEYS {
        out.shift_remove(*key);
    }
    out
}

/// Group sorted numbers into runs of consecutive values.
fn consecutive_runs(numbers: &[u32]) -> Vec<&[u32]> {
    let mut runs = Vec::new();
    let mut start = 0;
    for i in 1..=numbers.len() {
        if i == numbers.len() || numbers[i] != numbers[i - 1] + 1 {
            runs.push(&numbers[start..i]);
            start = i;
        }
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consecutive_runs() {
        assert_eq!(
            consecutive_runs(&[0, 1, 2, 5, 6, 9]),
            vec![&[0, 1, 2][..], &[5, 6][..], &[9][..]]
        );
        assert_eq!(consecutive_runs(&[4]), vec![&[4][..]]);
        assert!(consecutive_runs(&[]).is_empty());
    }

    #[test]
    fn test_strip_section_keys() {
        let mut trailer = Dictionary::new();
        trailer.insert("Size".to_string(), Object::Integer(4));
        trailer.insert("Prev".to_string(), Object::Integer(100));
        trailer.insert("Type".to_string(), Object::name("XRef"));
        trailer.insert("Root".to_string(), Object::Integer(1));

        let out = strip_section_keys(&trailer);
        assert!(out.contains_key("Size"));
        assert!(out.contains_key("Root"));
        assert!(!out.contains_key("Prev"));
        assert!(!out.contains_key("Type"));
    }

    #[test]
    fn test_incremental_requires_backing_bytes() {
        let mut doc = Document::new();
        assert!(DocumentWriter::new(&mut doc, SaveMode::Incremental).is_err());
    }

    #[test]
    fn test_full_save_of_new_document_roundtrips() {
        let mut doc = Document::new();
        let value = doc.add_object(Object::string("payload"));
        let mut catalog = Dictionary::new();
        catalog.insert("Type".to_string(), Object::name("Catalog"));
        catalog.insert("Data".to_string(), Object::Reference(value));
        let root = doc.add_object(Object::Dictionary(catalog));
        doc.trailer_mut()
            .insert("Root".to_string(), Object::Reference(root));

        let bytes = save_document(&mut doc, SaveMode::Full).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        assert!(text.starts_with("%PDF-1.7"));
        assert!(text.contains("xref"));
        assert!(text.ends_with("%%EOF"));

        let mut reopened = Document::open(bytes).unwrap();
        assert_eq!(reopened.resolve(value).unwrap(), Object::string("payload"));
        let cat = reopened.catalog().unwrap();
        assert_eq!(
            cat.as_dict().unwrap().get("Type").and_then(Object::as_name),
            Some("Catalog")
        );
    }

    #[test]
    fn test_full_save_free_chain_is_ascending() {
        let mut doc = Document::new();
        let a = doc.add_object(Object::Integer(1));
        let b = doc.add_object(Object::Integer(2));
        let c = doc.add_object(Object::Integer(3));
        doc.free_object(a.id).unwrap();
        doc.free_object(c.id).unwrap();
        let _keep = b;

        let bytes = save_document(&mut doc, SaveMode::Full).unwrap();
        let text = String::from_utf8_lossy(&bytes);
        // Free chain: 0 -> 1 -> 3 -> 0.
        assert!(text.contains("0000000001 65535 f "));
        assert!(text.contains("0000000003 00001 f "));
        assert!(text.contains("0000000000 00001 f "));
    }

    #[test]
    fn test_flush_object_twice_is_error() {
        let mut doc = Document::new();
        let r = doc.add_object(Object::Integer(1));
        let mut writer = DocumentWriter::new(&mut doc, SaveMode::Full).unwrap();
        writer.flush_object(r).unwrap();
        assert!(matches!(
            writer.flush_object(r).unwrap_err(),
            Error::FlushedObjectMutation(_)
        ));
    }

    #[test]
    fn test_flushed_object_is_frozen_in_document() {
        let mut doc = Document::new();
        let r = doc.add_object(Object::Integer(1));
        {
            let mut writer = DocumentWriter::new(&mut doc, SaveMode::Full).unwrap();
            writer.flush_object(r).unwrap();
            let _ = writer.save().unwrap();
        }
        assert!(matches!(
            doc.object_mut(r).unwrap_err(),
            Error::FlushedObjectMutation(_)
        ));
    }
}
