//! # pdf_forge
//!
//! Document-model core for PDF files: a typed object graph, the filter
//! pipeline, cross-reference plumbing, and a reader/writer pair built on
//! top of them.
//!
//! ## Reading
//!
//! [`Document::open`] parses only the header, the cross-reference
//! table(s), and the trailer; objects load lazily on first
//! [`Document::resolve`] and stay cached. Classic tables, cross-reference
//! streams, hybrid files, and packed object streams are all handled.
//! The default reader is lenient and recovers from the common breakages
//! (stale `/Length`, dangling references, malformed table entries) with a
//! logged warning; [`config::ReaderOptions::strict`] turns each of those
//! into an error.
//!
//! ## Writing
//!
//! [`writer::DocumentWriter`] streams objects into an output buffer and
//! finishes with a classic cross-reference table, either as a full
//! rewrite or as an incremental update appended after the original bytes.
//!
//! ## Quick start
//!
//! ```ignore
//! use pdf_forge::{Document, Object, ObjectRef};
//! use pdf_forge::writer::{save_document, SaveMode};
//!
//! # fn main() -> pdf_forge::Result<()> {
//! let bytes = std::fs::read("input.pdf")?;
//! let mut doc = Document::open(bytes)?;
//!
//! let catalog = doc.catalog()?;
//! let note = doc.add_object(Object::string("annotated"));
//!
//! let updated = save_document(&mut doc, SaveMode::Incremental)?;
//! std::fs::write("output.pdf", updated)?;
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]

pub mod config;
pub mod document;
pub mod error;
pub mod filters;
pub mod lexer;
pub mod object;
pub mod objstm;
pub mod parser;
pub mod writer;
pub mod xref;

pub use config::ReaderOptions;
pub use document::Document;
pub use error::{Error, Result};
pub use object::{Dictionary, Object, ObjectRef, StringFormat};
pub use writer::{DocumentWriter, SaveMode};
pub use xref::{CrossRefTable, XRefEntry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
