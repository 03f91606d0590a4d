//! Error types for the document-model and codec core.
//!
//! Codec errors (`Decode`, `UnsupportedEncode`) are stream-local: they fail
//! the operation on one stream without invalidating the document. Structural
//! errors (`InvalidHeader`, `ParseError`, `InvalidXref`) abort `Document::open`.

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reading, decoding, or writing a document.
#[derive(Debug, thiserror::Error)]
#[allow(clippy::enum_variant_names)] // "Invalid" prefix is intentional for clarity
pub enum Error {
    /// Invalid PDF header (expected '%PDF-')
    #[error("Invalid PDF header: expected '%PDF-', found '{0}'")]
    InvalidHeader(String),

    /// Parse error at specific byte offset
    #[error("Failed to parse object at byte {offset}: {reason}")]
    ParseError {
        /// Byte offset where error occurred
        offset: usize,
        /// Reason for parse failure
        reason: String,
    },

    /// Invalid cross-reference table
    #[error("Invalid cross-reference table: {0}")]
    InvalidXref(String),

    /// Referenced object not found in cross-reference table
    #[error("Object not found: {0} {1} R")]
    ObjectNotFound(u32, u16),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// Unexpected end of file
    #[error("End of file reached unexpectedly")]
    UnexpectedEof,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid PDF structure (generic)
    #[error("Invalid PDF: {0}")]
    InvalidPdf(String),

    /// Stream decoding error, tagged with the filter that failed
    #[error("{filter}: {reason}")]
    Decode {
        /// Name of the filter that failed
        filter: String,
        /// Reason for decode failure
        reason: String,
    },

    /// Filter is decode-only (e.g. CCITTFaxDecode, DCTDecode)
    #[error("Filter does not support encoding: {0}")]
    UnsupportedEncode(String),

    /// Unknown stream filter name
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Attempt to mutate or re-flush an object already flushed to output
    #[error("Object {0} has been flushed and can no longer be modified")]
    FlushedObjectMutation(crate::object::ObjectRef),

    /// Circular reference detected in object graph
    #[error("Circular reference detected: object {0}")]
    CircularReference(crate::object::ObjectRef),

    /// Recursion depth limit exceeded
    #[error("Recursion depth limit exceeded (max: {0})")]
    RecursionLimitExceeded(u32),
}

impl Error {
    /// Helper for filter implementations.
    pub(crate) fn decode(filter: &str, reason: impl Into<String>) -> Self {
        Error::Decode {
            filter: filter.to_string(),
            reason: reason.into(),
        }
    }
}
