//! Reader configuration: strictness and resource limits.

use crate::filters::{DEFAULT_MAX_DECOMPRESSED_SIZE, DEFAULT_MAX_DECOMPRESSION_RATIO};

/// Options controlling how tolerant the reader is of malformed input and
/// how much memory hostile input may cost.
///
/// # Example
///
/// ```
/// use pdf_forge::config::ReaderOptions;
///
/// // Fail on any structural irregularity
/// let strict = ReaderOptions::strict();
///
/// // Default: recover where a safe interpretation exists
/// let lenient = ReaderOptions::lenient();
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Fail on the first irregularity (true) or attempt recovery (false).
    ///
    /// Lenient recovery never invents structure: it only applies the named
    /// fallbacks (endstream scan, placeholder xref entries, dangling
    /// references as Null), each of which logs a warning.
    pub strict: bool,

    /// Maximum object nesting depth (stack protection for hostile files).
    pub max_nesting: usize,

    /// Maximum decompression ratio per stream (0 = unchecked).
    ///
    /// Guards against decompression bombs: tiny streams expanding to
    /// enormous buffers.
    pub max_decompression_ratio: u32,

    /// Maximum decompressed stream size in bytes (0 = unchecked).
    pub max_decompressed_size: usize,

    /// Maximum reference-resolution recursion depth.
    pub max_recursion_depth: u32,

    /// Maximum length of a `/Prev` cross-reference chain.
    pub max_xref_chain: u32,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self::lenient()
    }
}

impl ReaderOptions {
    /// Strict mode: reject anything the file syntax does not allow.
    pub fn strict() -> Self {
        Self {
            strict: true,
            max_nesting: 100,
            max_decompression_ratio: DEFAULT_MAX_DECOMPRESSION_RATIO,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            max_recursion_depth: 100,
            max_xref_chain: 100,
        }
    }

    /// Lenient mode (default): apply the documented recovery fallbacks.
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_nesting: 100,
            max_decompression_ratio: DEFAULT_MAX_DECOMPRESSION_RATIO,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
            max_recursion_depth: 100,
            max_xref_chain: 100,
        }
    }
}
