//! Shared, immutable source text.
//!
//! A [`SourceBuffer`] is a reference-counted string. Cloning it is cheap and
//! every clone points at the same allocation, which is what lets a parent
//! scanner hand its buffer to child scanners without copying and compare
//! offsets across them.
//!
//! # Line Endings
//!
//! [`SourceBuffer::new`] keeps the text verbatim. [`SourceBuffer::normalized`]
//! rewrites `\r\n` and lone `\r` to `\n` first, for callers that want
//! line-oriented patterns (`$`, `^` in multi-line mode) to behave uniformly.

use std::borrow::Cow;
use std::ops::Range;
use std::sync::Arc;

use crate::Cursor;

/// `\r\n` and lone `\r` become `\n`. Borrows when there is nothing to rewrite.
pub fn normalize_newlines(src: &str) -> Cow<'_, str> {
    if src.contains('\r') {
        Cow::Owned(src.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(src)
    }
}

/// Immutable source text shared between a scanner and its children.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Default)]
pub struct SourceBuffer {
    text: Arc<str>,
}

impl SourceBuffer {
    /// Create a buffer holding `source` exactly as given.
    pub fn new(source: &str) -> Self {
        SourceBuffer {
            text: Arc::from(source),
        }
    }

    /// Create a buffer with `\r\n` and `\r` rewritten to `\n`.
    pub fn normalized(source: &str) -> Self {
        Self::new(&normalize_newlines(source))
    }

    /// The full source text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length of the source in bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// Whether the source is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Substring for a byte range, clamped to the buffer.
    ///
    /// Returns `""` for ranges that are empty, reversed, or not on char
    /// boundaries.
    pub fn slice(&self, range: Range<usize>) -> &str {
        let end = range.end.min(self.text.len());
        let start = range.start.min(end);
        self.text.get(start..end).unwrap_or("")
    }

    /// Largest char boundary that is `<= pos`, clamped to the buffer length.
    pub fn floor_char_boundary(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    /// Whether two buffers share the same allocation.
    pub fn ptr_eq(&self, other: &SourceBuffer) -> bool {
        Arc::ptr_eq(&self.text, &other.text)
    }

    /// Create a cursor positioned at the start of this buffer.
    pub fn cursor(&self) -> Cursor {
        Cursor::new(self.clone())
    }
}

impl From<&str> for SourceBuffer {
    fn from(source: &str) -> Self {
        SourceBuffer::new(source)
    }
}

impl From<String> for SourceBuffer {
    fn from(source: String) -> Self {
        SourceBuffer {
            text: Arc::from(source),
        }
    }
}
