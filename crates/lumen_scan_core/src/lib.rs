//! Scanning primitives shared by every lumen scanner.
//!
//! This crate has no `lumen_*` dependencies. It provides the pieces a
//! language scanner is assembled from:
//!
//! - [`SourceBuffer`]: immutable, cheaply shared source text
//! - [`Cursor`]: scan position with anchored matching, lookahead and unscan
//! - [`Pattern`] / [`PatternTable`]: compiled matchers and ordered dispatch
//! - [`IdentifierMap`]: word to kind classification
//! - [`Token`] / [`TokenStream`]: the recorded output
//! - [`markup`]: inline `<KIND>...</KIND>` markup helpers
//!
//! # Offsets
//!
//! All positions are byte offsets into the UTF-8 source and always sit on a
//! char boundary. A parent scanner and its children share one buffer, so
//! offsets can be compared directly across delegation boundaries.

mod cursor;
mod ident;
pub mod markup;
mod pattern;
mod source_buffer;
mod token;

pub use cursor::Cursor;
pub use ident::IdentifierMap;
pub use pattern::{MatchData, NextMatch, Pattern, PatternEntry, PatternError, PatternId, PatternTable};
pub use source_buffer::{normalize_newlines, SourceBuffer};
pub use token::{Kind, Token, TokenStream};
