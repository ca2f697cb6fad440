//! Generic scanning engine for lumen.
//!
//! Builds on the primitives in `lumen_scan_core`:
//!
//! - [`GrammarBuilder`] / [`Grammar`]: per-language patterns, identifier
//!   maps, overrides, filters, state transitions and recovery patterns
//! - [`Scanner`]: cursor, recorded output and region stack
//! - [`simple`] / [`stateful`]: the two generic main loops
//! - [`ExitState`]: dirty-exit bookkeeping for scanners embedded in a host
//!   language
//! - [`Children`]: child scanners sharing the parent's buffer
//! - [`ScannerRegistry`]: language code to scanner factory table
//! - [`languages`]: the reference grammars
//!
//! # Driving a Scanner
//!
//! ```text
//! let registry = ScannerRegistry::with_defaults();
//! let mut scanner = registry.get("c")?;
//! let markup = scanner.highlight("int x = 1;")?;
//! ```

mod embed;
mod error;
pub mod filters;
mod grammar;
pub mod languages;
pub mod presets;
mod recovery;
mod registry;
mod scanner;
pub mod simple;
mod slash;
mod state;
pub mod stateful;

pub use embed::{delegate, Children, EmbedFlags, EmbedOptions};
pub use error::ScanError;
pub use grammar::{Grammar, GrammarBuilder, OverrideFn, StreamFilter, StreamFilterFn, TokenFilter, TokenFilterFn};
pub use recovery::ExitState;
pub use registry::{Language, ScannerRegistry, SourceInfo};
pub use scanner::Scanner;
pub use simple::SimpleScanner;
pub use slash::{classify_slash, SlashKind, CLOSER, OPENER};
pub use state::{Region, StateStack, INITIAL};
pub use stateful::StatefulScanner;

pub use lumen_scan_core::{Kind, MatchData, Pattern, SourceBuffer, Token, TokenStream};

/// A runnable scanner.
///
/// Implementors own a [`Scanner`] and provide `main`. Scanners with child
/// scanners override [`Scan::set_source`] to hand the buffer down, and
/// embeddable scanners override [`Scan::interrupted`].
pub trait Scan: Send {
    fn scanner(&self) -> &Scanner;

    fn scanner_mut(&mut self) -> &mut Scanner;

    /// Scan from the current position until EOS or a break.
    fn main(&mut self) -> Result<(), ScanError>;

    /// Point at `buf` and clear all scan state.
    fn set_source(&mut self, buf: SourceBuffer) {
        self.scanner_mut().set_source(buf);
    }

    /// Render and drain the recorded output.
    fn tagged(&mut self) -> String {
        self.scanner_mut().tagged()
    }

    /// Whether the last `main` stopped in the middle of a construct it
    /// must resume later.
    fn interrupted(&self) -> bool {
        false
    }

    fn language(&self) -> &'static str {
        self.scanner().language()
    }

    fn pos(&self) -> usize {
        self.scanner().pos()
    }

    fn set_pos(&mut self, pos: usize) {
        self.scanner_mut().set_pos(pos);
    }

    /// Scan `src` from the start and render it.
    fn highlight(&mut self, src: &str) -> Result<String, ScanError> {
        self.highlight_buffer(SourceBuffer::new(src))
    }

    /// Scan a shared buffer from the start and render it.
    fn highlight_buffer(&mut self, buf: SourceBuffer) -> Result<String, ScanError> {
        self.set_source(buf);
        self.main()?;
        Ok(self.tagged())
    }
}

impl std::fmt::Debug for dyn Scan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scan")
            .field("language", &self.language())
            .field("pos", &self.pos())
            .finish()
    }
}
