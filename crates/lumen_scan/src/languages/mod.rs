//! Reference grammars.
//!
//! Each submodule exposes a `grammar()` (or `builder()`) returning the
//! language's [`GrammarBuilder`](crate::GrammarBuilder), so derived
//! languages and tests can layer on top of it, and a scanner type
//! implementing [`Language`](crate::Language).

pub mod actionscript;
pub mod bnf;
pub mod cpp;
pub mod css;
pub mod diff;
pub mod haskell;
pub mod html;
pub mod javascript;
pub mod perl;
pub mod php;
pub mod plain;

use std::sync::OnceLock;

use lumen_scan_core::Pattern;
use tracing::error;

use crate::ScannerRegistry;

/// Declare a scanner type whose main loop is [`simple::run`](crate::simple::run).
macro_rules! simple_language {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug)]
        pub struct $name {
            scanner: $crate::Scanner,
        }

        impl $name {
            pub fn new() -> Result<Self, $crate::ScanError> {
                Ok($name {
                    scanner: $crate::Scanner::new(grammar()?.build()),
                })
            }
        }

        impl $crate::Scan for $name {
            fn scanner(&self) -> &$crate::Scanner {
                &self.scanner
            }

            fn scanner_mut(&mut self) -> &mut $crate::Scanner {
                &mut self.scanner
            }

            fn main(&mut self) -> Result<(), $crate::ScanError> {
                $crate::simple::run(&mut self.scanner)
            }
        }
    };
}

pub(crate) use simple_language;

/// Register every reference grammar.
pub(crate) fn register_all(registry: &mut ScannerRegistry) {
    registry.register::<plain::PlainScanner>();
    registry.register::<cpp::CppScanner>();
    registry.register::<haskell::HaskellScanner>();
    registry.register::<javascript::JavaScriptScanner>();
    registry.register::<actionscript::ActionScriptScanner>();
    registry.register::<css::CssScanner>();
    registry.register::<html::HtmlScanner>();
    registry.register::<php::PhpScanner>();
    registry.register::<php::PhpSnippetScanner>();
    registry.register::<perl::PerlScanner>();
    registry.register::<bnf::BnfScanner>();
    registry.register::<diff::DiffScanner>();
    registry.register::<diff::PrettyDiffScanner>();
}

/// A guess heuristic, compiled on first use.
///
/// Guess functions cannot fail, so an invalid pattern is logged and never
/// matches; debug builds assert on it.
pub(crate) struct Heuristic {
    source: &'static str,
    pattern: OnceLock<Option<Pattern>>,
}

impl Heuristic {
    pub(crate) const fn new(source: &'static str) -> Self {
        Heuristic {
            source,
            pattern: OnceLock::new(),
        }
    }

    fn pattern(&self) -> Option<&Pattern> {
        self.pattern
            .get_or_init(|| {
                let compiled = Pattern::new(self.source);
                debug_assert!(compiled.is_ok(), "invalid guess heuristic {:?}", self.source);
                compiled
                    .map_err(|err| error!(pattern = self.source, %err, "invalid guess heuristic"))
                    .ok()
            })
            .as_ref()
    }

    /// Whether the pattern matches anywhere in `src`.
    pub(crate) fn is_match(&self, src: &str) -> bool {
        self.pattern().is_some_and(|p| p.is_match(src))
    }

    /// Number of matches in `src`.
    pub(crate) fn count(&self, src: &str) -> usize {
        self.pattern().map_or(0, |p| p.count(src))
    }
}

/// `guess_matches!(r"pattern", src)`: match a heuristic compiled once per
/// call site.
macro_rules! guess_matches {
    ($pattern:literal, $src:expr) => {{
        static HEURISTIC: $crate::languages::Heuristic = $crate::languages::Heuristic::new($pattern);
        HEURISTIC.is_match($src)
    }};
}

/// `guess_count!(r"pattern", src)`: count matches of a heuristic compiled
/// once per call site.
macro_rules! guess_count {
    ($pattern:literal, $src:expr) => {{
        static HEURISTIC: $crate::languages::Heuristic = $crate::languages::Heuristic::new($pattern);
        HEURISTIC.count($src)
    }};
}

pub(crate) use {guess_count, guess_matches};
