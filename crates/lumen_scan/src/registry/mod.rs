//! Language registry.
//!
//! Maps language codes to scanner factories. Every `get` builds a fresh
//! scanner, so a registry can serve any number of independent highlights.
//! The registry is a plain value: scanners that need other languages (diff)
//! receive it when they are created.

use std::fmt;

use tracing::debug;

use crate::languages;
use crate::{Scan, ScanError};

/// Builds a scanner, given the registry for scanners that embed others.
pub type Factory = fn(&ScannerRegistry) -> Result<Box<dyn Scan>, ScanError>;

/// Scores how likely a source is written in a language, in `[0, 1]`.
pub type GuessFn = fn(&str, &SourceInfo<'_>) -> f64;

/// Facts about a source computed once per guessing pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SourceInfo<'a> {
    pub num_lines: usize,
    pub first_line: &'a str,
    /// The source with leading whitespace removed.
    pub trimmed: &'a str,
}

impl<'a> SourceInfo<'a> {
    pub fn new(src: &'a str) -> Self {
        SourceInfo {
            num_lines: src.lines().count(),
            first_line: src.lines().next().unwrap_or(""),
            trimmed: src.trim_start(),
        }
    }
}

/// A scanner type the registry can build.
pub trait Language: Scan + Sized + 'static {
    /// Codes the language is registered under; the first is canonical.
    const CODES: &'static [&'static str];
    const DESCRIPTION: &'static str;

    fn create(registry: &ScannerRegistry) -> Result<Self, ScanError>;

    /// Likelihood that `src` is this language.
    fn guess(_src: &str, _info: &SourceInfo<'_>) -> f64 {
        0.0
    }
}

fn build<L: Language>(registry: &ScannerRegistry) -> Result<Box<dyn Scan>, ScanError> {
    Ok(Box::new(L::create(registry)?))
}

#[derive(Clone)]
struct Entry {
    codes: Vec<&'static str>,
    description: &'static str,
    factory: Factory,
    guess: GuessFn,
}

/// Language code to scanner factory table.
#[derive(Clone, Default)]
pub struct ScannerRegistry {
    entries: Vec<Entry>,
    default: Option<&'static str>,
}

impl fmt::Debug for ScannerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScannerRegistry")
            .field("languages", &self.entries.iter().map(|e| e.codes[0]).collect::<Vec<_>>())
            .field("default", &self.default)
            .finish()
    }
}

impl ScannerRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        ScannerRegistry::default()
    }

    /// Registry with every reference grammar, defaulting to plain text.
    pub fn with_defaults() -> Self {
        let mut registry = ScannerRegistry::new();
        languages::register_all(&mut registry);
        registry.set_default(languages::plain::PlainScanner::CODES[0]);
        registry
    }

    /// Register a [`Language`] type.
    pub fn register<L: Language>(&mut self) {
        self.add(L::CODES, L::DESCRIPTION, build::<L>, L::guess);
    }

    /// Register a factory under `codes`. Codes already taken move to the new
    /// entry.
    pub fn add(&mut self, codes: &[&'static str], description: &'static str, factory: Factory, guess: GuessFn) {
        for code in codes {
            self.remove_code(code);
        }
        if codes.is_empty() {
            return;
        }
        self.entries.push(Entry {
            codes: codes.to_vec(),
            description,
            factory,
            guess,
        });
    }

    fn remove_code(&mut self, code: &str) {
        for e in &mut self.entries {
            e.codes.retain(|c| !c.eq_ignore_ascii_case(code));
        }
        self.entries.retain(|e| !e.codes.is_empty());
    }

    /// Remove the language registered under `code`, with all its codes.
    pub fn remove(&mut self, code: &str) -> bool {
        let before = self.entries.len();
        self.entries
            .retain(|e| !e.codes.iter().any(|c| c.eq_ignore_ascii_case(code)));
        before != self.entries.len()
    }

    /// Language used when a lookup or guess fails.
    pub fn set_default(&mut self, code: &'static str) {
        self.default = Some(code);
    }

    pub fn default_code(&self) -> Option<&'static str> {
        self.default
    }

    fn entry(&self, code: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|e| e.codes.iter().any(|c| c.eq_ignore_ascii_case(code)))
    }

    pub fn contains(&self, code: &str) -> bool {
        self.entry(code).is_some()
    }

    /// Build a fresh scanner for `code`.
    pub fn get(&self, code: &str) -> Result<Box<dyn Scan>, ScanError> {
        let entry = self.entry(code).ok_or_else(|| ScanError::UnknownLanguage {
            code: code.to_owned(),
        })?;
        (entry.factory)(self)
    }

    /// Build the default scanner.
    pub fn get_default(&self) -> Result<Box<dyn Scan>, ScanError> {
        let code = self.default.ok_or_else(|| ScanError::UnknownLanguage {
            code: String::new(),
        })?;
        self.get(code)
    }

    /// `(codes, description)` of every registered language.
    pub fn languages(&self) -> impl Iterator<Item = (&[&'static str], &'static str)> {
        self.entries.iter().map(|e| (e.codes.as_slice(), e.description))
    }

    /// Most likely language for `src` with its score.
    ///
    /// Falls back to the default language with score `0.0` when nothing
    /// scores above zero. Ties go to the earliest registration.
    pub fn guess(&self, src: &str) -> Option<(&'static str, f64)> {
        let info = SourceInfo::new(src);
        let mut best: Option<(&'static str, f64)> = None;
        for e in &self.entries {
            let score = (e.guess)(src, &info).clamp(0.0, 1.0);
            if score > 0.0 && best.map_or(true, |(_, b)| score > b) {
                best = Some((e.codes[0], score));
            }
        }
        let guess = best.or_else(|| self.default.map(|code| (code, 0.0)));
        debug!(?guess, lines = info.num_lines, "guessed language");
        guess
    }
}
