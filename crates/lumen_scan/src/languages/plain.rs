//! Plain text: the whole source as one untagged token.

use crate::{GrammarBuilder, Language, Scan, ScanError, Scanner, ScannerRegistry};

/// No patterns and no filters.
pub fn grammar() -> GrammarBuilder {
    GrammarBuilder::bare("plain")
}

#[derive(Debug)]
pub struct PlainScanner {
    scanner: Scanner,
}

impl PlainScanner {
    pub fn new() -> Self {
        PlainScanner {
            scanner: Scanner::new(grammar().build()),
        }
    }
}

impl Default for PlainScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scan for PlainScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn main(&mut self) -> Result<(), ScanError> {
        self.scanner.record_rest(None);
        Ok(())
    }
}

impl Language for PlainScanner {
    const CODES: &'static [&'static str] = &["plain", "text", "txt"];
    const DESCRIPTION: &'static str = "Plain text";

    fn create(_: &ScannerRegistry) -> Result<Self, ScanError> {
        Ok(Self::new())
    }
}
