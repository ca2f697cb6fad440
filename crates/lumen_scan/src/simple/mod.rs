//! Pattern-table main loop.
//!
//! Repeatedly takes the nearest match from the grammar's pattern table.
//! Text before it is recorded untagged. A kind with an override hands the
//! cursor (placed at the match start) to the handler; otherwise the match is
//! consumed and recorded under its kind. When nothing matches again, the
//! rest of the source is recorded untagged.

use std::sync::Arc;

use lumen_scan_core::NextMatch;
use tracing::trace;

use crate::{Grammar, Scan, ScanError, Scanner};

/// Drive `scanner` to EOS.
#[tracing::instrument(level = "debug", skip_all, fields(language = scanner.language()))]
pub fn run(scanner: &mut Scanner) -> Result<(), ScanError> {
    while !scanner.eos() {
        let from = scanner.pos();
        match scanner.next_match() {
            Some(next) => dispatch(scanner, next, from)?,
            None => {
                scanner.record_rest(None);
                break;
            }
        }
    }
    Ok(())
}

/// Handle one match found by [`Scanner::next_match`], recording the text
/// between `from` and the match start untagged.
pub fn dispatch(scanner: &mut Scanner, next: NextMatch, from: usize) -> Result<(), ScanError> {
    let start = next.data.start();
    scanner.record_range(from, start, None)?;
    let depth = scanner.depth();
    if let Some(handler) = scanner.grammar().override_for(next.kind) {
        trace!(kind = %next.kind, pos = start, "override");
        scanner.set_pos(start);
        handler(scanner, &next.data)?;
    } else {
        scanner.accept(&next.data);
        scanner.record_match(Some(next.kind), &next.data);
    }
    scanner.ensure_progress(start, depth)
}

/// A scanner whose main loop is [`run`].
#[derive(Debug)]
pub struct SimpleScanner {
    scanner: Scanner,
}

impl SimpleScanner {
    pub fn new(grammar: Arc<Grammar>) -> Self {
        SimpleScanner {
            scanner: Scanner::new(grammar),
        }
    }
}

impl Scan for SimpleScanner {
    fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    fn scanner_mut(&mut self) -> &mut Scanner {
        &mut self.scanner
    }

    fn main(&mut self) -> Result<(), ScanError> {
        run(&mut self.scanner)
    }
}

#[cfg(test)]
mod tests;
