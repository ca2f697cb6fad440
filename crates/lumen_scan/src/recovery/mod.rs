//! Dirty-exit recovery.
//!
//! A scanner embedded in a host language can be cut off in the middle of a
//! token, e.g. a JavaScript string interrupted by `<?php ... ?>`. It
//! records the part it has, remembers the interrupted kind and stops. When
//! the host hands control back, [`ExitState::resume`] consumes the rest of
//! the token with the kind's recovery pattern (the token's body without its
//! opening delimiter) before normal scanning continues.

use lumen_scan_core::{Kind, MatchData, Pattern};
use tracing::trace;

use crate::{EmbedFlags, EmbedOptions, ScanError, Scanner};

/// How the last `main` of an embeddable scanner ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExitState {
    interrupt: bool,
    clean_exit: bool,
    exit_kind: Option<Kind>,
}

impl Default for ExitState {
    fn default() -> Self {
        ExitState {
            interrupt: false,
            clean_exit: true,
            exit_kind: None,
        }
    }
}

impl ExitState {
    pub fn new() -> Self {
        ExitState::default()
    }

    /// Stopped mid-token and must resume.
    pub fn interrupted(&self) -> bool {
        self.interrupt
    }

    pub fn is_clean(&self) -> bool {
        self.clean_exit
    }

    /// The kind that was interrupted, while the exit is dirty.
    pub fn exit_kind(&self) -> Option<Kind> {
        if self.clean_exit {
            None
        } else {
            self.exit_kind
        }
    }

    /// Flag (or clear) an interruption at a token boundary, which needs no
    /// recovery but still hands control back to the host.
    pub fn set_interrupted(&mut self, interrupt: bool) {
        self.interrupt = interrupt;
    }

    /// Forget any pending interruption.
    pub fn clear(&mut self) {
        *self = ExitState::default();
    }

    /// Mark the exit as dirty inside a `kind` token.
    pub fn dirty_exit(&mut self, scanner: &Scanner, kind: Kind) -> Result<(), ScanError> {
        if scanner.grammar().recovery(kind).is_none() {
            return Err(ScanError::NoRecovery { kind });
        }
        trace!(language = scanner.language(), %kind, pos = scanner.pos(), "dirty exit");
        self.exit_kind = Some(kind);
        self.interrupt = true;
        self.clean_exit = false;
        Ok(())
    }

    /// Consume the rest of an interrupted token.
    ///
    /// Returns `None` when the last exit was clean. Otherwise scans the
    /// recovery pattern at the cursor and returns the interrupted kind with
    /// the recovered span, which the caller records (and may break again).
    pub fn resume(&mut self, scanner: &mut Scanner) -> Result<Option<(Kind, MatchData)>, ScanError> {
        if self.clean_exit {
            return Ok(None);
        }
        let Some(kind) = self.exit_kind.take() else {
            self.clear();
            return Ok(None);
        };
        self.clear();
        let pos = scanner.pos();
        let grammar = std::sync::Arc::clone(scanner.grammar());
        let pattern = grammar.recovery(kind).ok_or(ScanError::NoRecovery { kind })?;
        let data = scanner
            .scan(pattern)
            .ok_or(ScanError::RecoveryFailed { kind, pos })?;
        trace!(language = scanner.language(), %kind, pos, "resume");
        Ok(Some((kind, data)))
    }

    /// Break at a server-language opening tag inside `data`.
    ///
    /// When embedded in a server language and the span contains the server
    /// tag, records the part before the tag under `kind`, moves the cursor to
    /// the tag and exits dirty. Returns whether it broke.
    pub fn server_break(
        &mut self,
        scanner: &mut Scanner,
        opts: &EmbedOptions,
        kind: Kind,
        data: &MatchData,
    ) -> Result<bool, ScanError> {
        if !opts.flags.contains(EmbedFlags::SERVER) {
            return Ok(false);
        }
        let text = scanner.match_str(data);
        let Some(at) = text.find(opts.server_tag) else {
            return Ok(false);
        };
        let prefix = text[..at].to_owned();
        scanner.record(Some(kind), prefix);
        scanner.set_pos(data.start() + at);
        self.dirty_exit(scanner, kind)?;
        Ok(true)
    }

    /// Break at the host's closing script tag inside `data`.
    ///
    /// When embedded in HTML and `close` matches inside the span, records the
    /// part before it under `kind`, moves the cursor to the tag and exits
    /// cleanly.
    pub fn script_break(
        &mut self,
        scanner: &mut Scanner,
        opts: &EmbedOptions,
        close: &Pattern,
        kind: Kind,
        data: &MatchData,
    ) -> bool {
        if !opts.flags.contains(EmbedFlags::HTML) {
            return false;
        }
        let text = scanner.match_str(data);
        let Some(at) = close.find(text).map(|r| r.start) else {
            return false;
        };
        let prefix = text[..at].to_owned();
        scanner.record(Some(kind), prefix);
        scanner.set_pos(data.start() + at);
        self.clean_exit = true;
        self.interrupt = false;
        true
    }
}

impl Scanner {
    /// Close every open region, innermost first.
    ///
    /// Each region records what its recovery pattern matches at the cursor
    /// (or the whole rest when it has none) under its display kind. Whatever
    /// remains afterwards is recorded untagged, leaving the cursor at EOS.
    pub fn unwind_states(&mut self) -> Result<(), ScanError> {
        let grammar = std::sync::Arc::clone(self.grammar());
        while let Some(region) = self.state() {
            let name = region.name;
            let display = region.extra.or_else(|| grammar.display_kind(name));
            match grammar.recovery(name) {
                Some(pattern) => {
                    if let Some(data) = self.scan(pattern) {
                        self.record_match(display, &data);
                    }
                }
                None => self.record_rest(display),
            }
            trace!(language = self.language(), state = %name, "unwind");
            self.pop_state()?;
        }
        self.record_rest(None);
        Ok(())
    }
}

#[cfg(test)]
mod tests;
