//! Scanner error types.
//!
//! Only grammar bugs and request-level failures are errors. Unterminated
//! constructs and delegation boundaries are normal control flow and never
//! reach this type.

use lumen_scan_core::{Kind, PatternError};

/// Errors raised while building or running a scanner.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    // === Grammar Construction ===
    /// A grammar registered a pattern that does not compile.
    #[error(transparent)]
    InvalidPattern(#[from] PatternError),

    // === Scan-Time Invariants ===
    /// A dispatch step neither moved the cursor nor changed state.
    #[error("scanner `{language}` made no progress at offset {pos}")]
    NoProgress { language: &'static str, pos: usize },
    /// A dirty exit was requested for a kind with no recovery pattern.
    #[error("no dirty-exit recovery registered for `{kind}`")]
    NoRecovery { kind: Kind },
    /// A recovery pattern did not match where the scanner resumed.
    #[error("recovery pattern for `{kind}` failed to match at offset {pos}")]
    RecoveryFailed { kind: Kind, pos: usize },
    /// `pop_state` on an empty state stack.
    #[error("attempted to pop an empty state stack")]
    EmptyStateStack,
    /// `nestable_token` called where the opening pattern does not match.
    #[error("nestable `{kind}` requested at offset {pos}, but the opening delimiter is not there")]
    NestableMismatch { kind: Kind, pos: usize },
    /// `record_range` with `to < from`.
    #[error("invalid range [{from}, {to})")]
    InvalidRange { from: usize, to: usize },
    /// Delegation to a child scanner that was never registered.
    #[error("no child scanner named `{name}`")]
    UnknownChild { name: &'static str },

    // === Request Level ===
    /// No scanner registered under the requested language code.
    #[error("no scanner found for language `{code}`")]
    UnknownLanguage { code: String },
}
