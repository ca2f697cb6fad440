//! Regex-or-division disambiguation for `/`.
//!
//! A slash starts a regex literal when the previous significant token
//! cannot end an operand: an operator, an opening bracket, the start of the
//! input, or one of a language's regex-introducing words (`split`, `if`,
//! ...). Untagged text and comments are skipped.

use lumen_scan_core::{Kind, Token};

/// Opening brackets, recorded separately so a following `/` is a regex.
pub const OPENER: Kind = Kind::new("OPENER");

/// Closing brackets.
pub const CLOSER: Kind = Kind::new("CLOSER");

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlashKind {
    Regex,
    Division,
}

/// Classify a `/` from the tokens recorded before it.
///
/// `regex_words` lists `IDENT` texts after which a slash opens a regex.
pub fn classify_slash(tokens: &[Token], regex_words: &[&str]) -> SlashKind {
    let significant = tokens
        .iter()
        .rev()
        .find(|t| t.kind.is_some_and(|k| !k.name().starts_with("COMMENT")));
    let Some(prev) = significant else {
        return SlashKind::Regex;
    };
    let regex = match prev.kind {
        Some(Kind::OPERATOR | OPENER) => true,
        Some(Kind::IDENT) => regex_words.contains(&prev.text.as_str()),
        _ => false,
    };
    if regex {
        SlashKind::Regex
    } else {
        SlashKind::Division
    }
}
