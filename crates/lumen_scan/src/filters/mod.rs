//! Built-in token and stream filters.
//!
//! Every grammar created with [`GrammarBuilder::new`](crate::GrammarBuilder::new) gets these, in this
//! order, each under the name shown:
//!
//! | name             | kind        | effect                                      |
//! |------------------|-------------|---------------------------------------------|
//! | `map-ident`      | `IDENT`     | identifier classifier lookup                |
//! | `comment-note`   | `COMMENT`   | `TODO`, `FIXME`, ... wrapped in `COMMENT_NOTE` |
//! | `comment-to-doc` | `COMMENT`   | `/**`, `///`, `//!` become `DOCCOMMENT`     |
//! | `string-escape`  | `STRING`    | backslash escapes wrapped in `ESC`          |
//! | `char-escape`    | `CHARACTER` | same, for character literals                |
//! | `pcre`           | `REGEX`     | regex syntax markup                         |
//! | `user-defs`      | `IDENT`     | names the scanner recorded as user-defined  |
//! | `constant`       | `IDENT`     | `ALL_CAPS` names become `CONSTANT`          |
//! | `clean-ident`    | `IDENT`     | anything still `IDENT` is left untagged     |
//!
//! Stream filters: `rule-map` (display-kind remap) then `oo-syntax`
//! (identifiers after `.`, `->` or `::` become `OO`).
//!
//! Filters that inject markup escape the token first, so a later filter
//! never escapes injected tags a second time.

use std::sync::Arc;

use lumen_scan_core::markup::{escape_token, tag_matches};
use lumen_scan_core::{IdentifierMap, Kind, Pattern, PatternError, Token};
use rustc_hash::FxHashMap;

use crate::GrammarBuilder;

/// Read-only scanner state visible to filters.
#[derive(Clone, Copy, Debug)]
pub struct FilterContext<'a> {
    pub idents: &'a IdentifierMap,
    pub user_defs: &'a FxHashMap<String, Kind>,
    pub rule_map: &'a FxHashMap<Kind, Option<Kind>>,
}

/// Patterns used by the built-in filters, compiled once per grammar.
struct Builtins {
    note: Pattern,
    doc_line: Pattern,
    doc_brace: Pattern,
    escape: Pattern,
}

impl Builtins {
    fn compile() -> Result<Self, PatternError> {
        Ok(Builtins {
            note: Pattern::new(r"\b(?:NOTE|XXX|FIXME|TODO|HACK|BUG):?")?,
            doc_line: Pattern::new(r"(?m)^([/*#!\s]*)([@\\])(\S*)([ \t][^\n]*)?$")?,
            doc_brace: Pattern::new(r"\{[^}]*\}")?,
            escape: Pattern::new(
                r"(?i)\\(?:u[a-f0-9]{4,8}|[0-7]{1,3}|x[a-f0-9]{2}|&(?:lt|gt|amp);|.)",
            )?,
        })
    }
}

/// Install the default filter chain on `builder`.
pub(crate) fn install_defaults(builder: &mut GrammarBuilder) -> Result<(), PatternError> {
    let b = Arc::new(Builtins::compile()?);

    builder.add_filter(Some("map-ident"), Kind::IDENT, map_ident);
    let note = Arc::clone(&b);
    builder.add_filter(Some("comment-note"), Kind::COMMENT, move |t, _| {
        comment_note(&note, t)
    });
    let doc = Arc::clone(&b);
    builder.add_filter(Some("comment-to-doc"), Kind::COMMENT, move |t, _| {
        doc_comment(&doc, t)
    });
    let esc = Arc::clone(&b);
    builder.add_filter(Some("string-escape"), Kind::STRING, move |t, _| {
        string_escapes(&esc.escape, t)
    });
    let esc = Arc::clone(&b);
    builder.add_filter(Some("char-escape"), Kind::CHARACTER, move |t, _| {
        string_escapes(&esc.escape, t)
    });
    builder.add_filter(Some("pcre"), Kind::REGEX, move |t, _| {
        regex_syntax(&b.escape, t)
    });
    builder.add_filter(Some("user-defs"), Kind::IDENT, user_defs);
    builder.add_filter(Some("constant"), Kind::IDENT, upper_to_constant);
    builder.add_filter(Some("clean-ident"), Kind::IDENT, clean_ident);

    builder.add_stream_filter(Some("rule-map"), rule_map);
    builder.add_stream_filter(Some("oo-syntax"), oo_syntax);
    Ok(())
}

// === Identifier Filters ===

/// Classify an `IDENT` through the grammar's identifier map.
pub fn map_ident(mut token: Token, ctx: &FilterContext<'_>) -> Token {
    if token.is(Kind::IDENT) && !token.escaped {
        token.kind = Some(ctx.idents.classify(&token.text));
    }
    token
}

/// Apply kinds recorded for user-defined names (`function foo`, `class Bar`).
pub fn user_defs(mut token: Token, ctx: &FilterContext<'_>) -> Token {
    if let Some(kind) = ctx.user_defs.get(token.text.as_str()) {
        token.kind = Some(*kind);
    }
    token
}

/// `IDENT`s in `ALL_CAPS` (four or more chars) become `CONSTANT`.
pub fn upper_to_constant(mut token: Token, _: &FilterContext<'_>) -> Token {
    if token.is(Kind::IDENT) && is_constant_name(&token.text) {
        token.kind = Some(Kind::CONSTANT);
    }
    token
}

fn is_constant_name(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() >= 4
        && matches!(bytes[0], b'A'..=b'Z' | b'_')
        && bytes[1..]
            .iter()
            .all(|b| matches!(b, b'A'..=b'Z' | b'_' | b'0'..=b'9'))
        && bytes.iter().any(u8::is_ascii_uppercase)
}

/// Leftover `IDENT`s are rendered untagged.
pub fn clean_ident(mut token: Token, _: &FilterContext<'_>) -> Token {
    if token.is(Kind::IDENT) {
        token.kind = None;
    }
    token
}

// === Comment Filters ===

fn comment_note(b: &Builtins, token: Token) -> Token {
    if !b.note.is_match(&token.text) {
        return token;
    }
    let mut token = escape_token(token);
    token.text = tag_matches(&b.note, &token.text, Kind::COMMENT_NOTE);
    token
}

/// Doc comments open with a repeated comment char (or `!`) that is not
/// repeated again: `/**`, `///`, `//!`, `##` followed by text. Banner lines
/// like `/*****` stay plain comments.
fn is_doc_comment(text: &str) -> bool {
    let s = text.as_bytes();
    s.len() > 3 && (s[2] == s[1] || s[2] == b'!') && s[3] != s[2]
}

fn doc_comment(b: &Builtins, token: Token) -> Token {
    if !is_doc_comment(&token.text) {
        return token;
    }
    let mut token = escape_token(token);
    token.kind = Some(Kind::DOCCOMMENT);
    token.text = b.doc_line.replace_all_with(&token.text, |caps| {
        let lead = caps.get(1).map_or("", |m| m.as_str());
        let tag_char = caps.get(2).map_or("", |m| m.as_str());
        let tag = caps.get(3).map_or("", |m| m.as_str());
        let line = caps.get(4).map_or("", |m| m.as_str());
        doc_tag_line(b, lead, tag_char, tag, line)
    });
    token
}

/// Number of argument words a doxygen/javadoc command takes.
fn doc_tag_arity(tag: &str) -> usize {
    match tag.to_ascii_lowercase().as_str() {
        "addtogroup" | "category" | "class" | "def" | "defgroup" | "dir" | "enum"
        | "example" | "extends" | "file" | "headerfile" | "implements" | "ingroup"
        | "interface" | "namespace" | "memberof" | "package" | "page" | "relates"
        | "relatesalso" | "weakgroup" | "cond" | "elseif" | "exception" | "if" | "ifnot"
        | "par" | "param" | "tparam" | "retval" | "throw" | "throws" | "xrefitem" | "see"
        | "since" => 1,
        _ => 0,
    }
}

fn doc_tag_line(b: &Builtins, lead: &str, tag_char: &str, tag: &str, line: &str) -> String {
    let head = format!("{lead}<DOCTAG>{tag_char}{tag}</DOCTAG>");
    if line.trim_start().starts_with('{') {
        return head + &tag_matches(&b.doc_brace, line, Kind::DOCPROPERTY);
    }
    let arity = doc_tag_arity(tag);
    if arity == 0 {
        return head + line;
    }
    // Span of the leading whitespace plus `arity` words.
    let mut end = 0;
    let mut words = 0;
    let mut in_word = false;
    for (i, c) in line.char_indices() {
        if c.is_whitespace() {
            if in_word {
                words += 1;
                in_word = false;
                if words == arity {
                    end = i;
                    break;
                }
            }
        } else {
            in_word = true;
        }
        end = i + c.len_utf8();
    }
    let (args, rest) = line.split_at(end);
    format!("{head}<DOCPROPERTY>{args}</DOCPROPERTY>{rest}")
}

// === String Filters ===

fn string_escapes(escape: &Pattern, token: Token) -> Token {
    if !token.text.contains('\\') {
        return token;
    }
    let mut token = escape_token(token);
    token.text = tag_matches(escape, &token.text, Kind::ESC);
    token
}

/// Regex literal markup: escapes, operators, groups, classes, repeat
/// counts, trailing flags and `x`-mode comments.
fn regex_syntax(escape: &Pattern, token: Token) -> Token {
    let mut token = string_escapes(escape, escape_token(token));
    token.text = mark_regex(&token.text);
    token
}

fn wrap(out: &mut String, kind: &str, text: &str) {
    out.push('<');
    out.push_str(kind);
    out.push('>');
    out.push_str(text);
    out.push_str("</");
    out.push_str(kind);
    out.push('>');
}

/// Length of a `{n}`, `{n,}`, `{n,m}` or `{,m}` repeat marker at the start
/// of `s`, if there is one.
fn repeat_marker_len(s: &str) -> Option<usize> {
    let close = s.find('}')?;
    let inner = &s[1..close];
    let (lo, hi) = match inner.split_once(',') {
        Some((lo, hi)) => (lo, Some(hi)),
        None => (inner, None),
    };
    let digits = |t: &str| t.bytes().all(|b| b.is_ascii_digit());
    let ok = match hi {
        None => !lo.is_empty() && digits(lo),
        Some(hi) => digits(lo) && digits(hi) && !(lo.is_empty() && hi.is_empty()),
    };
    ok.then_some(close + 1)
}

/// Mark up escaped regex text. Existing tags (from the escape pass) and
/// entities are copied through untouched.
fn mark_regex(text: &str) -> String {
    // Trailing flags: an alphabetic run right after a non-alphanumeric,
    // non-space char, e.g. the `gi` in `/x/gi`.
    let body_end = text.trim_end_matches(|c: char| c.is_ascii_alphabetic()).len();
    let delimiter = text.chars().next();
    let has_flags = body_end > 1
        && body_end < text.len()
        && text[..body_end].chars().next_back() == delimiter
        && delimiter.is_some_and(|c| !c.is_alphanumeric() && !c.is_whitespace() && c != '&');
    let (body, flags) = if has_flags {
        text.split_at(body_end)
    } else {
        (text, "")
    };
    let extended = flags.contains('x');

    let mut out = String::with_capacity(text.len() * 2);
    let mut prev = '\0';
    let mut i = 0;
    while i < body.len() {
        let rest = &body[i..];
        let Some(c) = rest.chars().next() else { break };
        match c {
            '<' => {
                // Existing tag: copy through its closing counterpart.
                let len = rest
                    .find("</")
                    .and_then(|close| rest[close..].find('>').map(|e| close + e + 1))
                    .unwrap_or(rest.len());
                out.push_str(&rest[..len]);
                i += len;
                prev = '\\';
                continue;
            }
            '&' => {
                let len = rest.find(';').map_or(1, |e| e + 1);
                out.push_str(&rest[..len]);
                i += len;
                prev = '&';
                continue;
            }
            '*' | '+' | '.' | '|' => wrap(&mut out, "REGEX_OPERATOR", &rest[..1]),
            '?' if prev == '(' => {
                let sub = if rest[1..].starts_with("&lt;=") || rest[1..].starts_with("&lt;!") {
                    6
                } else if rest[1..].starts_with(|n: char| n.is_ascii_alphabetic() || ":!|=".contains(n)) {
                    2
                } else {
                    1
                };
                wrap(&mut out, "REGEX_SUBPATTERN", &rest[..sub]);
                i += sub;
                prev = '?';
                continue;
            }
            '?' => wrap(&mut out, "REGEX_OPERATOR", "?"),
            '(' | ')' => wrap(&mut out, "REGEX_SUBPATTERN_MARKER", &rest[..1]),
            '[' | ']' => wrap(&mut out, "REGEX_CLASS_MARKER", &rest[..1]),
            '{' => {
                if let Some(len) = repeat_marker_len(rest) {
                    wrap(&mut out, "REGEX_REPEAT_MARKER", &rest[..len]);
                    i += len;
                    prev = '}';
                    continue;
                }
                out.push(c);
            }
            '#' if extended => {
                let len = rest.find('\n').unwrap_or(rest.len());
                wrap(&mut out, "COMMENT", &rest[..len]);
                i += len;
                prev = '#';
                continue;
            }
            _ => out.push(c),
        }
        prev = c;
        i += c.len_utf8();
    }
    if !flags.is_empty() {
        wrap(&mut out, "KEYWORD", flags);
    }
    out
}

// === Stream Filters ===

/// Apply the grammar's rule-tag remap to every token.
pub fn rule_map(mut tokens: Vec<Token>, ctx: &FilterContext<'_>) -> Vec<Token> {
    if ctx.rule_map.is_empty() {
        return tokens;
    }
    for t in &mut tokens {
        if let Some(kind) = t.kind {
            if let Some(mapped) = ctx.rule_map.get(&kind) {
                t.kind = *mapped;
            }
        }
    }
    tokens
}

/// Identifiers directly after a member-access operator become `OO`.
pub fn oo_syntax(mut tokens: Vec<Token>, _: &FilterContext<'_>) -> Vec<Token> {
    for i in 1..tokens.len() {
        let after_access = {
            let prev = &tokens[i - 1];
            prev.is(Kind::OPERATOR)
                && (prev.text.ends_with('.')
                    || prev.text.ends_with("->")
                    || prev.text.ends_with("::"))
        };
        if after_access && tokens[i].is(Kind::IDENT) {
            tokens[i].kind = Some(Kind::OO);
        }
    }
    tokens
}

#[cfg(test)]
mod tests;
