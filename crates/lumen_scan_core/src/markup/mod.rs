//! Inline tag markup.
//!
//! Scanner output is text with `<KIND>...</KIND>` tags around classified
//! spans. Raw text is escaped (`&`, `<`, `>`), so every `<` in the output
//! opens a tag and the original text can always be recovered with
//! [`strip`].

use crate::{Kind, Token};

/// Escape `&`, `<` and `>` in `text`.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    escape_into(&mut out, text);
    out
}

/// Escape `text` onto the end of `out`.
pub fn escape_into(out: &mut String, text: &str) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
}

/// Inverse of [`escape`].
pub fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];
        let (decoded, skip) = if rest.starts_with("&amp;") {
            ('&', 5)
        } else if rest.starts_with("&lt;") {
            ('<', 4)
        } else if rest.starts_with("&gt;") {
            ('>', 4)
        } else {
            ('&', 1)
        };
        out.push(decoded);
        rest = &rest[skip..];
    }
    out.push_str(rest);
    out
}

/// Escape a token's text unless it is already escaped.
pub fn escape_token(mut token: Token) -> Token {
    if !token.escaped {
        token.text = escape(&token.text);
        token.escaped = true;
    }
    token
}

/// Wrap `block` in `<KIND>` tags.
///
/// With `split_multiline`, tags are closed before every newline and reopened
/// after it, so each output line is balanced on its own.
pub fn tag_block(kind: Kind, block: &str, split_multiline: bool) -> String {
    let name = kind.name();
    let mut out = String::with_capacity(block.len() + 2 * name.len() + 5);
    out.push('<');
    out.push_str(name);
    out.push('>');
    if split_multiline {
        let mut lines = block.split('\n');
        if let Some(first) = lines.next() {
            out.push_str(first);
        }
        for line in lines {
            out.push_str("</");
            out.push_str(name);
            out.push_str(">\n<");
            out.push_str(name);
            out.push('>');
            out.push_str(line);
        }
    } else {
        out.push_str(block);
    }
    out.push_str("</");
    out.push_str(name);
    out.push('>');
    out
}

/// Wrap every match of `pattern` in `text` with `<KIND>` tags.
pub fn tag_matches(pattern: &crate::Pattern, text: &str, kind: Kind) -> String {
    let name = kind.name();
    pattern.replace_all(text, &format!("<{name}>${{0}}</{name}>"))
}

/// Remove all tags and decode entities, recovering the raw text.
pub fn strip(markup: &str) -> String {
    let mut text = String::with_capacity(markup.len());
    let mut rest = markup;
    while let Some(open) = rest.find('<') {
        text.push_str(&rest[..open]);
        rest = &rest[open..];
        match rest.find('>') {
            Some(close) => rest = &rest[close + 1..],
            None => rest = "",
        }
    }
    text.push_str(rest);
    unescape(&text)
}

#[cfg(test)]
mod tests;
