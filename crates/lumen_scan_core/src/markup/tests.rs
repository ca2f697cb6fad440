#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use crate::Pattern;
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// === Escaping ===

#[test]
fn escape_replaces_markup_chars() {
    assert_eq!(escape("a < b && c > d"), "a &lt; b &amp;&amp; c &gt; d");
    assert_eq!(escape("\"quotes\" stay"), "\"quotes\" stay");
}

#[test]
fn unescape_leaves_unknown_entities() {
    assert_eq!(unescape("&lt;&amp;lt;&quot;&"), "<&lt;&quot;&");
}

#[test]
fn escape_token_is_idempotent() {
    let t = escape_token(Token::new(None, "<"));
    assert_eq!(t.text, "&lt;");
    let t = escape_token(t);
    assert_eq!(t.text, "&lt;");
}

// === Tagging ===

#[test]
fn tag_block_single_line() {
    assert_eq!(tag_block(Kind::STRING, "'x'", true), "<STRING>'x'</STRING>");
}

#[test]
fn tag_block_splits_lines() {
    assert_eq!(
        tag_block(Kind::COMMENT, "/* a\nb */", true),
        "<COMMENT>/* a</COMMENT>\n<COMMENT>b */</COMMENT>"
    );
    assert_eq!(
        tag_block(Kind::COMMENT, "a\nb", false),
        "<COMMENT>a\nb</COMMENT>"
    );
}

#[test]
fn tag_matches_wraps_each_match() {
    let p = Pattern::new(r"\bTODO\b").unwrap();
    assert_eq!(
        tag_matches(&p, "// TODO: x TODO", Kind::COMMENT_NOTE),
        "// <COMMENT_NOTE>TODO</COMMENT_NOTE>: x <COMMENT_NOTE>TODO</COMMENT_NOTE>"
    );
}

// === Stripping ===

#[test]
fn strip_recovers_raw_text() {
    let markup = "<KEYWORD>if</KEYWORD> (a &lt; b) <STRING>\"&amp;\"</STRING>";
    assert_eq!(strip(markup), "if (a < b) \"&\"");
}

proptest! {
    #[test]
    fn strip_inverts_tagged_escape(text in "\\PC{0,40}") {
        let tagged = tag_block(Kind::STRING, &escape(&text), true);
        prop_assert_eq!(strip(&tagged), text);
    }
}
