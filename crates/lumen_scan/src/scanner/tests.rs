#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;

use super::*;
use crate::GrammarBuilder;

fn scanner(src: &str) -> Scanner {
    let mut g = GrammarBuilder::new("test").unwrap();
    g.add_pattern(Kind::IDENT, r"[a-z]+").unwrap();
    let mut s = Scanner::new(g.build());
    s.set_source(SourceBuffer::new(src));
    s
}

// === Recording ===

#[test]
fn record_range_records_source_text() {
    let mut s = scanner("hello world");
    s.record_range(0, 5, Some(Kind::IDENT)).unwrap();
    s.record_range(5, 5, None).unwrap();
    assert_eq!(s.tokens().as_slice(), &[Token::new(Some(Kind::IDENT), "hello")]);
}

#[test]
fn record_range_rejects_backwards_range() {
    let mut s = scanner("abc");
    assert!(matches!(
        s.record_range(2, 1, None),
        Err(ScanError::InvalidRange { from: 2, to: 1 })
    ));
}

#[test]
fn record_rest_terminates() {
    let mut s = scanner("abc def");
    s.set_pos(4);
    s.record_rest(Some(Kind::IDENT));
    assert!(s.eos());
    s.record_rest(None);
    assert_eq!(s.tokens().as_slice(), &[Token::new(Some(Kind::IDENT), "def")]);
}

#[test]
fn skip_whitespace_records_untagged() {
    let mut s = scanner(" \n\tx");
    s.skip_whitespace();
    assert_eq!(s.pos(), 3);
    assert_eq!(s.tokens().as_slice(), &[Token::new(None, " \n\t")]);
    s.skip_whitespace();
    assert_eq!(s.tokens().len(), 1);
}

#[test]
fn set_source_clears_everything() {
    let mut s = scanner("abc");
    s.record(None, "a");
    s.add_user_def("f", Kind::USER_FUNCTION);
    s.push_state(Region::new(Kind::STRING, 0));
    s.set_source(SourceBuffer::new("xyz"));
    assert!(s.tokens().is_empty());
    assert!(s.user_defs().is_empty());
    assert_eq!(s.depth(), 0);
    assert_eq!(s.text(), "xyz");
}

// === Nestable Tokens ===

#[test]
fn nestable_token_tracks_depth() {
    let open = Pattern::new(r"/\*").unwrap();
    let close = Pattern::new(r"\*/").unwrap();
    let mut s = scanner("/* a /* b */ c */ d");
    s.nestable_token(Kind::COMMENT, &open, &close).unwrap();
    assert_eq!(s.pos(), 17);
    assert_eq!(s.tokens().as_slice(), &[Token::new(Some(Kind::COMMENT), "/* a /* b */ c */")]);
}

#[test]
fn nestable_token_runs_to_eos_when_unclosed() {
    let open = Pattern::new(r"/\*").unwrap();
    let close = Pattern::new(r"\*/").unwrap();
    let mut s = scanner("/* a /* b */");
    s.nestable_token(Kind::COMMENT, &open, &close).unwrap();
    assert!(s.eos());
    assert_eq!(s.tokens().text(), "/* a /* b */");
}

#[test]
fn nestable_token_requires_opener() {
    let open = Pattern::new(r"/\*").unwrap();
    let close = Pattern::new(r"\*/").unwrap();
    let mut s = scanner("x /*");
    assert!(matches!(
        s.nestable_token(Kind::COMMENT, &open, &close),
        Err(ScanError::NestableMismatch { pos: 0, .. })
    ));
}

// === Progress ===

#[test]
fn ensure_progress() {
    let mut s = scanner("abc");
    assert!(matches!(s.ensure_progress(0, 0), Err(ScanError::NoProgress { pos: 0, .. })));
    s.set_pos(1);
    assert!(s.ensure_progress(0, 0).is_ok());
    s.set_pos(0);
    s.push_state(Region::new(Kind::STRING, 0));
    assert!(s.ensure_progress(0, 0).is_ok());
}

// === Rendering ===

#[test]
fn tagged_drains_and_escapes() {
    let mut s = scanner("");
    s.record(Some(Kind::STRING), "\"a<b\"\n\"c\"");
    s.record(None, " & ");
    s.record_escaped(Some(Kind::TAG), "<X>y</X>");
    assert_eq!(
        s.tagged(),
        "<STRING>\"a&lt;b\"</STRING>\n<STRING>\"c\"</STRING> &amp; <TAG><X>y</X></TAG>"
    );
    assert_eq!(s.tagged(), "");
}

#[test]
fn user_defs_reach_filters() {
    let mut s = scanner("");
    s.add_user_def("frob", Kind::USER_FUNCTION);
    s.record(Some(Kind::IDENT), "frob");
    s.record(None, " ");
    s.record(Some(Kind::IDENT), "other");
    assert_eq!(s.tagged(), "<USER_FUNCTION>frob</USER_FUNCTION> other");
}
