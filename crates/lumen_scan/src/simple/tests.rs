#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use crate::GrammarBuilder;
use lumen_scan_core::{Kind, SourceBuffer, Token};
use pretty_assertions::assert_eq;

fn c_like() -> GrammarBuilder {
    let mut g = GrammarBuilder::new("test").unwrap();
    g.add_pattern(Kind::COMMENT, r"//[^\n]*").unwrap();
    g.add_pattern(Kind::IDENT, r"[A-Za-z_]\w*").unwrap();
    g.add_pattern(Kind::NUMERIC, r"\d+").unwrap();
    g.add_pattern(Kind::OPERATOR, r"[=+\-*/]").unwrap();
    g
}

fn scan_tokens(g: GrammarBuilder, src: &str) -> Vec<Token> {
    let mut s = SimpleScanner::new(g.build());
    s.set_source(SourceBuffer::new(src));
    s.main().unwrap();
    s.scanner().tokens().as_slice().to_vec()
}

// === Dispatch ===

#[test]
fn comment_then_assignment() {
    let tokens = scan_tokens(c_like(), "// hello\nx = 1");
    assert_eq!(
        tokens,
        vec![
            Token::new(Some(Kind::COMMENT), "// hello"),
            Token::new(None, "\n"),
            Token::new(Some(Kind::IDENT), "x"),
            Token::new(None, " "),
            Token::new(Some(Kind::OPERATOR), "="),
            Token::new(None, " "),
            Token::new(Some(Kind::NUMERIC), "1"),
        ]
    );
}

#[test]
fn ties_go_to_registration_order() {
    // `//` is both a comment start and two operators; the comment was
    // registered first.
    let tokens = scan_tokens(c_like(), "//x");
    assert_eq!(tokens, vec![Token::new(Some(Kind::COMMENT), "//x")]);

    let mut g = GrammarBuilder::bare("test");
    g.add_pattern(Kind::OPERATOR, "/").unwrap();
    g.add_pattern(Kind::COMMENT, "//.*").unwrap();
    let tokens = scan_tokens(g, "//x");
    assert_eq!(tokens[0], Token::new(Some(Kind::OPERATOR), "/"));
}

#[test]
fn unmatched_tail_is_untagged() {
    let tokens = scan_tokens(c_like(), "1 ???");
    assert_eq!(
        tokens,
        vec![Token::new(Some(Kind::NUMERIC), "1"), Token::new(None, " ???")]
    );
}

#[test]
fn tagged_runs_filters() {
    let mut g = c_like();
    g.add_identifier_mapping(Kind::KEYWORD, ["return"]);
    let mut s = SimpleScanner::new(g.build());
    let out = s.highlight("return x // TODO").unwrap();
    assert_eq!(
        out,
        "<KEYWORD>return</KEYWORD> x <COMMENT>// <COMMENT_NOTE>TODO</COMMENT_NOTE></COMMENT>"
    );
}

// === Overrides ===

#[test]
fn override_consumes_custom_span() {
    let mut g = c_like();
    let bang = lumen_scan_core::Pattern::new(r"![^!]*!?").unwrap();
    g.add_pattern(Kind::STRING, "!").unwrap();
    g.add_override(Kind::STRING, move |s: &mut Scanner, _| {
        let m = s.scan(&bang).unwrap();
        s.record_match(Some(Kind::STRING), &m);
        Ok(())
    });
    let tokens = scan_tokens(g, "a !b c! d");
    assert_eq!(tokens[2], Token::new(Some(Kind::STRING), "!b c!"));
    assert_eq!(tokens[4], Token::new(Some(Kind::IDENT), "d"));
}

#[test]
fn override_without_progress_is_an_error() {
    let mut g = c_like();
    g.add_override(Kind::NUMERIC, |_: &mut Scanner, _| Ok(()));
    let mut s = SimpleScanner::new(g.build());
    let err = s.highlight("x 12").unwrap_err();
    assert_eq!(err, ScanError::NoProgress { language: "test", pos: 2 });
}

#[test]
fn empty_match_is_an_error() {
    let mut g = GrammarBuilder::bare("test");
    g.add_pattern(Kind::STRING, "x*").unwrap();
    let mut s = SimpleScanner::new(g.build());
    assert!(matches!(
        s.highlight("abc"),
        Err(ScanError::NoProgress { .. })
    ));
}

#[test]
fn rescanning_clears_previous_output() {
    let mut s = SimpleScanner::new(c_like().build());
    let first = s.highlight("x").unwrap();
    let second = s.highlight("x").unwrap();
    assert_eq!(first, second);
    assert_eq!(second, "x");
}
