use super::*;
use pretty_assertions::assert_eq;

#[test]
fn kind_displays_its_name() {
    assert_eq!(Kind::KEYWORD.to_string(), "KEYWORD");
    assert_eq!(Kind::new("SELECTOR").name(), "SELECTOR");
    assert_eq!(format!("{:?}", Kind::STRING), "STRING");
}

#[test]
fn record_drops_empty_text() {
    let mut s = TokenStream::new();
    s.record(Some(Kind::STRING), "");
    s.record(None, " ");
    assert_eq!(s.len(), 1);
}

#[test]
fn escaped_flag_is_kept() {
    let mut s = TokenStream::new();
    s.record_escaped(None, "<KEYWORD>var</KEYWORD>");
    s.record(Some(Kind::OPERATOR), "=");
    let tokens = s.as_slice();
    assert!(tokens[0].escaped);
    assert!(!tokens[1].escaped);
    assert!(tokens[1].is(Kind::OPERATOR));
}

#[test]
fn text_concatenates_in_order() {
    let mut s = TokenStream::new();
    s.record(Some(Kind::IDENT), "x");
    s.record(None, " ");
    s.record(Some(Kind::OPERATOR), "=");
    assert_eq!(s.text(), "x =");
}

#[test]
fn take_empties_stream() {
    let mut s = TokenStream::new();
    s.record(None, "a");
    let tokens = s.take();
    assert_eq!(tokens.len(), 1);
    assert!(s.is_empty());
}

#[test]
fn into_vec_keeps_order() {
    let mut s = TokenStream::new();
    s.record(Some(Kind::KEYWORD), "let");
    s.record_escaped(None, "&amp;");
    let tokens = s.into_vec();
    let texts: Vec<_> = tokens.iter().map(|t| t.text.as_str()).collect();
    assert_eq!(texts, vec!["let", "&amp;"]);
    assert!(tokens[1].escaped);
}

#[test]
fn debug_format_is_compact() {
    let t = Token::new(Some(Kind::NUMERIC), "1");
    assert_eq!(format!("{t:?}"), "NUMERIC(\"1\")");
    let t = Token::escaped(None, "x");
    assert_eq!(format!("{t:?}"), "_!(\"x\")");
}
