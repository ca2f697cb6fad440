#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use super::*;
use lumen_scan_core::markup::strip;
use pretty_assertions::assert_eq;

fn builtins() -> Builtins {
    Builtins::compile().unwrap()
}

fn with_ctx<R>(idents: &IdentifierMap, f: impl FnOnce(&FilterContext<'_>) -> R) -> R {
    let user_defs = FxHashMap::default();
    let rule_map = FxHashMap::default();
    let ctx = FilterContext {
        idents,
        user_defs: &user_defs,
        rule_map: &rule_map,
    };
    f(&ctx)
}

// === Identifier Filters ===

#[test]
fn map_ident_uses_classifier() {
    let mut idents = IdentifierMap::default();
    idents.add_mapping(Kind::KEYWORD, ["if"]);
    with_ctx(&idents, |ctx| {
        let t = map_ident(Token::new(Some(Kind::IDENT), "if"), ctx);
        assert_eq!(t.kind, Some(Kind::KEYWORD));
        let t = map_ident(Token::new(Some(Kind::IDENT), "x"), ctx);
        assert_eq!(t.kind, Some(Kind::IDENT));
    });
}

#[test]
fn constant_needs_four_caps() {
    let idents = IdentifierMap::default();
    with_ctx(&idents, |ctx| {
        let t = upper_to_constant(Token::new(Some(Kind::IDENT), "MAX_LEN"), ctx);
        assert_eq!(t.kind, Some(Kind::CONSTANT));
        let t = upper_to_constant(Token::new(Some(Kind::IDENT), "MAX"), ctx);
        assert_eq!(t.kind, Some(Kind::IDENT));
        let t = upper_to_constant(Token::new(Some(Kind::IDENT), "____"), ctx);
        assert_eq!(t.kind, Some(Kind::IDENT));
    });
}

#[test]
fn clean_ident_only_touches_ident() {
    let idents = IdentifierMap::default();
    with_ctx(&idents, |ctx| {
        assert_eq!(clean_ident(Token::new(Some(Kind::IDENT), "x"), ctx).kind, None);
        assert_eq!(
            clean_ident(Token::new(Some(Kind::KEYWORD), "if"), ctx).kind,
            Some(Kind::KEYWORD)
        );
    });
}

#[test]
fn user_defs_apply() {
    let idents = IdentifierMap::default();
    let mut defs = FxHashMap::default();
    defs.insert("Foo".to_owned(), Kind::USER_FUNCTION);
    let remap = FxHashMap::default();
    let ctx = FilterContext {
        idents: &idents,
        user_defs: &defs,
        rule_map: &remap,
    };
    let t = user_defs(Token::new(Some(Kind::IDENT), "Foo"), &ctx);
    assert_eq!(t.kind, Some(Kind::USER_FUNCTION));
}

// === Comment Filters ===

#[test]
fn comment_notes_are_tagged() {
    let t = comment_note(&builtins(), Token::new(Some(Kind::COMMENT), "// TODO: a < b"));
    assert!(t.escaped);
    assert_eq!(t.text, "// <COMMENT_NOTE>TODO:</COMMENT_NOTE> a &lt; b");
}

#[test]
fn plain_comment_untouched() {
    let t = comment_note(&builtins(), Token::new(Some(Kind::COMMENT), "// a < b"));
    assert!(!t.escaped);
    assert_eq!(t.text, "// a < b");
}

#[test]
fn doc_comment_detection() {
    assert!(is_doc_comment("/** x */"));
    assert!(is_doc_comment("/// x"));
    assert!(is_doc_comment("//! x"));
    assert!(!is_doc_comment("/* x */"));
    assert!(!is_doc_comment("/*****/"));
    assert!(!is_doc_comment("//"));
}

#[test]
fn doc_tags_and_params() {
    let b = builtins();
    let t = doc_comment(
        &b,
        Token::new(Some(Kind::COMMENT), "/**\n * @param x the x\n * @return y\n */"),
    );
    assert_eq!(t.kind, Some(Kind::DOCCOMMENT));
    assert_eq!(
        t.text,
        "/**\n * <DOCTAG>@param</DOCTAG><DOCPROPERTY> x</DOCPROPERTY> the x\n \
         * <DOCTAG>@return</DOCTAG> y\n */"
    );
    assert_eq!(strip(&t.text), "/**\n * @param x the x\n * @return y\n */");
}

#[test]
fn doc_param_at_line_end_keeps_text() {
    let b = builtins();
    let t = doc_comment(&b, Token::new(Some(Kind::COMMENT), "/// @param x"));
    assert_eq!(strip(&t.text), "/// @param x");
}

#[test]
fn doc_braced_type() {
    let b = builtins();
    let t = doc_comment(&b, Token::new(Some(Kind::COMMENT), "/** @type {number} */"));
    assert_eq!(
        t.text,
        "/** <DOCTAG>@type</DOCTAG> <DOCPROPERTY>{number}</DOCPROPERTY> */"
    );
}

// === String Filters ===

#[test]
fn string_escapes_are_tagged() {
    let b = builtins();
    let t = string_escapes(&b.escape, Token::new(Some(Kind::STRING), r#""a\n\x41é""#));
    assert_eq!(
        t.text,
        r#""a<ESC>\n</ESC><ESC>\x41</ESC>é""#
    );
}

#[test]
fn escaped_markup_char_stays_whole() {
    let b = builtins();
    let t = string_escapes(&b.escape, Token::new(Some(Kind::STRING), r#""\<""#));
    assert_eq!(t.text, r#""<ESC>\&lt;</ESC>""#);
    assert_eq!(strip(&t.text), r#""\<""#);
}

#[test]
fn regex_markup() {
    let b = builtins();
    let t = regex_syntax(&b.escape, Token::new(Some(Kind::REGEX), r"/a+(b|c)?\d{2,3}[x]/gi"));
    assert_eq!(strip(&t.text), r"/a+(b|c)?\d{2,3}[x]/gi");
    assert!(t.text.contains("<REGEX_OPERATOR>+</REGEX_OPERATOR>"));
    assert!(t.text.contains("<REGEX_REPEAT_MARKER>{2,3}</REGEX_REPEAT_MARKER>"));
    assert!(t.text.contains("<REGEX_CLASS_MARKER>[</REGEX_CLASS_MARKER>"));
    assert!(t.text.contains("<ESC>\\d</ESC>"));
    assert!(t.text.ends_with("<KEYWORD>gi</KEYWORD>"));
}

#[test]
fn regex_lookahead_group() {
    let b = builtins();
    let t = regex_syntax(&b.escape, Token::new(Some(Kind::REGEX), "/(?=a)/"));
    assert!(t.text.contains("<REGEX_SUBPATTERN>?=</REGEX_SUBPATTERN>"));
    assert_eq!(strip(&t.text), "/(?=a)/");
}

#[test]
fn unterminated_regex_has_no_flags() {
    let b = builtins();
    let t = regex_syntax(&b.escape, Token::new(Some(Kind::REGEX), "/abc"));
    assert!(!t.text.contains("KEYWORD"));
}

// === Stream Filters ===

#[test]
fn oo_after_member_access() {
    let idents = IdentifierMap::default();
    let tokens = vec![
        Token::new(Some(Kind::IDENT), "a"),
        Token::new(Some(Kind::OPERATOR), "."),
        Token::new(Some(Kind::IDENT), "b"),
        Token::new(Some(Kind::OPERATOR), "->"),
        Token::new(Some(Kind::IDENT), "c"),
        Token::new(Some(Kind::OPERATOR), "+"),
        Token::new(Some(Kind::IDENT), "d"),
    ];
    let out = with_ctx(&idents, |ctx| oo_syntax(tokens, ctx));
    let kinds: Vec<_> = out.iter().map(|t| t.kind).collect();
    assert_eq!(
        kinds,
        vec![
            Some(Kind::IDENT),
            Some(Kind::OPERATOR),
            Some(Kind::OO),
            Some(Kind::OPERATOR),
            Some(Kind::OO),
            Some(Kind::OPERATOR),
            Some(Kind::IDENT),
        ]
    );
}

#[test]
fn rule_map_remaps_and_clears() {
    let idents = IdentifierMap::default();
    let defs = FxHashMap::default();
    let mut map = FxHashMap::default();
    map.insert(Kind::new("SSTRING"), Some(Kind::STRING));
    map.insert(Kind::new("OPENER"), None);
    let ctx = FilterContext {
        idents: &idents,
        user_defs: &defs,
        rule_map: &map,
    };
    let out = rule_map(
        vec![
            Token::new(Some(Kind::new("SSTRING")), "'a'"),
            Token::new(Some(Kind::new("OPENER")), "{"),
        ],
        &ctx,
    );
    assert_eq!(out[0].kind, Some(Kind::STRING));
    assert_eq!(out[1].kind, None);
}
