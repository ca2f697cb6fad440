#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;

use super::*;

fn tokens(src: &str) -> Vec<(Option<&'static str>, String)> {
    let mut s = PerlScanner::new().unwrap();
    s.set_source(SourceBuffer::new(src));
    s.main().unwrap();
    s.scanner()
        .tokens()
        .iter()
        .map(|t| (t.kind.map(Kind::name), t.text.clone()))
        .collect()
}

fn tok(kind: Option<&'static str>, text: &str) -> (Option<&'static str>, String) {
    (kind, text.to_owned())
}

fn perl(src: &str) -> String {
    PerlScanner::new().unwrap().highlight(src).unwrap()
}

// === Quote-Like Operators ===

#[test]
fn balanced_delimiters_nest() {
    assert_eq!(
        tokens("q(a (b) c)"),
        vec![
            tok(Some("DELIMITER"), "q("),
            tok(Some("STRING"), "a (b) c"),
            tok(Some("DELIMITER"), ")"),
        ]
    );
}

#[test]
fn escaped_delimiter_does_not_close() {
    assert_eq!(tokens(r"qq/a\/b/")[1], tok(Some("STRING"), r"a\/b"));
}

#[test]
fn qw_splits_words() {
    assert_eq!(
        tokens("qw/x  y/"),
        vec![
            tok(Some("DELIMITER"), "qw/"),
            tok(Some("STRING"), "x"),
            tok(None, "  "),
            tok(Some("STRING"), "y"),
            tok(Some("DELIMITER"), "/"),
        ]
    );
}

#[test]
fn substitution_with_shared_delimiter() {
    assert_eq!(
        tokens("$x =~ s/a/b/g;"),
        vec![
            tok(Some("VARIABLE"), "$x"),
            tok(None, " "),
            tok(Some("OPERATOR"), "=~"),
            tok(None, " "),
            tok(Some("DELIMITER"), "s/"),
            tok(Some("REGEX"), "a"),
            tok(Some("DELIMITER"), "/"),
            tok(Some("STRING"), "b"),
            tok(Some("DELIMITER"), "/"),
            tok(Some("KEYWORD"), "g"),
            tok(Some("OPERATOR"), ";"),
        ]
    );
}

#[test]
fn substitution_with_bracket_delimiters() {
    assert_eq!(
        tokens("s{a} {b};"),
        vec![
            tok(Some("DELIMITER"), "s{"),
            tok(Some("REGEX"), "a"),
            tok(Some("DELIMITER"), "}"),
            tok(None, " "),
            tok(Some("DELIMITER"), "{"),
            tok(Some("STRING"), "b"),
            tok(Some("DELIMITER"), "}"),
            tok(Some("OPERATOR"), ";"),
        ]
    );
}

#[test]
fn unterminated_quote_runs_to_end() {
    assert_eq!(
        tokens("q(abc"),
        vec![tok(Some("DELIMITER"), "q("), tok(Some("STRING"), "abc")]
    );
}

#[test]
fn interpolating_quotes_mark_variables() {
    assert_eq!(
        tokens("qq{a $x} q{a $x}"),
        vec![
            tok(Some("DELIMITER"), "qq{"),
            tok(Some("STRING"), "a <VARIABLE>$x</VARIABLE>"),
            tok(Some("DELIMITER"), "}"),
            tok(None, " "),
            tok(Some("DELIMITER"), "q{"),
            tok(Some("STRING"), "a $x"),
            tok(Some("DELIMITER"), "}"),
        ]
    );
}

#[test]
fn unterminated_replacement_is_unwound() {
    let mut s = PerlScanner::new().unwrap();
    s.set_source(SourceBuffer::new("s{a} {b < c"));
    s.main().unwrap();
    assert_eq!(s.scanner().depth(), 0);
    assert!(s.scanner().eos());
    let toks: Vec<_> = s.scanner().tokens().iter().map(|t| (t.kind.map(Kind::name), t.text.clone())).collect();
    assert_eq!(
        toks,
        vec![
            tok(Some("DELIMITER"), "s{"),
            tok(Some("REGEX"), "a"),
            tok(Some("DELIMITER"), "}"),
            tok(None, " "),
            tok(Some("DELIMITER"), "{"),
            tok(Some("STRING"), "b < c"),
        ]
    );
    assert_eq!(s.tagged(), "<DELIMITER>s{</DELIMITER><REGEX>a</REGEX><DELIMITER>}</DELIMITER> \
                           <DELIMITER>{</DELIMITER><STRING>b &lt; c</STRING>");
}

// === Slash ===

#[test]
fn slash_after_split_is_regex() {
    let toks = tokens("split /,/, $s");
    assert_eq!(toks[2], tok(Some("DELIMITER"), "/"));
    assert_eq!(toks[3], tok(Some("REGEX"), ","));
    assert_eq!(toks[4], tok(Some("DELIMITER"), "/"));
}

#[test]
fn slash_after_operand_is_division() {
    assert_eq!(
        tokens("$a / 2"),
        vec![
            tok(Some("VARIABLE"), "$a"),
            tok(None, " "),
            tok(Some("OPERATOR"), "/"),
            tok(None, " "),
            tok(Some("NUMERIC"), "2"),
        ]
    );
}

#[test]
fn double_slash_is_operator() {
    assert_eq!(tokens("$a // 1")[2], tok(Some("OPERATOR"), "//"));
}

// === Heredoc, POD, Terminators ===

#[test]
fn heredoc_body_starts_on_next_line() {
    assert_eq!(
        tokens("print <<EOF;\nhello\nEOF\nx"),
        vec![
            tok(Some("IDENT"), "print"),
            tok(None, " "),
            tok(Some("OPERATOR"), "<<"),
            tok(Some("DELIMITER"), "EOF"),
            tok(Some("OPERATOR"), ";"),
            tok(None, "\n"),
            tok(Some("HEREDOC"), "hello\n"),
            tok(Some("DELIMITER"), "EOF"),
            tok(None, "\n"),
            tok(Some("IDENT"), "x"),
        ]
    );
}

#[test]
fn quoted_heredoc_and_unterminated_body() {
    let toks = tokens("<<'END'\nnever ends");
    assert_eq!(toks[1], tok(Some("DELIMITER"), "'END'"));
    assert_eq!(toks.last(), Some(&tok(Some("HEREDOC"), "never ends")));
}

#[test]
fn shift_operator_is_not_heredoc() {
    assert_eq!(tokens("1 << 2")[2], tok(Some("OPERATOR"), "<<"));
}

#[test]
fn pod_block_is_doc_comment() {
    assert_eq!(
        tokens("=pod\ndoc\n=cut\ncode"),
        vec![
            tok(Some("DOCCOMMENT"), "=pod\ndoc\n=cut"),
            tok(None, "\n"),
            tok(Some("IDENT"), "code"),
        ]
    );
}

#[test]
fn end_marker_stops_highlighting() {
    assert_eq!(
        tokens("1;\n__END__\nmy $x"),
        vec![
            tok(Some("NUMERIC"), "1"),
            tok(Some("OPERATOR"), ";"),
            tok(None, "\n"),
            tok(Some("DELIMITER"), "__END__"),
            tok(None, "\nmy $x"),
        ]
    );
}

// === Output ===

#[test]
fn rendered_statement() {
    assert_eq!(
        perl(r#"my $x = "a"; `ls`"#),
        "<KEYWORD>my</KEYWORD> <VARIABLE>$x</VARIABLE> <OPERATOR>=</OPERATOR> \
         <STRING>\"a\"</STRING><OPERATOR>;</OPERATOR> <FUNCTION>`ls`</FUNCTION>"
    );
}

#[test]
fn word_operators() {
    assert_eq!(perl("$a eq $b"), "<VARIABLE>$a</VARIABLE> <OPERATOR>eq</OPERATOR> <VARIABLE>$b</VARIABLE>");
}

// === Guess ===

#[test]
fn guess() {
    let shebang = "#!/usr/bin/perl -w\nprint 1;";
    assert!((PerlScanner::guess(shebang, &SourceInfo::new(shebang)) - 1.0).abs() < f64::EPSILON);
    let code = "sub f {\n  my $x = shift;\n}";
    assert!(PerlScanner::guess(code, &SourceInfo::new(code)) > 0.1);
}
