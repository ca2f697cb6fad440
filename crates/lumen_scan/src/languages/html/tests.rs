#![allow(clippy::unwrap_used, reason = "Tests can panic")]

use pretty_assertions::assert_eq;

use super::*;
use lumen_scan_core::markup::strip;

fn html(src: &str) -> String {
    HtmlScanner::new(EmbedOptions::default()).unwrap().highlight(src).unwrap()
}

fn server() -> EmbedOptions {
    EmbedOptions::new(EmbedFlags::SERVER)
}

// === Tags ===

#[test]
fn tag_attributes_and_entities() {
    assert_eq!(
        html(r#"<p class="x">a &amp; b</p>"#),
        "&lt;<HTMLTAG>p</HTMLTAG> <TYPE>class</TYPE>=<STRING>\"x\"</STRING>&gt;\
         a <ESC>&amp;amp;</ESC> b&lt;<HTMLTAG>/p</HTMLTAG>&gt;"
    );
}

#[test]
fn unquoted_value_and_self_closing_tag() {
    assert_eq!(
        html("<img src=a.png />"),
        "&lt;<HTMLTAG>img</HTMLTAG> <TYPE>src</TYPE>=<VALUE>a.png</VALUE> /&gt;"
    );
}

#[test]
fn doctype_is_a_keyword() {
    assert_eq!(
        html("<!DOCTYPE html>"),
        "&lt;<KEYWORD>!DOCTYPE</KEYWORD> <TYPE>html</TYPE>&gt;"
    );
}

#[test]
fn comments_and_cdata() {
    assert_eq!(
        html("<!-- a > b --><![CDATA[x<y]]><!ELEMENT e>"),
        "<COMMENT>&lt;!-- a &gt; b --&gt;</COMMENT>\
         <COMMENT>&lt;![CDATA[x&lt;y]]&gt;</COMMENT>\
         <COMMENT>&lt;!ELEMENT e&gt;</COMMENT>"
    );
}

#[test]
fn unterminated_comment_runs_to_end() {
    assert_eq!(html("<!-- open\nstill"), "<COMMENT>&lt;!-- open</COMMENT>\n<COMMENT>still</COMMENT>");
}

#[test]
fn bare_ampersand_is_untagged() {
    assert_eq!(html("a & b"), "a &amp; b");
}

#[test]
fn string_stops_at_tag_end() {
    let out = html("<a href=\"x>y");
    assert_eq!(strip(&out), "<a href=\"x>y");
    assert!(out.contains("<STRING>\"x</STRING>&gt;"));
}

// === Children ===

#[test]
fn script_body_goes_to_javascript() {
    assert_eq!(
        html("<p>before<script>var x=1;</script>after</p>"),
        "&lt;<HTMLTAG>p</HTMLTAG>&gt;before\
         &lt;<HTMLTAG>script</HTMLTAG>&gt;\
         <KEYWORD>var</KEYWORD> x<OPERATOR>=</OPERATOR><NUMERIC>1</NUMERIC><OPERATOR>;</OPERATOR>\
         &lt;<HTMLTAG>/script</HTMLTAG>&gt;after&lt;<HTMLTAG>/p</HTMLTAG>&gt;"
    );
}

#[test]
fn style_body_goes_to_css() {
    let out = html("<style>a{}</style>");
    assert!(out.contains("<KEYWORD>a</KEYWORD>{}"));
    assert!(out.ends_with("&lt;<HTMLTAG>/style</HTMLTAG>&gt;"));
}

#[test]
fn script_tag_name_is_case_insensitive() {
    let out = html("<SCRIPT>var y</SCRIPT>");
    assert!(out.contains("<KEYWORD>var</KEYWORD>"));
}

#[test]
fn unclosed_script_runs_to_end() {
    let src = "<script>if (a < b) { c(); }";
    let out = html(src);
    assert_eq!(strip(&out), src);
    assert!(out.contains("<KEYWORD>if</KEYWORD>"));
}

// === Server Embedding ===

#[test]
fn breaks_cleanly_at_server_tag_in_text() {
    let mut s = HtmlScanner::new(server()).unwrap();
    s.set_source(SourceBuffer::new("<b>x</b><?php echo 1; ?>"));
    s.main().unwrap();
    assert!(s.interrupted());
    assert_eq!(s.pos(), 8);
    assert_eq!(strip(&s.tagged()), "<b>x</b>");
}

#[test]
fn server_tag_inside_attribute_string_resumes() {
    let src = r#"<a href="<?php echo $u ?>">go</a>"#;
    let mut s = HtmlScanner::new(server()).unwrap();
    s.set_source(SourceBuffer::new(src));
    s.main().unwrap();
    assert!(s.interrupted());
    assert_eq!(s.pos(), 9);
    let head = s.tagged();
    assert!(head.ends_with("<STRING>\"</STRING>"));

    // the host consumed the server block
    s.set_pos(src.find("?>").unwrap() + 2);
    s.main().unwrap();
    assert!(!s.interrupted());
    let tail = s.tagged();
    assert!(tail.starts_with("<STRING>\"</STRING>&gt;go"));
}

#[test]
fn interrupted_script_child_resumes() {
    let src = "<script>var s = 'a<?= $x ?>b';</script>";
    let mut s = HtmlScanner::new(server()).unwrap();
    s.set_source(SourceBuffer::new(src));
    s.main().unwrap();
    let at = src.find("<?=").unwrap();
    assert_eq!(s.pos(), at);
    assert_eq!(s.children().pending(), Some(("js", at)));
    s.tagged();

    s.set_pos(src.find("?>").unwrap() + 2);
    s.main().unwrap();
    assert!(s.scanner().eos());
    assert_eq!(s.children().pending(), None);
    let tail = s.tagged();
    assert!(tail.starts_with("<STRING>b'</STRING><OPERATOR>;</OPERATOR>"));
    assert!(tail.ends_with("&lt;<HTMLTAG>/script</HTMLTAG>&gt;"));
}

// === Guess ===

#[test]
fn guess_doctype() {
    let src = "<!DOCTYPE html>\n<html></html>";
    assert!((HtmlScanner::guess(src, &SourceInfo::new(src)) - 0.75).abs() < f64::EPSILON);
}

#[test]
fn guess_markup() {
    let src = "<div class=\"a\">\n<script>x()</script>\n</div>";
    assert!(HtmlScanner::guess(src, &SourceInfo::new(src)) > 0.3);
    let plain = "just some words\nand more words";
    assert!(HtmlScanner::guess(plain, &SourceInfo::new(plain)) < f64::EPSILON);
}
